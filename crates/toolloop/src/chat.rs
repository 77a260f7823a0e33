//! Conversation data model.
//!
//! A [`Message`] is one entry of the append-only conversation log. Assistant
//! entries carry the model's [`OutputItem`]s verbatim so they can be resent
//! on the next round, and tool results carry the [`ToolResult`] that answers
//! a [`ToolInvocation`] by correlation id.

use serde::{Deserialize, Serialize};

/// Who authored a [`Message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Instructions framing the whole session.
    System,
    /// The end user's request.
    User,
    /// An item produced by the model.
    Assistant,
    /// The outcome of a local tool invocation.
    ToolResult,
}

/// Which calling convention produced a [`ToolInvocation`].
///
/// Mirrors [`CallingConvention`](crate::tool::CallingConvention) on the
/// declaration side: schema-typed tools are invoked with function calls,
/// grammar-constrained tools with custom calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallKind {
    /// JSON arguments validated against a parameter schema.
    Function,
    /// Free-form text constrained by a grammar.
    Custom,
}

/// A request from the model to run one local tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolInvocation {
    /// Service-assigned id; the matching [`ToolResult`] echoes it.
    pub correlation_id: String,
    /// Output item id, used to reassemble streamed argument fragments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_id: Option<String>,
    /// Name of the declared tool.
    pub tool_name: String,
    /// JSON text (function calls) or grammar-produced text (custom calls).
    pub raw_arguments: String,
    /// Calling convention of the request.
    pub kind: CallKind,
}

impl ToolInvocation {
    /// A schema-typed invocation.
    pub fn function(
        correlation_id: impl Into<String>,
        tool_name: impl Into<String>,
        raw_arguments: impl Into<String>,
    ) -> Self {
        Self {
            correlation_id: correlation_id.into(),
            item_id: None,
            tool_name: tool_name.into(),
            raw_arguments: raw_arguments.into(),
            kind: CallKind::Function,
        }
    }

    /// A grammar-constrained invocation.
    pub fn custom(
        correlation_id: impl Into<String>,
        tool_name: impl Into<String>,
        raw_arguments: impl Into<String>,
    ) -> Self {
        Self {
            kind: CallKind::Custom,
            ..Self::function(correlation_id, tool_name, raw_arguments)
        }
    }

    /// Sets the output item id.
    #[must_use]
    pub fn with_item_id(mut self, item_id: impl Into<String>) -> Self {
        self.item_id = Some(item_id.into());
        self
    }
}

/// The answer to one [`ToolInvocation`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Correlation id of the invocation this answers.
    pub correlation_id: String,
    /// Name of the tool that was requested.
    pub tool_name: String,
    /// Calling convention of the invocation, so the client can encode the
    /// result the way the service expects.
    pub kind: CallKind,
    /// JSON text: the handler's result, or a fault payload.
    pub payload: String,
    /// Whether `payload` describes a fault.
    #[serde(default)]
    pub is_error: bool,
}

/// One item of model output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutputItem {
    /// Assistant text.
    Message {
        /// Service item id, if the service assigned one.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        /// The text itself.
        text: String,
    },
    /// A tool invocation request.
    ToolInvocation(ToolInvocation),
    /// Hidden reasoning. Resent verbatim; never keeps the loop alive.
    Reasoning {
        /// Service item id.
        id: String,
        /// Human-readable summary parts, possibly empty.
        #[serde(default)]
        summary: Vec<String>,
        /// Opaque reasoning state, when the service returns one.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        encrypted_content: Option<String>,
    },
}

impl OutputItem {
    /// Assistant text without an item id.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Message {
            id: None,
            text: text.into(),
        }
    }

    /// The service's id for this item, if any.
    pub fn item_id(&self) -> Option<&str> {
        match self {
            Self::Message { id, .. } => id.as_deref(),
            Self::ToolInvocation(call) => call.item_id.as_deref(),
            Self::Reasoning { id, .. } => Some(id),
        }
    }

    /// Returns the invocation if this item is one.
    pub fn as_tool_invocation(&self) -> Option<&ToolInvocation> {
        match self {
            Self::ToolInvocation(call) => Some(call),
            _ => None,
        }
    }

    /// Returns the assistant text if this item is a message.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Message { text, .. } => Some(text),
            _ => None,
        }
    }
}

/// What a [`Message`] carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum MessageContent {
    /// Plain text (system and user messages).
    Text(String),
    /// A model output item.
    Output(OutputItem),
    /// A tool result.
    ToolResult(ToolResult),
}

/// One entry of the conversation log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Author of the entry.
    pub role: Role,
    /// Payload of the entry.
    pub content: MessageContent,
}

impl Message {
    /// A system message.
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: MessageContent::Text(text.into()),
        }
    }

    /// A user message.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Text(text.into()),
        }
    }

    /// An assistant entry wrapping a model output item.
    pub fn output(item: OutputItem) -> Self {
        Self {
            role: Role::Assistant,
            content: MessageContent::Output(item),
        }
    }

    /// A tool-result entry.
    pub fn tool_result(result: ToolResult) -> Self {
        Self {
            role: Role::ToolResult,
            content: MessageContent::ToolResult(result),
        }
    }

    /// The text of a system, user, or assistant text entry.
    pub fn text(&self) -> Option<&str> {
        match &self.content {
            MessageContent::Text(text) => Some(text),
            MessageContent::Output(item) => item.as_text(),
            MessageContent::ToolResult(_) => None,
        }
    }

    /// The invocation, if this entry is one.
    pub fn as_tool_invocation(&self) -> Option<&ToolInvocation> {
        match &self.content {
            MessageContent::Output(item) => item.as_tool_invocation(),
            _ => None,
        }
    }

    /// The tool result, if this entry is one.
    pub fn as_tool_result(&self) -> Option<&ToolResult> {
        match &self.content {
            MessageContent::ToolResult(result) => Some(result),
            _ => None,
        }
    }
}
