//! Normalized model response.
//!
//! Buffered and streaming calls both end in a [`ModelResponse`], so the
//! orchestration loop only ever inspects one shape.

use serde::{Deserialize, Serialize};

use crate::chat::{OutputItem, ToolInvocation};
use crate::usage::Usage;

/// Terminal status reported by the service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    /// The model finished its turn.
    #[default]
    Completed,
    /// Output was cut short (for example by an output-token cap).
    Incomplete,
}

/// One complete response from the model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelResponse {
    /// Service response id.
    pub id: String,
    /// Model that produced the response.
    pub model: String,
    /// Terminal status.
    pub status: ResponseStatus,
    /// Output items in service order.
    pub items: Vec<OutputItem>,
    /// Token usage for this call.
    pub usage: Usage,
}

impl ModelResponse {
    /// Concatenated assistant text, or `None` when the response has none.
    ///
    /// Empty messages don't count: a response whose only text is `""` has
    /// no text.
    pub fn output_text(&self) -> Option<String> {
        let text: String = self.items.iter().filter_map(OutputItem::as_text).collect();
        if text.is_empty() { None } else { Some(text) }
    }

    /// The tool invocations requested in this response, in item order.
    pub fn tool_invocations(&self) -> Vec<&ToolInvocation> {
        self.items
            .iter()
            .filter_map(OutputItem::as_tool_invocation)
            .collect()
    }

    /// Whether the response requests at least one tool invocation.
    ///
    /// This is the only thing that keeps a session going; reasoning and
    /// other stray items never do.
    pub fn has_tool_invocations(&self) -> bool {
        self.items
            .iter()
            .any(|item| item.as_tool_invocation().is_some())
    }
}
