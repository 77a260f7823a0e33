//! Tool error types.

use serde_json::json;

/// Error returned by a tool handler.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct ToolError {
    /// Human-readable error description.
    pub message: String,
}

impl ToolError {
    /// Creates a new tool error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for ToolError {
    fn from(err: serde_json::Error) -> Self {
        Self::new(err.to_string())
    }
}

/// A fault confined to one tool invocation.
///
/// Faults never abort the session. The dispatcher renders them into the
/// invocation's result via [`payload`](Self::payload) so the model can see
/// what went wrong and react on the next round.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ToolFault {
    /// The model asked for a tool that was never declared.
    #[error("Unknown tool: {tool}")]
    UnknownTool {
        /// The requested name.
        tool: String,
    },
    /// The arguments could not be decoded under the tool's calling
    /// convention, or failed its parameter schema.
    #[error("Invalid arguments for {tool}: {message}")]
    ArgumentDecode {
        /// The tool's name.
        tool: String,
        /// What was wrong with the arguments.
        message: String,
    },
    /// The handler returned an error or panicked.
    #[error("Tool {tool} failed: {message}")]
    HandlerFailure {
        /// The tool's name.
        tool: String,
        /// The handler's error message.
        message: String,
    },
}

impl ToolFault {
    /// Stable machine-readable kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnknownTool { .. } => "unknown_tool",
            Self::ArgumentDecode { .. } => "argument_decode_error",
            Self::HandlerFailure { .. } => "handler_failure",
        }
    }

    /// The tool the fault belongs to.
    pub fn tool(&self) -> &str {
        match self {
            Self::UnknownTool { tool }
            | Self::ArgumentDecode { tool, .. }
            | Self::HandlerFailure { tool, .. } => tool,
        }
    }

    /// The JSON error payload sent back to the model.
    pub fn payload(&self) -> String {
        json!({
            "error": {
                "kind": self.kind(),
                "tool": self.tool(),
                "message": self.to_string(),
            }
        })
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_payload_shape() {
        let fault = ToolFault::UnknownTool {
            tool: "teleport".into(),
        };
        let payload: Value = serde_json::from_str(&fault.payload()).unwrap();
        assert_eq!(payload["error"]["kind"], "unknown_tool");
        assert_eq!(payload["error"]["tool"], "teleport");
        assert_eq!(payload["error"]["message"], "Unknown tool: teleport");
    }

    #[test]
    fn test_kinds_are_distinct() {
        let decode = ToolFault::ArgumentDecode {
            tool: "t".into(),
            message: "m".into(),
        };
        let failure = ToolFault::HandlerFailure {
            tool: "t".into(),
            message: "m".into(),
        };
        assert_ne!(decode.kind(), failure.kind());
        assert_eq!(failure.to_string(), "Tool t failed: m");
    }
}
