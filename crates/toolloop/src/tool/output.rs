//! Tool output types.

use serde::Serialize;
use serde_json::Value;

use super::ToolError;

/// Output returned by a tool handler.
///
/// Holds a JSON value; the dispatcher serializes it to text for the
/// model. A handler with nothing to report returns [`ToolOutput::null`].
///
/// ```rust
/// use serde_json::json;
/// use toolloop::tool::ToolOutput;
///
/// let output = ToolOutput::from(json!({"priceCents": 4999}));
/// assert_eq!(output.to_payload(), r#"{"priceCents":4999}"#);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolOutput {
    /// The result value.
    pub value: Value,
}

impl ToolOutput {
    /// Creates an output from a JSON value.
    pub fn new(value: Value) -> Self {
        Self { value }
    }

    /// An empty result, serialized as `null`.
    pub fn null() -> Self {
        Self::default()
    }

    /// Serializes any `Serialize` value into an output.
    pub fn json<T: Serialize>(value: &T) -> Result<Self, ToolError> {
        Ok(Self::new(serde_json::to_value(value)?))
    }

    /// The JSON text sent back to the model.
    pub fn to_payload(&self) -> String {
        self.value.to_string()
    }
}

impl From<Value> for ToolOutput {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}

impl From<String> for ToolOutput {
    fn from(s: String) -> Self {
        Self::new(Value::String(s))
    }
}

impl From<&str> for ToolOutput {
    fn from(s: &str) -> Self {
        Self::new(Value::String(s.to_string()))
    }
}

impl From<()> for ToolOutput {
    fn from((): ()) -> Self {
        Self::null()
    }
}
