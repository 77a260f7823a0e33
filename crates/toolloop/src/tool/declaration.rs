//! Tool declarations and calling conventions.
//!
//! A [`ToolDeclaration`] tells the model a tool exists and how to call it.
//! The [`CallingConvention`] decides both what the model is shown and how
//! the dispatcher decodes what it sends back:
//!
//! ```rust
//! use serde_json::json;
//! use toolloop::tool::{CallingConvention, Grammar, JsonSchema, ToolDeclaration};
//!
//! let by_schema = ToolDeclaration::schema(
//!     "getPrice",
//!     "Get the price of a SKU at a store",
//!     JsonSchema::new(json!({
//!         "type": "object",
//!         "properties": { "sku": { "type": "string" } },
//!         "required": ["sku"],
//!         "additionalProperties": false
//!     })),
//! );
//!
//! let by_grammar = ToolDeclaration::grammar(
//!     "checkPrice",
//!     "Get the price of a SKU",
//!     Grammar::lark(r#"start: "{\"sku\":\"" SKU "\"}"
//! SKU: /[A-Z0-9-]+/"#),
//! );
//!
//! assert!(matches!(by_schema.convention, CallingConvention::Schema(_)));
//! assert!(matches!(by_grammar.convention, CallingConvention::Grammar(_)));
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::chat::CallKind;

/// A declared tool: name, description, and calling convention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDeclaration {
    /// Unique name within a registry.
    pub name: String,
    /// What the tool does, shown to the model.
    pub description: String,
    /// How the model calls the tool.
    pub convention: CallingConvention,
}

impl ToolDeclaration {
    /// A schema-typed tool.
    pub fn schema(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: JsonSchema,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            convention: CallingConvention::Schema(parameters),
        }
    }

    /// A grammar-constrained tool.
    pub fn grammar(
        name: impl Into<String>,
        description: impl Into<String>,
        grammar: Grammar,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            convention: CallingConvention::Grammar(grammar),
        }
    }

    /// The invocation kind this declaration expects.
    pub fn call_kind(&self) -> CallKind {
        match self.convention {
            CallingConvention::Schema(_) => CallKind::Function,
            CallingConvention::Grammar(_) => CallKind::Custom,
        }
    }
}

/// How a tool's arguments are described to the model and decoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "contract", rename_all = "snake_case")]
pub enum CallingConvention {
    /// Arguments are a JSON object conforming to a schema.
    Schema(JsonSchema),
    /// Arguments are text produced under a grammar.
    Grammar(Grammar),
}

/// Grammar dialects a service may accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrammarSyntax {
    /// Lark EBNF.
    Lark,
    /// A single regular expression.
    Regex,
}

impl GrammarSyntax {
    /// Wire name of the dialect.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lark => "lark",
            Self::Regex => "regex",
        }
    }
}

/// A grammar constraining a custom tool's input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grammar {
    /// Dialect of `definition`.
    pub syntax: GrammarSyntax,
    /// The grammar source.
    pub definition: String,
}

impl Grammar {
    /// A Lark grammar.
    pub fn lark(definition: impl Into<String>) -> Self {
        Self {
            syntax: GrammarSyntax::Lark,
            definition: definition.into(),
        }
    }

    /// A regex grammar.
    pub fn regex(definition: impl Into<String>) -> Self {
        Self {
            syntax: GrammarSyntax::Regex,
            definition: definition.into(),
        }
    }
}

/// A JSON Schema document describing tool parameters.
///
/// Wraps a [`serde_json::Value`]; validation goes through the
/// [`jsonschema`] crate when the `schema` feature is enabled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonSchema(Value);

impl JsonSchema {
    /// Creates a schema from a raw JSON value.
    pub fn new(schema: Value) -> Self {
        Self(schema)
    }

    /// Returns a reference to the underlying JSON value.
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Derives a schema from a Rust type implementing
    /// [`schemars::JsonSchema`].
    #[cfg(feature = "schema")]
    pub fn from_type<T: schemars::JsonSchema>() -> Result<Self, serde_json::Error> {
        let schema = schemars::schema_for!(T);
        let value = serde_json::to_value(schema)?;
        Ok(Self(value))
    }

    /// Validates `value` against this schema.
    ///
    /// On failure returns the violations joined with `"; "`. A malformed
    /// schema is reported the same way.
    #[cfg(feature = "schema")]
    pub fn validate(&self, value: &Value) -> Result<(), String> {
        let validator = jsonschema::validator_for(&self.0)
            .map_err(|e| format!("invalid JSON schema: {e}"))?;
        let errors: Vec<String> = validator
            .iter_errors(value)
            .map(|e| e.to_string())
            .collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors.join("; "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_call_kind_follows_convention() {
        let schema = ToolDeclaration::schema("a", "", JsonSchema::new(json!({"type": "object"})));
        let grammar = ToolDeclaration::grammar("b", "", Grammar::regex("^[0-9]+$"));
        assert_eq!(schema.call_kind(), CallKind::Function);
        assert_eq!(grammar.call_kind(), CallKind::Custom);
        assert_eq!(GrammarSyntax::Regex.as_str(), "regex");
    }

    #[cfg(feature = "schema")]
    #[test]
    fn test_validate_reports_violations() {
        let schema = JsonSchema::new(json!({
            "type": "object",
            "properties": { "limit": { "type": "integer", "minimum": 1 } },
            "required": ["limit"]
        }));
        assert!(schema.validate(&json!({"limit": 3})).is_ok());
        let err = schema.validate(&json!({"limit": "three"})).unwrap_err();
        assert!(!err.is_empty());
        assert!(schema.validate(&json!({})).is_err());
    }

    #[cfg(feature = "schema")]
    #[test]
    fn test_from_type() {
        #[derive(schemars::JsonSchema)]
        #[allow(dead_code)]
        struct Args {
            sku: String,
        }
        let schema = JsonSchema::from_type::<Args>().unwrap();
        assert_eq!(schema.as_value()["properties"]["sku"]["type"], "string");
    }
}
