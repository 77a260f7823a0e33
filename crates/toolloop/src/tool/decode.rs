//! Argument decoding per calling convention.

use serde_json::{Map, Value};

use super::{CallingConvention, ToolDeclaration, ToolFault};
use crate::chat::{CallKind, ToolInvocation};

/// Decodes an invocation's raw arguments into the argument object handed
/// to the handler.
///
/// - Schema-typed: the text must be a JSON object (an empty string means
///   no arguments) and, with the `schema` feature, must satisfy the
///   parameter schema.
/// - Grammar-constrained: the grammar already constrained the text, and
///   every grammar the tools use produces a JSON object, so the text is
///   parsed as one.
///
/// An invocation whose kind doesn't match the declaration's convention is
/// rejected.
pub(crate) fn decode_arguments(
    declaration: &ToolDeclaration,
    call: &ToolInvocation,
) -> Result<Value, ToolFault> {
    let fault = |message: String| ToolFault::ArgumentDecode {
        tool: call.tool_name.clone(),
        message,
    };

    if call.kind != declaration.call_kind() {
        return Err(fault(format!(
            "{} call for a tool declared with {} arguments",
            kind_label(call.kind),
            kind_label(declaration.call_kind()),
        )));
    }

    match &declaration.convention {
        CallingConvention::Schema(schema) => {
            let args = parse_object(&call.raw_arguments, true).map_err(fault)?;
            #[cfg(feature = "schema")]
            schema.validate(&args).map_err(fault)?;
            #[cfg(not(feature = "schema"))]
            let _ = schema;
            Ok(args)
        }
        CallingConvention::Grammar(_) => parse_object(&call.raw_arguments, false).map_err(fault),
    }
}

fn parse_object(raw: &str, empty_is_none: bool) -> Result<Value, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return if empty_is_none {
            Ok(Value::Object(Map::new()))
        } else {
            Err("empty input".into())
        };
    }
    match serde_json::from_str::<Value>(trimmed) {
        Ok(value @ Value::Object(_)) => Ok(value),
        Ok(other) => Err(format!("expected a JSON object, got {}", json_type(&other))),
        Err(e) => Err(format!("malformed JSON: {e}")),
    }
}

fn kind_label(kind: CallKind) -> &'static str {
    match kind {
        CallKind::Function => "function",
        CallKind::Custom => "custom",
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::{Grammar, JsonSchema};
    use serde_json::json;

    fn price_schema() -> ToolDeclaration {
        ToolDeclaration::schema(
            "getPrice",
            "price lookup",
            JsonSchema::new(json!({
                "type": "object",
                "properties": {
                    "store": { "type": "string", "enum": ["storeA", "storeB"] },
                    "sku": { "type": "string" }
                },
                "required": ["store", "sku"],
                "additionalProperties": false
            })),
        )
    }

    fn price_grammar() -> ToolDeclaration {
        ToolDeclaration::grammar("checkPrice", "price lookup", Grammar::lark("start: /.+/"))
    }

    #[test]
    fn test_schema_arguments_decode() {
        let call = ToolInvocation::function("c1", "getPrice", r#"{"store":"storeA","sku":"N3"}"#);
        let args = decode_arguments(&price_schema(), &call).unwrap();
        assert_eq!(args["sku"], "N3");
    }

    #[test]
    fn test_empty_schema_arguments_are_empty_object() {
        let decl = ToolDeclaration::schema(
            "get_current_datetime",
            "",
            JsonSchema::new(json!({"type": "object", "properties": {}})),
        );
        let call = ToolInvocation::function("c1", "get_current_datetime", "");
        assert_eq!(decode_arguments(&decl, &call).unwrap(), json!({}));
    }

    #[test]
    fn test_malformed_json_is_decode_fault() {
        let call = ToolInvocation::function("c1", "getPrice", r#"{"store":"#);
        let err = decode_arguments(&price_schema(), &call).unwrap_err();
        assert!(matches!(err, ToolFault::ArgumentDecode { ref message, .. } if message.starts_with("malformed JSON")));
    }

    #[test]
    fn test_non_object_is_decode_fault() {
        let call = ToolInvocation::function("c1", "getPrice", "[1, 2]");
        let err = decode_arguments(&price_schema(), &call).unwrap_err();
        assert_eq!(
            err,
            ToolFault::ArgumentDecode {
                tool: "getPrice".into(),
                message: "expected a JSON object, got an array".into(),
            }
        );
    }

    #[cfg(feature = "schema")]
    #[test]
    fn test_schema_violation_is_decode_fault() {
        let call = ToolInvocation::function("c1", "getPrice", r#"{"store":"storeC","sku":"N3"}"#);
        assert!(matches!(
            decode_arguments(&price_schema(), &call),
            Err(ToolFault::ArgumentDecode { .. })
        ));
    }

    #[test]
    fn test_grammar_arguments_decode() {
        let call = ToolInvocation::custom("c1", "checkPrice", "  {\"sku\": \"OOS-ITEM\"}\n");
        let args = decode_arguments(&price_grammar(), &call).unwrap();
        assert_eq!(args["sku"], "OOS-ITEM");
    }

    #[test]
    fn test_grammar_empty_input_is_fault() {
        let call = ToolInvocation::custom("c1", "checkPrice", "");
        assert!(decode_arguments(&price_grammar(), &call).is_err());
    }

    #[test]
    fn test_convention_mismatch_is_fault() {
        let call = ToolInvocation::function("c1", "checkPrice", r#"{"sku":"A"}"#);
        let err = decode_arguments(&price_grammar(), &call).unwrap_err();
        assert!(err.to_string().contains("function call for a tool declared with custom"));
    }
}
