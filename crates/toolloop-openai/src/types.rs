//! `OpenAI` Responses API request and response types.
//!
//! These types mirror the wire format and are not part of the public API.
//! Conversion to and from `toolloop` types happens in
//! [`convert`](crate::convert).

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ── Request types ──────────────────────────────────────────────────

/// Top-level request body for `POST /responses`.
#[derive(Debug, Serialize)]
pub(crate) struct Request<'a> {
    pub model: &'a str,
    pub input: Vec<InputItem>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<Tool<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<Reasoning>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parallel_tool_calls: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
}

/// Reasoning settings.
#[derive(Debug, Serialize)]
pub(crate) struct Reasoning {
    pub effort: &'static str,
}

/// One entry of the request's `input` list.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum InputItem {
    /// A system, user, or assistant message.
    Message {
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        role: &'static str,
        content: InputContent,
    },
    /// A schema-typed tool call the model made earlier.
    FunctionCall {
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        call_id: String,
        name: String,
        arguments: String,
    },
    /// A grammar-constrained tool call the model made earlier.
    CustomToolCall {
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        call_id: String,
        name: String,
        input: String,
    },
    /// A reasoning item the model produced earlier.
    Reasoning {
        id: String,
        summary: Vec<SummaryText>,
        #[serde(skip_serializing_if = "Option::is_none")]
        encrypted_content: Option<String>,
    },
    /// Result of a schema-typed tool call.
    FunctionCallOutput { call_id: String, output: String },
    /// Result of a grammar-constrained tool call.
    CustomToolCallOutput { call_id: String, output: String },
}

/// Message content: plain text for prompts, output parts for resent
/// assistant messages.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub(crate) enum InputContent {
    Text(String),
    Parts(Vec<OutputTextPart>),
}

/// An `output_text` content part.
#[derive(Debug, Serialize)]
pub(crate) struct OutputTextPart {
    #[serde(rename = "type")]
    pub part_type: &'static str,
    pub text: String,
}

/// A reasoning summary entry.
#[derive(Debug, Serialize)]
pub(crate) struct SummaryText {
    #[serde(rename = "type")]
    pub part_type: &'static str,
    pub text: String,
}

/// Tool declaration sent in the request.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum Tool<'a> {
    Function {
        name: &'a str,
        description: &'a str,
        parameters: &'a Value,
    },
    Custom {
        name: &'a str,
        description: &'a str,
        format: GrammarFormat<'a>,
    },
}

/// Grammar format of a custom tool.
#[derive(Debug, Serialize)]
pub(crate) struct GrammarFormat<'a> {
    #[serde(rename = "type")]
    pub format_type: &'static str,
    pub syntax: &'static str,
    pub definition: &'a str,
}

// ── Response types ─────────────────────────────────────────────────

/// Top-level response from `POST /responses`.
#[derive(Debug, Deserialize)]
pub(crate) struct Response {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub output: Vec<OutputItem>,
    #[serde(default)]
    pub usage: Option<ResponseUsage>,
    #[serde(default)]
    pub error: Option<ErrorDetail>,
}

/// An item of the response's `output` list.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum OutputItem {
    Message {
        id: String,
        #[serde(default)]
        content: Vec<ContentPart>,
    },
    FunctionCall {
        #[serde(default)]
        id: Option<String>,
        call_id: String,
        name: String,
        #[serde(default)]
        arguments: String,
    },
    CustomToolCall {
        #[serde(default)]
        id: Option<String>,
        call_id: String,
        name: String,
        #[serde(default)]
        input: String,
    },
    Reasoning {
        id: String,
        #[serde(default)]
        summary: Vec<SummaryPart>,
        #[serde(default)]
        encrypted_content: Option<String>,
    },
    /// Item types the client doesn't model (web search calls and such).
    #[serde(other)]
    Unknown,
}

/// A content part of an output message.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum ContentPart {
    OutputText {
        text: String,
    },
    Refusal {
        refusal: String,
    },
    #[serde(other)]
    Unknown,
}

/// A reasoning summary entry.
#[derive(Debug, Deserialize)]
pub(crate) struct SummaryPart {
    #[serde(default)]
    pub text: String,
}

/// Token usage in the response.
#[derive(Debug, Deserialize)]
pub(crate) struct ResponseUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    #[serde(default)]
    pub output_tokens_details: Option<OutputTokensDetails>,
}

/// Detailed breakdown of output tokens.
#[derive(Debug, Deserialize)]
pub(crate) struct OutputTokensDetails {
    #[serde(default)]
    pub reasoning_tokens: Option<u64>,
}

// ── Error types ────────────────────────────────────────────────────

/// Error response body from the API.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorResponse {
    pub error: ErrorDetail,
}

/// Error detail within an error response or failed response.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorDetail {
    #[serde(default)]
    pub code: Option<String>,
    pub message: String,
}

// ── Streaming types ────────────────────────────────────────────────

/// A single SSE event from the streaming API.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub(crate) enum StreamEvent {
    #[serde(rename = "response.created")]
    Created { response: Response },
    #[serde(rename = "response.output_item.added")]
    OutputItemAdded { output_index: u32, item: OutputItem },
    #[serde(rename = "response.output_text.delta")]
    OutputTextDelta { item_id: String, delta: String },
    #[serde(rename = "response.function_call_arguments.delta")]
    FunctionCallArgumentsDelta { item_id: String, delta: String },
    #[serde(rename = "response.function_call_arguments.done")]
    FunctionCallArgumentsDone { item_id: String, arguments: String },
    #[serde(rename = "response.custom_tool_call_input.delta")]
    CustomToolCallInputDelta { item_id: String, delta: String },
    #[serde(rename = "response.custom_tool_call_input.done")]
    CustomToolCallInputDone { item_id: String, input: String },
    #[serde(rename = "response.output_item.done")]
    OutputItemDone { output_index: u32, item: OutputItem },
    #[serde(rename = "response.completed")]
    Completed { response: Response },
    #[serde(rename = "response.incomplete")]
    Incomplete { response: Response },
    #[serde(rename = "response.failed")]
    Failed { response: Response },
    #[serde(rename = "error")]
    Error {
        #[serde(default)]
        code: Option<String>,
        message: String,
    },
    /// Progress and bookkeeping events the client doesn't act on.
    #[serde(other)]
    Other,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_response_deserialization() {
        let json = json!({
            "id": "resp_1",
            "object": "response",
            "model": "gpt-5-mini",
            "status": "completed",
            "output": [
                { "type": "reasoning", "id": "rs_1", "summary": [] },
                {
                    "type": "custom_tool_call",
                    "id": "ctc_1",
                    "call_id": "call_1",
                    "name": "checkPrice",
                    "input": "{\"sku\":\"SKU-001\"}"
                },
                { "type": "web_search_call", "id": "ws_1", "status": "completed" }
            ],
            "usage": {
                "input_tokens": 120,
                "output_tokens": 40,
                "output_tokens_details": { "reasoning_tokens": 32 },
                "total_tokens": 160
            }
        });
        let resp: Response = serde_json::from_value(json).unwrap();
        assert_eq!(resp.id, "resp_1");
        assert_eq!(resp.output.len(), 3);
        assert!(matches!(resp.output[1], OutputItem::CustomToolCall { .. }));
        assert!(matches!(resp.output[2], OutputItem::Unknown));
        let usage = resp.usage.unwrap();
        assert_eq!(usage.output_tokens_details.unwrap().reasoning_tokens, Some(32));
    }

    #[test]
    fn test_error_response_deserialization() {
        let json = json!({
            "error": {
                "message": "Incorrect API key provided",
                "type": "invalid_request_error",
                "code": "invalid_api_key"
            }
        });
        let err: ErrorResponse = serde_json::from_value(json).unwrap();
        assert_eq!(err.error.message, "Incorrect API key provided");
        assert_eq!(err.error.code.as_deref(), Some("invalid_api_key"));
    }

    #[test]
    fn test_input_items_serialization() {
        let items = vec![
            InputItem::Message {
                id: None,
                role: "user",
                content: InputContent::Text("hi".into()),
            },
            InputItem::CustomToolCallOutput {
                call_id: "call_1".into(),
                output: "{}".into(),
            },
        ];
        let json = serde_json::to_value(&items).unwrap();
        assert_eq!(json[0]["type"], "message");
        assert_eq!(json[0]["content"], "hi");
        assert!(json[0].get("id").is_none());
        assert_eq!(json[1]["type"], "custom_tool_call_output");
        assert_eq!(json[1]["call_id"], "call_1");
    }

    #[test]
    fn test_custom_tool_serialization() {
        let tool = Tool::Custom {
            name: "checkPrice",
            description: "Price for a SKU",
            format: GrammarFormat {
                format_type: "grammar",
                syntax: "lark",
                definition: "start: /.+/",
            },
        };
        let json = serde_json::to_value(&tool).unwrap();
        assert_eq!(json["type"], "custom");
        assert_eq!(json["format"]["type"], "grammar");
        assert_eq!(json["format"]["syntax"], "lark");
    }

    #[test]
    fn test_stream_event_deserialization() {
        let delta: StreamEvent = serde_json::from_value(json!({
            "type": "response.function_call_arguments.delta",
            "sequence_number": 7,
            "item_id": "fc_1",
            "output_index": 0,
            "delta": "{\"li"
        }))
        .unwrap();
        assert!(matches!(delta, StreamEvent::FunctionCallArgumentsDelta { ref delta, .. } if delta == "{\"li"));

        let other: StreamEvent = serde_json::from_value(json!({
            "type": "response.in_progress",
            "response": {}
        }))
        .unwrap();
        assert!(matches!(other, StreamEvent::Other));
    }
}
