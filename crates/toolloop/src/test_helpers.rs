//! Pre-built helpers for tests that drive sessions.
//!
//! Available with the `test-utils` feature so downstream crates can reuse
//! them, and always compiled for this crate's own tests. Provides response
//! builders, a converter from a response to the fragmented event sequence
//! a streaming client would produce, and a [`MockClient`] factory.

use crate::chat::{OutputItem, ToolInvocation};
use crate::mock::MockClient;
use crate::response::{ModelResponse, ResponseStatus};
use crate::stream::ResponseEvent;
use crate::usage::Usage;

/// Returns a [`Usage`] with 100 input / 50 output tokens.
pub fn sample_usage() -> Usage {
    Usage {
        input_tokens: 100,
        output_tokens: 50,
        reasoning_tokens: None,
    }
}

/// A response with a single text message.
pub fn text_response(text: &str) -> ModelResponse {
    ModelResponse {
        id: "resp_text".into(),
        model: "mock-model".into(),
        status: ResponseStatus::Completed,
        items: vec![OutputItem::Message {
            id: Some("msg_1".into()),
            text: text.into(),
        }],
        usage: sample_usage(),
    }
}

/// A response with the given tool invocations and nothing else.
pub fn tool_response(calls: Vec<ToolInvocation>) -> ModelResponse {
    ModelResponse {
        id: "resp_tools".into(),
        model: "mock-model".into(),
        status: ResponseStatus::Completed,
        items: calls.into_iter().map(OutputItem::ToolInvocation).collect(),
        usage: sample_usage(),
    }
}

/// A response with neither text nor tool invocations, only reasoning.
pub fn silent_response() -> ModelResponse {
    ModelResponse {
        id: "resp_silent".into(),
        model: "mock-model".into(),
        status: ResponseStatus::Completed,
        items: vec![OutputItem::Reasoning {
            id: "rs_1".into(),
            summary: Vec::new(),
            encrypted_content: None,
        }],
        usage: sample_usage(),
    }
}

/// A schema-typed invocation with item id `fc_<id>`.
pub fn function_call(id: &str, name: &str, arguments: &str) -> ToolInvocation {
    ToolInvocation::function(id, name, arguments).with_item_id(format!("fc_{id}"))
}

/// A grammar-constrained invocation with item id `ctc_<id>`.
pub fn custom_call(id: &str, name: &str, input: &str) -> ToolInvocation {
    ToolInvocation::custom(id, name, input).with_item_id(format!("ctc_{id}"))
}

/// The event sequence a streaming client would emit for `response`, with
/// text and arguments split into fragments of at most `chunk` characters.
///
/// Items are announced with empty payloads and closed with their full
/// payload, the way the Responses API streams them.
pub fn streamed(response: &ModelResponse, chunk: usize) -> Vec<ResponseEvent> {
    let chunk = chunk.max(1);
    let mut events = vec![ResponseEvent::Created {
        response_id: response.id.clone(),
        model: response.model.clone(),
    }];

    for (index, item) in response.items.iter().enumerate() {
        let output_index = u32::try_from(index).unwrap_or(u32::MAX);
        let key = item
            .item_id()
            .map_or_else(|| format!("#{output_index}"), str::to_string);

        let (announced, payload, is_text) = match item {
            OutputItem::Message { id, text } => (
                OutputItem::Message {
                    id: id.clone(),
                    text: String::new(),
                },
                text.clone(),
                true,
            ),
            OutputItem::ToolInvocation(call) => (
                OutputItem::ToolInvocation(ToolInvocation {
                    raw_arguments: String::new(),
                    ..call.clone()
                }),
                call.raw_arguments.clone(),
                false,
            ),
            other => (other.clone(), String::new(), false),
        };

        events.push(ResponseEvent::ItemAdded {
            output_index,
            item: announced.clone(),
        });
        let chars: Vec<char> = payload.chars().collect();
        for piece in chars.chunks(chunk) {
            let delta: String = piece.iter().collect();
            events.push(if is_text {
                ResponseEvent::TextDelta {
                    item_id: key.clone(),
                    delta,
                }
            } else {
                ResponseEvent::ArgumentsDelta {
                    item_id: key.clone(),
                    delta,
                }
            });
        }
        events.push(ResponseEvent::ItemDone {
            output_index,
            item: announced,
        });
    }

    events.push(ResponseEvent::Completed {
        response: ModelResponse {
            items: Vec::new(),
            ..response.clone()
        },
    });
    events
}

/// A [`MockClient`] preloaded with buffered responses.
pub fn mock_client(responses: Vec<ModelResponse>) -> MockClient {
    let mock = MockClient::new();
    for response in responses {
        mock.queue_response(response);
    }
    mock
}

/// A [`MockClient`] preloaded with the streamed form of each response.
pub fn streaming_mock_client(responses: &[ModelResponse], chunk: usize) -> MockClient {
    let mock = MockClient::new();
    for response in responses {
        mock.queue_stream(streamed(response, chunk));
    }
    mock
}
