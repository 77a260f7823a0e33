//! Streaming response events and their reassembly.
//!
//! A streaming client yields [`ResponseEvent`]s through a
//! [`ResponseStream`]. Tool arguments arrive in fragments that are keyed by
//! the output item's id, possibly interleaved with fragments of other
//! items:
//!
//! 1. [`ItemAdded`](ResponseEvent::ItemAdded) announces the item.
//! 2. [`ArgumentsDelta`](ResponseEvent::ArgumentsDelta) /
//!    [`TextDelta`](ResponseEvent::TextDelta) carry fragments.
//! 3. [`ItemDone`](ResponseEvent::ItemDone) closes the item.
//! 4. [`Completed`](ResponseEvent::Completed) ends the response.
//!
//! [`ResponseAssembler`] folds the events into the same [`ModelResponse`]
//! a buffered call would have returned. A tool invocation only becomes
//! part of the response once its item is closed, so a partially streamed
//! call can never be dispatched.

use std::collections::{BTreeMap, HashMap};
use std::pin::Pin;

use futures::{Stream, StreamExt};
use tracing::{debug, warn};

use crate::chat::OutputItem;
use crate::error::LoopError;
use crate::response::ModelResponse;

/// A pinned, boxed, `Send` stream of [`ResponseEvent`] results.
pub type ResponseStream = Pin<Box<dyn Stream<Item = Result<ResponseEvent, LoopError>> + Send>>;

/// An incremental event of a streamed response.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ResponseEvent {
    /// The service accepted the request.
    Created {
        /// Service response id.
        response_id: String,
        /// Model serving the request.
        model: String,
    },
    /// A new output item started.
    ItemAdded {
        /// Position of the item in the final output.
        output_index: u32,
        /// The item as known so far (arguments and text usually empty).
        item: OutputItem,
    },
    /// A fragment of assistant text.
    TextDelta {
        /// Item the fragment belongs to.
        item_id: String,
        /// The fragment.
        delta: String,
    },
    /// A fragment of tool-call arguments.
    ArgumentsDelta {
        /// Item the fragment belongs to.
        item_id: String,
        /// The fragment.
        delta: String,
    },
    /// The full argument text of an item, once generation of it ended.
    ArgumentsDone {
        /// Item the arguments belong to.
        item_id: String,
        /// The complete arguments.
        arguments: String,
    },
    /// An output item is complete.
    ItemDone {
        /// Position of the item in the final output.
        output_index: u32,
        /// The finished item.
        item: OutputItem,
    },
    /// The response is complete. Carries status and usage; `items` may be
    /// empty when the service only reports them through item events.
    Completed {
        /// The final response summary.
        response: ModelResponse,
    },
}

/// Folds [`ResponseEvent`]s into a [`ModelResponse`].
#[derive(Debug, Default)]
pub struct ResponseAssembler {
    id: String,
    model: String,
    open: HashMap<String, u32>,
    fragments: HashMap<String, String>,
    final_arguments: HashMap<String, String>,
    done: BTreeMap<u32, OutputItem>,
    completed: Option<ModelResponse>,
}

impl ResponseAssembler {
    /// Creates an empty assembler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the completion event has been seen.
    pub fn is_complete(&self) -> bool {
        self.completed.is_some()
    }

    /// Applies one event.
    pub fn push(&mut self, event: ResponseEvent) {
        match event {
            ResponseEvent::Created { response_id, model } => {
                debug!(response_id = %response_id, "response created");
                self.id = response_id;
                self.model = model;
            }
            ResponseEvent::ItemAdded { output_index, item } => {
                debug!(output_index, item_id = ?item.item_id(), "output item added");
                self.open.insert(item_key(&item, output_index), output_index);
            }
            ResponseEvent::TextDelta { item_id, delta }
            | ResponseEvent::ArgumentsDelta { item_id, delta } => {
                self.fragments.entry(item_id).or_default().push_str(&delta);
            }
            ResponseEvent::ArgumentsDone { item_id, arguments } => {
                debug!(item_id = %item_id, len = arguments.len(), "tool input done");
                self.final_arguments.insert(item_id, arguments);
            }
            ResponseEvent::ItemDone { output_index, item } => {
                let key = item_key(&item, output_index);
                self.open.remove(&key);
                let item = self.finalize(&key, item);
                debug!(output_index, item_id = ?item.item_id(), "output item done");
                self.done.insert(output_index, item);
            }
            ResponseEvent::Completed { response } => {
                debug!(
                    input_tokens = response.usage.input_tokens,
                    output_tokens = response.usage.output_tokens,
                    "response completed"
                );
                self.completed = Some(response);
            }
        }
    }

    /// Produces the assembled response.
    ///
    /// Fails with [`LoopError::Stream`] if the completion event never
    /// arrived. Items that were opened but never closed are dropped.
    pub fn finish(self) -> Result<ModelResponse, LoopError> {
        let Some(completed) = self.completed else {
            return Err(LoopError::Stream(
                "stream ended before the response completed".into(),
            ));
        };

        if !self.open.is_empty() {
            let mut dropped: Vec<&String> = self.open.keys().collect();
            dropped.sort();
            warn!(?dropped, "dropping output items that never completed");
        }

        let items = if self.done.is_empty() {
            completed.items
        } else {
            self.done.into_values().collect()
        };

        Ok(ModelResponse {
            id: if completed.id.is_empty() { self.id } else { completed.id },
            model: if completed.model.is_empty() {
                self.model
            } else {
                completed.model
            },
            status: completed.status,
            items,
            usage: completed.usage,
        })
    }

    /// Merges buffered fragments into a closed item.
    ///
    /// Streamed fragments take precedence, then the explicit
    /// arguments-done value, then whatever the item itself carries.
    fn finalize(&mut self, key: &str, item: OutputItem) -> OutputItem {
        let fragments = self.fragments.remove(key).filter(|f| !f.is_empty());
        let done_arguments = self.final_arguments.remove(key);
        match item {
            OutputItem::ToolInvocation(mut call) => {
                if let Some(arguments) = fragments.or(done_arguments) {
                    call.raw_arguments = arguments;
                }
                OutputItem::ToolInvocation(call)
            }
            OutputItem::Message { id, text } if text.is_empty() => OutputItem::Message {
                id,
                text: fragments.unwrap_or_default(),
            },
            other => other,
        }
    }
}

fn item_key(item: &OutputItem, output_index: u32) -> String {
    item.item_id()
        .map_or_else(|| format!("#{output_index}"), str::to_string)
}

/// Drains a [`ResponseStream`] into a [`ModelResponse`].
///
/// The first error yielded by the stream aborts collection.
pub async fn collect_response(mut stream: ResponseStream) -> Result<ModelResponse, LoopError> {
    let mut assembler = ResponseAssembler::new();
    while let Some(event) = stream.next().await {
        assembler.push(event?);
    }
    assembler.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::ToolInvocation;
    use crate::response::ResponseStatus;
    use crate::usage::Usage;

    fn pending_call(item_id: &str, call_id: &str, name: &str) -> OutputItem {
        OutputItem::ToolInvocation(ToolInvocation::function(call_id, name, "").with_item_id(item_id))
    }

    fn completed() -> ResponseEvent {
        ResponseEvent::Completed {
            response: ModelResponse {
                id: "resp_1".into(),
                usage: Usage {
                    input_tokens: 10,
                    output_tokens: 5,
                    reasoning_tokens: None,
                },
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_interleaved_fragments_keyed_by_item() {
        let mut asm = ResponseAssembler::new();
        asm.push(ResponseEvent::ItemAdded {
            output_index: 0,
            item: pending_call("fc_a", "call_a", "getPrice"),
        });
        asm.push(ResponseEvent::ItemAdded {
            output_index: 1,
            item: pending_call("fc_b", "call_b", "getShipping"),
        });
        for (id, delta) in [
            ("fc_a", "{\"sku\":"),
            ("fc_b", "{\"zip\":"),
            ("fc_a", "\"A1\"}"),
            ("fc_b", "\"94107\"}"),
        ] {
            asm.push(ResponseEvent::ArgumentsDelta {
                item_id: id.into(),
                delta: delta.into(),
            });
        }
        asm.push(ResponseEvent::ItemDone {
            output_index: 1,
            item: pending_call("fc_b", "call_b", "getShipping"),
        });
        asm.push(ResponseEvent::ItemDone {
            output_index: 0,
            item: pending_call("fc_a", "call_a", "getPrice"),
        });
        asm.push(completed());

        let response = asm.finish().unwrap();
        let calls = response.tool_invocations();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].correlation_id, "call_a");
        assert_eq!(calls[0].raw_arguments, "{\"sku\":\"A1\"}");
        assert_eq!(calls[1].raw_arguments, "{\"zip\":\"94107\"}");
        assert_eq!(response.id, "resp_1");
        assert_eq!(response.usage.input_tokens, 10);
    }

    #[test]
    fn test_arguments_done_used_without_fragments() {
        let mut asm = ResponseAssembler::new();
        asm.push(ResponseEvent::ItemAdded {
            output_index: 0,
            item: pending_call("ctc_1", "call_1", "checkPrice"),
        });
        asm.push(ResponseEvent::ArgumentsDone {
            item_id: "ctc_1".into(),
            arguments: "{\"sku\":\"N3\"}".into(),
        });
        asm.push(ResponseEvent::ItemDone {
            output_index: 0,
            item: pending_call("ctc_1", "call_1", "checkPrice"),
        });
        asm.push(completed());
        let response = asm.finish().unwrap();
        assert_eq!(response.tool_invocations()[0].raw_arguments, "{\"sku\":\"N3\"}");
    }

    #[test]
    fn test_unfinished_item_is_dropped() {
        let mut asm = ResponseAssembler::new();
        asm.push(ResponseEvent::ItemAdded {
            output_index: 0,
            item: pending_call("fc_1", "call_1", "getPrice"),
        });
        asm.push(ResponseEvent::ArgumentsDelta {
            item_id: "fc_1".into(),
            delta: "{\"sku\"".into(),
        });
        asm.push(completed());
        let response = asm.finish().unwrap();
        assert!(!response.has_tool_invocations());
    }

    #[test]
    fn test_missing_completion_is_stream_error() {
        let mut asm = ResponseAssembler::new();
        asm.push(ResponseEvent::ItemAdded {
            output_index: 0,
            item: OutputItem::text(""),
        });
        assert!(!asm.is_complete());
        assert!(matches!(asm.finish(), Err(LoopError::Stream(_))));
    }

    #[test]
    fn test_text_fragments_fill_empty_message() {
        let mut asm = ResponseAssembler::new();
        let item = OutputItem::Message {
            id: Some("msg_1".into()),
            text: String::new(),
        };
        asm.push(ResponseEvent::ItemAdded {
            output_index: 0,
            item: item.clone(),
        });
        for delta in ["Two ", "options ", "found."] {
            asm.push(ResponseEvent::TextDelta {
                item_id: "msg_1".into(),
                delta: delta.into(),
            });
        }
        asm.push(ResponseEvent::ItemDone {
            output_index: 0,
            item,
        });
        asm.push(completed());
        let response = asm.finish().unwrap();
        assert_eq!(response.output_text().as_deref(), Some("Two options found."));
    }

    #[test]
    fn test_completion_items_used_when_no_item_events() {
        let mut asm = ResponseAssembler::new();
        asm.push(ResponseEvent::Completed {
            response: ModelResponse {
                id: "resp_9".into(),
                status: ResponseStatus::Incomplete,
                items: vec![OutputItem::text("partial")],
                ..Default::default()
            },
        });
        let response = asm.finish().unwrap();
        assert_eq!(response.status, ResponseStatus::Incomplete);
        assert_eq!(response.output_text().as_deref(), Some("partial"));
    }

    #[tokio::test]
    async fn test_collect_response_propagates_error() {
        let stream: ResponseStream = Box::pin(futures::stream::iter(vec![
            Ok(ResponseEvent::Created {
                response_id: "resp_1".into(),
                model: "m".into(),
            }),
            Err(LoopError::Stream("connection reset".into())),
        ]));
        let err = collect_response(stream).await.unwrap_err();
        assert!(matches!(err, LoopError::Stream(msg) if msg == "connection reset"));
    }
}
