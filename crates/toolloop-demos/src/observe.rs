//! Logs streamed response events as they arrive.

use futures::TryStreamExt;
use toolloop::chat::OutputItem;
use toolloop::client::{ClientMetadata, InferenceClient, InferenceRequest};
use toolloop::error::LoopError;
use toolloop::response::ModelResponse;
use toolloop::stream::{ResponseEvent, ResponseStream};
use tracing::{debug, info, trace};

/// Wraps a client and logs every event of its streamed responses.
///
/// Buffered calls pass straight through.
#[derive(Debug)]
pub(crate) struct EventLogger<C> {
    inner: C,
}

impl<C> EventLogger<C> {
    pub(crate) fn new(inner: C) -> Self {
        Self { inner }
    }
}

impl<C: InferenceClient> InferenceClient for EventLogger<C> {
    async fn submit(&self, request: &InferenceRequest) -> Result<ModelResponse, LoopError> {
        self.inner.submit(request).await
    }

    async fn submit_stream(&self, request: &InferenceRequest) -> Result<ResponseStream, LoopError> {
        let stream = self.inner.submit_stream(request).await?;
        Ok(Box::pin(stream.inspect_ok(log_event)))
    }

    fn metadata(&self) -> ClientMetadata {
        self.inner.metadata()
    }
}

/// Kind, tool name, and id of an item, for log lines.
fn describe(item: &OutputItem) -> (&'static str, Option<&str>, Option<&str>) {
    match item {
        OutputItem::Message { id, .. } => ("message", None, id.as_deref()),
        OutputItem::ToolInvocation(call) => {
            ("tool_call", Some(call.tool_name.as_str()), call.item_id.as_deref())
        }
        OutputItem::Reasoning { id, .. } => ("reasoning", None, Some(id.as_str())),
    }
}

fn log_event(event: &ResponseEvent) {
    match event {
        ResponseEvent::Created { response_id, model } => {
            debug!(response_id = %response_id, model = %model, "stream created");
        }
        ResponseEvent::ItemAdded { output_index, item } => {
            let (kind, tool, id) = describe(item);
            info!(output_index, kind, tool, id, "output item added");
        }
        ResponseEvent::TextDelta { item_id, delta } | ResponseEvent::ArgumentsDelta { item_id, delta } => {
            trace!(item_id = %item_id, delta = %delta, "delta");
        }
        ResponseEvent::ArgumentsDone { item_id, arguments } => {
            info!(item_id = %item_id, input = %arguments, "tool call input");
        }
        ResponseEvent::ItemDone { output_index, item } => {
            let (kind, tool, id) = describe(item);
            info!(output_index, kind, tool, id, "output item done");
        }
        ResponseEvent::Completed { response } => {
            info!(
                status = ?response.status,
                output_items = response.items.len(),
                input_tokens = response.usage.input_tokens,
                output_tokens = response.usage.output_tokens,
                total_tokens = response.usage.total_tokens(),
                "stream completed"
            );
        }
        _ => {}
    }
}
