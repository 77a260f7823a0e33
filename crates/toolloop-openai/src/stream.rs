//! SSE stream parser for the `OpenAI` Responses API.
//!
//! Converts a raw `reqwest::Response` byte stream into a
//! [`ResponseStream`] of [`ResponseEvent`]s. Handles UTF-8 boundary
//! splitting and maps both tool-call kinds onto the same argument events.
//! Reassembly into a [`ModelResponse`](toolloop::ModelResponse) happens in
//! the core crate's `ResponseAssembler`.

use futures::stream::{Stream, StreamExt};
use toolloop::error::LoopError;
use toolloop::stream::{ResponseEvent, ResponseStream};
use tracing::{trace, warn};

use crate::convert::{convert_item, convert_summary, failed_response, provider_error};
use crate::types::StreamEvent;

/// Maximum size for buffers before we abort the stream.
const MAX_BUF: usize = 16 * 1024 * 1024; // 16 MiB

/// Convert a reqwest SSE response into a `ResponseStream`.
pub(crate) fn into_stream(response: reqwest::Response) -> ResponseStream {
    decode_sse(response.bytes_stream())
}

/// Decodes a byte stream of SSE frames. Chunk boundaries may fall anywhere,
/// including inside an event or a multi-byte character.
fn decode_sse<S, B, E>(chunks: S) -> ResponseStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + 'static,
    E: std::fmt::Display + 'static,
{
    let stream = chunks
        .scan(
            (String::new(), Vec::<u8>::new()),
            move |(buffer, utf8_buf), chunk| {
                let result = match chunk {
                    Ok(bytes) => {
                        utf8_buf.extend_from_slice(bytes.as_ref());

                        if utf8_buf.len() > MAX_BUF || buffer.len() > MAX_BUF {
                            utf8_buf.clear();
                            buffer.clear();
                            Some(vec![Err(LoopError::ResponseFormat {
                                message: "SSE stream buffer exceeded 16 MiB".into(),
                                raw: String::new(),
                            })])
                        } else {
                            decode_utf8(buffer, utf8_buf);

                            let mut results = Vec::new();
                            while let Some(pos) = buffer.find("\n\n") {
                                let event_text = buffer[..pos + 2].to_string();
                                buffer.drain(..pos + 2);
                                results.extend(parse_sse_event(&event_text));
                            }

                            Some(results)
                        }
                    }
                    Err(e) => Some(vec![Err(LoopError::Http {
                        status: None,
                        message: format!("Stream read error: {e}"),
                        retryable: true,
                    })]),
                };

                async move { result }
            },
        )
        .flat_map(futures::stream::iter);

    Box::pin(stream)
}

/// Moves the valid UTF-8 prefix of `utf8_buf` into `buffer`, keeping an
/// incomplete trailing sequence for the next chunk.
fn decode_utf8(buffer: &mut String, utf8_buf: &mut Vec<u8>) {
    match std::str::from_utf8(utf8_buf) {
        Ok(text) => {
            buffer.push_str(text);
            utf8_buf.clear();
        }
        Err(e) => {
            let valid_up_to = e.valid_up_to();
            if let Ok(valid) = std::str::from_utf8(&utf8_buf[..valid_up_to]) {
                buffer.push_str(valid);
            }
            match e.error_len() {
                // Permanently invalid bytes are skipped.
                Some(len) => {
                    utf8_buf.drain(..valid_up_to + len);
                }
                None => {
                    utf8_buf.drain(..valid_up_to);
                }
            }
        }
    }
}

/// Parse a single SSE event into zero or more `ResponseEvent`s.
fn parse_sse_event(event_text: &str) -> Vec<Result<ResponseEvent, LoopError>> {
    let Some(data) = extract_data_line(event_text) else {
        return vec![];
    };
    if data == "[DONE]" {
        return vec![];
    }

    let event = match serde_json::from_str::<StreamEvent>(data) {
        Ok(event) => event,
        Err(e) => {
            warn!(error = %e, "skipping unparseable SSE event");
            return vec![];
        }
    };

    match event {
        StreamEvent::Created { response } => vec![Ok(ResponseEvent::Created {
            response_id: response.id,
            model: response.model,
        })],
        StreamEvent::OutputItemAdded { output_index, item } => convert_item(item)
            .map(|item| Ok(ResponseEvent::ItemAdded { output_index, item }))
            .into_iter()
            .collect(),
        StreamEvent::OutputTextDelta { item_id, delta } => {
            vec![Ok(ResponseEvent::TextDelta { item_id, delta })]
        }
        StreamEvent::FunctionCallArgumentsDelta { item_id, delta }
        | StreamEvent::CustomToolCallInputDelta { item_id, delta } => {
            vec![Ok(ResponseEvent::ArgumentsDelta { item_id, delta })]
        }
        StreamEvent::FunctionCallArgumentsDone { item_id, arguments }
        | StreamEvent::CustomToolCallInputDone {
            item_id,
            input: arguments,
        } => vec![Ok(ResponseEvent::ArgumentsDone { item_id, arguments })],
        StreamEvent::OutputItemDone { output_index, item } => convert_item(item)
            .map(|item| Ok(ResponseEvent::ItemDone { output_index, item }))
            .into_iter()
            .collect(),
        StreamEvent::Completed { response } | StreamEvent::Incomplete { response } => {
            vec![Ok(ResponseEvent::Completed {
                response: convert_summary(response),
            })]
        }
        StreamEvent::Failed { response } => vec![Err(failed_response(response.error))],
        StreamEvent::Error { code, message } => vec![Err(provider_error(code, message))],
        StreamEvent::Other => {
            trace!(data, "ignoring SSE event");
            vec![]
        }
    }
}

/// Extract the `data: ` payload from an SSE event text block.
fn extract_data_line(event_text: &str) -> Option<&str> {
    for line in event_text.lines() {
        let line = line.trim_end_matches('\r');
        if let Some(data) = line.strip_prefix("data: ") {
            return Some(data);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use toolloop::chat::{CallKind, OutputItem};
    use toolloop::response::ResponseStatus;

    fn parse_ok(event: &str) -> Vec<ResponseEvent> {
        parse_sse_event(event)
            .into_iter()
            .collect::<Result<_, _>>()
            .unwrap()
    }

    #[test]
    fn test_extract_data_line_basic() {
        let event = "event: response.created\ndata: {\"type\":\"response.created\"}\n\n";
        assert_eq!(extract_data_line(event), Some("{\"type\":\"response.created\"}"));
    }

    #[test]
    fn test_extract_data_line_no_data() {
        assert_eq!(extract_data_line("event: ping\n\n"), None);
    }

    #[test]
    fn test_parse_created() {
        let events = parse_ok(
            "data: {\"type\":\"response.created\",\"response\":{\"id\":\"resp_1\",\"model\":\"gpt-5-mini\",\"status\":\"in_progress\",\"output\":[]}}\n\n",
        );
        assert_eq!(
            events,
            [ResponseEvent::Created {
                response_id: "resp_1".into(),
                model: "gpt-5-mini".into(),
            }]
        );
    }

    #[test]
    fn test_parse_custom_tool_item_added() {
        let events = parse_ok(
            "data: {\"type\":\"response.output_item.added\",\"output_index\":1,\"item\":{\"type\":\"custom_tool_call\",\"id\":\"ctc_1\",\"call_id\":\"call_1\",\"name\":\"checkPrice\",\"input\":\"\"}}\n\n",
        );
        let [ResponseEvent::ItemAdded { output_index, item }] = events.as_slice() else {
            panic!("expected one ItemAdded, got {events:?}");
        };
        assert_eq!(*output_index, 1);
        let call = item.as_tool_invocation().unwrap();
        assert_eq!(call.kind, CallKind::Custom);
        assert_eq!(call.item_id.as_deref(), Some("ctc_1"));
    }

    #[test]
    fn test_both_delta_kinds_map_to_arguments_delta() {
        let function = parse_ok(
            "data: {\"type\":\"response.function_call_arguments.delta\",\"item_id\":\"fc_1\",\"output_index\":0,\"delta\":\"{\\\"sku\"}\n\n",
        );
        let custom = parse_ok(
            "data: {\"type\":\"response.custom_tool_call_input.delta\",\"item_id\":\"ctc_1\",\"output_index\":0,\"delta\":\"{\\\"sku\"}\n\n",
        );
        assert!(matches!(&function[0], ResponseEvent::ArgumentsDelta { item_id, delta } if item_id == "fc_1" && delta == "{\"sku"));
        assert!(matches!(&custom[0], ResponseEvent::ArgumentsDelta { item_id, .. } if item_id == "ctc_1"));
    }

    #[test]
    fn test_parse_input_done() {
        let events = parse_ok(
            "data: {\"type\":\"response.custom_tool_call_input.done\",\"item_id\":\"ctc_1\",\"output_index\":0,\"input\":\"{}\"}\n\n",
        );
        assert_eq!(
            events,
            [ResponseEvent::ArgumentsDone {
                item_id: "ctc_1".into(),
                arguments: "{}".into(),
            }]
        );
    }

    #[test]
    fn test_parse_incomplete_as_completed() {
        let events = parse_ok(
            "data: {\"type\":\"response.incomplete\",\"response\":{\"id\":\"resp_1\",\"model\":\"m\",\"status\":\"incomplete\",\"output\":[{\"type\":\"message\",\"id\":\"msg_1\",\"content\":[{\"type\":\"output_text\",\"text\":\"partial\"}]}]}}\n\n",
        );
        let [ResponseEvent::Completed { response }] = events.as_slice() else {
            panic!("expected Completed, got {events:?}");
        };
        assert_eq!(response.status, ResponseStatus::Incomplete);
        assert_eq!(
            response.items,
            [OutputItem::Message {
                id: Some("msg_1".into()),
                text: "partial".into(),
            }]
        );
    }

    #[test]
    fn test_parse_failed_and_error_events() {
        let failed = parse_sse_event(
            "data: {\"type\":\"response.failed\",\"response\":{\"id\":\"r\",\"status\":\"failed\",\"error\":{\"code\":\"server_error\",\"message\":\"boom\"}}}\n\n",
        );
        assert!(matches!(failed[0], Err(LoopError::Provider { retryable: true, .. })));

        let error = parse_sse_event(
            "data: {\"type\":\"error\",\"code\":\"invalid_prompt\",\"message\":\"nope\",\"param\":null}\n\n",
        );
        assert!(matches!(&error[0], Err(LoopError::Provider { code, retryable: false, .. }) if code == "invalid_prompt"));
    }

    #[test]
    fn test_unknown_and_malformed_events_skipped() {
        assert!(parse_sse_event("data: {\"type\":\"response.in_progress\",\"response\":{}}\n\n").is_empty());
        assert!(parse_sse_event("data: {not json\n\n").is_empty());
        assert!(parse_sse_event("data: [DONE]\n\n").is_empty());
    }

    async fn decode_chunks(chunks: Vec<Vec<u8>>) -> Vec<ResponseEvent> {
        let stream = futures::stream::iter(chunks.into_iter().map(Ok::<_, std::convert::Infallible>));
        decode_sse(stream)
            .collect::<Vec<_>>()
            .await
            .into_iter()
            .collect::<Result<_, _>>()
            .unwrap()
    }

    fn sse_body() -> String {
        [
            "event: response.created\ndata: {\"type\":\"response.created\",\"response\":{\"id\":\"resp_1\",\"model\":\"m\",\"status\":\"in_progress\",\"output\":[]}}\n\n",
            "event: response.output_text.delta\ndata: {\"type\":\"response.output_text.delta\",\"item_id\":\"msg_1\",\"output_index\":0,\"delta\":\"Prix: 49,99 €\"}\n\n",
            "event: response.output_text.delta\ndata: {\"type\":\"response.output_text.delta\",\"item_id\":\"msg_1\",\"output_index\":0,\"delta\":\" ✓\"}\n\n",
        ]
        .concat()
    }

    fn expected_events() -> Vec<ResponseEvent> {
        vec![
            ResponseEvent::Created {
                response_id: "resp_1".into(),
                model: "m".into(),
            },
            ResponseEvent::TextDelta {
                item_id: "msg_1".into(),
                delta: "Prix: 49,99 €".into(),
            },
            ResponseEvent::TextDelta {
                item_id: "msg_1".into(),
                delta: " ✓".into(),
            },
        ]
    }

    #[tokio::test]
    async fn test_decode_sse_whole_body() {
        let events = decode_chunks(vec![sse_body().into_bytes()]).await;
        assert_eq!(events, expected_events());
    }

    #[tokio::test]
    async fn test_decode_sse_any_chunking() {
        let body = sse_body().into_bytes();
        let euro = body.windows(3).position(|w| w == "€".as_bytes()).unwrap();

        // Every two-way cut, which covers a split inside "\n\n", inside
        // JSON, and between the bytes of "€".
        for cut in 1..body.len() {
            let events = decode_chunks(vec![body[..cut].to_vec(), body[cut..].to_vec()]).await;
            assert_eq!(events, expected_events(), "cut at byte {cut}");
        }

        // One byte at a time.
        let events = decode_chunks(body.iter().map(|b| vec![*b]).collect()).await;
        assert_eq!(events, expected_events());

        // Several cuts, one landing mid-character and one mid-boundary.
        let boundary = body.windows(2).position(|w| w == b"\n\n").unwrap();
        let cuts = [boundary + 1, euro + 1, euro + 2];
        let mut chunks = Vec::new();
        let mut start = 0;
        for cut in cuts {
            chunks.push(body[start..cut].to_vec());
            start = cut;
        }
        chunks.push(body[start..].to_vec());
        assert_eq!(decode_chunks(chunks).await, expected_events());
    }

    #[tokio::test]
    async fn test_decode_sse_holds_incomplete_event() {
        let body = sse_body().into_bytes();
        let events = decode_chunks(vec![body[..body.len() - 1].to_vec()]).await;
        assert_eq!(events, expected_events()[..2]);
    }

    #[test]
    fn test_decode_utf8_keeps_split_sequence() {
        let mut buffer = String::new();
        let mut utf8_buf = "héllo".as_bytes()[..2].to_vec();
        decode_utf8(&mut buffer, &mut utf8_buf);
        assert_eq!(buffer, "h");
        assert_eq!(utf8_buf.len(), 1);

        utf8_buf.extend_from_slice(&"héllo".as_bytes()[2..]);
        decode_utf8(&mut buffer, &mut utf8_buf);
        assert_eq!(buffer, "héllo");
        assert!(utf8_buf.is_empty());
    }
}
