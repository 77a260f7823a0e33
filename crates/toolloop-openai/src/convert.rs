//! Conversion between `toolloop` types and Responses API types.

use toolloop::chat::{CallKind, Message, MessageContent, OutputItem, Role, ToolInvocation};
use toolloop::error::LoopError;
use toolloop::response::{ModelResponse, ResponseStatus};
use toolloop::tool::{CallingConvention, ToolDeclaration};
use toolloop::usage::Usage;
use toolloop::InferenceRequest;

use crate::config::OpenAiConfig;
use crate::types::{
    self, ContentPart, ErrorResponse, GrammarFormat, InputContent, InputItem, OutputTextPart,
    Reasoning, Request, ResponseUsage, SummaryText, Tool,
};

// ── Request conversion ───────────────────────────────────────────────

/// Build a Responses API request from an `InferenceRequest` and client
/// config.
pub(crate) fn build_request<'a>(
    request: &'a InferenceRequest,
    config: &'a OpenAiConfig,
    stream: bool,
) -> Result<Request<'a>, LoopError> {
    let generation = &request.generation;
    let input = request
        .input
        .iter()
        .map(convert_message)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Request {
        model: generation.model.as_deref().unwrap_or(&config.model),
        input,
        tools: request.tools.iter().map(convert_tool).collect(),
        reasoning: generation
            .reasoning_effort
            .or(config.reasoning_effort)
            .map(|effort| Reasoning {
                effort: effort.as_str(),
            }),
        temperature: generation.temperature,
        max_output_tokens: generation.max_output_tokens,
        parallel_tool_calls: generation.parallel_tool_calls,
        store: config.store,
        include: config.include(),
        stream: if stream { Some(true) } else { None },
    })
}

fn convert_tool(declaration: &ToolDeclaration) -> Tool<'_> {
    match &declaration.convention {
        CallingConvention::Schema(schema) => Tool::Function {
            name: &declaration.name,
            description: &declaration.description,
            parameters: schema.as_value(),
        },
        CallingConvention::Grammar(grammar) => Tool::Custom {
            name: &declaration.name,
            description: &declaration.description,
            format: GrammarFormat {
                format_type: "grammar",
                syntax: grammar.syntax.as_str(),
                definition: &grammar.definition,
            },
        },
    }
}

/// Convert one conversation entry to an input item.
///
/// Assistant output items are resent verbatim, and each tool result is
/// sent as the output type matching the call that produced it.
fn convert_message(msg: &Message) -> Result<InputItem, LoopError> {
    match &msg.content {
        MessageContent::Text(text) => Ok(InputItem::Message {
            id: None,
            role: role_str(msg.role)?,
            content: InputContent::Text(text.clone()),
        }),
        MessageContent::Output(item) => Ok(convert_output_item(item)),
        MessageContent::ToolResult(result) => Ok(match result.kind {
            CallKind::Function => InputItem::FunctionCallOutput {
                call_id: result.correlation_id.clone(),
                output: result.payload.clone(),
            },
            CallKind::Custom => InputItem::CustomToolCallOutput {
                call_id: result.correlation_id.clone(),
                output: result.payload.clone(),
            },
        }),
    }
}

fn role_str(role: Role) -> Result<&'static str, LoopError> {
    match role {
        Role::System => Ok("system"),
        Role::User => Ok("user"),
        Role::Assistant => Ok("assistant"),
        Role::ToolResult => Err(LoopError::InvalidRequest(
            "tool result messages must carry a tool result".into(),
        )),
    }
}

fn convert_output_item(item: &OutputItem) -> InputItem {
    match item {
        OutputItem::Message { id, text } => InputItem::Message {
            id: id.clone(),
            role: "assistant",
            content: InputContent::Parts(vec![OutputTextPart {
                part_type: "output_text",
                text: text.clone(),
            }]),
        },
        OutputItem::ToolInvocation(call) => match call.kind {
            CallKind::Function => InputItem::FunctionCall {
                id: call.item_id.clone(),
                call_id: call.correlation_id.clone(),
                name: call.tool_name.clone(),
                arguments: call.raw_arguments.clone(),
            },
            CallKind::Custom => InputItem::CustomToolCall {
                id: call.item_id.clone(),
                call_id: call.correlation_id.clone(),
                name: call.tool_name.clone(),
                input: call.raw_arguments.clone(),
            },
        },
        OutputItem::Reasoning {
            id,
            summary,
            encrypted_content,
        } => InputItem::Reasoning {
            id: id.clone(),
            summary: summary
                .iter()
                .map(|text| SummaryText {
                    part_type: "summary_text",
                    text: text.clone(),
                })
                .collect(),
            encrypted_content: encrypted_content.clone(),
        },
    }
}

// ── Response conversion ──────────────────────────────────────────────

/// Convert a buffered Responses API response.
///
/// A `failed` response becomes [`LoopError::Provider`].
pub(crate) fn convert_response(resp: types::Response) -> Result<ModelResponse, LoopError> {
    if resp.status.as_deref() == Some("failed") {
        return Err(failed_response(resp.error));
    }
    Ok(convert_summary(resp))
}

/// Convert a response without checking its status.
pub(crate) fn convert_summary(resp: types::Response) -> ModelResponse {
    let status = match resp.status.as_deref() {
        Some("incomplete") => ResponseStatus::Incomplete,
        _ => ResponseStatus::Completed,
    };
    ModelResponse {
        id: resp.id,
        model: resp.model,
        status,
        items: resp.output.into_iter().filter_map(convert_item).collect(),
        usage: resp.usage.as_ref().map_or_else(Usage::default, convert_usage),
    }
}

/// Convert one output item. Item types the client doesn't model are
/// dropped.
pub(crate) fn convert_item(item: types::OutputItem) -> Option<OutputItem> {
    match item {
        types::OutputItem::Message { id, content } => {
            let text = content
                .into_iter()
                .filter_map(|part| match part {
                    ContentPart::OutputText { text } => Some(text),
                    ContentPart::Refusal { refusal } => Some(refusal),
                    ContentPart::Unknown => None,
                })
                .collect();
            Some(OutputItem::Message { id: Some(id), text })
        }
        types::OutputItem::FunctionCall {
            id,
            call_id,
            name,
            arguments,
        } => Some(OutputItem::ToolInvocation(ToolInvocation {
            correlation_id: call_id,
            item_id: id,
            tool_name: name,
            raw_arguments: arguments,
            kind: CallKind::Function,
        })),
        types::OutputItem::CustomToolCall {
            id,
            call_id,
            name,
            input,
        } => Some(OutputItem::ToolInvocation(ToolInvocation {
            correlation_id: call_id,
            item_id: id,
            tool_name: name,
            raw_arguments: input,
            kind: CallKind::Custom,
        })),
        types::OutputItem::Reasoning {
            id,
            summary,
            encrypted_content,
        } => Some(OutputItem::Reasoning {
            id,
            summary: summary.into_iter().map(|part| part.text).collect(),
            encrypted_content,
        }),
        types::OutputItem::Unknown => {
            tracing::trace!("skipping unsupported output item");
            None
        }
    }
}

pub(crate) fn convert_usage(usage: &ResponseUsage) -> Usage {
    Usage {
        input_tokens: usage.input_tokens,
        output_tokens: usage.output_tokens,
        reasoning_tokens: usage
            .output_tokens_details
            .as_ref()
            .and_then(|d| d.reasoning_tokens),
    }
}

/// The error carried by a `failed` response.
pub(crate) fn failed_response(error: Option<types::ErrorDetail>) -> LoopError {
    match error {
        Some(detail) => provider_error(detail.code, detail.message),
        None => provider_error(None, "response failed without error details".into()),
    }
}

/// An in-band service error.
///
/// Rate limits and server errors reported inside a response are worth
/// retrying the same way their HTTP equivalents are.
pub(crate) fn provider_error(code: Option<String>, message: String) -> LoopError {
    let code = code.unwrap_or_else(|| "unknown".into());
    let retryable = matches!(code.as_str(), "rate_limit_exceeded" | "server_error");
    LoopError::Provider {
        code,
        message,
        retryable,
    }
}

// ── Error conversion ─────────────────────────────────────────────────

/// Convert an HTTP status + optional error body into a `LoopError`.
pub(crate) fn convert_error(status: http::StatusCode, body: &str) -> LoopError {
    let message = serde_json::from_str::<ErrorResponse>(body)
        .map_or_else(|_| body.to_string(), |e| e.error.message);

    if status == http::StatusCode::UNAUTHORIZED || status == http::StatusCode::FORBIDDEN {
        return LoopError::Auth(message);
    }

    if status == http::StatusCode::BAD_REQUEST {
        return LoopError::InvalidRequest(message);
    }

    let retryable = matches!(status.as_u16(), 429 | 500 | 502 | 503 | 504);

    LoopError::Http {
        status: Some(status),
        message,
        retryable,
    }
}
