//! The inference boundary.
//!
//! An [`InferenceClient`] turns an [`InferenceRequest`] (the whole
//! conversation, the tool declarations, and generation settings) into a
//! [`ModelResponse`]. Clients are stateless with respect to the session:
//! every round resends the full conversation.
//!
//! [`InferenceClient`] uses native async fn in trait and is not
//! object-safe; [`DynInferenceClient`] is the boxed-future counterpart,
//! implemented for every client by a blanket impl. The orchestration
//! loop takes `&dyn DynInferenceClient`.

use std::borrow::Cow;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::chat::Message;
use crate::error::LoopError;
use crate::response::ModelResponse;
use crate::stream::{ResponseStream, collect_response};
use crate::tool::{ResponseMode, ToolDeclaration};

/// How much hidden reasoning the model should spend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasoningEffort {
    /// As little as possible.
    Minimal,
    /// Light reasoning.
    Low,
    /// The service default.
    Medium,
    /// Extensive reasoning.
    High,
}

impl ReasoningEffort {
    /// Wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Minimal => "minimal",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for ReasoningEffort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReasoningEffort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "minimal" => Ok(Self::Minimal),
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(format!(
                "unknown reasoning effort {other:?} (expected minimal, low, medium, or high)"
            )),
        }
    }
}

/// Per-request generation settings.
///
/// `timeout` is a transport concern and skipped during serialization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Overrides the client's configured model.
    pub model: Option<String>,
    /// Reasoning effort, for models that reason.
    pub reasoning_effort: Option<ReasoningEffort>,
    /// Sampling temperature.
    pub temperature: Option<f32>,
    /// Upper bound on generated tokens per call.
    pub max_output_tokens: Option<u32>,
    /// Whether the model may request several tools in one round.
    pub parallel_tool_calls: Option<bool>,
    /// Per-request timeout.
    #[serde(skip)]
    pub timeout: Option<Duration>,
}

/// One inference call's input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InferenceRequest {
    /// The full conversation so far.
    pub input: Vec<Message>,
    /// Tools the model may call.
    pub tools: Vec<ToolDeclaration>,
    /// Generation settings.
    pub generation: GenerationConfig,
}

/// Describes a client instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientMetadata {
    /// Service name (e.g. `"openai"`).
    pub name: Cow<'static, str>,
    /// Default model identifier.
    pub model: String,
    /// Whether the client supports grammar-constrained tools.
    pub grammar_tools: bool,
}

/// A client for the remote model.
pub trait InferenceClient: Send + Sync {
    /// Sends a request and waits for the complete response.
    fn submit(
        &self,
        request: &InferenceRequest,
    ) -> impl Future<Output = Result<ModelResponse, LoopError>> + Send;

    /// Sends a request and returns its event stream.
    fn submit_stream(
        &self,
        request: &InferenceRequest,
    ) -> impl Future<Output = Result<ResponseStream, LoopError>> + Send;

    /// Static metadata about this client.
    fn metadata(&self) -> ClientMetadata;
}

/// Object-safe counterpart of [`InferenceClient`].
///
/// Implemented for every [`InferenceClient`] by a blanket impl.
pub trait DynInferenceClient: Send + Sync {
    /// Boxed-future version of [`InferenceClient::submit`].
    fn submit_boxed<'a>(
        &'a self,
        request: &'a InferenceRequest,
    ) -> Pin<Box<dyn Future<Output = Result<ModelResponse, LoopError>> + Send + 'a>>;

    /// Boxed-future version of [`InferenceClient::submit_stream`].
    fn submit_stream_boxed<'a>(
        &'a self,
        request: &'a InferenceRequest,
    ) -> Pin<Box<dyn Future<Output = Result<ResponseStream, LoopError>> + Send + 'a>>;

    /// Static metadata about this client.
    fn metadata(&self) -> ClientMetadata;
}

impl<T: InferenceClient> DynInferenceClient for T {
    fn submit_boxed<'a>(
        &'a self,
        request: &'a InferenceRequest,
    ) -> Pin<Box<dyn Future<Output = Result<ModelResponse, LoopError>> + Send + 'a>> {
        Box::pin(self.submit(request))
    }

    fn submit_stream_boxed<'a>(
        &'a self,
        request: &'a InferenceRequest,
    ) -> Pin<Box<dyn Future<Output = Result<ResponseStream, LoopError>> + Send + 'a>> {
        Box::pin(self.submit_stream(request))
    }

    fn metadata(&self) -> ClientMetadata {
        InferenceClient::metadata(self)
    }
}

/// Calls the client in the given mode and normalizes the result.
///
/// Streaming responses are folded with
/// [`collect_response`](crate::stream::collect_response), so callers see
/// the same [`ModelResponse`] either way.
pub async fn submit_with_mode(
    client: &dyn DynInferenceClient,
    request: &InferenceRequest,
    mode: ResponseMode,
) -> Result<ModelResponse, LoopError> {
    match mode {
        ResponseMode::Buffered => client.submit_boxed(request).await,
        ResponseMode::Streaming => {
            let stream = client.submit_stream_boxed(request).await?;
            collect_response(stream).await
        }
    }
}
