//! Mock inference client for testing.
//!
//! [`MockClient`] is a queue-based fake: tests decide exactly which
//! responses, streams, and errors the client returns, in order, without
//! touching the network. It implements [`InferenceClient`], so it works
//! anywhere a real client does, including through
//! [`DynInferenceClient`](crate::DynInferenceClient).
//!
//! ```rust
//! use toolloop::mock::MockClient;
//! use toolloop::test_helpers::text_response;
//! use toolloop::{InferenceClient, InferenceRequest};
//!
//! # async fn example() {
//! let mock = MockClient::new();
//! mock.queue_response(text_response("Hello!"));
//!
//! let response = mock.submit(&InferenceRequest::default()).await.unwrap();
//! assert_eq!(response.output_text().as_deref(), Some("Hello!"));
//! assert_eq!(mock.recorded_requests().len(), 1);
//! # }
//! ```
//!
//! [`LoopError`] isn't `Clone`, so queued failures are written as
//! [`MockError`] and converted when dequeued.

use std::borrow::Cow;
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::client::{ClientMetadata, InferenceClient, InferenceRequest};
use crate::error::LoopError;
use crate::response::ModelResponse;
use crate::stream::{ResponseEvent, ResponseStream};

/// Cloneable error subset for queuing.
#[derive(Debug, Clone)]
pub enum MockError {
    /// Maps to [`LoopError::Http`].
    Http {
        /// HTTP status code, if any.
        status: Option<http::StatusCode>,
        /// Error message.
        message: String,
        /// Whether the error is retryable.
        retryable: bool,
    },
    /// Maps to [`LoopError::Auth`].
    Auth(String),
    /// Maps to [`LoopError::Timeout`].
    Timeout {
        /// Elapsed milliseconds.
        elapsed_ms: u64,
    },
    /// Maps to [`LoopError::Stream`].
    Stream(String),
}

impl MockError {
    fn into_loop_error(self) -> LoopError {
        match self {
            Self::Http {
                status,
                message,
                retryable,
            } => LoopError::Http {
                status,
                message,
                retryable,
            },
            Self::Auth(msg) => LoopError::Auth(msg),
            Self::Timeout { elapsed_ms } => LoopError::Timeout { elapsed_ms },
            Self::Stream(msg) => LoopError::Stream(msg),
        }
    }
}

/// A stream script: events to yield, optionally followed by an error.
#[derive(Debug, Clone, Default)]
struct StreamScript {
    events: Vec<ResponseEvent>,
    trailing_error: Option<MockError>,
}

/// A queue-based mock client.
///
/// Each `submit` pops the response queue and each `submit_stream` pops the
/// stream queue. Every call records its [`InferenceRequest`].
///
/// # Panics
///
/// `submit` and `submit_stream` panic when their queue is empty.
pub struct MockClient {
    responses: Mutex<VecDeque<Result<ModelResponse, MockError>>>,
    streams: Mutex<VecDeque<Result<StreamScript, MockError>>>,
    requests: Arc<Mutex<Vec<InferenceRequest>>>,
    delay: Mutex<Option<Duration>>,
    meta: ClientMetadata,
}

impl fmt::Debug for MockClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockClient")
            .field("meta", &self.meta)
            .field("queued_responses", &self.responses.lock().unwrap().len())
            .field("queued_streams", &self.streams.lock().unwrap().len())
            .field("recorded_requests", &self.requests.lock().unwrap().len())
            .finish()
    }
}

impl Default for MockClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockClient {
    /// Creates a mock with empty queues.
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            streams: Mutex::new(VecDeque::new()),
            requests: Arc::new(Mutex::new(Vec::new())),
            delay: Mutex::new(None),
            meta: ClientMetadata {
                name: Cow::Borrowed("mock"),
                model: "mock-model".into(),
                grammar_tools: true,
            },
        }
    }

    /// Enqueues a response for the next `submit` call.
    pub fn queue_response(&self, response: ModelResponse) -> &Self {
        self.responses.lock().unwrap().push_back(Ok(response));
        self
    }

    /// Enqueues an error for the next `submit` call.
    pub fn queue_error(&self, error: MockError) -> &Self {
        self.responses.lock().unwrap().push_back(Err(error));
        self
    }

    /// Enqueues events for the next `submit_stream` call.
    pub fn queue_stream(&self, events: Vec<ResponseEvent>) -> &Self {
        self.streams.lock().unwrap().push_back(Ok(StreamScript {
            events,
            trailing_error: None,
        }));
        self
    }

    /// Enqueues events that are followed by a mid-stream error.
    pub fn queue_broken_stream(&self, events: Vec<ResponseEvent>, error: MockError) -> &Self {
        self.streams.lock().unwrap().push_back(Ok(StreamScript {
            events,
            trailing_error: Some(error),
        }));
        self
    }

    /// Enqueues an error returned by `submit_stream` itself.
    pub fn queue_stream_error(&self, error: MockError) -> &Self {
        self.streams.lock().unwrap().push_back(Err(error));
        self
    }

    /// Delays every subsequent call, to exercise cancellation.
    pub fn set_delay(&self, delay: Duration) -> &Self {
        *self.delay.lock().unwrap() = Some(delay);
        self
    }

    /// Every request received, in call order.
    pub fn recorded_requests(&self) -> Vec<InferenceRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn record(&self, request: &InferenceRequest) -> Option<Duration> {
        self.requests.lock().unwrap().push(request.clone());
        *self.delay.lock().unwrap()
    }
}

impl InferenceClient for MockClient {
    async fn submit(&self, request: &InferenceRequest) -> Result<ModelResponse, LoopError> {
        if let Some(delay) = self.record(request) {
            tokio::time::sleep(delay).await;
        }
        let next = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .expect("MockClient: no queued responses remaining");
        next.map_err(MockError::into_loop_error)
    }

    async fn submit_stream(&self, request: &InferenceRequest) -> Result<ResponseStream, LoopError> {
        if let Some(delay) = self.record(request) {
            tokio::time::sleep(delay).await;
        }
        let next = self
            .streams
            .lock()
            .unwrap()
            .pop_front()
            .expect("MockClient: no queued streams remaining");
        let script = next.map_err(MockError::into_loop_error)?;
        let items: Vec<Result<ResponseEvent, LoopError>> = script
            .events
            .into_iter()
            .map(Ok)
            .chain(script.trailing_error.map(|e| Err(e.into_loop_error())))
            .collect();
        Ok(Box::pin(futures::stream::iter(items)))
    }

    fn metadata(&self) -> ClientMetadata {
        self.meta.clone()
    }
}
