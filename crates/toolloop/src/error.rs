//! Session-level error type.
//!
//! Everything that can end a session early is a [`LoopError`]. Faults that
//! belong to a single tool invocation (unknown tool, undecodable arguments,
//! handler failure) are *not* errors at this level: the dispatcher renders
//! them into the invocation's result payload and the round closes normally.
//! See [`ToolFault`](crate::tool::ToolFault).
//!
//! # Families
//!
//! - Transport: [`Http`](LoopError::Http), [`Auth`](LoopError::Auth),
//!   [`InvalidRequest`](LoopError::InvalidRequest),
//!   [`Provider`](LoopError::Provider),
//!   [`ResponseFormat`](LoopError::ResponseFormat),
//!   [`Stream`](LoopError::Stream), [`Timeout`](LoopError::Timeout).
//!   The inference call failed; the session aborts. The loop never retries,
//!   but [`LoopError::is_retryable`] tells callers whether a fresh session
//!   is worth attempting.
//! - Session: [`RoundLimitExceeded`](LoopError::RoundLimitExceeded),
//!   [`Cancelled`](LoopError::Cancelled), and
//!   [`SessionAborted`](LoopError::SessionAborted).
//! - Registry: [`DuplicateToolName`](LoopError::DuplicateToolName) and
//!   [`UnknownTool`](LoopError::UnknownTool).
//!
//! ```rust
//! use toolloop::LoopError;
//!
//! fn worth_retrying(err: &LoopError) -> bool {
//!     err.is_transport() && err.is_retryable()
//! }
//!
//! assert!(worth_retrying(&LoopError::Timeout { elapsed_ms: 30_000 }));
//! assert!(!worth_retrying(&LoopError::Cancelled { round: 2 }));
//! ```

/// The error type returned by sessions, clients, and the tool registry.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum LoopError {
    /// An HTTP-level failure (transport error, unexpected status code).
    ///
    /// `status` is `None` when no response was received at all.
    #[error("HTTP error (status={status:?}): {message}")]
    Http {
        /// The HTTP status code, if one was received.
        status: Option<http::StatusCode>,
        /// A human-readable description of the failure.
        message: String,
        /// Whether a new attempt could succeed.
        retryable: bool,
    },

    /// The credential was rejected.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// The request was malformed.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A service-reported failure that doesn't map to another variant.
    #[error("Provider error ({code}): {message}")]
    Provider {
        /// Service-defined error code.
        code: String,
        /// Human-readable error description.
        message: String,
        /// Whether a new attempt could succeed.
        retryable: bool,
    },

    /// The response body could not be interpreted.
    #[error("Response format error: {message}")]
    ResponseFormat {
        /// What went wrong during parsing.
        message: String,
        /// The raw payload, for diagnostics.
        raw: String,
    },

    /// A streamed response ended or broke before completing.
    #[error("Stream error: {0}")]
    Stream(String),

    /// The inference call exceeded its deadline.
    #[error("Operation timed out after {elapsed_ms}ms")]
    Timeout {
        /// Milliseconds elapsed before the timeout fired.
        elapsed_ms: u64,
    },

    /// The model was still requesting tools when the round guard tripped.
    ///
    /// `partial_text` holds whatever assistant text the last completed
    /// round produced. It is never a final answer.
    #[error("round limit exceeded (limit: {limit})")]
    RoundLimitExceeded {
        /// The configured maximum number of rounds.
        limit: u32,
        /// Text produced before the guard tripped, if any.
        partial_text: Option<String>,
    },

    /// The caller cancelled the session.
    #[error("session cancelled during round {round}")]
    Cancelled {
        /// The round in flight when cancellation was observed.
        round: u32,
    },

    /// The session already aborted and cannot be driven further.
    #[error("session already aborted")]
    SessionAborted,

    /// A tool with this name is already declared in the registry.
    #[error("duplicate tool name: {0}")]
    DuplicateToolName(String),

    /// No tool with this name is declared in the registry.
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    /// Writing the session snapshot failed.
    #[error("snapshot I/O error: {0}")]
    Snapshot(#[from] std::io::Error),
}

impl LoopError {
    /// Returns `true` for failures of the inference boundary itself.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Http { .. }
                | Self::Auth(_)
                | Self::InvalidRequest(_)
                | Self::Provider { .. }
                | Self::ResponseFormat { .. }
                | Self::Stream(_)
                | Self::Timeout { .. }
        )
    }

    /// Returns `true` if the error is transient.
    ///
    /// Timeouts and broken streams count as transient; everything else
    /// follows the `retryable` flag the client set.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http { retryable, .. } | Self::Provider { retryable, .. } => *retryable,
            Self::Timeout { .. } | Self::Stream(_) => true,
            _ => false,
        }
    }
}

impl From<serde_json::Error> for LoopError {
    fn from(err: serde_json::Error) -> Self {
        Self::ResponseFormat {
            message: err.to_string(),
            raw: String::new(),
        }
    }
}
