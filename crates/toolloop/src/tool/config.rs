//! Orchestration loop configuration, events, and outcomes.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::chat::ToolResult;

/// Whether each inference call is made buffered or streamed.
///
/// Both modes produce the same [`ModelResponse`](crate::ModelResponse);
/// the choice only affects latency and logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseMode {
    /// One request, one complete response.
    #[default]
    Buffered,
    /// Incremental events folded into a response.
    Streaming,
}

/// Configuration for the orchestration loop.
///
/// ```rust
/// use toolloop::tool::{LoopConfig, ResponseMode};
///
/// let config = LoopConfig {
///     max_rounds: Some(4),
///     response_mode: ResponseMode::Streaming,
///     ..Default::default()
/// };
/// assert!(config.parallel_dispatch);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopConfig {
    /// Safety bound on the number of rounds. `None` disables the guard;
    /// the loop then ends only when a round requests no tools. Default: 10.
    pub max_rounds: Option<u32>,
    /// Run the handlers of one round concurrently. Default: true.
    pub parallel_dispatch: bool,
    /// Buffered or streaming inference calls. Default: buffered.
    pub response_mode: ResponseMode,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            max_rounds: Some(10),
            parallel_dispatch: true,
            response_mode: ResponseMode::Buffered,
        }
    }
}

/// Something that happened inside the loop.
///
/// Buffered on the [`Session`](crate::Session); drain with
/// [`Session::drain_events`](crate::Session::drain_events).
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum LoopEvent {
    /// A round is about to call the model.
    RoundStart {
        /// Round number, 1-indexed.
        round: u32,
        /// Conversation length when the request was built.
        message_count: usize,
    },
    /// The model answered.
    ResponseReceived {
        /// Round number.
        round: u32,
        /// Number of tool invocations requested.
        tool_calls: usize,
        /// Whether the response carried assistant text.
        has_text: bool,
    },
    /// A handler is about to run.
    ///
    /// With parallel dispatch, start/end pairs arrive in completion order.
    /// Use `correlation_id` to pair them.
    ToolDispatchStart {
        /// Invocation id.
        correlation_id: String,
        /// Requested tool.
        tool_name: String,
    },
    /// A handler finished (or the invocation faulted).
    ToolDispatchEnd {
        /// Invocation id.
        correlation_id: String,
        /// Requested tool.
        tool_name: String,
        /// The committed result.
        result: ToolResult,
        /// Time spent in decode and handler.
        duration: Duration,
    },
    /// The session reached a terminal state.
    Finished {
        /// Rounds executed.
        rounds: u32,
        /// Whether the session ended normally (as opposed to aborting).
        completed: bool,
    },
}

/// How a session that ran to natural completion ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    /// The final round produced text.
    Completed {
        /// The terminal text.
        text: String,
        /// Rounds executed.
        rounds: u32,
        /// Tool invocations dispatched across all rounds.
        tool_calls: usize,
    },
    /// The final round requested no tools but produced no text either.
    Inconclusive {
        /// Rounds executed.
        rounds: u32,
        /// Tool invocations dispatched across all rounds.
        tool_calls: usize,
    },
}

impl Outcome {
    /// The terminal text, if any.
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Completed { text, .. } => Some(text),
            Self::Inconclusive { .. } => None,
        }
    }

    /// Rounds executed.
    pub fn rounds(&self) -> u32 {
        match self {
            Self::Completed { rounds, .. } | Self::Inconclusive { rounds, .. } => *rounds,
        }
    }

    /// Whether the session ended without terminal text.
    pub fn is_inconclusive(&self) -> bool {
        matches!(self, Self::Inconclusive { .. })
    }
}

/// Result of driving one round with [`ToolLoop::step`](super::ToolLoop::step).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// Tools were dispatched; the given round is next.
    Continue {
        /// The round that will run on the next step.
        next_round: u32,
    },
    /// The session is over.
    Finished(Outcome),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LoopConfig::default();
        assert_eq!(config.max_rounds, Some(10));
        assert!(config.parallel_dispatch);
        assert_eq!(config.response_mode, ResponseMode::Buffered);
    }

    #[test]
    fn test_outcome_accessors() {
        let done = Outcome::Completed {
            text: "Two slots open".into(),
            rounds: 2,
            tool_calls: 2,
        };
        assert_eq!(done.text(), Some("Two slots open"));
        assert_eq!(done.rounds(), 2);
        assert!(!done.is_inconclusive());

        let empty = Outcome::Inconclusive {
            rounds: 1,
            tool_calls: 0,
        };
        assert!(empty.text().is_none());
        assert!(empty.is_inconclusive());
    }

    #[test]
    fn test_outcome_serializes_with_status_tag() {
        let json = serde_json::to_value(Outcome::Inconclusive {
            rounds: 3,
            tool_calls: 4,
        })
        .unwrap();
        assert_eq!(json["status"], "inconclusive");
        assert_eq!(json["rounds"], 3);
    }
}
