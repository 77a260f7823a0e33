//! Per-request session state.

use serde::{Deserialize, Serialize};

use crate::chat::{ToolInvocation, ToolResult};
use crate::conversation::ConversationState;
use crate::tool::{LoopEvent, Outcome, ToolDeclaration};
use crate::usage::Usage;

/// Lifecycle state of a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Seeded, no inference call made yet.
    Init,
    /// Waiting on the model.
    AwaitingModel,
    /// Running the round's tool handlers.
    DispatchingTools,
    /// Ended because a round requested no tools.
    Done,
    /// Ended by an error, the round guard, or cancellation.
    Aborted,
}

impl SessionState {
    /// Whether the state is terminal.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Aborted)
    }
}

/// One round that dispatched tools.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Round {
    /// Round number, 1-indexed.
    pub number: u32,
    /// Invocations the model requested.
    pub invocations: Vec<ToolInvocation>,
    /// One result per invocation, in request order.
    pub results: Vec<ToolResult>,
}

/// Everything one user request accumulates while it is being served.
///
/// A session is seeded with a system message and the user's request, then
/// driven by a [`ToolLoop`](crate::tool::ToolLoop). After it ends (normally
/// or not) it stays inspectable, and can be persisted with
/// [`snapshot`](Self::snapshot).
#[derive(Debug, Clone)]
pub struct Session {
    pub(crate) prompt: String,
    pub(crate) declarations: Vec<ToolDeclaration>,
    pub(crate) conversation: ConversationState,
    pub(crate) round: u32,
    pub(crate) rounds: Vec<Round>,
    pub(crate) state: SessionState,
    pub(crate) last_text: Option<String>,
    pub(crate) outcome: Option<Outcome>,
    pub(crate) usage: Usage,
    pub(crate) events: Vec<LoopEvent>,
}

impl Session {
    /// Seeds a session.
    ///
    /// `declarations` are fixed for the session's lifetime.
    pub fn new(
        system: impl Into<String>,
        user: impl Into<String>,
        declarations: Vec<ToolDeclaration>,
    ) -> Self {
        let prompt = user.into();
        Self {
            conversation: ConversationState::seeded(system, prompt.clone()),
            prompt,
            declarations,
            round: 1,
            rounds: Vec::new(),
            state: SessionState::Init,
            last_text: None,
            outcome: None,
            usage: Usage::default(),
            events: Vec::new(),
        }
    }

    /// The user's request.
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Tools offered to the model.
    pub fn declarations(&self) -> &[ToolDeclaration] {
        &self.declarations
    }

    /// The conversation so far.
    pub fn conversation(&self) -> &ConversationState {
        &self.conversation
    }

    /// The round currently running, or the next one to run.
    pub fn round(&self) -> u32 {
        self.round
    }

    /// Rounds that dispatched tools, oldest first.
    pub fn rounds(&self) -> &[Round] {
        &self.rounds
    }

    /// Lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The outcome, once the session ended normally.
    pub fn outcome(&self) -> Option<&Outcome> {
        self.outcome.as_ref()
    }

    /// The terminal text, once the session ended with one.
    pub fn terminal_text(&self) -> Option<&str> {
        self.outcome.as_ref().and_then(Outcome::text)
    }

    /// The most recent assistant text, final or not.
    pub fn last_text(&self) -> Option<&str> {
        self.last_text.as_deref()
    }

    /// Tokens used across all rounds.
    pub fn usage(&self) -> &Usage {
        &self.usage
    }

    /// Tool invocations dispatched across all rounds.
    pub fn tool_call_count(&self) -> usize {
        self.rounds.iter().map(|r| r.invocations.len()).sum()
    }

    /// Whether the session reached a terminal state.
    pub fn is_finished(&self) -> bool {
        self.state.is_terminal()
    }

    /// Takes the buffered loop events.
    pub fn drain_events(&mut self) -> Vec<LoopEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_is_seeded() {
        let session = Session::new("sys", "Compare prices for N3-KEYBRD", Vec::new());
        assert_eq!(session.prompt(), "Compare prices for N3-KEYBRD");
        assert_eq!(session.conversation().len(), 2);
        assert_eq!(session.round(), 1);
        assert_eq!(session.state(), SessionState::Init);
        assert!(!session.is_finished());
        assert!(session.terminal_text().is_none());
        assert_eq!(session.tool_call_count(), 0);
    }

    #[test]
    fn test_terminal_states() {
        assert!(SessionState::Done.is_terminal());
        assert!(SessionState::Aborted.is_terminal());
        assert!(!SessionState::DispatchingTools.is_terminal());
    }
}
