//! Append-only conversation log.

use serde::Serialize;

use crate::chat::{Message, ToolInvocation, ToolResult};

/// The ordered message log of one session.
///
/// Entries are only ever appended: nothing is removed, reordered, or
/// mutated once it is in the log, so the length never decreases. Mutation
/// goes through [`commit`](Self::commit), which appends a whole batch at
/// once; the orchestration loop commits each round as a single batch so a
/// cancelled round leaves no trace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConversationState {
    messages: Vec<Message>,
}

impl ConversationState {
    /// An empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// A log seeded with a system message and the user request.
    pub fn seeded(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::system(system), Message::user(user)],
        }
    }

    /// Appends a batch of entries.
    pub fn commit(&mut self, batch: impl IntoIterator<Item = Message>) {
        self.messages.extend(batch);
    }

    /// All entries, oldest first.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the log is empty.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Every tool invocation in the log, in order.
    pub fn tool_invocations(&self) -> impl Iterator<Item = &ToolInvocation> {
        self.messages.iter().filter_map(Message::as_tool_invocation)
    }

    /// Every tool result in the log, in order.
    pub fn tool_results(&self) -> impl Iterator<Item = &ToolResult> {
        self.messages.iter().filter_map(Message::as_tool_result)
    }

    /// Whether a correlation id has already been used in this log.
    pub fn has_correlation_id(&self, correlation_id: &str) -> bool {
        self.tool_invocations()
            .any(|call| call.correlation_id == correlation_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::{CallKind, OutputItem, Role};

    #[test]
    fn test_seeded_order() {
        let state = ConversationState::seeded("be brief", "list my threads");
        assert_eq!(state.len(), 2);
        assert_eq!(state.messages()[0].role, Role::System);
        assert_eq!(state.messages()[1].text(), Some("list my threads"));
    }

    #[test]
    fn test_commit_appends_in_order() {
        let mut state = ConversationState::seeded("s", "u");
        state.commit([
            Message::output(OutputItem::ToolInvocation(ToolInvocation::function(
                "call_1", "lookup", "{}",
            ))),
            Message::tool_result(ToolResult {
                correlation_id: "call_1".into(),
                tool_name: "lookup".into(),
                kind: CallKind::Function,
                payload: "1".into(),
                is_error: false,
            }),
        ]);
        assert_eq!(state.len(), 4);
        assert_eq!(state.tool_invocations().count(), 1);
        assert_eq!(state.tool_results().next().unwrap().correlation_id, "call_1");
        assert!(state.has_correlation_id("call_1"));
        assert!(!state.has_correlation_id("call_2"));
    }

    #[test]
    fn test_empty_commit_is_noop() {
        let mut state = ConversationState::new();
        state.commit(Vec::new());
        assert!(state.is_empty());
    }
}
