//! Session snapshots.
//!
//! A [`SessionSnapshot`] is an immutable record of one session: the user's
//! request, every tool call with its arguments and result per round, and
//! the terminal text. It is written once, when the session ends, and a
//! new snapshot at the same path fully replaces the previous one.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::chat::{ToolInvocation, ToolResult};
use crate::error::LoopError;
use crate::session::{Session, SessionState};
use crate::tool::{Outcome, SessionRun};

/// One tool call as recorded in a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallRecord {
    /// Invocation id.
    pub correlation_id: String,
    /// Requested tool.
    pub name: String,
    /// Arguments, as JSON when they parse and as the raw text otherwise.
    pub args: Value,
    /// Result, as JSON when it parses and as the raw text otherwise.
    pub result: Value,
    /// Whether the result is a fault payload.
    pub is_error: bool,
}

/// One round as recorded in a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundRecord {
    /// Round number.
    pub round: u32,
    /// The round's calls, in request order.
    pub calls: Vec<CallRecord>,
}

/// How the session ended, as recorded in a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotStatus {
    /// Ended with terminal text.
    Completed,
    /// Ended without terminal text.
    Inconclusive,
    /// Ended by an error, the round guard, or cancellation.
    Aborted,
    /// Captured before the session ended.
    InProgress,
}

/// Persistent record of one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// The user's request.
    pub prompt: String,
    /// Rounds that dispatched tools.
    pub rounds: Vec<RoundRecord>,
    /// Every call across all rounds, in order.
    pub tool_outputs: Vec<CallRecord>,
    /// Terminal text; `None` for inconclusive and aborted sessions.
    pub final_text: Option<String>,
    /// Text an aborted session produced before it stopped. Never a final
    /// answer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partial_text: Option<String>,
    /// How the session ended.
    pub status: SnapshotStatus,
    /// The error that aborted the session, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SessionSnapshot {
    /// Captures the session's current state.
    pub fn capture(session: &Session, error: Option<&LoopError>) -> Self {
        let rounds: Vec<RoundRecord> = session
            .rounds()
            .iter()
            .map(|round| RoundRecord {
                round: round.number,
                calls: round
                    .invocations
                    .iter()
                    .zip(&round.results)
                    .map(|(call, result)| call_record(call, result))
                    .collect(),
            })
            .collect();
        let tool_outputs = rounds.iter().flat_map(|r| r.calls.iter().cloned()).collect();

        let status = match (session.state(), session.outcome()) {
            (SessionState::Done, Some(Outcome::Completed { .. })) => SnapshotStatus::Completed,
            (SessionState::Done, _) => SnapshotStatus::Inconclusive,
            (SessionState::Aborted, _) => SnapshotStatus::Aborted,
            _ => SnapshotStatus::InProgress,
        };
        let partial_text = match status {
            SnapshotStatus::Aborted => session.last_text().map(str::to_string),
            _ => None,
        };

        Self {
            prompt: session.prompt().to_string(),
            rounds,
            tool_outputs,
            final_text: session.terminal_text().map(str::to_string),
            partial_text,
            status,
            error: error.map(ToString::to_string),
        }
    }

    /// Writes the snapshot as pretty JSON, replacing any file at `path`.
    ///
    /// Parent directories are created as needed. The content goes to a
    /// sibling temporary file first and is renamed into place, so readers
    /// never see a half-written snapshot.
    pub async fn write_to(&self, path: impl AsRef<Path>) -> Result<(), LoopError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_vec_pretty(self)?;
        let tmp = temp_path(path);
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, path).await?;
        info!(path = %path.display(), status = ?self.status, "session snapshot written");
        Ok(())
    }

    /// Reads a snapshot back.
    pub async fn read_from(path: impl AsRef<Path>) -> Result<Self, LoopError> {
        let bytes = tokio::fs::read(path).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

impl Session {
    /// Captures a snapshot of this session.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot::capture(self, None)
    }
}

impl SessionRun {
    /// Captures a snapshot of the finished session, including the error
    /// that aborted it, if any.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot::capture(&self.session, self.result.as_ref().err())
    }

    /// Captures the snapshot and writes it to `path`.
    ///
    /// See [`SessionSnapshot::write_to`].
    pub async fn write_snapshot(&self, path: impl AsRef<Path>) -> Result<(), LoopError> {
        self.snapshot().write_to(path).await
    }
}

fn call_record(call: &ToolInvocation, result: &ToolResult) -> CallRecord {
    CallRecord {
        correlation_id: call.correlation_id.clone(),
        name: call.tool_name.clone(),
        args: json_or_text(&call.raw_arguments),
        result: json_or_text(&result.payload),
        is_error: result.is_error,
    }
}

fn json_or_text(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::CallKind;
    use crate::session::Round;

    fn finished_session() -> Session {
        let mut session = Session::new("sys", "price of N3-KEYBRD?", Vec::new());
        session.rounds.push(Round {
            number: 1,
            invocations: vec![ToolInvocation::function(
                "call_1",
                "getPrice",
                r#"{"store":"storeA","sku":"N3-KEYBRD"}"#,
            )],
            results: vec![ToolResult {
                correlation_id: "call_1".into(),
                tool_name: "getPrice".into(),
                kind: CallKind::Function,
                payload: r#"{"priceCents":4999}"#.into(),
                is_error: false,
            }],
        });
        session.state = SessionState::Done;
        session.outcome = Some(Outcome::Completed {
            text: "$49.99 at storeA".into(),
            rounds: 2,
            tool_calls: 1,
        });
        session
    }

    #[test]
    fn test_capture_completed_session() {
        let snapshot = finished_session().snapshot();
        assert_eq!(snapshot.prompt, "price of N3-KEYBRD?");
        assert_eq!(snapshot.status, SnapshotStatus::Completed);
        assert_eq!(snapshot.final_text.as_deref(), Some("$49.99 at storeA"));
        assert_eq!(snapshot.rounds.len(), 1);
        assert_eq!(snapshot.tool_outputs.len(), 1);
        let call = &snapshot.tool_outputs[0];
        assert_eq!(call.args["sku"], "N3-KEYBRD");
        assert_eq!(call.result["priceCents"], 4999);
        assert!(snapshot.error.is_none());
        assert!(snapshot.partial_text.is_none());
    }

    #[test]
    fn test_capture_aborted_session_records_error() {
        let mut session = Session::new("sys", "loop forever", Vec::new());
        session.state = SessionState::Aborted;
        session.last_text = Some("Partial: checking storeA".into());
        let err = LoopError::RoundLimitExceeded {
            limit: 1,
            partial_text: None,
        };
        let snapshot = SessionSnapshot::capture(&session, Some(&err));
        assert_eq!(snapshot.status, SnapshotStatus::Aborted);
        assert!(snapshot.final_text.is_none());
        assert_eq!(snapshot.partial_text.as_deref(), Some("Partial: checking storeA"));
        assert_eq!(snapshot.error.as_deref(), Some("round limit exceeded (limit: 1)"));
    }

    #[test]
    fn test_unparseable_text_kept_verbatim() {
        assert_eq!(json_or_text("not json"), Value::String("not json".into()));
        assert_eq!(json_or_text("null"), Value::Null);
    }

    #[tokio::test]
    async fn test_write_replaces_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output").join("price.json");

        let mut first = finished_session().snapshot();
        first.final_text = Some("first".into());
        first.write_to(&path).await.unwrap();

        let second = Session::new("sys", "second prompt", Vec::new()).snapshot();
        second.write_to(&path).await.unwrap();

        let read = SessionSnapshot::read_from(&path).await.unwrap();
        assert_eq!(read, second);
        assert_eq!(read.status, SnapshotStatus::InProgress);
        assert!(!temp_path(&path).exists());
    }
}
