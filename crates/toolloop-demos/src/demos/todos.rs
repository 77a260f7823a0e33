//! Todo extraction from a transcript, persisted to a local JSON file.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::sync::Mutex;
use toolloop::tool::{ToolError, ToolRegistry, tool_fn_with_ctx};
use toolloop::{LoopError, ReasoningEffort};
use tracing::info;

use super::{Convention, Demo};

const SYSTEM_PROMPT: &str = "\
# Role and Objective
- Your task is to analyze the user's transcript, extract all actionable todos, and facilitate their addition to the system in an efficient manner.

# Instructions
- Begin with a concise checklist (3-7 bullets) of what you will do; keep items conceptual, not implementation-level.
- Process the full transcript in one pass, identifying every todo item before invoking any tools.
- Issue all tool calls in a single response to enable maximum parallelism:
  1. Call `get_current_datetime` once if you need the current date or time for due dates.
  2. For each identified todo, call `add_todo` (emit all calls in parallel in the same output).
- Only split tool calls across multiple responses if absolutely required, otherwise always group them together.
- After tool execution, generate a concise user-facing summary that clearly details what todos were added, or indicate that none were found.

# Context
- Provide clear, concise todo titles. When appropriate, infer smart relative due dates based on the current date.
- If no todos are found in the transcript, avoid all tool calls and inform the user accordingly.

# Output Format
- Call tools using the specified API methods (`get_current_datetime`, `add_todo`) as described above, batching all calls unless impossible.
- End with a summary message to the user: either a list of added todos or an explicit statement that no todos were extracted.
";

const DEFAULT_TRANSCRIPT: &str = "I just got a new job at the local hospital. I need to call my mom to tell her tonight, \
and then go pick up my new car tomorrow. Had a really good time at the beach with my friends yesterday, \
need to call them to setup a time to go again later this week.";

const DATETIME_GRAMMAR: &str = include_str!("../../grammars/get_current_datetime.lark");
const ADD_TODO_GRAMMAR: &str = include_str!("../../grammars/add_todo.lark");

/// Format of `get_current_datetime` results.
pub(crate) const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Todo priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum Priority {
    Low,
    Medium,
    High,
}

/// One todo as the model submits it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Todo {
    pub title: String,
    /// `YYYY-MM-DD`, or `None` for no due date.
    pub due: Option<String>,
    pub priority: Priority,
}

/// JSON-file todo list shared by every `add_todo` call of a session.
///
/// Appends are serialized so parallel calls never lose an entry.
#[derive(Debug, Clone)]
pub(crate) struct TodoStore {
    path: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl TodoStore {
    pub(crate) fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Removes any list left by a previous run.
    pub(crate) async fn reset(&self) -> io::Result<()> {
        let _guard = self.lock.lock().await;
        match tokio::fs::remove_file(&self.path).await {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }

    /// Reads the current list; a missing file is an empty list.
    pub(crate) async fn load(&self) -> io::Result<Vec<Todo>> {
        let _guard = self.lock.lock().await;
        self.read().await
    }

    /// Appends a todo and returns the new list length.
    pub(crate) async fn add(&self, todo: Todo) -> io::Result<usize> {
        let _guard = self.lock.lock().await;
        let mut todos = self.read().await?;
        todos.push(todo);
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, serde_json::to_vec_pretty(&todos)?).await?;
        Ok(todos.len())
    }

    async fn read(&self) -> io::Result<Vec<Todo>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }
}

/// Builds the demo. Tools write to the [`TodoStore`] passed as context.
pub(crate) fn demo(
    convention: Convention,
    transcript: Option<String>,
) -> Result<Demo<TodoStore>, LoopError> {
    let mut registry = ToolRegistry::new();
    registry.declare(tool_fn_with_ctx(
        convention.declare(
            "get_current_datetime",
            "Gets the current date and time, in the format of YYYY-MM-DD HH:MM:SS",
            json!({ "type": "object", "properties": {}, "required": [] }),
            DATETIME_GRAMMAR,
        ),
        |_args: Value, _store: &TodoStore| async move {
            let now = chrono::Local::now().format(DATETIME_FORMAT).to_string();
            Ok::<_, ToolError>(json!({ "current_datetime": now }))
        },
    ))?;
    registry.declare(tool_fn_with_ctx(
        convention.declare(
            "add_todo",
            "Adds a todo to the user's list",
            json!({
                "type": "object",
                "properties": {
                    "title": { "type": "string", "description": "Title of the todo" },
                    "due": { "type": ["string", "null"], "description": "Due date in YYYY-MM-DD or null" },
                    "priority": { "type": "string", "enum": ["low", "medium", "high"] }
                },
                "required": ["title", "due", "priority"]
            }),
            ADD_TODO_GRAMMAR,
        ),
        |args: Value, store: &TodoStore| {
            let store = store.clone();
            async move {
                let todo: Todo = serde_json::from_value(args)?;
                let title = todo.title.clone();
                let count = store
                    .add(todo)
                    .await
                    .map_err(|e| ToolError::new(format!("failed to save todo: {e}")))?;
                info!(title = %title, count, path = %store.path().display(), "todo added");
                Ok::<_, ToolError>(json!({ "added": title, "count": count }))
            }
        },
    ))?;

    let transcript = transcript.unwrap_or_else(|| DEFAULT_TRANSCRIPT.to_string());
    Ok(Demo {
        name: "todos",
        system: SYSTEM_PROMPT,
        user: format!("Transcript:\n{transcript}"),
        registry,
        model: "gpt-5-mini",
        reasoning_effort: ReasoningEffort::Minimal,
    })
}

#[cfg(test)]
mod tests {
    use tokio_util::sync::CancellationToken;
    use toolloop::test_helpers::{custom_call, function_call, mock_client, text_response, tool_response};

    use super::*;
    use crate::demos::{RunOptions, run};

    fn todo(title: &str) -> Todo {
        Todo {
            title: title.into(),
            due: None,
            priority: Priority::Medium,
        }
    }

    #[tokio::test]
    async fn test_store_add_and_reset() {
        let dir = tempfile::tempdir().unwrap();
        let store = TodoStore::new(dir.path().join("output").join("todos.json"));

        assert!(store.load().await.unwrap().is_empty());
        assert_eq!(store.add(todo("Call mom")).await.unwrap(), 1);
        assert_eq!(store.add(todo("Pick up car")).await.unwrap(), 2);
        assert_eq!(store.load().await.unwrap()[1].title, "Pick up car");

        store.reset().await.unwrap();
        assert!(store.load().await.unwrap().is_empty());
        store.reset().await.unwrap();
    }

    #[tokio::test]
    async fn test_concurrent_adds_keep_every_todo() {
        let dir = tempfile::tempdir().unwrap();
        let store = TodoStore::new(dir.path().join("todos.json"));

        let adds = (0..8).map(|i| {
            let store = store.clone();
            async move { store.add(todo(&format!("todo {i}"))).await }
        });
        for result in futures::future::join_all(adds).await {
            result.unwrap();
        }

        assert_eq!(store.load().await.unwrap().len(), 8);
    }

    #[test]
    fn test_todo_wire_shape() {
        let parsed: Todo = serde_json::from_str(
            r#"{"title":"Call friends","due":"2025-03-06","priority":"low"}"#,
        )
        .unwrap();
        assert_eq!(parsed.priority, Priority::Low);
        assert_eq!(parsed.due.as_deref(), Some("2025-03-06"));

        let no_due: Todo =
            serde_json::from_str(r#"{"title":"x","due":null,"priority":"high"}"#).unwrap();
        assert_eq!(no_due.due, None);
    }

    #[tokio::test]
    async fn test_grammar_session_adds_todos_in_parallel() {
        let dir = tempfile::tempdir().unwrap();
        let store = TodoStore::new(dir.path().join("todos.json"));
        let demo = demo(Convention::Grammar, None).unwrap();
        assert!(demo.user.starts_with("Transcript:\n"));

        let mock = mock_client(vec![
            tool_response(vec![
                custom_call("call_1", "get_current_datetime", "{}"),
                custom_call(
                    "call_2",
                    "add_todo",
                    r#"{"title":"Call mom","due":"2025-03-03","priority":"high"}"#,
                ),
                custom_call(
                    "call_3",
                    "add_todo",
                    r#"{"title":"Pick up new car","due":"2025-03-04","priority":"medium"}"#,
                ),
            ]),
            text_response("Added 2 todos."),
        ]);

        let session_run = run(&mock, demo, &store, RunOptions::default(), &CancellationToken::new()).await;

        assert_eq!(session_run.result.unwrap().text(), Some("Added 2 todos."));
        let results = &session_run.session.rounds()[0].results;
        assert!(results.iter().all(|r| !r.is_error));
        let now: Value = serde_json::from_str(&results[0].payload).unwrap();
        let stamp = now["current_datetime"].as_str().unwrap();
        assert!(chrono::NaiveDateTime::parse_from_str(stamp, DATETIME_FORMAT).is_ok());

        let saved = store.load().await.unwrap();
        let mut titles: Vec<&str> = saved.iter().map(|t| t.title.as_str()).collect();
        titles.sort_unstable();
        assert_eq!(titles, ["Call mom", "Pick up new car"]);
    }

    #[tokio::test]
    async fn test_schema_rejects_bad_priority() {
        let dir = tempfile::tempdir().unwrap();
        let store = TodoStore::new(dir.path().join("todos.json"));
        let demo = demo(Convention::Schema, Some("buy milk".into())).unwrap();
        let mock = mock_client(vec![
            tool_response(vec![function_call(
                "call_1",
                "add_todo",
                r#"{"title":"Buy milk","due":null,"priority":"urgent"}"#,
            )]),
            text_response("Could not add."),
        ]);

        let session_run = run(&mock, demo, &store, RunOptions::default(), &CancellationToken::new()).await;

        assert!(session_run.session.rounds()[0].results[0].is_error);
        assert!(store.load().await.unwrap().is_empty());
    }
}
