//! Tools and the orchestration loop.
//!
//! # Architecture
//!
//! ```text
//!   ToolDeclaration   : name, description, calling convention
//!       │
//!   ToolHandler       : declaration + execute fn
//!       │
//!   ToolRegistry      : handlers by name; resolve, decode, execute
//!       │
//!   dispatch()        : fan-out / fan-in of one round's invocations
//!       │
//!   ToolLoop          : model ⇄ tools rounds until no tool is requested
//!   run_session()     : seed, run, and return a session in one call
//! ```
//!
//! # Calling conventions
//!
//! A tool is either schema-typed (the model emits a JSON object checked
//! against a JSON Schema) or grammar-constrained (the model emits text
//! generated under a grammar). Both kinds can be declared in the same
//! registry; decoding picks the right path from the declaration.
//!
//! # Faults
//!
//! An invocation of an undeclared tool, arguments that don't decode, and a
//! handler that fails or panics each produce a [`ToolFault`] payload for
//! that invocation. The round still closes and the model sees the error on
//! the next round.
//!
//! # Example
//!
//! ```rust,no_run
//! use serde_json::{json, Value};
//! use tokio_util::sync::CancellationToken;
//! use toolloop::tool::{run_session, tool_fn, JsonSchema, SessionSpec, ToolDeclaration, ToolRegistry};
//!
//! # async fn example(client: &dyn toolloop::DynInferenceClient) -> Result<(), toolloop::LoopError> {
//! let mut registry: ToolRegistry = ToolRegistry::new();
//! registry.declare(tool_fn(
//!     ToolDeclaration::schema(
//!         "listUnreadThreads",
//!         "List unread email threads",
//!         JsonSchema::new(json!({
//!             "type": "object",
//!             "properties": { "limit": { "type": "integer", "minimum": 1 } },
//!             "required": ["limit"]
//!         })),
//!     ),
//!     |args: Value| async move {
//!         let limit = args["limit"].as_u64().unwrap_or(10);
//!         Ok(json!({ "threads": [], "limit": limit }))
//!     },
//! ))?;
//!
//! let run = run_session(
//!     client,
//!     &registry,
//!     SessionSpec {
//!         system: "You triage email.".into(),
//!         user: "What needs a reply today?".into(),
//!         ..Default::default()
//!     },
//!     &(),
//!     &CancellationToken::new(),
//! )
//! .await;
//! println!("{:?}", run.result?.text());
//! # Ok(())
//! # }
//! ```

mod config;
mod declaration;
mod decode;
mod dispatcher;
mod error;
mod handler;
mod helpers;
mod loop_core;
mod loop_sync;
mod output;
mod registry;

pub use config::{LoopConfig, LoopEvent, Outcome, ResponseMode, StepOutcome};
pub use declaration::{CallingConvention, Grammar, GrammarSyntax, JsonSchema, ToolDeclaration};
pub use dispatcher::{DispatchOutcome, dispatch};
pub use error::{ToolError, ToolFault};
pub use handler::{FnToolHandler, HandlerFuture, NoCtxToolHandler, ToolHandler};
pub use helpers::{tool_fn, tool_fn_with_ctx};
pub use loop_core::ToolLoop;
pub use loop_sync::{SessionRun, SessionSpec, run_session};
pub use output::ToolOutput;
pub use registry::ToolRegistry;
