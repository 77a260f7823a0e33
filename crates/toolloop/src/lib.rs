//! # toolloop
//!
//! Client-side tool-calling orchestration for reasoning models.
//!
//! A caller declares local tools, hands a user request to a session, and
//! the session alternates between asking a model for a response and
//! executing whatever tools that response requests, feeding every result
//! back, until a response requests no tools. The model never runs
//! anything itself.
//!
//! This crate holds the service-agnostic half: the conversation model,
//! tool declarations and dispatch, the session state machine, and session
//! snapshots. Concrete inference services live in sibling crates and
//! implement [`InferenceClient`] (or its object-safe counterpart
//! [`DynInferenceClient`]).
//!
//! # Architecture
//!
//! ```text
//!              ┌────────────────────┐
//!              │  toolloop-openai   │  Responses API client
//!              └─────────┬──────────┘
//!                        │ InferenceClient
//!                        ▼
//!  ┌──────────────────────────────────────────────┐
//!  │                  toolloop                    │
//!  │  Session ─ ToolLoop ─ ToolRegistry ─ dispatch │
//!  └──────────────────────────────────────────────┘
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use serde_json::{json, Value};
//! use tokio_util::sync::CancellationToken;
//! use toolloop::tool::{tool_fn, JsonSchema, LoopConfig, ToolDeclaration, ToolLoop, ToolRegistry};
//!
//! # async fn example(client: &dyn toolloop::DynInferenceClient) -> Result<(), toolloop::LoopError> {
//! let mut registry: ToolRegistry = ToolRegistry::new();
//! registry.declare(tool_fn(
//!     ToolDeclaration::schema(
//!         "getPrice",
//!         "Price of a SKU at a store",
//!         JsonSchema::new(json!({
//!             "type": "object",
//!             "properties": { "store": { "type": "string" }, "sku": { "type": "string" } },
//!             "required": ["store", "sku"]
//!         })),
//!     ),
//!     |_args: Value| async move { Ok(json!({ "priceCents": 4999, "currency": "USD" })) },
//! ))?;
//!
//! let tool_loop = ToolLoop::new(client, &registry, LoopConfig::default());
//! let mut session = tool_loop.session("You compare prices.", "Where is N3-KEYBRD cheapest?");
//! let outcome = tool_loop.run(&mut session, &(), &CancellationToken::new()).await?;
//! println!("{}", outcome.text().unwrap_or("(no answer)"));
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`chat`] | Messages, output items, tool invocations and results |
//! | [`client`] | The [`InferenceClient`] trait and request parameters |
//! | [`conversation`] | Append-only conversation log |
//! | [`error`] | Unified [`LoopError`] |
//! | [`response`] | Normalized [`ModelResponse`] |
//! | [`session`] | Per-request [`Session`] state |
//! | [`snapshot`] | Persistent [`SessionSnapshot`] records |
//! | [`stream`] | Streaming events and their reassembly |
//! | [`tool`] | Declarations, registry, dispatch, and the loop |
//! | [`usage`] | Token counts |

#![warn(missing_docs)]

pub mod chat;
pub mod client;
pub mod conversation;
pub mod error;
pub mod response;
pub mod session;
pub mod snapshot;
pub mod stream;
pub mod tool;
pub mod usage;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_helpers;

// Only the types most programs touch are re-exported at the root:
//
//   toolloop::tool::*      : handlers, declarations, loop config, outcomes
//   toolloop::stream::*    : ResponseEvent, ResponseAssembler
//   toolloop::snapshot::*  : CallRecord, RoundRecord, SnapshotStatus
//   toolloop::mock::*      : MockClient (test-utils feature)

pub use chat::{CallKind, Message, OutputItem, ToolInvocation, ToolResult};
pub use client::{
    ClientMetadata, DynInferenceClient, GenerationConfig, InferenceClient, InferenceRequest,
    ReasoningEffort,
};
pub use conversation::ConversationState;
pub use error::LoopError;
pub use response::{ModelResponse, ResponseStatus};
pub use session::{Session, SessionState};
pub use snapshot::SessionSnapshot;
pub use stream::{ResponseEvent, ResponseStream};
pub use tool::{LoopConfig, Outcome, ToolDeclaration, ToolHandler, ToolLoop, ToolRegistry};
pub use usage::Usage;
