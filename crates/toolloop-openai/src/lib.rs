//! `OpenAI` Responses API client for `toolloop`.
//!
//! [`OpenAiClient`] implements [`toolloop::InferenceClient`] on top of
//! `POST /responses`. Schema-typed tools are declared as `function` tools
//! and grammar-constrained tools as `custom` tools with a grammar format;
//! both kinds of call, and their results, round-trip through the
//! conversation unchanged.
//!
//! ```rust,no_run
//! use tokio_util::sync::CancellationToken;
//! use toolloop::tool::{LoopConfig, ToolLoop, ToolRegistry};
//! use toolloop_openai::{OpenAiClient, OpenAiConfig};
//!
//! # async fn example() -> Result<(), toolloop::LoopError> {
//! let client = OpenAiClient::new(OpenAiConfig {
//!     api_key: std::env::var("OPENAI_API_KEY").unwrap_or_default(),
//!     ..Default::default()
//! });
//! let registry: ToolRegistry = ToolRegistry::new();
//! let tool_loop = ToolLoop::new(&client, &registry, LoopConfig::default());
//! let mut session = tool_loop.session("Be brief.", "Say hi.");
//! tool_loop.run(&mut session, &(), &CancellationToken::new()).await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod config;
mod convert;
mod provider;
mod stream;
mod types;

pub use config::{DEFAULT_BASE_URL, DEFAULT_MODEL, OpenAiConfig};
pub use provider::OpenAiClient;
