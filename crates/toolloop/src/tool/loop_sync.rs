//! One-call session runner.
//!
//! Thin wrapper around [`ToolLoop`] that seeds a session, runs it to the
//! end, and hands back both the session and its result.

use tokio_util::sync::CancellationToken;

use super::ToolRegistry;
use super::config::{LoopConfig, Outcome};
use super::loop_core::ToolLoop;
use crate::client::{DynInferenceClient, GenerationConfig};
use crate::error::LoopError;
use crate::session::Session;

/// A finished session and how it ended.
///
/// The session is returned even on error so callers can inspect partial
/// progress or persist a snapshot of it.
#[derive(Debug)]
pub struct SessionRun {
    /// The session in its terminal state.
    pub session: Session,
    /// The outcome, or the error that aborted the session.
    pub result: Result<Outcome, LoopError>,
}

/// Everything [`run_session`] needs besides the client and registry.
#[derive(Debug, Clone, Default)]
pub struct SessionSpec {
    /// System message framing the session.
    pub system: String,
    /// The user's request.
    pub user: String,
    /// Loop configuration.
    pub config: LoopConfig,
    /// Generation settings for every round.
    pub generation: GenerationConfig,
}

/// Runs one user request to completion.
///
/// Each round:
/// 1. Sends the full conversation and every declared tool to the client
/// 2. If the response requests tools, dispatches them and commits the
///    results
/// 3. Repeats until a round requests no tools, the round guard trips, the
///    client fails, or `cancel` fires
pub async fn run_session<Ctx: Send + Sync + 'static>(
    client: &dyn DynInferenceClient,
    registry: &ToolRegistry<Ctx>,
    spec: SessionSpec,
    ctx: &Ctx,
    cancel: &CancellationToken,
) -> SessionRun {
    let SessionSpec {
        system,
        user,
        config,
        generation,
    } = spec;
    let tool_loop = ToolLoop::new(client, registry, config).with_generation(generation);
    let mut session = tool_loop.session(system, user);
    let result = tool_loop.run(&mut session, ctx, cancel).await;
    SessionRun { session, result }
}
