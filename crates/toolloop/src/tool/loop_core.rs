//! The orchestration loop.
//!
//! [`ToolLoop`] drives a [`Session`] through its states:
//!
//! ```text
//! Init ─► AwaitingModel ─► DispatchingTools ─► AwaitingModel ─► … ─► Done
//!              │                   │
//!              └──────────┬────────┘
//!                         ▼
//!                      Aborted  (transport error, round guard, cancellation)
//! ```
//!
//! A session ends normally only on a round whose response requests no
//! tools. The round guard is an extra safety bound, not the termination
//! mechanism.
//!
//! # Atomic rounds
//!
//! A round's response items and all of its tool results are committed to
//! the conversation in one batch after fan-in. A round interrupted by an
//! error or by cancellation commits nothing, so the conversation always
//! ends on a round boundary and every committed invocation has exactly
//! one committed result.

use std::collections::HashSet;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::ToolRegistry;
use super::config::{LoopConfig, LoopEvent, Outcome, StepOutcome};
use super::dispatcher::dispatch;
use crate::chat::{Message, ToolInvocation};
use crate::client::{DynInferenceClient, GenerationConfig, InferenceRequest, submit_with_mode};
use crate::error::LoopError;
use crate::session::{Round, Session, SessionState};

/// Drives sessions against one client and one registry.
///
/// The loop borrows both for its whole lifetime, so the registry cannot
/// change while sessions run.
///
/// ```rust,no_run
/// use tokio_util::sync::CancellationToken;
/// use toolloop::tool::{LoopConfig, ToolLoop, ToolRegistry};
/// use toolloop::DynInferenceClient;
///
/// # async fn example(client: &dyn DynInferenceClient) -> Result<(), toolloop::LoopError> {
/// let registry: ToolRegistry = ToolRegistry::new();
/// let tool_loop = ToolLoop::new(client, &registry, LoopConfig::default());
///
/// let mut session = tool_loop.session("You are terse.", "Say hi.");
/// let outcome = tool_loop.run(&mut session, &(), &CancellationToken::new()).await?;
/// println!("{:?}", outcome.text());
/// # Ok(())
/// # }
/// ```
pub struct ToolLoop<'a, Ctx = ()>
where
    Ctx: Send + Sync + 'static,
{
    client: &'a dyn DynInferenceClient,
    registry: &'a ToolRegistry<Ctx>,
    config: LoopConfig,
    generation: GenerationConfig,
}

impl<Ctx> std::fmt::Debug for ToolLoop<'_, Ctx>
where
    Ctx: Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolLoop")
            .field("client", &self.client.metadata())
            .field("registry", &self.registry)
            .field("config", &self.config)
            .field("generation", &self.generation)
            .finish()
    }
}

impl<'a, Ctx> ToolLoop<'a, Ctx>
where
    Ctx: Send + Sync + 'static,
{
    /// Creates a loop with default generation settings.
    pub fn new(
        client: &'a dyn DynInferenceClient,
        registry: &'a ToolRegistry<Ctx>,
        config: LoopConfig,
    ) -> Self {
        Self {
            client,
            registry,
            config,
            generation: GenerationConfig::default(),
        }
    }

    /// Sets the generation settings sent with every request.
    #[must_use]
    pub fn with_generation(mut self, generation: GenerationConfig) -> Self {
        self.generation = generation;
        self
    }

    /// The loop's configuration.
    pub fn config(&self) -> &LoopConfig {
        &self.config
    }

    /// Seeds a session that offers every tool in the registry.
    pub fn session(&self, system: impl Into<String>, user: impl Into<String>) -> Session {
        Session::new(system, user, self.registry.declarations())
    }

    /// Drives the session until it ends.
    ///
    /// Returns the [`Outcome`] of a session that ended because a round
    /// requested no tools. Every other ending is an error, after which the
    /// session is [`Aborted`](SessionState::Aborted) but still holds its
    /// conversation, rounds, and most recent text.
    pub async fn run(
        &self,
        session: &mut Session,
        ctx: &Ctx,
        cancel: &CancellationToken,
    ) -> Result<Outcome, LoopError> {
        loop {
            match self.step(session, ctx, cancel).await? {
                StepOutcome::Continue { .. } => {}
                StepOutcome::Finished(outcome) => return Ok(outcome),
            }
        }
    }

    /// Drives exactly one round.
    ///
    /// Calling `step` on a finished session returns its outcome again; on an
    /// aborted one it returns [`LoopError::SessionAborted`].
    pub async fn step(
        &self,
        session: &mut Session,
        ctx: &Ctx,
        cancel: &CancellationToken,
    ) -> Result<StepOutcome, LoopError> {
        match (session.state, &session.outcome) {
            (SessionState::Done, Some(outcome)) => return Ok(StepOutcome::Finished(outcome.clone())),
            (SessionState::Aborted, _) => return Err(LoopError::SessionAborted),
            _ => {}
        }

        let round = session.round;
        if cancel.is_cancelled() {
            return Err(abort(session, LoopError::Cancelled { round }));
        }
        if let Some(limit) = self.config.max_rounds {
            if round > limit {
                let partial_text = session.last_text.clone();
                return Err(abort(
                    session,
                    LoopError::RoundLimitExceeded {
                        limit,
                        partial_text,
                    },
                ));
            }
        }

        // ── AwaitingModel ───────────────────────────────────────

        session.state = SessionState::AwaitingModel;
        session.events.push(LoopEvent::RoundStart {
            round,
            message_count: session.conversation.len(),
        });
        info!(round, messages = session.conversation.len(), "inference start");

        let request = InferenceRequest {
            input: session.conversation.messages().to_vec(),
            tools: session.declarations.clone(),
            generation: self.generation.clone(),
        };

        let submitted = tokio::select! {
            biased;
            () = cancel.cancelled() => Err(LoopError::Cancelled { round }),
            result = submit_with_mode(self.client, &request, self.config.response_mode) => result,
        };
        let response = match submitted {
            Ok(response) => response,
            Err(e) => return Err(abort(session, e)),
        };

        session.usage += &response.usage;
        let text = response.output_text();
        if text.is_some() {
            session.last_text.clone_from(&text);
        }

        let calls: Vec<ToolInvocation> = response.tool_invocations().into_iter().cloned().collect();
        session.events.push(LoopEvent::ResponseReceived {
            round,
            tool_calls: calls.len(),
            has_text: text.is_some(),
        });

        if let Some(id) = reused_correlation_id(session, &calls) {
            return Err(abort(
                session,
                LoopError::ResponseFormat {
                    message: format!("correlation id {id} was already used in this session"),
                    raw: String::new(),
                },
            ));
        }

        let mut batch: Vec<Message> = response.items.into_iter().map(Message::output).collect();

        if calls.is_empty() {
            session.conversation.commit(batch);
            info!(round, "no more tool calls; exiting tool loop");
            let outcome = finish(session, round, text);
            return Ok(StepOutcome::Finished(outcome));
        }

        // ── DispatchingTools ────────────────────────────────────

        session.state = SessionState::DispatchingTools;
        for call in &calls {
            info!(
                round,
                tool = %call.tool_name,
                correlation_id = %call.correlation_id,
                "tool requested"
            );
        }

        let dispatched = tokio::select! {
            biased;
            () = cancel.cancelled() => None,
            outcome = dispatch(self.registry, calls.clone(), self.config.parallel_dispatch, ctx) => Some(outcome),
        };
        let Some(dispatched) = dispatched else {
            return Err(abort(session, LoopError::Cancelled { round }));
        };

        session.events.extend(dispatched.events);
        batch.extend(dispatched.results.iter().cloned().map(Message::tool_result));
        session.conversation.commit(batch);
        session.rounds.push(Round {
            number: round,
            invocations: calls,
            results: dispatched.results,
        });
        session.round += 1;

        Ok(StepOutcome::Continue {
            next_round: session.round,
        })
    }
}

/// Returns a correlation id that is either repeated within `calls` or
/// already present in the session.
fn reused_correlation_id<'c>(session: &Session, calls: &'c [ToolInvocation]) -> Option<&'c str> {
    let mut seen = HashSet::with_capacity(calls.len());
    calls
        .iter()
        .map(|call| call.correlation_id.as_str())
        .find(|id| !seen.insert(*id) || session.conversation.has_correlation_id(id))
}

fn finish(session: &mut Session, round: u32, text: Option<String>) -> Outcome {
    let tool_calls = session.tool_call_count();
    let outcome = match text {
        Some(text) => Outcome::Completed {
            text,
            rounds: round,
            tool_calls,
        },
        None => {
            warn!(round, "final output text unavailable on response");
            Outcome::Inconclusive {
                rounds: round,
                tool_calls,
            }
        }
    };
    session.state = SessionState::Done;
    session.outcome = Some(outcome.clone());
    session.events.push(LoopEvent::Finished {
        rounds: round,
        completed: true,
    });
    outcome
}

fn abort(session: &mut Session, error: LoopError) -> LoopError {
    warn!(round = session.round, error = %error, "session aborted");
    session.state = SessionState::Aborted;
    session.events.push(LoopEvent::Finished {
        rounds: session.round,
        completed: false,
    });
    error
}
