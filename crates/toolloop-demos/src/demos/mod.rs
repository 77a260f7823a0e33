//! Demo sessions.
//!
//! Each demo bundles a system prompt, a default user request, and a
//! registry of mock tools. Tools can be declared under either calling
//! convention so the same session can be compared schema against grammar.

pub(crate) mod email_triage;
pub(crate) mod price_compare;
pub(crate) mod simple_price;
pub(crate) mod todos;

use clap::ValueEnum;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use toolloop::tool::{
    Grammar, JsonSchema, LoopConfig, SessionRun, StepOutcome, ToolDeclaration, ToolLoop,
    ToolRegistry,
};
use toolloop::{DynInferenceClient, GenerationConfig, ReasoningEffort};
use tracing::info;

/// How a demo declares its tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum Convention {
    /// `function` tools with JSON Schema parameters.
    Schema,
    /// `custom` tools constrained by a Lark grammar.
    Grammar,
}

impl Convention {
    /// Builds a declaration under this convention from both variants.
    fn declare(
        self,
        name: &str,
        description: &str,
        schema: Value,
        grammar: &str,
    ) -> ToolDeclaration {
        match self {
            Self::Schema => ToolDeclaration::schema(name, description, JsonSchema::new(schema)),
            Self::Grammar => ToolDeclaration::grammar(name, description, Grammar::lark(grammar)),
        }
    }
}

/// A ready-to-run demo.
pub(crate) struct Demo<Ctx = ()>
where
    Ctx: Send + Sync + 'static,
{
    pub name: &'static str,
    pub system: &'static str,
    pub user: String,
    pub registry: ToolRegistry<Ctx>,
    /// Model used when none is configured.
    pub model: &'static str,
    /// Reasoning effort used when none is configured.
    pub reasoning_effort: ReasoningEffort,
}

/// Loop and generation settings for one run.
#[derive(Debug, Clone, Default)]
pub(crate) struct RunOptions {
    pub config: LoopConfig,
    pub generation: GenerationConfig,
}

/// Runs a demo to completion, logging every round's tool calls.
pub(crate) async fn run<Ctx: Send + Sync + 'static>(
    client: &dyn DynInferenceClient,
    demo: Demo<Ctx>,
    ctx: &Ctx,
    options: RunOptions,
    cancel: &CancellationToken,
) -> SessionRun {
    let Demo {
        name,
        system,
        user,
        registry,
        ..
    } = demo;
    info!(
        demo = name,
        tools = registry.len(),
        mode = ?options.config.response_mode,
        parallel = options.config.parallel_dispatch,
        "session start"
    );

    let tool_loop = ToolLoop::new(client, &registry, options.config).with_generation(options.generation);
    let mut session = tool_loop.session(system, user);

    let result = loop {
        match tool_loop.step(&mut session, ctx, cancel).await {
            Ok(StepOutcome::Continue { .. }) => {
                if let Some(round) = session.rounds().last() {
                    for (call, result) in round.invocations.iter().zip(&round.results) {
                        info!(
                            round = round.number,
                            tool = %call.tool_name,
                            args = %call.raw_arguments,
                            is_error = result.is_error,
                            "tool requested"
                        );
                    }
                }
            }
            Ok(StepOutcome::Finished(outcome)) => break Ok(outcome),
            Err(e) => break Err(e),
        }
    };

    let usage = session.usage();
    info!(
        demo = name,
        rounds = session.round(),
        tool_calls = session.tool_call_count(),
        input_tokens = usage.input_tokens,
        output_tokens = usage.output_tokens,
        "session end"
    );

    SessionRun { session, result }
}
