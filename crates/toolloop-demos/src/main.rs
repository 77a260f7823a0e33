//! toolloop demos
//!
//! Runs one of the demo sessions against the `OpenAI` Responses API and
//! writes its snapshot:
//! - `email-triage`: unread threads and calendar slots, drafted replies
//! - `price-compare`: delivered price across two stores
//! - `simple-price`: one random price lookup
//! - `todos`: todo extraction into a local JSON list

mod cli;
mod demos;
mod observe;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use toolloop::tool::SessionRun;
use toolloop_openai::{OpenAiClient, OpenAiConfig};
use tracing::{info, warn};

use crate::cli::{Cli, Command};
use crate::demos::{Demo, email_triage, price_compare, simple_price, todos};
use crate::observe::EventLogger;

#[tokio::main]
async fn main() {
    // Logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run().await {
        eprintln!("error: {e}");
        for cause in e.chain().skip(1) {
            eprintln!("  caused by: {cause}");
        }
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let api_key = cli
        .api_key
        .clone()
        .filter(|key| !key.is_empty())
        .context("OPENAI_API_KEY is not set (export it or pass --api-key)")?;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted; cancelling session");
            on_signal.cancel();
        }
    });

    let session_run = match &cli.command {
        Command::EmailTriage { prompt } => {
            let now = chrono::Local::now().naive_local();
            let demo = email_triage::demo(cli.convention, prompt.clone(), now)?;
            execute(&cli, &api_key, demo, &(), &cancel).await
        }
        Command::PriceCompare { prompt } => {
            let demo = price_compare::demo(cli.convention, prompt.clone())?;
            execute(&cli, &api_key, demo, &(), &cancel).await
        }
        Command::SimplePrice { prompt } => {
            let demo = simple_price::demo(cli.convention, prompt.clone())?;
            execute(&cli, &api_key, demo, &(), &cancel).await
        }
        Command::Todos { transcript, store } => {
            let store = todos::TodoStore::new(store);
            store
                .reset()
                .await
                .with_context(|| format!("failed to reset {}", store.path().display()))?;
            let demo = todos::demo(cli.convention, transcript.clone())?;
            let session_run = execute(&cli, &api_key, demo, &store, &cancel).await;
            let saved = store.load().await.context("failed to read the todo list")?;
            info!(todos = saved.len(), path = %store.path().display(), "todo list saved");
            session_run
        }
    };

    let output = cli.output_path();
    session_run
        .write_snapshot(&output)
        .await
        .with_context(|| format!("failed to write snapshot to {}", output.display()))?;

    if session_run.result.is_err() {
        if let Some(text) = session_run.session.last_text() {
            warn!("incomplete output text: {text}");
        }
    }
    let outcome = session_run.result.context("session aborted")?;
    match outcome.text() {
        Some(text) => info!(rounds = outcome.rounds(), "final output text: {text}"),
        None => info!(rounds = outcome.rounds(), "final output text unavailable"),
    }
    Ok(())
}

/// Builds the client for a demo and runs it.
async fn execute<Ctx: Send + Sync + 'static>(
    cli: &Cli,
    api_key: &str,
    demo: Demo<Ctx>,
    ctx: &Ctx,
    cancel: &CancellationToken,
) -> SessionRun {
    let client = EventLogger::new(OpenAiClient::new(OpenAiConfig {
        api_key: api_key.to_string(),
        model: cli.model.clone().unwrap_or_else(|| demo.model.to_string()),
        base_url: cli.base_url.clone(),
        timeout: cli.timeout(),
        ..Default::default()
    }));
    let options = cli.run_options(demo.reasoning_effort);
    demos::run(&client, demo, ctx, options, cancel).await
}
