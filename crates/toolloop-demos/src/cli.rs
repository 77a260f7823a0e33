use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use toolloop::tool::{LoopConfig, ResponseMode};
use toolloop::{GenerationConfig, ReasoningEffort};
use toolloop_openai::DEFAULT_BASE_URL;

use crate::demos::{Convention, RunOptions};

#[derive(Debug, Parser)]
#[command(
    name = "toolloop-demos",
    version,
    about = "Run a tool-calling session against the OpenAI Responses API"
)]
pub(crate) struct Cli {
    /// API key
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true, global = true)]
    pub api_key: Option<String>,

    /// Model (default depends on the demo)
    #[arg(long, env = "OPENAI_MODEL", global = true)]
    pub model: Option<String>,

    /// Reasoning effort: minimal, low, medium, or high (default depends on the demo)
    #[arg(long, env = "OPENAI_REASONING_EFFORT", global = true)]
    pub reasoning_effort: Option<ReasoningEffort>,

    /// API base URL
    #[arg(long, env = "OPENAI_BASE_URL", default_value = DEFAULT_BASE_URL, global = true)]
    pub base_url: String,

    /// How tools are declared to the model
    #[arg(long, value_enum, default_value_t = Convention::Grammar, global = true)]
    pub convention: Convention,

    /// Stream responses and log every event
    #[arg(long, global = true)]
    pub stream: bool,

    /// Round limit; 0 disables it
    #[arg(long, default_value_t = 10, global = true)]
    pub max_rounds: u32,

    /// Run the tools of one round one after another
    #[arg(long, global = true)]
    pub sequential: bool,

    /// Per-request timeout in seconds
    #[arg(long, global = true)]
    pub timeout_secs: Option<u64>,

    /// Snapshot path (default: output/<demo>.json)
    #[arg(long, global = true)]
    pub output: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    /// Triage unread email and propose meeting slots
    EmailTriage {
        /// User request (default: triage this week's inbox)
        #[arg(long)]
        prompt: Option<String>,
    },
    /// Compare delivered prices across stores
    PriceCompare {
        /// User request (default: N3-KEYBRD to ZIP 94507)
        #[arg(long)]
        prompt: Option<String>,
    },
    /// Look up one price
    SimplePrice {
        /// User request (default: SKU-001)
        #[arg(long)]
        prompt: Option<String>,
    },
    /// Extract todos from a transcript
    Todos {
        /// Transcript to read (default: a short sample)
        #[arg(long)]
        transcript: Option<String>,
        /// Todo list file, reset at the start of every run
        #[arg(long, default_value = "output/todo-list.json")]
        store: PathBuf,
    },
}

impl Command {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Self::EmailTriage { .. } => "email-triage",
            Self::PriceCompare { .. } => "price-compare",
            Self::SimplePrice { .. } => "simple-price",
            Self::Todos { .. } => "todos",
        }
    }
}

impl Cli {
    /// Where the session snapshot goes.
    pub(crate) fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| PathBuf::from("output").join(format!("{}.json", self.command.name())))
    }

    pub(crate) fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Loop and generation settings, falling back to the demo's effort.
    pub(crate) fn run_options(&self, default_effort: ReasoningEffort) -> RunOptions {
        RunOptions {
            config: LoopConfig {
                max_rounds: (self.max_rounds > 0).then_some(self.max_rounds),
                parallel_dispatch: !self.sequential,
                response_mode: if self.stream {
                    ResponseMode::Streaming
                } else {
                    ResponseMode::Buffered
                },
            },
            generation: GenerationConfig {
                reasoning_effort: Some(self.reasoning_effort.unwrap_or(default_effort)),
                timeout: self.timeout(),
                ..Default::default()
            },
        }
    }
}
