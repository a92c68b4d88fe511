//! CLI command definitions using clap

use crate::commands::dynamic::{
    CallOptions, DEFAULT_TEMPERATURE, Language, Verbosity, parse_temperature,
};
use clap::{Args, Parser, Subcommand, ValueEnum};

/// toolspan - traced parallel tool calling
#[derive(Parser)]
#[command(name = "toolspan")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Tracing backend (each command has its own default)
    #[arg(short, long, global = true)]
    pub backend: Option<BackendKind>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Tracing backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendKind {
    /// OTLP HTTP+JSON with batching (`OPENLUMIX_URL`, `OPENLUMIX_PROJECT_ID`)
    Openlumix,
    /// OTLP HTTP+protobuf, one export per span (`PHOENIX_UI_PORT`)
    Phoenix,
    /// Spans written to the log, no collector needed
    Console,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Openlumix => write!(f, "openlumix"),
            Self::Phoenix => write!(f, "phoenix"),
            Self::Console => write!(f, "console"),
        }
    }
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Agent that calls several city tools in parallel
    Parallel {
        /// Prompt; starts an interactive chat when omitted
        prompt: Vec<String>,
    },

    /// Agent with a weather tool that streams progress
    Streaming {
        /// Prompt; starts an interactive chat when omitted
        prompt: Vec<String>,
    },

    /// Run one prompt against several models and compare them
    Bench {
        /// Model to benchmark (repeatable)
        #[arg(short, long = "model")]
        models: Vec<String>,

        /// Benchmark prompt
        #[arg(short, long)]
        prompt: Option<String>,

        /// Pause between models in milliseconds
        #[arg(long, default_value_t = 2000)]
        pause_ms: u64,
    },

    /// Weather agent whose model, language and verbosity are set per call
    Dynamic {
        /// Prompt; runs the built-in scenarios when omitted
        prompt: Vec<String>,

        #[command(flatten)]
        options: CallArgs,
    },
}

/// Per-call options of `dynamic`
#[derive(Debug, Args)]
pub struct CallArgs {
    /// Model for this call (defaults to the agent's model)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Sampling temperature, 0 to 2
    #[arg(short, long, default_value_t = DEFAULT_TEMPERATURE, value_parser = parse_temperature)]
    pub temperature: f32,

    /// Response language
    #[arg(short, long, value_enum, default_value_t = Language::En)]
    pub language: Language,

    /// Offer the translate tool
    #[arg(long)]
    pub translate: bool,

    /// Response length
    #[arg(long, value_enum, default_value_t = Verbosity::Normal)]
    pub verbosity: Verbosity,
}

impl From<CallArgs> for CallOptions {
    fn from(args: CallArgs) -> Self {
        Self {
            model: args.model,
            temperature: args.temperature,
            language: args.language,
            enable_translation: args.translate,
            verbosity: args.verbosity,
        }
    }
}
