//! toolspan CLI - traced parallel tool calling demos and model benchmarks

mod cli;
mod commands;
mod output;

use clap::Parser;
use cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging; RUST_LOG takes precedence over -v
    let level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run_command_async(cli))
}

async fn run_command_async(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Parallel { prompt } => {
            commands::parallel::run(cli.backend, &prompt).await?;
        }

        Commands::Streaming { prompt } => {
            commands::streaming::run(cli.backend, &prompt).await?;
        }

        Commands::Bench {
            models,
            prompt,
            pause_ms,
        } => {
            commands::bench::run(cli.backend, models, prompt, pause_ms).await?;
        }

        Commands::Dynamic { prompt, options } => {
            commands::dynamic::run(cli.backend, &prompt, options.into()).await?;
        }
    }

    Ok(())
}
