//! CLI command implementations

pub mod bench;
pub mod dynamic;
pub mod parallel;
pub mod streaming;
pub mod tools;

use crate::cli::BackendKind;
use async_trait::async_trait;
use colored::Colorize;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use toolspan_foundation::{EntityPlanner, LocalToolLoop};
use toolspan_kernel::config::BackendSettings;
use toolspan_monitoring::tracing::{
    ConsoleBackend, OpenLumixBackend, PhoenixBackend, TracingRuntime,
};
use tracing::{info, warn};

/// Something that answers one prompt at a time
#[async_trait]
pub trait PromptRunner: Send {
    async fn run_prompt(&mut self, prompt: &str) -> anyhow::Result<()>;
}

/// Backend settings from the environment
pub fn backend_settings() -> anyhow::Result<BackendSettings> {
    BackendSettings::from_env().map_err(|report| anyhow::anyhow!("{report:?}"))
}

/// Tracing runtime for the selected backend
pub fn tracing_runtime(kind: BackendKind, settings: &BackendSettings) -> Arc<TracingRuntime> {
    let runtime = match kind {
        BackendKind::Openlumix => {
            TracingRuntime::new(OpenLumixBackend::new(settings.openlumix.clone()))
        }
        BackendKind::Phoenix => {
            TracingRuntime::new(PhoenixBackend::new(settings.phoenix.clone()))
        }
        BackendKind::Console => TracingRuntime::new(ConsoleBackend::new()),
    };
    info!(backend = runtime.backend_name(), "Tracing runtime configured");
    Arc::new(runtime)
}

/// Local engine planning over the demo cities
pub fn city_engine() -> Arc<LocalToolLoop> {
    Arc::new(
        LocalToolLoop::new(Arc::new(EntityPlanner::cities()))
            .with_model_latency("gpt-5-nano", Duration::from_millis(600))
            .with_model_latency("gpt-4.1-nano", Duration::from_millis(250))
            .with_model_latency("gpt-4o", Duration::from_millis(400)),
    )
}

/// Flush and close tracing; a failed flush is logged, not fatal
pub async fn shutdown_tracing(runtime: &TracingRuntime) {
    if let Err(err) = runtime.shutdown().await {
        warn!(backend = runtime.backend_name(), error = %err, "Tracing shutdown failed");
    }
}

/// Run the joined prompt words once, or chat when there are none
pub async fn run_with_args(
    runner: &mut dyn PromptRunner,
    prompt: &[String],
    welcome: &str,
) -> anyhow::Result<()> {
    if prompt.is_empty() {
        chat_loop(runner, welcome).await
    } else {
        runner.run_prompt(&prompt.join(" ")).await
    }
}

/// Read prompts from stdin until EOF or Ctrl-C. Failed prompts are reported
/// and the loop continues.
pub async fn chat_loop(runner: &mut dyn PromptRunner, welcome: &str) -> anyhow::Result<()> {
    println!("{welcome}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("{} ", ">".green().bold());
        std::io::stdout().flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
        };
        let Some(line) = line else {
            break;
        };

        let prompt = line.trim();
        if prompt.is_empty() {
            continue;
        }
        if let Err(err) = runner.run_prompt(prompt).await {
            eprintln!("{} {err:#}", "Error:".red().bold());
        }
    }

    Ok(())
}
