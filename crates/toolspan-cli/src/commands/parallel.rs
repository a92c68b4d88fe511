//! `toolspan parallel` - several city tools called concurrently

use super::tools::{PARALLEL_DELAYS, city_tools};
use super::{
    PromptRunner, backend_settings, city_engine, run_with_args, shutdown_tracing, tracing_runtime,
};
use crate::cli::BackendKind;
use crate::output::{ParallelConsole, print_performance_summary, rule};
use async_trait::async_trait;
use toolspan_foundation::{TracedAgent, TracedAgentConfig, TracedAgentFactory};

const INSTRUCTIONS: &str = "You are a helpful assistant that can fetch information from \
multiple sources simultaneously. When asked about multiple things, use all relevant tools in \
parallel for efficiency.";

const WELCOME: &str = "🚀 Parallel Tool Calling Agent
============================================================
This agent can call multiple tools simultaneously!
Try asking about multiple cities to see parallel execution.

Example: \"Tell me about Tokyo, New York, and London\"

Type your message (Ctrl+C to exit):
";

struct ParallelDemo {
    agent: TracedAgent,
}

#[async_trait]
impl PromptRunner for ParallelDemo {
    async fn run_prompt(&mut self, prompt: &str) -> anyhow::Result<()> {
        println!("\n{}", rule());
        let summary = self.agent.run(prompt, &mut ParallelConsole).await?;
        if summary.report.tool_calls > 0 {
            print_performance_summary(&summary.report);
        }
        println!();
        Ok(())
    }
}

pub async fn run(backend: Option<BackendKind>, prompt: &[String]) -> anyhow::Result<()> {
    let settings = backend_settings()?;
    let runtime = tracing_runtime(backend.unwrap_or(BackendKind::Openlumix), &settings);
    let factory = TracedAgentFactory::new(runtime.clone(), city_engine());
    let agent = factory
        .create(
            file!(),
            TracedAgentConfig::new(INSTRUCTIONS).with_tools(city_tools(PARALLEL_DELAYS)),
        )
        .await;

    let outcome = run_with_args(&mut ParallelDemo { agent }, prompt, WELCOME).await;
    shutdown_tracing(&runtime).await;
    outcome
}
