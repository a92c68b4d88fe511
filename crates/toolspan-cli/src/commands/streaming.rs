//! `toolspan streaming` - a tool that reports progress before its result

use super::tools::StreamingWeather;
use super::{
    PromptRunner, backend_settings, city_engine, run_with_args, shutdown_tracing, tracing_runtime,
};
use crate::cli::BackendKind;
use crate::output::StreamingConsole;
use async_trait::async_trait;
use std::sync::Arc;
use toolspan_foundation::{TracedAgent, TracedAgentConfig, TracedAgentFactory};
use toolspan_kernel::ToolSet;

const AGENT_ID: &str = "agent-streaming-tool";
const MODEL: &str = "gpt-4o";
const INSTRUCTIONS: &str = "You are a helpful assistant that can fetch weather data.";
const WELCOME: &str = "Streaming Tool Agent ready. Type your message (Ctrl+C to exit):\n";

struct StreamingDemo {
    agent: TracedAgent,
}

#[async_trait]
impl PromptRunner for StreamingDemo {
    async fn run_prompt(&mut self, prompt: &str) -> anyhow::Result<()> {
        self.agent.run(prompt, &mut StreamingConsole).await?;
        println!();
        Ok(())
    }
}

pub async fn run(backend: Option<BackendKind>, prompt: &[String]) -> anyhow::Result<()> {
    let settings = backend_settings()?;
    let runtime = tracing_runtime(backend.unwrap_or(BackendKind::Phoenix), &settings);
    let factory = TracedAgentFactory::new(runtime.clone(), city_engine());
    let config = TracedAgentConfig::new(INSTRUCTIONS)
        .with_agent_id(AGENT_ID)
        .with_model(MODEL)
        .with_tools(ToolSet::new().with_tool(Arc::new(StreamingWeather::default())));
    let agent = factory.create(file!(), config).await;

    let outcome = run_with_args(&mut StreamingDemo { agent }, prompt, WELCOME).await;
    shutdown_tracing(&runtime).await;
    outcome
}
