//! 模型基准测试
//! Model benchmark runner
//!
//! Runs one prompt against several models, one after another, each through a
//! traced agent whose identifier (and so its backend project) is
//! `benchmark-<model>`.

use crate::agent::correlator::elapsed;
use crate::agent::factory::{TracedAgentConfig, TracedAgentFactory};
use crate::agent::run::{NoopObserver, RunObserver};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use toolspan_kernel::{TokenUsage, ToolSet};
use toolspan_monitoring::tracing::query::{
    BENCHMARK_PROJECT_PREFIX, ModelTraceMetrics, PhoenixMetricsClient,
};
use toolspan_monitoring::tracing::TracingRuntime;
use tracing::{info, warn};

/// Pause between two models
pub const DEFAULT_PAUSE: Duration = Duration::from_secs(2);

/// Wait after shutdown before reading metrics back
pub const DEFAULT_SETTLE: Duration = Duration::from_secs(2);

pub const DEFAULT_BENCHMARK_INSTRUCTIONS: &str = "You are a helpful assistant that can fetch \
information from multiple sources simultaneously. When asked about multiple things, use all \
relevant tools in parallel for efficiency.";

#[derive(Debug, Error)]
pub enum BenchError {
    #[error("no models to benchmark")]
    NoModels,

    #[error("benchmark prompt is empty")]
    EmptyPrompt,
}

/// Outcome of benchmarking one model
#[derive(Debug, Clone)]
pub struct BenchmarkResult {
    pub model_id: String,
    pub execution_time: Duration,
    pub token_usage: Option<TokenUsage>,
    pub trace_id: Option<String>,
    pub tool_calls: usize,
    pub sequential_tool_time: Duration,
    pub success: bool,
    pub error: Option<String>,
}

impl BenchmarkResult {
    pub fn execution_ms(&self) -> u128 {
        self.execution_time.as_millis()
    }

    pub fn total_tokens(&self) -> Option<u64> {
        self.token_usage.map(|u| u.total_tokens)
    }
}

/// Run observer with per-model hooks
pub trait BenchmarkObserver: RunObserver {
    fn on_model_started(&mut self, model: &str, index: usize, total: usize) {
        let _ = (model, index, total);
    }

    fn on_model_finished(&mut self, result: &BenchmarkResult) {
        let _ = result;
    }
}

impl BenchmarkObserver for NoopObserver {}

pub fn benchmark_agent_id(model: &str) -> String {
    format!("{BENCHMARK_PROJECT_PREFIX}{model}")
}

pub struct BenchmarkRunner {
    factory: Arc<TracedAgentFactory>,
    tools: ToolSet,
    instructions: String,
    pause: Duration,
}

impl BenchmarkRunner {
    pub fn new(factory: Arc<TracedAgentFactory>, tools: ToolSet) -> Self {
        Self {
            factory,
            tools,
            instructions: DEFAULT_BENCHMARK_INSTRUCTIONS.to_string(),
            pause: DEFAULT_PAUSE,
        }
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }

    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    /// Benchmark every model in order. A failing model is recorded and does
    /// not stop the remaining ones.
    pub async fn run<O: BenchmarkObserver>(
        &self,
        models: &[String],
        prompt: &str,
        observer: &mut O,
    ) -> Result<Vec<BenchmarkResult>, BenchError> {
        if models.is_empty() {
            return Err(BenchError::NoModels);
        }
        if prompt.trim().is_empty() {
            return Err(BenchError::EmptyPrompt);
        }

        let mut results = Vec::with_capacity(models.len());
        for (index, model) in models.iter().enumerate() {
            if index > 0 && !self.pause.is_zero() {
                tokio::time::sleep(self.pause).await;
            }
            observer.on_model_started(model, index, models.len());
            let result = self.run_model(model, prompt, &mut *observer).await;
            observer.on_model_finished(&result);
            results.push(result);
        }
        Ok(results)
    }

    /// Benchmark a single model
    pub async fn run_model(
        &self,
        model: &str,
        prompt: &str,
        observer: &mut dyn RunObserver,
    ) -> BenchmarkResult {
        let clock = self.factory.clock().clone();
        let started_at = clock.now();

        let config = TracedAgentConfig::new(self.instructions.clone())
            .with_agent_id(benchmark_agent_id(model))
            .with_model(model)
            .with_tools(self.tools.clone());
        let agent = self.factory.create(file!(), config).await;
        let outcome = agent.run(prompt, observer).await;
        let execution_time = elapsed(started_at, clock.now());

        match outcome {
            Ok(summary) => {
                info!(
                    model,
                    execution_ms = execution_time.as_millis() as u64,
                    tokens = summary.total_tokens(),
                    "Benchmark run finished"
                );
                BenchmarkResult {
                    model_id: model.to_string(),
                    execution_time,
                    token_usage: summary.usage,
                    trace_id: summary.trace_id,
                    tool_calls: summary.report.tool_calls,
                    sequential_tool_time: summary.report.sequential_time,
                    success: true,
                    error: None,
                }
            }
            Err(err) => {
                warn!(model, error = %err, "Benchmark run failed");
                BenchmarkResult {
                    model_id: model.to_string(),
                    execution_time,
                    token_usage: None,
                    trace_id: None,
                    tool_calls: 0,
                    sequential_tool_time: Duration::ZERO,
                    success: false,
                    error: Some(err.to_string()),
                }
            }
        }
    }
}

/// Shut tracing down so every span is delivered, give the backend time to
/// ingest, then read the per-model metrics back once.
pub async fn read_back(
    runtime: &TracingRuntime,
    client: &PhoenixMetricsClient,
    settle: Duration,
) -> Option<BTreeMap<String, ModelTraceMetrics>> {
    if let Err(err) = runtime.shutdown().await {
        warn!(backend = runtime.backend_name(), error = %err, "Tracing shutdown reported an error");
    }
    if !settle.is_zero() {
        tokio::time::sleep(settle).await;
    }
    client.model_metrics().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use futures::StreamExt;
    use toolspan_kernel::{
        AgentEngine, AgentError, AgentEvent, AgentResult, EventStream, RunRequest,
    };
    use toolspan_monitoring::tracing::{
        NoopSpanProcessor, TracerConfig, TracerProvider, TracingBackend, TracingResult,
    };

    struct QuietBackend;

    impl TracingBackend for QuietBackend {
        fn name(&self) -> &'static str {
            "quiet"
        }

        fn build_provider(&self, label: &str) -> TracingResult<TracerProvider> {
            Ok(TracerProvider::new(
                TracerConfig::new(label),
                Arc::new(NoopSpanProcessor),
            ))
        }
    }

    /// Fails for models named `broken`, answers otherwise
    struct PickyEngine;

    #[async_trait]
    impl AgentEngine for PickyEngine {
        async fn stream(&self, request: RunRequest) -> AgentResult<EventStream> {
            if request.settings.model == "broken" {
                return Err(AgentError::EngineUnavailable("model not served".into()));
            }
            Ok(futures::stream::iter(vec![
                AgentEvent::text("ok"),
                AgentEvent::finish(TokenUsage::new(3, 4)),
            ])
            .boxed())
        }
    }

    #[derive(Default)]
    struct Recorder {
        started: Vec<String>,
        finished: Vec<bool>,
    }

    impl RunObserver for Recorder {}

    impl BenchmarkObserver for Recorder {
        fn on_model_started(&mut self, model: &str, _index: usize, _total: usize) {
            self.started.push(model.to_string());
        }

        fn on_model_finished(&mut self, result: &BenchmarkResult) {
            self.finished.push(result.success);
        }
    }

    fn runner() -> (Arc<TracingRuntime>, BenchmarkRunner) {
        let runtime = Arc::new(TracingRuntime::new(QuietBackend));
        let factory = Arc::new(TracedAgentFactory::new(
            runtime.clone(),
            Arc::new(PickyEngine),
        ));
        (runtime, BenchmarkRunner::new(factory, ToolSet::new()))
    }

    #[tokio::test(start_paused = true)]
    async fn failures_are_recorded_and_do_not_stop_the_run() {
        let (runtime, runner) = runner();
        let models = vec!["gpt-5-nano".to_string(), "broken".to_string()];
        let mut recorder = Recorder::default();

        let results = runner.run(&models, "Tokyo?", &mut recorder).await.unwrap();

        assert_eq!(recorder.started, models);
        assert_eq!(recorder.finished, vec![true, false]);
        assert_eq!(results[0].total_tokens(), Some(7));
        assert!(results[0].trace_id.is_some());
        assert_eq!(
            results[1].error.as_deref(),
            Some("Agent engine unavailable: model not served")
        );
        // first agent's id labels the provider
        assert_eq!(
            runtime.provider().unwrap().service_name(),
            "benchmark-gpt-5-nano"
        );
    }

    #[tokio::test]
    async fn empty_inputs_are_rejected() {
        let (_, runner) = runner();
        assert!(matches!(
            runner.run(&[], "prompt", &mut NoopObserver).await,
            Err(BenchError::NoModels)
        ));
        assert!(matches!(
            runner.run(&["m".to_string()], " ", &mut NoopObserver).await,
            Err(BenchError::EmptyPrompt)
        ));
    }

    #[tokio::test]
    async fn read_back_without_backend_yields_none() {
        let (runtime, _) = runner();
        let client = PhoenixMetricsClient::new("http://127.0.0.1:9/graphql");
        assert!(read_back(&runtime, &client, Duration::ZERO).await.is_none());
    }
}
