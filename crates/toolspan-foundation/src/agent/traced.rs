//! 带追踪的 Agent
//! Traced agent
//!
//! Every `run` opens one `agent.run` span, correlates the tool events of the
//! engine stream into child spans and closes the run span exactly once, on
//! success as well as on failure.

use super::correlator::{ToolCallCorrelator, elapsed};
use super::run::{Clock, RunObserver, RunSummary};
use futures::StreamExt;
use std::sync::Arc;
use toolspan_kernel::{
    AgentEngine, AgentError, AgentEvent, AgentResult, AgentSettings, RunRequest, TokenUsage,
};
use toolspan_monitoring::tracing::attributes::{
    AGENT_DURATION_MS, AGENT_RUN_SPAN, AGENT_TOOL_CALLS_COUNT, MODEL_ID, PROMPT, RESOURCE_NAME,
    RESPONSE_TEXT, SETTINGS_TEMPERATURE, TELEMETRY_FUNCTION_ID, USAGE_INPUT_TOKENS,
    USAGE_OUTPUT_TOKENS, USAGE_TOTAL_TOKENS,
};
use toolspan_monitoring::tracing::{Span, SpanKind, Tracer, TracingHandle};
use tracing::{debug, error, info};

/// Text and usage collected from one turn
#[derive(Debug, Default)]
struct Turn {
    text: String,
    usage: Option<TokenUsage>,
}

/// An agent whose runs are traced
pub struct TracedAgent {
    agent_id: String,
    settings: AgentSettings,
    engine: Arc<dyn AgentEngine>,
    tracing: TracingHandle,
    tracer: Arc<Tracer>,
    clock: Arc<dyn Clock>,
}

impl TracedAgent {
    pub(crate) fn new(
        agent_id: String,
        settings: AgentSettings,
        engine: Arc<dyn AgentEngine>,
        tracing: TracingHandle,
        tracer: Arc<Tracer>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            agent_id,
            settings,
            engine,
            tracing,
            tracer,
            clock,
        }
    }

    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    pub fn settings(&self) -> &AgentSettings {
        &self.settings
    }

    pub fn tracing(&self) -> &TracingHandle {
        &self.tracing
    }

    pub fn tracer(&self) -> &Arc<Tracer> {
        &self.tracer
    }

    /// Start the engine without tracing; the caller consumes the raw events
    pub async fn stream(&self, prompt: &str) -> AgentResult<toolspan_kernel::EventStream> {
        self.engine
            .stream(RunRequest::new(self.settings.clone(), prompt))
            .await
    }

    fn run_span(
        &self,
        settings: &AgentSettings,
        prompt: &str,
        started_at: chrono::DateTime<chrono::Utc>,
    ) -> Span {
        let mut builder = self
            .tracer
            .span_builder(AGENT_RUN_SPAN)
            .with_kind(SpanKind::Internal)
            .with_attribute(RESOURCE_NAME, self.agent_id.clone())
            .with_attribute(MODEL_ID, settings.model.clone())
            .with_attribute(PROMPT, prompt)
            .with_start_time(started_at);
        if let Some(temperature) = settings.temperature {
            builder = builder.with_attribute(SETTINGS_TEMPERATURE, f64::from(temperature));
        }
        if settings.telemetry.is_enabled {
            if let Some(function_id) = &settings.telemetry.function_id {
                builder = builder.with_attribute(TELEMETRY_FUNCTION_ID, function_id);
            }
        }
        self.tracer.build(builder)
    }

    /// 执行一次提示并追踪
    /// Execute one prompt with tracing
    pub async fn run(
        &self,
        prompt: &str,
        observer: &mut dyn RunObserver,
    ) -> AgentResult<RunSummary> {
        self.run_with(prompt, |settings| settings, observer).await
    }

    /// 以本次调用的设置执行
    /// Execute one prompt with settings derived for this call only.
    ///
    /// `prepare` receives a copy of the agent's settings. Telemetry stays
    /// owned by the agent, so whatever `prepare` does to it is discarded.
    pub async fn run_with<F>(
        &self,
        prompt: &str,
        prepare: F,
        observer: &mut dyn RunObserver,
    ) -> AgentResult<RunSummary>
    where
        F: FnOnce(AgentSettings) -> AgentSettings,
    {
        let mut settings = prepare(self.settings.clone());
        settings.telemetry = self.settings.telemetry.clone();

        let started_at = self.clock.now();
        let span = self.run_span(&settings, prompt, started_at);
        let span_context = span.span_context().await;
        let mut correlator = ToolCallCorrelator::new(self.tracer.clone(), span_context.clone());

        info!(agent = %self.agent_id, model = %settings.model, "Agent run started");
        let request = RunRequest::new(settings.clone(), prompt);
        let outcome = self.drive(request, &mut correlator, observer).await;

        let ended_at = self.clock.now();
        let duration = elapsed(started_at, ended_at);
        span.set_attribute(AGENT_DURATION_MS, duration.as_millis() as i64)
            .await;
        span.set_attribute(AGENT_TOOL_CALLS_COUNT, correlator.len())
            .await;

        match outcome {
            Ok(turn) => {
                if correlator.open_count() > 0 {
                    let open = correlator
                        .abandon_open(ended_at, "run finished before the tool call resolved")
                        .await;
                    debug!(agent = %self.agent_id, open, "Closed unresolved tool calls");
                }
                if let Some(usage) = turn.usage {
                    span.set_attribute(USAGE_INPUT_TOKENS, usage.input_tokens).await;
                    span.set_attribute(USAGE_OUTPUT_TOKENS, usage.output_tokens).await;
                    span.set_attribute(USAGE_TOTAL_TOKENS, usage.total_tokens).await;
                }
                if !turn.text.is_empty() {
                    span.set_attribute(RESPONSE_TEXT, turn.text.clone()).await;
                }
                span.set_ok().await;
                self.tracer.end_span_at(&span, ended_at).await;

                let report = correlator.report(duration);
                info!(
                    agent = %self.agent_id,
                    duration_ms = duration.as_millis() as u64,
                    tool_calls = report.tool_calls,
                    "Agent run finished"
                );
                Ok(RunSummary {
                    agent_id: self.agent_id.clone(),
                    model: settings.model.clone(),
                    temperature: settings.temperature,
                    trace_id: self
                        .tracer
                        .is_recording()
                        .then(|| span_context.trace_id.to_hex()),
                    text: turn.text,
                    usage: turn.usage,
                    tool_calls: correlator.completed(),
                    report,
                    started_at,
                    duration,
                })
            }
            Err(err) => {
                let message = err.to_string();
                let abandoned = correlator.abandon_open(ended_at, &message).await;
                span.record_exception(err.kind(), &message).await;
                self.tracer.end_span_at(&span, ended_at).await;

                error!(
                    agent = %self.agent_id,
                    error = %message,
                    abandoned,
                    "Agent run failed"
                );
                Err(err)
            }
        }
    }

    async fn drive(
        &self,
        request: RunRequest,
        correlator: &mut ToolCallCorrelator,
        observer: &mut dyn RunObserver,
    ) -> AgentResult<Turn> {
        let mut events = self.engine.stream(request).await?;
        let mut turn = Turn::default();

        while let Some(event) = events.next().await {
            let at = self.clock.now();
            observer.on_event(&event);

            match event {
                AgentEvent::ToolCall {
                    call_id,
                    tool_name,
                    input,
                } => {
                    correlator
                        .on_invoked(&call_id, &tool_name, &input, at)
                        .await;
                }
                AgentEvent::ToolResult {
                    call_id,
                    output,
                    preliminary: true,
                } => {
                    correlator.on_progress(&call_id, &output, at).await;
                }
                AgentEvent::ToolResult {
                    call_id,
                    output,
                    preliminary: false,
                } => {
                    if let Some(call) = correlator.on_resolved(&call_id, &output, at).await {
                        observer.on_tool_completed(&call);
                    }
                }
                AgentEvent::ToolError { call_id, error } => {
                    if let Some(call) = correlator.on_failed(&call_id, &error, at).await {
                        observer.on_tool_completed(&call);
                    }
                }
                AgentEvent::TextDelta { text } => turn.text.push_str(&text),
                AgentEvent::Finish { usage } => {
                    turn.usage = Some(usage);
                    break;
                }
                AgentEvent::Error { message } => {
                    return Err(AgentError::ExecutionFailed(message));
                }
            }
        }

        Ok(turn)
    }
}

impl std::fmt::Debug for TracedAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TracedAgent")
            .field("agent_id", &self.agent_id)
            .field("model", &self.settings.model)
            .field("tracing_active", &self.tracing.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::factory::{DEFAULT_MODEL, TracedAgentConfig, TracedAgentFactory};
    use crate::agent::run::NoopObserver;
    use async_trait::async_trait;
    use serde_json::json;
    use toolspan_kernel::EventStream;
    use toolspan_monitoring::tracing::{
        NoopSpanProcessor, TracerConfig, TracerProvider, TracingBackend, TracingResult,
        TracingRuntime,
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

    struct FixedEngine(Vec<AgentEvent>);

    #[async_trait]
    impl AgentEngine for FixedEngine {
        async fn stream(&self, _request: RunRequest) -> AgentResult<EventStream> {
            Ok(futures::stream::iter(self.0.clone()).boxed())
        }
    }

    async fn agent(events: Vec<AgentEvent>) -> TracedAgent {
        let factory = TracedAgentFactory::new(
            Arc::new(TracingRuntime::new(QuietBackend)),
            Arc::new(FixedEngine(events)),
        );
        factory
            .create(file!(), TracedAgentConfig::new("be helpful"))
            .await
    }

    #[tokio::test]
    async fn factory_enables_telemetry_and_defaults_model() {
        let agent = agent(Vec::new()).await;
        assert_eq!(agent.agent_id(), "traced");
        assert_eq!(agent.settings().model, DEFAULT_MODEL);
        assert!(agent.settings().telemetry.is_enabled);
        assert_eq!(agent.settings().telemetry.function_id.as_deref(), Some("traced"));
        assert!(agent.tracing().is_active());
    }

    #[tokio::test]
    async fn run_collects_text_usage_and_tool_calls() {
        let agent = agent(vec![
            AgentEvent::tool_call("1", "getWeather", json!({"city": "Paris"})),
            AgentEvent::tool_result("1", json!({"temperature": 18})),
            AgentEvent::text("Paris is "),
            AgentEvent::text("mild."),
            AgentEvent::finish(TokenUsage::new(10, 5)),
            AgentEvent::text("ignored after finish"),
        ])
        .await;

        let summary = agent.run("weather in Paris?", &mut NoopObserver).await.unwrap();
        assert_eq!(summary.text, "Paris is mild.");
        assert_eq!(summary.total_tokens(), 15);
        assert_eq!(summary.tool_calls.len(), 1);
        assert_eq!(summary.tool_calls[0].tool_name, "getWeather");
        assert!(summary.trace_id.is_some());
    }

    #[tokio::test]
    async fn error_event_fails_the_run() {
        let agent = agent(vec![
            AgentEvent::tool_call("1", "getWeather", json!({})),
            AgentEvent::error("model overloaded"),
        ])
        .await;

        let err = agent.run("hi", &mut NoopObserver).await.unwrap_err();
        assert!(matches!(err, AgentError::ExecutionFailed(ref m) if m == "model overloaded"));
    }
}
