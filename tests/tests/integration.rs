use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use toolspan_foundation::agent::{
    DynamicAgent, NoopObserver, RunObserver, TracedAgentConfig, TracedAgentFactory,
};
use toolspan_foundation::bench::{BenchmarkRunner, BenchmarkSummary};
use toolspan_foundation::engine::{EntityPlanner, LocalToolLoop};
use toolspan_kernel::{AgentError, AgentEvent, AgentSettings, TokenUsage, Tool, ToolSet};
use toolspan_monitoring::tracing::attributes::{
    AGENT_DURATION_MS, AGENT_RUN_SPAN, AGENT_TOOL_CALLS_COUNT, MODEL_ID, SETTINGS_TEMPERATURE,
    TELEMETRY_FUNCTION_ID,
    TOOL_DURATION_MS, TOOL_INPUT, TOOL_NAME, TOOL_OUTPUT, TOOL_PROGRESS_EVENT,
    TOOL_SPAN_PREFIX, USAGE_TOTAL_TOKENS,
};
use toolspan_monitoring::tracing::{SpanAttribute, SpanData, SpanStatus, TracingRuntime};
use toolspan_testing::{ManualClock, MockTool, RecordingBackend, ScriptedEngine, Step};

struct Harness {
    clock: Arc<ManualClock>,
    backend: RecordingBackend,
    runtime: Arc<TracingRuntime>,
}

impl Harness {
    fn new() -> Self {
        let backend = RecordingBackend::new();
        Self {
            clock: Arc::new(ManualClock::epoch()),
            runtime: Arc::new(TracingRuntime::new(backend.clone())),
            backend,
        }
    }

    fn factory(&self, steps: Vec<Step>) -> TracedAgentFactory {
        let engine = ScriptedEngine::new(self.clock.clone(), steps);
        TracedAgentFactory::new(self.runtime.clone(), Arc::new(engine))
            .with_clock(self.clock.clone())
    }

    fn tool_spans(&self) -> Vec<SpanData> {
        self.backend.exporter().with_prefix(TOOL_SPAN_PREFIX)
    }

    fn run_span(&self) -> SpanData {
        let mut runs = self.backend.exporter().named(AGENT_RUN_SPAN);
        assert_eq!(runs.len(), 1, "expected exactly one run span");
        runs.remove(0)
    }
}

fn int(span: &SpanData, key: &str) -> Option<i64> {
    span.attribute(key).and_then(SpanAttribute::as_i64)
}

fn text(span: &SpanData, key: &str) -> Option<String> {
    span.attribute(key)
        .and_then(SpanAttribute::as_str)
        .map(str::to_string)
}

fn call(id: &str, tool: &str) -> Step {
    AgentEvent::tool_call(id, tool, json!({"city": "Tokyo"})).into()
}

fn result(id: &str, output: Value) -> Step {
    AgentEvent::tool_result(id, output).into()
}

#[tokio::test]
async fn three_overlapping_calls_report_parallel_savings() {
    let harness = Harness::new();
    let factory = harness.factory(vec![
        call("a", "getWeather"),
        call("b", "getPopulation"),
        call("c", "getTimeZone"),
        Step::advance_ms(800),
        result("a", json!({"temperature": 21})),
        Step::advance_ms(100),
        result("b", json!({"population": 13_960_000})),
        Step::advance_ms(100),
        result("c", json!({"timezone": "Asia/Tokyo"})),
        AgentEvent::text("Tokyo is warm.").into(),
        AgentEvent::finish(TokenUsage::new(100, 20)).into(),
    ]);
    let agent = factory
        .create("src/agent-parallel-tools.rs", TracedAgentConfig::new("help"))
        .await;

    let summary = agent.run("Tell me about Tokyo", &mut NoopObserver).await.unwrap();

    assert_eq!(summary.report.tool_calls, 3);
    assert_eq!(summary.report.actual_time, Duration::from_millis(1000));
    assert_eq!(summary.report.sequential_time, Duration::from_millis(2700));
    assert_eq!(summary.report.time_saved, Duration::from_millis(1700));
    assert_eq!(summary.report.speedup_percent, Some(170));
    assert_eq!(summary.report.faster_percent, Some(63));

    let run = harness.run_span();
    assert_eq!(run.status, SpanStatus::Ok);
    assert_eq!(run.duration_ms(), Some(1000));
    assert_eq!(int(&run, AGENT_DURATION_MS), Some(1000));
    assert_eq!(int(&run, AGENT_TOOL_CALLS_COUNT), Some(3));
    assert_eq!(int(&run, USAGE_TOTAL_TOKENS), Some(120));
    assert_eq!(text(&run, MODEL_ID).as_deref(), Some("gpt-5-nano"));
    assert_eq!(
        text(&run, TELEMETRY_FUNCTION_ID).as_deref(),
        Some("agent-parallel-tools")
    );
    assert_eq!(summary.trace_id, Some(run.span_context.trace_id.to_hex()));

    let mut tools = harness.tool_spans();
    tools.sort_by_key(|s| s.duration_ms());
    let names: Vec<&str> = tools.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["tool.getWeather", "tool.getPopulation", "tool.getTimeZone"]
    );
    let durations: Vec<Option<i64>> = tools.iter().map(SpanData::duration_ms).collect();
    assert_eq!(durations, vec![Some(800), Some(900), Some(1000)]);

    for span in &tools {
        assert_eq!(span.status, SpanStatus::Ok);
        assert_eq!(span.span_context.trace_id, run.span_context.trace_id);
        assert_eq!(
            span.parent_span_context.as_ref().map(|p| p.span_id),
            Some(run.span_context.span_id)
        );
        assert_eq!(text(span, TOOL_INPUT).as_deref(), Some(r#"{"city":"Tokyo"}"#));
        assert_eq!(int(span, TOOL_DURATION_MS), span.duration_ms());
    }
    assert_eq!(text(&tools[0], TOOL_NAME).as_deref(), Some("getWeather"));
    assert_eq!(
        text(&tools[1], TOOL_OUTPUT).as_deref(),
        Some(r#"{"population":13960000}"#)
    );
}

#[tokio::test]
async fn unknown_completion_is_ignored() {
    let harness = Harness::new();
    let factory = harness.factory(vec![
        call("a", "getWeather"),
        call("b", "getCurrency"),
        Step::advance_ms(300),
        result("ghost", json!("boo")),
        result("a", json!("sunny")),
        Step::advance_ms(200),
        result("b", json!("JPY")),
        result("a", json!("late duplicate")),
        AgentEvent::finish(TokenUsage::default()).into(),
    ]);
    let agent = factory.create(file!(), TracedAgentConfig::new("help")).await;

    let summary = agent.run("Tokyo", &mut NoopObserver).await.unwrap();

    assert_eq!(summary.tool_calls.len(), 2);
    assert_eq!(summary.tool_calls[0].output, r#""sunny""#);
    assert_eq!(summary.tool_calls[0].duration, Duration::from_millis(300));
    assert_eq!(summary.tool_calls[1].duration, Duration::from_millis(500));
    assert_eq!(summary.report.sequential_time, Duration::from_millis(800));
    assert_eq!(summary.report.time_saved, Duration::from_millis(300));

    let tools = harness.tool_spans();
    assert_eq!(tools.len(), 2);
    assert!(tools.iter().all(|s| s.status == SpanStatus::Ok));
}

#[tokio::test]
async fn error_event_closes_every_span_with_error() {
    let harness = Harness::new();
    let factory = harness.factory(vec![
        call("a", "getWeather"),
        call("b", "getPopulation"),
        Step::advance_ms(400),
        result("a", json!({"temperature": 19})),
        Step::advance_ms(100),
        AgentEvent::error("rate limited").into(),
        result("b", json!("never seen")),
    ]);
    let agent = factory.create(file!(), TracedAgentConfig::new("help")).await;

    let err = agent.run("Tokyo", &mut NoopObserver).await.unwrap_err();
    assert!(matches!(err, AgentError::ExecutionFailed(ref m) if m == "rate limited"));

    let run = harness.run_span();
    assert!(run.status.is_error());
    assert_eq!(run.duration_ms(), Some(500));
    let exception = run
        .events
        .iter()
        .find(|e| e.name == "exception")
        .expect("exception event");
    assert_eq!(
        exception
            .attributes
            .get("exception.type")
            .and_then(SpanAttribute::as_str),
        Some("ExecutionFailed")
    );
    assert_eq!(int(&run, AGENT_TOOL_CALLS_COUNT), Some(2));

    let tools = harness.tool_spans();
    assert_eq!(tools.len(), 2);
    let open = tools
        .iter()
        .find(|s| s.name == "tool.getPopulation")
        .expect("abandoned span exported");
    assert!(open.status.is_error());
    assert_eq!(open.duration_ms(), Some(500));
}

#[tokio::test]
async fn failed_tool_marks_its_span_but_not_the_run() {
    let harness = Harness::new();
    let factory = harness.factory(vec![
        call("a", "getWeather"),
        call("b", "getCurrency"),
        Step::advance_ms(200),
        AgentEvent::tool_error("a", "upstream unavailable").into(),
        Step::advance_ms(100),
        result("b", json!({"currency": "JPY"})),
        AgentEvent::finish(TokenUsage::new(10, 5)).into(),
    ]);
    let agent = factory.create(file!(), TracedAgentConfig::new("help")).await;

    let summary = agent.run("Tokyo", &mut NoopObserver).await.unwrap();
    assert_eq!(summary.tool_calls.len(), 2);
    assert_eq!(
        summary.tool_calls[0].error.as_deref(),
        Some("upstream unavailable")
    );
    assert!(!summary.tool_calls[1].is_error());
    assert_eq!(summary.report.sequential_time, Duration::from_millis(500));

    assert_eq!(harness.run_span().status, SpanStatus::Ok);
    let tools = harness.tool_spans();
    let weather = tools
        .iter()
        .find(|s| s.name == "tool.getWeather")
        .expect("failed span exported");
    assert!(weather.status.is_error());
    assert_eq!(weather.duration_ms(), Some(200));
    assert_eq!(text(weather, TOOL_OUTPUT), None);
    let currency = tools
        .iter()
        .find(|s| s.name == "tool.getCurrency")
        .expect("currency span exported");
    assert_eq!(currency.status, SpanStatus::Ok);
}

#[tokio::test]
async fn engine_start_failure_still_closes_the_run_span() {
    let harness = Harness::new();
    let engine = ScriptedEngine::failing(harness.clock.clone(), "no API key");
    let factory = TracedAgentFactory::new(harness.runtime.clone(), Arc::new(engine))
        .with_clock(harness.clock.clone());
    let agent = factory.create(file!(), TracedAgentConfig::new("help")).await;

    let err = agent.run("Tokyo", &mut NoopObserver).await.unwrap_err();
    assert!(matches!(err, AgentError::EngineUnavailable(_)));

    let run = harness.run_span();
    assert!(run.status.is_error());
    assert!(run.end_time.is_some());
    assert!(harness.tool_spans().is_empty());
}

#[tokio::test]
async fn factories_sharing_a_runtime_share_one_provider() {
    let harness = Harness::new();
    let first = harness.factory(Vec::new());
    let second = harness.factory(Vec::new());

    let a = first
        .create(file!(), TracedAgentConfig::new("a").with_agent_id("weather"))
        .await;
    let b = second
        .create(file!(), TracedAgentConfig::new("b").with_agent_id("population"))
        .await;

    let provider = harness.runtime.provider().expect("initialized");
    assert!(Arc::ptr_eq(a.tracing().provider().unwrap(), &provider));
    assert!(Arc::ptr_eq(b.tracing().provider().unwrap(), &provider));
    assert_eq!(harness.backend.builds(), 1);
    // later labels are ignored
    assert_eq!(provider.service_name(), "weather");
    // telemetry still follows each agent's own id
    assert_eq!(
        b.settings().telemetry.function_id.as_deref(),
        Some("population")
    );
}

#[tokio::test]
async fn shutdown_is_safe_before_init_and_allows_reinit() {
    let harness = Harness::new();
    harness.runtime.shutdown().await.unwrap();
    assert_eq!(harness.backend.builds(), 0);
    assert!(!harness.runtime.is_initialized());

    harness.runtime.init("first");
    harness.runtime.shutdown().await.unwrap();
    assert!(!harness.runtime.is_initialized());
    assert_eq!(harness.backend.exporter().shutdowns(), 1);

    harness.runtime.init("second");
    assert_eq!(harness.backend.builds(), 2);
    assert_eq!(harness.runtime.provider().unwrap().service_name(), "second");
}

#[tokio::test]
async fn unavailable_backend_runs_without_spans() {
    let clock = Arc::new(ManualClock::epoch());
    let backend = RecordingBackend::unavailable("collector URL is not valid");
    let runtime = Arc::new(TracingRuntime::new(backend.clone()));
    let engine = ScriptedEngine::new(
        clock.clone(),
        vec![
            call("a", "getWeather"),
            Step::advance_ms(10),
            result("a", json!("ok")),
            AgentEvent::finish(TokenUsage::new(1, 1)).into(),
        ],
    );
    let agent = TracedAgentFactory::new(runtime.clone(), Arc::new(engine))
        .with_clock(clock)
        .create(file!(), TracedAgentConfig::new("help"))
        .await;

    assert!(!agent.tracing().is_active());
    let summary = agent.run("Tokyo", &mut NoopObserver).await.unwrap();
    assert_eq!(summary.tool_calls.len(), 1);
    assert!(summary.trace_id.is_none());
    assert!(backend.exporter().spans().is_empty());
    assert!(!runtime.is_initialized());
}

#[derive(Default)]
struct EventLog {
    progress: usize,
    completed: Vec<String>,
}

impl RunObserver for EventLog {
    fn on_event(&mut self, event: &AgentEvent) {
        if let AgentEvent::ToolResult {
            preliminary: true, ..
        } = event
        {
            self.progress += 1;
        }
    }

    fn on_tool_completed(&mut self, call: &toolspan_foundation::CompletedToolCall) {
        self.completed.push(call.tool_name.clone());
    }
}

#[tokio::test(start_paused = true)]
async fn streaming_progress_becomes_span_events() {
    let backend = RecordingBackend::new();
    let runtime = Arc::new(TracingRuntime::new(backend.clone()));
    let weather = MockTool::new("getWeather", "weather", json!({"type": "object"}))
        .with_delay(Duration::from_millis(2400));
    weather
        .set_progress(vec![
            json!({"status": "connecting"}),
            json!({"status": "fetching", "progress": 30}),
            json!({"status": "processing", "progress": 70}),
        ])
        .await;
    weather.set_result(Ok(json!({"status": "complete"}))).await;

    let engine = LocalToolLoop::new(Arc::new(EntityPlanner::cities()))
        .with_default_latency(Duration::from_millis(50));
    let factory = TracedAgentFactory::new(runtime, Arc::new(engine));
    let tools = ToolSet::new().with_tool(Arc::new(weather.clone()) as Arc<dyn Tool>);
    let agent = factory
        .create(
            file!(),
            TracedAgentConfig::new("weather only").with_tools(tools),
        )
        .await;

    let mut log = EventLog::default();
    let summary = agent.run("Weather in Sydney?", &mut log).await.unwrap();

    toolspan_testing::assert_tool_called!(weather, 1);
    assert_eq!(weather.history().await, vec![json!({"city": "Sydney"})]);
    assert_eq!(log.progress, 3);
    assert_eq!(log.completed, vec!["getWeather"]);
    assert_eq!(summary.tool_calls[0].output, r#"{"status":"complete"}"#);

    let spans = backend.exporter().named("tool.getWeather");
    assert_eq!(spans.len(), 1);
    let progress: Vec<Value> = spans[0]
        .events
        .iter()
        .filter(|e| e.name == TOOL_PROGRESS_EVENT)
        .filter_map(|e| e.attributes.get(TOOL_OUTPUT).and_then(SpanAttribute::as_str))
        .filter_map(|raw| serde_json::from_str(raw).ok())
        .collect();
    assert_eq!(
        progress,
        vec![
            json!({"status": "connecting"}),
            json!({"status": "fetching", "progress": 30}),
            json!({"status": "processing", "progress": 70}),
        ]
    );
    assert_eq!(spans[0].status, SpanStatus::Ok);
}

#[tokio::test]
async fn benchmark_run_spans_carry_their_own_model() {
    let harness = Harness::new();
    let factory = Arc::new(harness.factory(vec![
        call("a", "getWeather"),
        Step::advance_ms(700),
        result("a", json!("sunny")),
        Step::advance_ms(300),
        AgentEvent::finish(TokenUsage::new(40, 10)).into(),
    ]));
    let runner = BenchmarkRunner::new(factory, ToolSet::new()).with_pause(Duration::ZERO);
    let models = vec!["gpt-5-nano".to_string(), "gpt-4.1-nano".to_string()];

    let results = runner
        .run(&models, "Tokyo weather", &mut NoopObserver)
        .await
        .unwrap();

    assert_eq!(results.len(), 2);
    for result in &results {
        assert!(result.success);
        assert_eq!(result.execution_time, Duration::from_millis(1000));
        assert_eq!(result.total_tokens(), Some(50));
        assert_eq!(result.tool_calls, 1);
        assert_eq!(result.sequential_tool_time, Duration::from_millis(700));
        assert!(result.trace_id.is_some());
    }
    assert_ne!(results[0].trace_id, results[1].trace_id);

    let runs = harness.backend.exporter().named(AGENT_RUN_SPAN);
    let functions: Vec<Option<String>> = runs
        .iter()
        .map(|s| text(s, TELEMETRY_FUNCTION_ID))
        .collect();
    assert_eq!(
        functions,
        vec![
            Some("benchmark-gpt-5-nano".to_string()),
            Some("benchmark-gpt-4.1-nano".to_string())
        ]
    );
    let run_models: Vec<Option<String>> = runs.iter().map(|s| text(s, MODEL_ID)).collect();
    assert_eq!(
        run_models,
        vec![
            Some("gpt-5-nano".to_string()),
            Some("gpt-4.1-nano".to_string())
        ]
    );
    // one shared provider, so the project label stays that of the first model
    assert_eq!(harness.backend.builds(), 1);
    assert_eq!(
        harness.runtime.provider().map(|p| p.service_name().to_string()),
        Some("benchmark-gpt-5-nano".to_string())
    );

    let summary = BenchmarkSummary::from_results(&results);
    let comparison = summary.comparison.expect("two successes");
    assert_eq!(comparison.fastest.model_id, "gpt-5-nano");
    assert_eq!(comparison.speed_difference_percent, 0.0);
}

struct Verbosity {
    model: Option<&'static str>,
    temperature: f32,
    detailed: bool,
}

fn prepare_verbosity(options: &Verbosity, settings: AgentSettings) -> AgentSettings {
    let model = options.model.map_or(settings.model.clone(), str::to_string);
    let style = if options.detailed { "Explain in detail." } else { "Be brief." };
    let instructions = format!("{} {style}", settings.instructions);
    settings
        .with_model(model)
        .with_instructions(instructions)
        .with_temperature(options.temperature)
        .with_tools(ToolSet::new())
}

#[tokio::test]
async fn prepared_call_settings_reach_engine_and_span() {
    let harness = Harness::new();
    let engine = Arc::new(ScriptedEngine::new(
        harness.clock.clone(),
        vec![
            Step::advance_ms(50),
            AgentEvent::text("Sunny.").into(),
            AgentEvent::finish(TokenUsage::new(8, 2)).into(),
        ],
    ));
    let weather = MockTool::new("weather", "Weather lookup", json!({}));
    let tools = ToolSet::new().with_tool(Arc::new(weather));
    let agent = TracedAgentFactory::new(harness.runtime.clone(), engine.clone())
        .with_clock(harness.clock.clone())
        .create(
            "src/agent-dynamic-config.rs",
            TracedAgentConfig::new("You are a weather assistant.").with_tools(tools),
        )
        .await;
    let agent = DynamicAgent::new(agent, prepare_verbosity);

    let options = Verbosity {
        model: Some("gpt-4o"),
        temperature: 0.3,
        detailed: true,
    };
    let summary = agent.run("Weather in Paris?", &options, &mut NoopObserver).await.unwrap();
    assert_eq!(summary.model, "gpt-4o");
    assert_eq!(summary.temperature, Some(0.3));

    let requests = engine.requests();
    assert_eq!(requests.len(), 1);
    let sent = &requests[0].settings;
    assert_eq!(sent.model, "gpt-4o");
    assert_eq!(sent.instructions, "You are a weather assistant. Explain in detail.");
    assert!(sent.tools.is_empty());
    assert_eq!(sent.telemetry.function_id.as_deref(), Some("agent-dynamic-config"));

    let run = harness.run_span();
    assert_eq!(text(&run, MODEL_ID).as_deref(), Some("gpt-4o"));
    let temperature = run.attribute(SETTINGS_TEMPERATURE).and_then(SpanAttribute::as_f64);
    assert!(temperature.is_some_and(|t| (t - 0.3).abs() < 1e-6));

    // the agent's own settings are untouched
    assert_eq!(agent.agent().settings().model, "gpt-5-nano");
    assert_eq!(agent.agent().settings().tools.len(), 1);
}
