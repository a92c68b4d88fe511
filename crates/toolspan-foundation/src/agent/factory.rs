//! Traced-agent factory
//!
//! Builds [`TracedAgent`]s bound to a shared [`TracingRuntime`]: the first
//! agent initializes tracing, later ones reuse the same provider.

use super::run::{Clock, SystemClock};
use super::traced::TracedAgent;
use std::path::Path;
use std::sync::Arc;
use toolspan_kernel::{AgentEngine, AgentSettings, TelemetrySettings, ToolSet};
use toolspan_monitoring::tracing::TracingRuntime;
use tracing::debug;

/// Model used when the configuration names none
pub const DEFAULT_MODEL: &str = "gpt-5-nano";

/// Identifier used when neither an agent id nor a usable caller is given
pub const FALLBACK_AGENT_ID: &str = "agent";

/// Agent configuration accepted by the factory
#[derive(Debug, Clone, Default)]
pub struct TracedAgentConfig {
    pub agent_id: Option<String>,
    pub model: Option<String>,
    pub instructions: String,
    pub tools: ToolSet,
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
}

impl TracedAgentConfig {
    pub fn new(instructions: impl Into<String>) -> Self {
        Self {
            instructions: instructions.into(),
            ..Default::default()
        }
    }

    pub fn with_agent_id(mut self, agent_id: impl Into<String>) -> Self {
        self.agent_id = Some(agent_id.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_tools(mut self, tools: ToolSet) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = Some(max_output_tokens);
        self
    }
}

/// File stem of a caller identity such as `file!()` or a `file://` URL
pub fn caller_stem(caller_identity: &str) -> Option<String> {
    let path = caller_identity
        .strip_prefix("file://")
        .unwrap_or(caller_identity);
    Path::new(path)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

pub struct TracedAgentFactory {
    tracing: Arc<TracingRuntime>,
    engine: Arc<dyn AgentEngine>,
    clock: Arc<dyn Clock>,
}

impl TracedAgentFactory {
    pub fn new(tracing: Arc<TracingRuntime>, engine: Arc<dyn AgentEngine>) -> Self {
        Self {
            tracing,
            engine,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn tracing(&self) -> &Arc<TracingRuntime> {
        &self.tracing
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Resolve the agent identifier: explicit id, else the caller's file stem
    pub fn resolve_agent_id(caller_identity: &str, config: &TracedAgentConfig) -> String {
        config
            .agent_id
            .clone()
            .filter(|id| !id.is_empty())
            .or_else(|| caller_stem(caller_identity))
            .unwrap_or_else(|| FALLBACK_AGENT_ID.to_string())
    }

    /// 创建带追踪的 Agent
    /// Create a traced agent.
    ///
    /// Initializes tracing with the agent identifier as label (idempotent) and
    /// enables telemetry attributed to that identifier.
    pub async fn create(&self, caller_identity: &str, config: TracedAgentConfig) -> TracedAgent {
        let agent_id = Self::resolve_agent_id(caller_identity, &config);
        let handle = self.tracing.init(&agent_id);
        let tracer = handle.tracer(&agent_id).await;

        let settings = AgentSettings {
            instructions: config.instructions,
            model: config
                .model
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            tools: config.tools,
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
            telemetry: TelemetrySettings::enabled(&agent_id),
        };

        debug!(
            agent = %agent_id,
            model = %settings.model,
            tools = settings.tools.len(),
            tracing_active = handle.is_active(),
            "Traced agent created"
        );
        TracedAgent::new(
            agent_id,
            settings,
            self.engine.clone(),
            handle,
            tracer,
            self.clock.clone(),
        )
    }
}
