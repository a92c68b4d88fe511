//! Agent settings handed to the runtime

use super::tool::ToolSet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Telemetry annotation carried by an agent.
///
/// When enabled, every run of the agent is attributed to `function_id` in
/// the tracing backend (`ai.telemetry.functionId`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetrySettings {
    pub is_enabled: bool,
    pub function_id: Option<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl TelemetrySettings {
    pub fn enabled(function_id: impl Into<String>) -> Self {
        Self {
            is_enabled: true,
            function_id: Some(function_id.into()),
            metadata: BTreeMap::new(),
        }
    }
}

/// Configuration of one agent
#[derive(Debug, Clone, Default)]
pub struct AgentSettings {
    pub instructions: String,
    pub model: String,
    pub tools: ToolSet,
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
    pub telemetry: TelemetrySettings,
}

impl AgentSettings {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
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

    pub fn with_telemetry(mut self, telemetry: TelemetrySettings) -> Self {
        self.telemetry = telemetry;
        self
    }
}
