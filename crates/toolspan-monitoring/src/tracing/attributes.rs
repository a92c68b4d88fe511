//! Span names and attribute keys used by traced agents.
//!
//! The `ai.*` keys follow the AI SDK telemetry namespace so backends that
//! understand it (Phoenix, OpenLumix) render model, usage and function id.

pub const AGENT_RUN_SPAN: &str = "agent.run";
pub const TOOL_SPAN_PREFIX: &str = "tool.";
pub const TOOL_PROGRESS_EVENT: &str = "tool.progress";

pub const TELEMETRY_FUNCTION_ID: &str = "ai.telemetry.functionId";
pub const RESOURCE_NAME: &str = "resource.name";
pub const MODEL_ID: &str = "ai.model.id";
pub const PROMPT: &str = "ai.prompt";
pub const RESPONSE_TEXT: &str = "ai.response.text";
pub const SETTINGS_TEMPERATURE: &str = "ai.settings.temperature";
pub const USAGE_INPUT_TOKENS: &str = "ai.usage.promptTokens";
pub const USAGE_OUTPUT_TOKENS: &str = "ai.usage.completionTokens";
pub const USAGE_TOTAL_TOKENS: &str = "ai.usage.totalTokens";

pub const AGENT_DURATION_MS: &str = "agent.duration_ms";
pub const AGENT_TOOL_CALLS_COUNT: &str = "agent.tool_calls_count";

pub const TOOL_NAME: &str = "tool.name";
pub const TOOL_INPUT: &str = "tool.input";
pub const TOOL_OUTPUT: &str = "tool.output";
pub const TOOL_CALL_ID: &str = "tool.call_id";
pub const TOOL_DURATION_MS: &str = "tool.duration_ms";
pub const TOOL_ERROR: &str = "tool.error";

/// `tool.<name>`
pub fn tool_span_name(tool_name: &str) -> String {
    format!("{TOOL_SPAN_PREFIX}{tool_name}")
}
