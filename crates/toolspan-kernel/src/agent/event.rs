//! Agent lifecycle events
//!
//! A run is observed as a stream of [`AgentEvent`]s. Tool calls the runtime
//! executes concurrently show up interleaved: a `ToolCall` always precedes the
//! `ToolResult` or `ToolError` with the same `call_id`, but results of
//! different calls may arrive in any order.

use crate::usage::TokenUsage;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Stream of events produced by one agent run
pub type EventStream = BoxStream<'static, AgentEvent>;

/// Closed set of events emitted by an agent runtime
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum AgentEvent {
    /// The runtime invoked a tool
    #[serde(rename_all = "camelCase")]
    ToolCall {
        call_id: String,
        tool_name: String,
        input: Value,
    },

    /// A tool produced output. Preliminary outputs are progress updates of a
    /// streaming tool; the call is resolved by the first non-preliminary one.
    #[serde(rename_all = "camelCase")]
    ToolResult {
        call_id: String,
        output: Value,
        #[serde(default)]
        preliminary: bool,
    },

    /// A tool failed; the call resolves without output and the run goes on
    #[serde(rename_all = "camelCase")]
    ToolError { call_id: String, error: String },

    /// Incremental model text
    TextDelta { text: String },

    /// The turn finished
    Finish { usage: TokenUsage },

    /// The run failed
    Error { message: String },
}

impl AgentEvent {
    pub fn tool_call(
        call_id: impl Into<String>,
        tool_name: impl Into<String>,
        input: Value,
    ) -> Self {
        AgentEvent::ToolCall {
            call_id: call_id.into(),
            tool_name: tool_name.into(),
            input,
        }
    }

    pub fn tool_result(call_id: impl Into<String>, output: Value) -> Self {
        AgentEvent::ToolResult {
            call_id: call_id.into(),
            output,
            preliminary: false,
        }
    }

    pub fn tool_progress(call_id: impl Into<String>, output: Value) -> Self {
        AgentEvent::ToolResult {
            call_id: call_id.into(),
            output,
            preliminary: true,
        }
    }

    pub fn tool_error(call_id: impl Into<String>, error: impl Into<String>) -> Self {
        AgentEvent::ToolError {
            call_id: call_id.into(),
            error: error.into(),
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        AgentEvent::TextDelta { text: text.into() }
    }

    pub fn finish(usage: TokenUsage) -> Self {
        AgentEvent::Finish { usage }
    }

    pub fn error(message: impl Into<String>) -> Self {
        AgentEvent::Error {
            message: message.into(),
        }
    }

    /// Call id carried by tool events
    pub fn call_id(&self) -> Option<&str> {
        match self {
            AgentEvent::ToolCall { call_id, .. }
            | AgentEvent::ToolResult { call_id, .. }
            | AgentEvent::ToolError { call_id, .. } => Some(call_id),
            AgentEvent::TextDelta { .. } | AgentEvent::Finish { .. } | AgentEvent::Error { .. } => {
                None
            }
        }
    }

    /// Whether this event ends the run
    pub fn is_terminal(&self) -> bool {
        matches!(self, AgentEvent::Finish { .. } | AgentEvent::Error { .. })
    }
}
