//! toolspan kernel
//!
//! Contracts shared by every toolspan crate:
//! - the closed set of [`AgentEvent`](agent::AgentEvent)s an agent runtime emits
//! - the [`AgentEngine`](agent::AgentEngine) and [`Tool`](agent::Tool) seams
//! - agent settings and telemetry annotations
//! - backend configuration read from the process environment

// agent module
pub mod agent;

// config module
pub mod config;

// error module
pub mod error;

// usage module
pub mod usage;

pub use agent::{
    AgentEngine, AgentError, AgentEvent, AgentResult, AgentSettings, EventStream, RunRequest,
    TelemetrySettings, Tool, ToolError, ToolProgress, ToolResult, ToolSet,
};
pub use error::{KernelError, KernelResult};
pub use usage::TokenUsage;
