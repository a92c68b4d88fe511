//! Agent contracts
//!
//! The agent runtime itself is external. This module only fixes the shape of
//! what flows between it and the tracing layer: the settings it is started
//! with, the tools it may call, and the events it emits.

pub mod engine;
pub mod error;
pub mod event;
pub mod settings;
pub mod tool;

pub use engine::{AgentEngine, RunRequest};
pub use error::{AgentError, AgentResult};
pub use event::{AgentEvent, EventStream};
pub use settings::{AgentSettings, TelemetrySettings};
pub use tool::{Tool, ToolError, ToolProgress, ToolResult, ToolSet};
