//! 带追踪的 Agent 模块
//! Traced agent module
//!
//! - [`TracedAgentFactory`]: builds agents bound to a tracing runtime
//! - [`TracedAgent`]: runs a prompt inside an `agent.run` span
//! - [`DynamicAgent`]: derives the settings of each run from call options
//! - [`ToolCallCorrelator`]: turns tool events into child spans
//! - [`ParallelismReport`]: sequential vs. wall-clock tool time

pub mod call;
pub mod correlator;
pub mod factory;
pub mod report;
pub mod run;
pub mod traced;

pub use call::{DynamicAgent, PrepareCall};
pub use correlator::{CompletedToolCall, PendingToolCall, ToolCallCorrelator};
pub use factory::{DEFAULT_MODEL, TracedAgentConfig, TracedAgentFactory, caller_stem};
pub use report::ParallelismReport;
pub use run::{Clock, NoopObserver, RunObserver, RunSummary, SystemClock};
pub use traced::TracedAgent;
