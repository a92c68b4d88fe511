//! toolspan Foundation - traced agents, tool-call correlation and benchmarks
//!
//! - [`agent`]: traced-agent factory, run span lifecycle, tool-call span
//!   correlator and the parallelism report
//! - [`engine`]: local tool-loop engine for demos and tests
//! - [`bench`]: model benchmark runner

// agent module
pub mod agent;

// bench module
pub mod bench;

// engine module
pub mod engine;

pub use agent::{
    CompletedToolCall, DynamicAgent, ParallelismReport, PrepareCall, RunObserver, RunSummary,
    ToolCallCorrelator, TracedAgent, TracedAgentConfig, TracedAgentFactory,
};
pub use bench::{BenchmarkResult, BenchmarkRunner, BenchmarkSummary};
pub use engine::{EntityPlanner, LocalToolLoop, ToolPlanner};
