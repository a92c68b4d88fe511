//! Local agent engine
//!
//! A deterministic [`AgentEngine`](toolspan_kernel::AgentEngine) used by the
//! demos and tests in place of a model-backed runtime.

pub mod local;
pub mod planner;

pub use local::{DEFAULT_MODEL_LATENCY, LocalToolLoop, estimate_tokens};
pub use planner::{EntityPlanner, PlannedCall, ToolPlanner};
