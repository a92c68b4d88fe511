//! Run observation: clock, observer hooks and the run summary

use super::correlator::CompletedToolCall;
use super::report::ParallelismReport;
use chrono::{DateTime, Utc};
use std::time::Duration;
use toolspan_kernel::{AgentEvent, TokenUsage};

/// Time source for span timestamps
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Hooks called while a run is driven.
///
/// `on_event` sees every event before it is correlated; `on_tool_completed`
/// fires once per resolved call.
pub trait RunObserver: Send {
    fn on_event(&mut self, event: &AgentEvent) {
        let _ = event;
    }

    fn on_tool_completed(&mut self, call: &CompletedToolCall) {
        let _ = call;
    }
}

/// Observer that ignores everything
#[derive(Debug, Default)]
pub struct NoopObserver;

impl RunObserver for NoopObserver {}

/// Outcome of one successful run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub agent_id: String,
    pub model: String,
    pub temperature: Option<f32>,
    /// Hex trace id of the run span; `None` when tracing is unavailable
    pub trace_id: Option<String>,
    pub text: String,
    pub usage: Option<TokenUsage>,
    pub tool_calls: Vec<CompletedToolCall>,
    pub report: ParallelismReport,
    pub started_at: DateTime<Utc>,
    pub duration: Duration,
}

impl RunSummary {
    pub fn total_tokens(&self) -> u64 {
        self.usage.map(|u| u.total_tokens).unwrap_or(0)
    }
}
