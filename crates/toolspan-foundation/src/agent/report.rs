//! Parallelism report of one run

use serde::Serialize;
use std::time::Duration;

/// How much concurrent tool execution saved compared with running the same
/// calls one after another.
///
/// `speedup_percent` and `faster_percent` are independent views of the same
/// numbers and are only present when the calls overlapped
/// (`sequential_time > actual_time`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParallelismReport {
    pub tool_calls: usize,
    pub actual_time: Duration,
    pub sequential_time: Duration,
    pub time_saved: Duration,
    /// `round(sequential / actual * 100) - 100`
    pub speedup_percent: Option<i64>,
    /// `round((1 - actual / sequential) * 100)`
    pub faster_percent: Option<i64>,
}

impl ParallelismReport {
    pub fn new(tool_calls: usize, sequential_time: Duration, actual_time: Duration) -> Self {
        let time_saved = sequential_time.saturating_sub(actual_time);
        let overlapped = sequential_time > actual_time;

        let sequential = sequential_time.as_secs_f64();
        let actual = actual_time.as_secs_f64();

        let speedup_percent = (overlapped && actual > 0.0)
            .then(|| (sequential / actual * 100.0).round() as i64 - 100);
        let faster_percent =
            overlapped.then(|| ((1.0 - actual / sequential) * 100.0).round() as i64);

        Self {
            tool_calls,
            actual_time,
            sequential_time,
            time_saved,
            speedup_percent,
            faster_percent,
        }
    }

    pub fn is_parallel(&self) -> bool {
        self.sequential_time > self.actual_time
    }
}
