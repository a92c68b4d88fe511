//! Comparison across benchmark results

use super::runner::BenchmarkResult;
use std::time::Duration;

/// Execution time of one model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelTiming {
    pub model_id: String,
    pub execution_time: Duration,
}

impl From<&BenchmarkResult> for ModelTiming {
    fn from(result: &BenchmarkResult) -> Self {
        Self {
            model_id: result.model_id.clone(),
            execution_time: result.execution_time,
        }
    }
}

/// Fastest/slowest comparison. Only produced with at least two successful
/// runs; failed runs never take part.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub comparison: Option<Comparison>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub fastest: ModelTiming,
    pub slowest: ModelTiming,
    /// `(slowest - fastest) / slowest * 100`
    pub speed_difference_percent: f64,
}

impl BenchmarkSummary {
    pub fn from_results(results: &[BenchmarkResult]) -> Self {
        let successes: Vec<&BenchmarkResult> = results.iter().filter(|r| r.success).collect();
        let failed = results.len() - successes.len();

        let comparison = (successes.len() > 1)
            .then(|| {
                // ties: the earlier run is fastest, the later one slowest
                let fastest = successes
                    .iter()
                    .copied()
                    .reduce(|a, b| if b.execution_time < a.execution_time { b } else { a })?;
                let slowest = successes
                    .iter()
                    .copied()
                    .reduce(|a, b| if a.execution_time > b.execution_time { a } else { b })?;
                Some(Comparison {
                    fastest: fastest.into(),
                    slowest: slowest.into(),
                    speed_difference_percent: speed_difference(
                        fastest.execution_time,
                        slowest.execution_time,
                    ),
                })
            })
            .flatten();

        Self {
            succeeded: successes.len(),
            failed,
            comparison,
        }
    }
}

/// `(slow - fast) / slow * 100`; zero when the slow run took no time
pub fn speed_difference(fast: Duration, slow: Duration) -> f64 {
    let slow = slow.as_secs_f64();
    if slow == 0.0 {
        return 0.0;
    }
    (slow - fast.as_secs_f64()) / slow * 100.0
}
