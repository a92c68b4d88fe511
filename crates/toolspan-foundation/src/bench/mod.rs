//! 基准测试模块
//! Benchmark module
//!
//! Runs one prompt against several models through traced agents and
//! compares the outcomes.

pub mod runner;
pub mod summary;

pub use runner::{
    BenchError, BenchmarkObserver, BenchmarkResult, BenchmarkRunner, DEFAULT_PAUSE,
    DEFAULT_SETTLE, benchmark_agent_id, read_back,
};
pub use summary::{BenchmarkSummary, Comparison, ModelTiming, speed_difference};
