//! Output formatting module
//!
//! Console observers for agent runs and tables for benchmark results.

pub mod console;
pub mod table;

pub use console::{
    BenchConsole, DynamicConsole, ParallelConsole, StreamingConsole, print_performance_summary,
    rule,
};
pub use table::{metrics_table, results_table, summary_lines};
