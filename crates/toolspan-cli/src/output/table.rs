//! Table formatting for benchmark output

use comfy_table::{Cell, Color, ContentArrangement, Table};
use std::collections::BTreeMap;
use toolspan_foundation::bench::{BenchmarkResult, BenchmarkSummary};
use toolspan_monitoring::tracing::ModelTraceMetrics;

/// One row per model: time, tokens, tool calls, status
pub fn results_table(results: &[BenchmarkResult]) -> Table {
    let mut table = Table::new();
    table
        .set_header(vec!["Model", "Time (ms)", "Tokens", "Tool calls", "Status"])
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(100);

    for result in results {
        let tokens = result
            .total_tokens()
            .map(|t| t.to_string())
            .unwrap_or_else(|| "N/A".to_string());
        let status = if result.success {
            Cell::new("✓ Success").fg(Color::Green)
        } else {
            Cell::new("✗ Failed").fg(Color::Red)
        };
        table.add_row(vec![
            Cell::new(&result.model_id),
            Cell::new(result.execution_ms()),
            Cell::new(tokens),
            Cell::new(result.tool_calls),
            status,
        ]);
    }
    table
}

/// Fastest/slowest lines, empty without a comparison
pub fn summary_lines(summary: &BenchmarkSummary) -> Vec<String> {
    let Some(comparison) = &summary.comparison else {
        return Vec::new();
    };
    vec![
        format!(
            "🏆 Fastest: {} ({}ms)",
            comparison.fastest.model_id,
            comparison.fastest.execution_time.as_millis()
        ),
        format!(
            "🐌 Slowest: {} ({}ms)",
            comparison.slowest.model_id,
            comparison.slowest.execution_time.as_millis()
        ),
        format!(
            "⚡ Speed difference: {:.1}% faster",
            comparison.speed_difference_percent
        ),
    ]
}

/// Per-model aggregates read back from the backend
pub fn metrics_table(metrics: &BTreeMap<String, ModelTraceMetrics>) -> Table {
    let mut table = Table::new();
    table
        .set_header(vec![
            "Model",
            "Spans",
            "Avg latency (ms)",
            "Min / Max (ms)",
            "Tokens",
        ])
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(100);

    for (model, m) in metrics {
        table.add_row(vec![
            model.clone(),
            m.span_count.to_string(),
            format!("{:.2}", m.avg_latency_ms),
            format!("{} / {}", m.min_latency_ms, m.max_latency_ms),
            m.total_tokens.to_string(),
        ]);
    }
    table
}
