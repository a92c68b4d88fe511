//! `toolspan bench` - compare models on one multi-city prompt

use super::tools::{BENCH_DELAYS, city_tools};
use super::{backend_settings, city_engine, shutdown_tracing, tracing_runtime};
use crate::cli::BackendKind;
use crate::output::{BenchConsole, metrics_table, results_table, rule, summary_lines};
use colored::Colorize;
use std::sync::Arc;
use std::time::Duration;
use toolspan_foundation::TracedAgentFactory;
use toolspan_foundation::bench::{BenchmarkRunner, BenchmarkSummary, DEFAULT_SETTLE, read_back};
use toolspan_monitoring::tracing::{PhoenixBackend, PhoenixMetricsClient};

pub const DEFAULT_MODELS: [&str; 2] = ["gpt-5-nano", "gpt-4.1-nano"];

pub const DEFAULT_PROMPT: &str =
    "Tell me about Tokyo, Paris, and London - their weather, population, timezone, and currency.";

pub async fn run(
    backend: Option<BackendKind>,
    models: Vec<String>,
    prompt: Option<String>,
    pause_ms: u64,
) -> anyhow::Result<()> {
    let models = if models.is_empty() {
        DEFAULT_MODELS.iter().map(|m| m.to_string()).collect()
    } else {
        models
    };
    let prompt = prompt.unwrap_or_else(|| DEFAULT_PROMPT.to_string());

    let settings = backend_settings()?;
    let phoenix = &settings.phoenix;
    let runtime = tracing_runtime(backend.unwrap_or(BackendKind::Phoenix), &settings);

    print_header(&models);

    let factory = Arc::new(TracedAgentFactory::new(runtime.clone(), city_engine()));
    let runner = BenchmarkRunner::new(factory, city_tools(BENCH_DELAYS))
        .with_pause(Duration::from_millis(pause_ms));
    let results = runner.run(&models, &prompt, &mut BenchConsole).await?;

    println!("\n{}", rule());
    println!("\n📊 BENCHMARK RESULTS\n");
    println!("{}", results_table(&results));
    let summary = BenchmarkSummary::from_results(&results);
    for line in summary_lines(&summary) {
        println!("{line}");
    }

    println!("\n{}", rule());
    if runtime.backend_name() == PhoenixBackend::NAME {
        println!("\n🔍 Fetching Phoenix metrics...\n");
        let client = PhoenixMetricsClient::new(phoenix.graphql_endpoint());
        match read_back(&runtime, &client, DEFAULT_SETTLE).await {
            Some(metrics) if !metrics.is_empty() => {
                println!("📈 Phoenix Trace Analysis:\n");
                println!("{}", metrics_table(&metrics));
            }
            _ => {
                println!("{}", "⚠️  Could not fetch Phoenix metrics".yellow());
                println!(
                    "   Make sure Phoenix is running at http://localhost:{}",
                    phoenix.ui_port
                );
            }
        }
    } else {
        shutdown_tracing(&runtime).await;
    }

    println!("\n{}", rule());
    println!("\n✅ Benchmark complete!");
    if runtime.backend_name() == PhoenixBackend::NAME {
        println!("\n📊 View detailed traces: {}\n", phoenix.projects_url());
    }
    Ok(())
}

fn print_header(models: &[String]) {
    println!("{}", "MODEL BENCHMARK - Parallel Tool Calling".bold());
    println!();
    println!("Test Scenario: Multi-city information retrieval");
    println!("Tools: getWeather, getPopulation, getTimeZone, getCurrency");
    println!("Expected: All tools called in parallel for each city");
    println!();
    println!("Models under test:");
    for (i, model) in models.iter().enumerate() {
        println!("  {}. {model}", i + 1);
    }
    println!();
    println!("{}", rule());
}
