//! Console rendering of agent runs

use colored::Colorize;
use std::io::Write;
use toolspan_foundation::agent::{CompletedToolCall, ParallelismReport, RunObserver};
use toolspan_foundation::bench::{BenchmarkObserver, BenchmarkResult};
use toolspan_kernel::{AgentEvent, AgentSettings};

pub fn rule() -> String {
    "─".repeat(60)
}

fn flush() {
    let _ = std::io::stdout().flush();
}

/// Prints tool starts and completions with their durations
#[derive(Debug, Default)]
pub struct ParallelConsole;

impl RunObserver for ParallelConsole {
    fn on_event(&mut self, event: &AgentEvent) {
        match event {
            AgentEvent::ToolCall {
                tool_name, input, ..
            } => {
                println!("\n🔧 [{}] Starting...", tool_name.cyan());
                println!("   Input: {input}");
            }
            // completions are printed once correlated
            AgentEvent::ToolResult { .. } | AgentEvent::ToolError { .. } => {}
            AgentEvent::TextDelta { text } => {
                print!("{text}");
                flush();
            }
            AgentEvent::Finish { .. } => println!("\n\n{}", "✓ Response complete".green()),
            AgentEvent::Error { message } => eprintln!("\n{} {message}", "❌ Error:".red()),
        }
    }

    fn on_tool_completed(&mut self, call: &CompletedToolCall) {
        match &call.error {
            None => {
                println!(
                    "✅ [{}] Completed in {}ms",
                    call.tool_name.cyan(),
                    call.duration.as_millis()
                );
                println!("   Output: {}", call.output);
            }
            Some(error) => {
                println!(
                    "❌ [{}] Failed after {}ms",
                    call.tool_name.cyan(),
                    call.duration.as_millis()
                );
                println!("   Error: {}", error.red());
            }
        }
    }
}

/// Prints preliminary tool outputs as progress lines
#[derive(Debug, Default)]
pub struct StreamingConsole;

impl RunObserver for StreamingConsole {
    fn on_event(&mut self, event: &AgentEvent) {
        match event {
            AgentEvent::ToolCall {
                tool_name, input, ..
            } => {
                println!("\n[🔧 Calling tool: {}]", tool_name.cyan());
                println!("[📝 Input: {input}]");
            }
            AgentEvent::ToolResult {
                output,
                preliminary: true,
                ..
            } => println!("[⏳ Progress: {output}]"),
            AgentEvent::ToolResult { output, .. } => {
                let pretty = serde_json::to_string_pretty(output).unwrap_or_default();
                println!("[✅ Final Result: {pretty}]\n");
            }
            AgentEvent::ToolError { error, .. } => println!("[❌ Tool failed: {error}]\n"),
            AgentEvent::TextDelta { text } => {
                print!("{text}");
                flush();
            }
            AgentEvent::Finish { .. } => println!("\n[{}]", "✓ Done".green()),
            AgentEvent::Error { message } => eprintln!("[❌ Error: {message}]"),
        }
    }
}

/// Streams the answer and closes each run with its model, temperature and
/// token count
#[derive(Debug)]
pub struct DynamicConsole {
    model: String,
    temperature: Option<f32>,
}

impl DynamicConsole {
    pub fn new(settings: &AgentSettings) -> Self {
        Self {
            model: settings.model.clone(),
            temperature: settings.temperature,
        }
    }

    pub fn step_lines(&self, total_tokens: u64) -> Vec<String> {
        let temperature = self
            .temperature
            .map_or_else(|| "default".to_string(), |t| t.to_string());
        vec![
            "--- Step Finished ---".to_string(),
            format!("Model: {}", self.model),
            format!("Temperature: {temperature}"),
            format!("Tokens used: {total_tokens}"),
        ]
    }
}

impl RunObserver for DynamicConsole {
    fn on_event(&mut self, event: &AgentEvent) {
        match event {
            AgentEvent::ToolCall { tool_name, .. } => {
                println!("[🔧 {}]", tool_name.cyan());
            }
            AgentEvent::ToolError { error, .. } => println!("[❌ Tool failed: {error}]"),
            AgentEvent::TextDelta { text } => {
                print!("{text}");
                flush();
            }
            AgentEvent::Finish { usage } => {
                println!();
                for line in self.step_lines(usage.total_tokens) {
                    println!("{}", line.dimmed());
                }
            }
            AgentEvent::Error { message } => eprintln!("[❌ Error: {message}]"),
            AgentEvent::ToolResult { .. } => {}
        }
    }
}

/// Prints a dot per text delta and a short line per model
#[derive(Debug, Default)]
pub struct BenchConsole;

impl RunObserver for BenchConsole {
    fn on_event(&mut self, event: &AgentEvent) {
        if let AgentEvent::TextDelta { .. } = event {
            print!(".");
            flush();
        }
    }
}

impl BenchmarkObserver for BenchConsole {
    fn on_model_started(&mut self, model: &str, _index: usize, _total: usize) {
        println!("\n🔬 Testing {}...", model.bold());
        print!("   Progress: ");
        flush();
    }

    fn on_model_finished(&mut self, result: &BenchmarkResult) {
        println!(" ✓");
        if result.success {
            println!("   ⏱️  Execution time: {}ms", result.execution_ms());
            if let Some(usage) = result.token_usage {
                println!(
                    "   🪙  Tokens: {} (in: {}, out: {})",
                    usage.total_tokens, usage.input_tokens, usage.output_tokens
                );
            }
        } else {
            println!(
                "   {} {}",
                "❌ Error:".red(),
                result.error.as_deref().unwrap_or("unknown")
            );
        }
    }
}

/// Lines of the performance summary printed after a parallel run
pub fn performance_lines(report: &ParallelismReport) -> Vec<String> {
    let mut lines = vec![
        format!("✨ Tools called in parallel: {}", report.tool_calls),
        format!(
            "⚡ Actual execution time: {}ms",
            report.actual_time.as_millis()
        ),
        format!(
            "🐌 Sequential would take: {}ms",
            report.sequential_time.as_millis()
        ),
    ];
    let saved = format!("🚀 Time saved: {}ms", report.time_saved.as_millis());
    match (report.faster_percent, report.speedup_percent) {
        (Some(faster), Some(speedup)) => {
            lines.push(format!("{saved} ({faster}% faster, {speedup}% speedup)"))
        }
        (Some(faster), None) => lines.push(format!("{saved} ({faster}% faster)")),
        _ => lines.push(saved),
    }
    lines
}

pub fn print_performance_summary(report: &ParallelismReport) {
    println!("\n{}", rule());
    println!("📊 Performance Summary:");
    println!("{}", rule());
    for line in performance_lines(report) {
        println!("{line}");
    }
}
