//! 工具调用 Span 关联器
//! Tool-call span correlator
//!
//! Matches each tool-call event of a run with its completion by call id and
//! turns the pair into one child span of the run span. Every call id moves
//! through `unseen -> invoked -> resolved` at most once, where a call resolves
//! either with an output or with a tool error. Completions for ids that were
//! never invoked, or that already resolved, are logged and ignored.
//!
//! Inputs and outputs are recorded as their JSON text, so a string input
//! `Tokyo` is stored as `"Tokyo"`.

use super::report::ParallelismReport;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use toolspan_monitoring::tracing::attributes::{
    TOOL_CALL_ID, TOOL_DURATION_MS, TOOL_ERROR, TOOL_INPUT, TOOL_NAME, TOOL_OUTPUT,
    TOOL_PROGRESS_EVENT, tool_span_name,
};
use toolspan_monitoring::tracing::{Span, SpanContext, SpanEvent, SpanKind, Tracer};
use tracing::{debug, warn};

/// 未完成的工具调用
/// A tool call that has been invoked
#[derive(Debug)]
pub struct PendingToolCall {
    pub call_id: String,
    pub tool_name: String,
    /// Serialized input
    pub input: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    /// Serialized final output
    pub output: Option<String>,
    /// Error message of a failed call
    pub error: Option<String>,
    span: Span,
}

impl PendingToolCall {
    pub fn is_resolved(&self) -> bool {
        self.ended_at.is_some()
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    fn completed(&self) -> Option<CompletedToolCall> {
        let ended_at = self.ended_at?;
        Some(CompletedToolCall {
            call_id: self.call_id.clone(),
            tool_name: self.tool_name.clone(),
            input: self.input.clone(),
            output: self.output.clone().unwrap_or_default(),
            error: self.error.clone(),
            started_at: self.started_at,
            ended_at,
            duration: elapsed(self.started_at, ended_at),
        })
    }
}

/// 已完成的工具调用
/// A resolved tool call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedToolCall {
    pub call_id: String,
    pub tool_name: String,
    pub input: String,
    /// Serialized output; empty for a failed call
    pub output: String,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub duration: Duration,
}

impl CompletedToolCall {
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Non-negative time between two instants
pub(crate) fn elapsed(from: DateTime<Utc>, to: DateTime<Utc>) -> Duration {
    (to - from).to_std().unwrap_or_default()
}

/// 工具调用关联器（每次运行一个）
/// How a call resolved
enum Resolution<'a> {
    Output(&'a Value),
    Failed(&'a str),
}

/// Tool-call correlator, one per run
pub struct ToolCallCorrelator {
    tracer: Arc<Tracer>,
    parent: SpanContext,
    calls: HashMap<String, PendingToolCall>,
    /// call ids in invocation order
    order: Vec<String>,
}

impl ToolCallCorrelator {
    pub fn new(tracer: Arc<Tracer>, parent: SpanContext) -> Self {
        Self {
            tracer,
            parent,
            calls: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// 工具被调用：打开子 Span
    /// A tool was invoked: open its child span.
    ///
    /// Returns false when the call id was already seen in this run.
    pub async fn on_invoked(
        &mut self,
        call_id: &str,
        tool_name: &str,
        input: &Value,
        at: DateTime<Utc>,
    ) -> bool {
        if self.calls.contains_key(call_id) {
            warn!(call_id, tool = tool_name, "Duplicate tool call id, ignoring");
            return false;
        }

        let input = input.to_string();
        let span = self.tracer.build(
            self.tracer
                .span_builder(tool_span_name(tool_name))
                .with_kind(SpanKind::Internal)
                .with_parent(self.parent.clone())
                .with_attribute(TOOL_NAME, tool_name)
                .with_attribute(TOOL_INPUT, input.clone())
                .with_attribute(TOOL_CALL_ID, call_id)
                .with_start_time(at),
        );

        debug!(call_id, tool = tool_name, "Tool call started");
        self.calls.insert(
            call_id.to_string(),
            PendingToolCall {
                call_id: call_id.to_string(),
                tool_name: tool_name.to_string(),
                input,
                started_at: at,
                ended_at: None,
                output: None,
                error: None,
                span,
            },
        );
        self.order.push(call_id.to_string());
        true
    }

    /// 预备结果：记录 span 事件，span 保持打开
    /// Preliminary result: record a span event; the span stays open
    pub async fn on_progress(&mut self, call_id: &str, output: &Value, at: DateTime<Utc>) -> bool {
        let Some(call) = self.calls.get(call_id) else {
            warn!(call_id, "Progress for unknown tool call, ignoring");
            return false;
        };
        if call.is_resolved() {
            debug!(call_id, "Progress after completion, ignoring");
            return false;
        }

        let event =
            SpanEvent::at(TOOL_PROGRESS_EVENT, at).with_attribute(TOOL_OUTPUT, output.to_string());
        call.span.add_event(event).await;
        true
    }

    /// 工具完成：关闭 Span
    /// A tool resolved: close its span.
    ///
    /// Unknown and already-resolved ids are ignored and yield `None`.
    pub async fn on_resolved(
        &mut self,
        call_id: &str,
        output: &Value,
        at: DateTime<Utc>,
    ) -> Option<CompletedToolCall> {
        self.resolve(call_id, Resolution::Output(output), at).await
    }

    /// 工具失败：以错误状态关闭 Span
    /// A tool failed: close its span with an error status.
    ///
    /// The call counts as resolved, so its time still adds to the sequential
    /// total. Unknown and already-resolved ids are ignored.
    pub async fn on_failed(
        &mut self,
        call_id: &str,
        error: &str,
        at: DateTime<Utc>,
    ) -> Option<CompletedToolCall> {
        self.resolve(call_id, Resolution::Failed(error), at).await
    }

    async fn resolve(
        &mut self,
        call_id: &str,
        resolution: Resolution<'_>,
        at: DateTime<Utc>,
    ) -> Option<CompletedToolCall> {
        let Some(call) = self.calls.get_mut(call_id) else {
            warn!(call_id, "Result for unknown tool call, ignoring");
            return None;
        };
        if call.is_resolved() {
            warn!(call_id, tool = %call.tool_name, "Tool call already resolved, ignoring");
            return None;
        }

        let duration = elapsed(call.started_at, at);
        call.span
            .set_attribute(TOOL_DURATION_MS, duration.as_millis() as i64)
            .await;

        match resolution {
            Resolution::Output(output) => {
                let output = output.to_string();
                call.span.set_attribute(TOOL_OUTPUT, output.clone()).await;
                call.span.set_ok().await;
                call.output = Some(output);
                debug!(
                    call_id,
                    tool = %call.tool_name,
                    duration_ms = duration.as_millis() as u64,
                    "Tool call completed"
                );
            }
            Resolution::Failed(error) => {
                call.span.set_attribute(TOOL_ERROR, error).await;
                call.span.record_exception("ToolExecutionFailed", error).await;
                call.error = Some(error.to_string());
                warn!(
                    call_id,
                    tool = %call.tool_name,
                    duration_ms = duration.as_millis() as u64,
                    error,
                    "Tool call failed"
                );
            }
        }
        self.tracer.end_span_at(&call.span, at).await;
        call.ended_at = Some(at);
        call.completed()
    }

    /// 关闭所有仍然打开的 Span（错误路径）
    /// Close every still-open span with an error status (error path).
    ///
    /// Returns how many spans were closed.
    pub async fn abandon_open(&mut self, at: DateTime<Utc>, reason: &str) -> usize {
        let mut closed = 0;
        for call_id in &self.order {
            let Some(call) = self.calls.get(call_id) else {
                continue;
            };
            if call.is_resolved() {
                continue;
            }
            call.span.set_error(reason).await;
            self.tracer.end_span_at(&call.span, at).await;
            warn!(call_id = %call_id, tool = %call.tool_name, reason, "Tool call abandoned");
            closed += 1;
        }
        closed
    }

    pub fn get(&self, call_id: &str) -> Option<&PendingToolCall> {
        self.calls.get(call_id)
    }

    /// 调用次数
    /// Number of invoked calls
    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    pub fn open_count(&self) -> usize {
        self.calls.values().filter(|c| !c.is_resolved()).count()
    }

    /// 已完成调用（按调用顺序）
    /// Resolved calls in invocation order
    pub fn completed(&self) -> Vec<CompletedToolCall> {
        self.order
            .iter()
            .filter_map(|id| self.calls.get(id))
            .filter_map(PendingToolCall::completed)
            .collect()
    }

    /// 顺序执行所需时间
    /// Sum of resolved call durations
    pub fn sequential_time(&self) -> Duration {
        self.calls
            .values()
            .filter_map(|c| c.ended_at.map(|end| elapsed(c.started_at, end)))
            .sum()
    }

    pub fn report(&self, actual_time: Duration) -> ParallelismReport {
        let resolved = self.calls.values().filter(|c| c.is_resolved()).count();
        ParallelismReport::new(resolved, self.sequential_time(), actual_time)
    }
}
