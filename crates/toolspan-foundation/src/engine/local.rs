//! 本地工具循环引擎
//! Local tool-loop engine
//!
//! A deterministic stand-in for a model-backed agent runtime. It plans the
//! tool calls with a [`ToolPlanner`], runs them concurrently and streams the
//! resulting events in completion order:
//!
//! 1. "think" for the model latency, then emit every `ToolCall`
//! 2. run all tools at once; progress and final results are emitted as they
//!    happen
//! 3. "think" again for half the latency, stream the answer word by word
//! 4. `Finish` with an estimated token usage

use super::planner::{PlannedCall, ToolPlanner};
use async_trait::async_trait;
use futures::StreamExt;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_stream::wrappers::UnboundedReceiverStream;
use toolspan_kernel::{
    AgentEngine, AgentError, AgentEvent, AgentResult, EventStream, RunRequest, TokenUsage,
    ToolProgress,
};
use tracing::{debug, warn};
use uuid::Uuid;

/// Latency used for models without an explicit entry
pub const DEFAULT_MODEL_LATENCY: Duration = Duration::from_millis(300);

pub struct LocalToolLoop {
    planner: Arc<dyn ToolPlanner>,
    model_latency: HashMap<String, Duration>,
    default_latency: Duration,
}

impl LocalToolLoop {
    pub fn new(planner: Arc<dyn ToolPlanner>) -> Self {
        Self {
            planner,
            model_latency: HashMap::new(),
            default_latency: DEFAULT_MODEL_LATENCY,
        }
    }

    pub fn with_default_latency(mut self, latency: Duration) -> Self {
        self.default_latency = latency;
        self
    }

    pub fn with_model_latency(mut self, model: impl Into<String>, latency: Duration) -> Self {
        self.model_latency.insert(model.into(), latency);
        self
    }

    pub fn latency_for(&self, model: &str) -> Duration {
        self.model_latency
            .get(model)
            .copied()
            .unwrap_or(self.default_latency)
    }
}

impl std::fmt::Debug for LocalToolLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalToolLoop")
            .field("model_latency", &self.model_latency)
            .field("default_latency", &self.default_latency)
            .finish()
    }
}

#[async_trait]
impl AgentEngine for LocalToolLoop {
    async fn stream(&self, request: RunRequest) -> AgentResult<EventStream> {
        if request.prompt.trim().is_empty() {
            return Err(AgentError::InvalidInput("prompt is empty".to_string()));
        }

        let plan = self.planner.plan(&request.prompt, &request.settings.tools);
        if let Some(missing) = plan
            .iter()
            .find(|call| request.settings.tools.get(&call.tool_name).is_none())
        {
            return Err(AgentError::ToolNotFound(missing.tool_name.clone()));
        }

        let latency = self.latency_for(&request.settings.model);
        debug!(
            model = %request.settings.model,
            planned = plan.len(),
            latency_ms = latency.as_millis() as u64,
            "Local tool loop started"
        );

        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(drive(self.planner.clone(), request, plan, latency, tx));
        Ok(UnboundedReceiverStream::new(rx).boxed())
    }
}

async fn drive(
    planner: Arc<dyn ToolPlanner>,
    request: RunRequest,
    plan: Vec<PlannedCall>,
    latency: Duration,
    tx: mpsc::UnboundedSender<AgentEvent>,
) {
    tokio::time::sleep(latency).await;

    let mut tasks = JoinSet::new();
    for (index, call) in plan.iter().enumerate() {
        let Some(tool) = request.settings.tools.get(&call.tool_name) else {
            continue;
        };
        let call_id = format!("call_{}", Uuid::new_v4().simple());
        let event = AgentEvent::tool_call(&call_id, &call.tool_name, call.input.clone());
        if tx.send(event).is_err() {
            return;
        }

        let progress = ToolProgress::new(call_id.clone(), tx.clone());
        let input = call.input.clone();
        let tool_name = call.tool_name.clone();
        let tx = tx.clone();
        tasks.spawn(async move {
            // the answer still mentions a failed tool
            let output = match tool.execute(input, progress).await {
                Ok(output) => {
                    let _ = tx.send(AgentEvent::tool_result(call_id, output.clone()));
                    output
                }
                Err(err) => {
                    warn!(tool = %tool_name, call_id = %call_id, error = %err, "Tool failed");
                    let _ = tx.send(AgentEvent::tool_error(call_id, err.to_string()));
                    json!({ "error": err.to_string() })
                }
            };
            (index, output)
        });
    }

    let mut finished: Vec<(usize, Value)> = Vec::with_capacity(plan.len());
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(result) => finished.push(result),
            Err(err) => {
                let _ = tx.send(AgentEvent::error(format!("tool task aborted: {err}")));
                return;
            }
        }
    }
    finished.sort_by_key(|(index, _)| *index);
    let results: Vec<(PlannedCall, Value)> = finished
        .into_iter()
        .map(|(index, output)| (plan[index].clone(), output))
        .collect();

    if !results.is_empty() {
        tokio::time::sleep(latency / 2).await;
    }

    let text = planner.respond(&request.prompt, &results);
    for word in text.split_inclusive(' ') {
        if tx.send(AgentEvent::text(word)).is_err() {
            return;
        }
    }

    let input_tokens = estimate_tokens(&request.settings.instructions)
        + estimate_tokens(&request.prompt)
        + results
            .iter()
            .map(|(_, output)| estimate_tokens(&output.to_string()))
            .sum::<u64>();
    let usage = TokenUsage::new(input_tokens, estimate_tokens(&text));
    let _ = tx.send(AgentEvent::finish(usage));
}

/// Rough token count: one token per four characters, rounded up
pub fn estimate_tokens(text: &str) -> u64 {
    (text.chars().count() as u64).div_ceil(4)
}
