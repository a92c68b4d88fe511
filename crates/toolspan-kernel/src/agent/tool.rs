//! 工具组件
//! Tool Component
//!
//! Callable tools handed to the agent runtime. A tool may stream preliminary
//! outputs through its [`ToolProgress`] before returning the final one.

use super::event::AgentEvent;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

/// Tool execution result
pub type ToolResult = Result<Value, ToolError>;

/// Tool execution errors
#[derive(Debug, Clone, Error)]
pub enum ToolError {
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("{0}")]
    Failed(String),
}

/// 统一工具 Trait
/// Unified Tool Trait
///
/// ```rust,ignore
/// struct Echo;
///
/// #[async_trait]
/// impl Tool for Echo {
///     fn name(&self) -> &str { "echo" }
///     fn description(&self) -> &str { "Echo the input back" }
///     fn parameters_schema(&self) -> Value { json!({"type": "object"}) }
///     async fn execute(&self, input: Value, _progress: ToolProgress) -> ToolResult {
///         Ok(input)
///     }
/// }
/// ```
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name (unique identifier)
    fn name(&self) -> &str;

    /// Tool description (for LLM understanding)
    fn description(&self) -> &str;

    /// Parameters JSON Schema
    fn parameters_schema(&self) -> Value;

    /// Execute the tool
    async fn execute(&self, input: Value, progress: ToolProgress) -> ToolResult;
}

/// Channel a running tool uses to publish preliminary outputs
#[derive(Clone)]
pub struct ToolProgress {
    call_id: String,
    sender: Option<mpsc::UnboundedSender<AgentEvent>>,
}

impl ToolProgress {
    pub fn new(call_id: impl Into<String>, sender: mpsc::UnboundedSender<AgentEvent>) -> Self {
        Self {
            call_id: call_id.into(),
            sender: Some(sender),
        }
    }

    /// Progress sink that drops every update
    pub fn detached(call_id: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            sender: None,
        }
    }

    pub fn call_id(&self) -> &str {
        &self.call_id
    }

    /// Publish a preliminary output. Returns false once the run has gone away.
    pub fn report(&self, output: Value) -> bool {
        match &self.sender {
            Some(sender) => sender
                .send(AgentEvent::tool_progress(self.call_id.clone(), output))
                .is_ok(),
            None => false,
        }
    }
}

impl fmt::Debug for ToolProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolProgress")
            .field("call_id", &self.call_id)
            .field("attached", &self.sender.is_some())
            .finish()
    }
}

/// Named set of tools available to an agent
#[derive(Clone, Default)]
pub struct ToolSet {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool, replacing any tool registered under the same name
    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.insert(tool);
        self
    }

    pub fn insert(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tools.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl fmt::Debug for ToolSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.tools.keys()).finish()
    }
}
