use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use toolspan_kernel::{Tool, ToolProgress, ToolResult};

/// A mock tool simulating a real agent tool
///
/// It returns a stubbed outcome after an optional delay and records every
/// input it was called with.
#[derive(Clone)]
pub struct MockTool {
    name: String,
    description: String,
    schema: Value,
    delay: Duration,
    /// Outcome returned by every execution
    pub stubbed_result: Arc<RwLock<ToolResult>>,
    /// Preliminary outputs reported before the final result
    pub progress_updates: Arc<RwLock<Vec<Value>>>,
    /// Track all inputs passed to this tool
    pub call_history: Arc<RwLock<Vec<Value>>>,
}

impl MockTool {
    pub fn new(name: &str, description: &str, schema: Value) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            schema,
            delay: Duration::ZERO,
            stubbed_result: Arc::new(RwLock::new(Ok(json!("Mock Execution Default")))),
            progress_updates: Arc::new(RwLock::new(Vec::new())),
            call_history: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Sleep this long before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Sets the result this tool will produce when executed.
    pub async fn set_result(&self, result: ToolResult) {
        *self.stubbed_result.write().await = result;
    }

    /// Sets the preliminary outputs reported on every execution.
    pub async fn set_progress(&self, updates: Vec<Value>) {
        *self.progress_updates.write().await = updates;
    }

    /// Retrieve the history of calls made to this tool
    pub async fn history(&self) -> Vec<Value> {
        self.call_history.read().await.clone()
    }

    /// Check the total number of times this tool was executed
    pub async fn call_count(&self) -> usize {
        self.call_history.read().await.len()
    }
}

#[async_trait]
impl Tool for MockTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters_schema(&self) -> Value {
        self.schema.clone()
    }

    async fn execute(&self, input: Value, progress: ToolProgress) -> ToolResult {
        self.call_history.write().await.push(input);
        for update in self.progress_updates.read().await.iter() {
            progress.report(update.clone());
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.stubbed_result.read().await.clone()
    }
}

#[macro_export]
macro_rules! assert_tool_called {
    ($tool:expr, $expected_count:expr) => {
        let count = $tool.call_count().await;
        assert_eq!(
            count, $expected_count,
            "Expected tool '{}' to be called {} times, but was called {} times",
            $tool.name(),
            $expected_count,
            count
        );
    };
}
