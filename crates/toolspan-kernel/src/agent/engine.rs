//! Agent execution engine seam
//!
//! The engine decides which tools to call and runs them; toolspan only
//! consumes the [`EventStream`] it returns.

use super::error::AgentResult;
use super::event::EventStream;
use super::settings::AgentSettings;
use async_trait::async_trait;

/// One prompt execution request
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub settings: AgentSettings,
    pub prompt: String,
}

impl RunRequest {
    pub fn new(settings: AgentSettings, prompt: impl Into<String>) -> Self {
        Self {
            settings,
            prompt: prompt.into(),
        }
    }
}

/// External agent runtime
#[async_trait]
pub trait AgentEngine: Send + Sync {
    /// Start a run and return its event stream
    async fn stream(&self, request: RunRequest) -> AgentResult<EventStream>;
}
