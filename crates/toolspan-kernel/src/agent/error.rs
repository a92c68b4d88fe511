//! Agent error types

use thiserror::Error;

/// Agent operation result type
pub type AgentResult<T> = Result<T, AgentError>;

/// Errors raised while driving an agent run
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AgentError {
    /// The engine reported an error event; the run is terminated
    #[error("Agent execution failed: {0}")]
    ExecutionFailed(String),

    /// The engine could not start the run at all
    #[error("Agent engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("Tool execution failed: {tool_name}: {message}")]
    ToolExecutionFailed { tool_name: String, message: String },

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AgentError {
    /// Stable short name used as `exception.type` on spans
    pub fn kind(&self) -> &'static str {
        match self {
            AgentError::ExecutionFailed(_) => "ExecutionFailed",
            AgentError::EngineUnavailable(_) => "EngineUnavailable",
            AgentError::ToolExecutionFailed { .. } => "ToolExecutionFailed",
            AgentError::ToolNotFound(_) => "ToolNotFound",
            AgentError::InvalidInput(_) => "InvalidInput",
            AgentError::Serialization(_) => "Serialization",
        }
    }
}
