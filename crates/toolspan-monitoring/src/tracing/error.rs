//! 追踪错误类型
//! Tracing error types

use thiserror::Error;

/// Span 导出错误
/// Span export error
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExportError {
    /// HTTP 传输失败
    /// HTTP transport failure
    #[error("failed to send spans to {endpoint}: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    /// 收集器返回非成功状态
    /// Collector answered with a non-success status
    #[error("collector at {endpoint} returned status {status}")]
    Status { endpoint: String, status: u16 },

    /// 编码失败
    /// Payload encoding failure
    #[error("failed to encode OTLP payload: {0}")]
    Encode(String),

    /// 导出器已关闭
    /// Exporter already shut down
    #[error("exporter is shut down")]
    Shutdown,
}

impl From<serde_json::Error> for ExportError {
    fn from(err: serde_json::Error) -> Self {
        ExportError::Encode(err.to_string())
    }
}

/// 追踪后端错误
/// Tracing backend error
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TracingError {
    #[error("invalid collector endpoint `{endpoint}`: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("backend configuration error: {0}")]
    Config(#[from] toolspan_kernel::config::ConfigError),

    #[error(transparent)]
    Export(#[from] ExportError),
}

pub type ExportResult<T = ()> = Result<T, ExportError>;

pub type TracingResult<T> = Result<T, TracingError>;
