//! Crate-level error types for `toolspan-kernel`.
//!
//! [`KernelError`] composes the errors of every sub-module and is used with
//! [`error_stack::Report`] to attach context as errors propagate.
//!
//! ```rust,ignore
//! use error_stack::ResultExt;
//! use toolspan_kernel::config::PhoenixConfig;
//! use toolspan_kernel::error::{KernelError, KernelResult};
//!
//! fn phoenix() -> KernelResult<PhoenixConfig> {
//!     PhoenixConfig::from_env()
//!         .map_err(KernelError::from)
//!         .map_err(error_stack::Report::new)
//!         .attach("reading PHOENIX_* environment")
//! }
//! ```

use crate::agent::error::AgentError;
use crate::config::ConfigError;
use thiserror::Error;

/// Crate-level error type for `toolspan-kernel`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum KernelError {
    /// An error originating from an agent run.
    #[error("Agent error: {0}")]
    Agent(#[from] AgentError),

    /// A configuration error.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// A JSON (de)serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An internal / untyped error described by a message string.
    #[error("{0}")]
    Internal(String),
}

/// Convenience result alias using [`error_stack::Report`].
pub type KernelResult<T> = Result<T, error_stack::Report<KernelError>>;
