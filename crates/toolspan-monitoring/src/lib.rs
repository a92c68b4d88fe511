//! toolspan Monitoring - span model, OTLP exporters and tracing backends
//!
//! This crate provides the tracing side of toolspan:
//! - A span model with explicit start/end timestamps
//! - Simple and batch span processors
//! - OTLP exporters over HTTP+JSON and HTTP+protobuf
//! - OpenLumix and Phoenix backend adapters behind a process-scoped
//!   [`TracingRuntime`]
//! - Phoenix metrics read-back
//!
//! # Example
//!
//! ```rust,no_run
//! use toolspan_monitoring::tracing::{PhoenixBackend, TracingRuntime};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let runtime = TracingRuntime::new(PhoenixBackend::from_env()?);
//! let handle = runtime.init("weather-agent");
//!
//! let tracer = handle.tracer("weather-agent").await;
//! let span = tracer.start_span("agent.run");
//! tracer.end_span(&span).await;
//!
//! runtime.shutdown().await?;
//! # Ok(())
//! # }
//! ```

pub mod tracing;

pub use crate::tracing::{TracingBackend, TracingHandle, TracingRuntime};
