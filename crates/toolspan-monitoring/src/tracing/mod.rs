//! 分布式追踪模块
//! Distributed tracing module
//!
//! 提供分布式追踪功能，支持:
//! Provides distributed tracing functionality, supporting:
//! - Span 管理
//! - Span management
//! - 简单与批量 Span 处理器
//! - Simple and batch span processors
//! - OTLP 导出 (HTTP+JSON, HTTP+protobuf) 与 Console 导出
//! - OTLP export (HTTP+JSON, HTTP+protobuf) and console export
//! - OpenLumix / Phoenix 后端适配
//! - OpenLumix / Phoenix backend adapters

pub mod attributes;
mod backend;
mod context;
mod error;
mod exporter;
pub mod otlp;
pub mod query;
mod span;
mod tracer;

pub use backend::{
    ConsoleBackend, OPENINFERENCE_PROJECT_ATTRIBUTE, OPENLUMIX_PROJECT_HEADER, OpenLumixBackend,
    PhoenixBackend, TracingBackend, TracingHandle, TracingRuntime,
};
pub use context::{SpanContext, SpanId, TraceFlags, TraceId};
pub use error::{ExportError, ExportResult, TracingError, TracingResult};
pub use exporter::{
    ConsoleExporter, ExporterConfig, OtlpConfig, OtlpExporter, OtlpProtocol, TracingExporter,
};
pub use otlp::{Resource, Scope};
pub use query::{ModelTraceMetrics, PhoenixMetricsClient, QueryError};
pub use span::{Span, SpanAttribute, SpanBuilder, SpanData, SpanEvent, SpanKind, SpanStatus};
pub use tracer::{
    BatchConfig, BatchSpanProcessor, NoopSpanProcessor, SimpleSpanProcessor, SpanProcessor,
    Tracer, TracerConfig, TracerProvider,
};
