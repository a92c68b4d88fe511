//! Tracer 和 TracerProvider
//! Tracer and TracerProvider
//!
//! 提供追踪器、Span 处理器的创建和管理
//! Provides creation and management of tracers and span processors

use super::context::SpanContext;
use super::error::ExportResult;
use super::exporter::TracingExporter;
use super::span::{Span, SpanBuilder, SpanData, SpanKind};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;

/// Tracer 配置
/// Tracer configuration
#[derive(Debug, Clone)]
pub struct TracerConfig {
    /// 服务名称
    /// Service name
    pub service_name: String,
    /// 是否记录 Span
    /// Whether spans are recorded at all
    pub recording: bool,
}

impl Default for TracerConfig {
    fn default() -> Self {
        Self {
            service_name: "unknown-service".to_string(),
            recording: true,
        }
    }
}

impl TracerConfig {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            ..Default::default()
        }
    }
}

/// Span 处理器 trait
/// Span processor trait
#[async_trait::async_trait]
pub trait SpanProcessor: Send + Sync {
    /// Span 结束时调用
    /// Called when a Span ends
    async fn on_end(&self, span: SpanData);
    /// 关闭处理器
    /// Shutdown the processor
    async fn shutdown(&self) -> ExportResult;
    /// 强制刷新
    /// Force flush
    async fn force_flush(&self) -> ExportResult;
}

/// 丢弃所有 Span 的处理器
/// Processor that drops every span
#[derive(Debug, Default)]
pub struct NoopSpanProcessor;

#[async_trait::async_trait]
impl SpanProcessor for NoopSpanProcessor {
    async fn on_end(&self, _span: SpanData) {}

    async fn shutdown(&self) -> ExportResult {
        Ok(())
    }

    async fn force_flush(&self) -> ExportResult {
        Ok(())
    }
}

/// 简单 Span 处理器 - 直接导出
/// Simple Span Processor - Export directly
pub struct SimpleSpanProcessor {
    exporter: Arc<dyn TracingExporter>,
}

impl SimpleSpanProcessor {
    pub fn new(exporter: Arc<dyn TracingExporter>) -> Self {
        Self { exporter }
    }
}

#[async_trait::async_trait]
impl SpanProcessor for SimpleSpanProcessor {
    async fn on_end(&self, span: SpanData) {
        let name = span.name.clone();
        if let Err(e) = self.exporter.export(vec![span]).await {
            tracing::error!(span = %name, error = %e, "Failed to export span");
        }
    }

    async fn shutdown(&self) -> ExportResult {
        self.exporter.shutdown().await
    }

    async fn force_flush(&self) -> ExportResult {
        self.exporter.force_flush().await
    }
}

/// 批处理配置
/// Batch configuration
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// 达到此数量立即导出
    /// Export as soon as this many spans are buffered
    pub max_export_batch_size: usize,
    /// 缓冲上限，超出的 Span 被丢弃
    /// Buffer cap; spans past it are dropped
    pub max_queue_size: usize,
    /// 定时导出间隔
    /// Interval of the scheduled export
    pub scheduled_delay: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_export_batch_size: 512,
            max_queue_size: 2048,
            scheduled_delay: Duration::from_secs(5),
        }
    }
}

impl BatchConfig {
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.max_export_batch_size = batch_size.max(1);
        self
    }

    pub fn with_max_queue_size(mut self, max_size: usize) -> Self {
        self.max_queue_size = max_size;
        self
    }

    pub fn with_scheduled_delay(mut self, delay: Duration) -> Self {
        self.scheduled_delay = delay;
        self
    }
}

struct BatchState {
    exporter: Arc<dyn TracingExporter>,
    buffer: Mutex<Vec<SpanData>>,
    config: BatchConfig,
}

impl BatchState {
    async fn export_buffered(&self) -> ExportResult {
        let to_export: Vec<SpanData> = {
            let mut buffer = self.buffer.lock().await;
            buffer.drain(..).collect()
        };

        if to_export.is_empty() {
            return Ok(());
        }
        tracing::debug!(count = to_export.len(), "Exporting span batch");
        self.exporter.export(to_export).await
    }
}

/// 批处理 Span 处理器
/// Batch Span Processor
///
/// 在批量满、定时器触发、`force_flush` 或 `shutdown` 时导出。
/// Exports when the batch is full, on the timer, on `force_flush` and on
/// `shutdown`.
pub struct BatchSpanProcessor {
    state: Arc<BatchState>,
    ticker: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

impl BatchSpanProcessor {
    pub fn new(exporter: Arc<dyn TracingExporter>, config: BatchConfig) -> Self {
        let state = Arc::new(BatchState {
            exporter,
            buffer: Mutex::new(Vec::new()),
            config,
        });
        let ticker = Self::spawn_ticker(Arc::downgrade(&state));

        Self {
            state,
            ticker: parking_lot::Mutex::new(ticker),
        }
    }

    /// 启动后台定时导出任务（需要 tokio 运行时）
    /// Start the background export timer (needs a tokio runtime)
    fn spawn_ticker(state: Weak<BatchState>) -> Option<JoinHandle<()>> {
        let handle = tokio::runtime::Handle::try_current().ok()?;
        let delay = state.upgrade()?.config.scheduled_delay;
        if delay.is_zero() {
            return None;
        }

        Some(handle.spawn(async move {
            let mut interval = tokio::time::interval(delay);
            // first tick completes immediately
            interval.tick().await;
            loop {
                interval.tick().await;
                let Some(state) = state.upgrade() else {
                    break;
                };
                if let Err(e) = state.export_buffered().await {
                    tracing::error!(error = %e, "Scheduled span export failed");
                }
            }
        }))
    }

    pub async fn queued(&self) -> usize {
        self.state.buffer.lock().await.len()
    }
}

impl Drop for BatchSpanProcessor {
    fn drop(&mut self) {
        if let Some(ticker) = self.ticker.lock().take() {
            ticker.abort();
        }
    }
}

#[async_trait::async_trait]
impl SpanProcessor for BatchSpanProcessor {
    async fn on_end(&self, span: SpanData) {
        let full = {
            let mut buffer = self.state.buffer.lock().await;
            if buffer.len() < self.state.config.max_queue_size {
                buffer.push(span);
            } else {
                tracing::warn!(span = %span.name, "Span queue full, dropping span");
            }
            buffer.len() >= self.state.config.max_export_batch_size
        };

        if full {
            if let Err(e) = self.state.export_buffered().await {
                tracing::error!(error = %e, "Failed to export spans");
            }
        }
    }

    async fn shutdown(&self) -> ExportResult {
        if let Some(ticker) = self.ticker.lock().take() {
            ticker.abort();
        }
        let flushed = self.force_flush().await;
        let closed = self.state.exporter.shutdown().await;
        flushed.and(closed)
    }

    async fn force_flush(&self) -> ExportResult {
        self.state.export_buffered().await?;
        self.state.exporter.force_flush().await
    }
}

/// Tracer - 追踪器
/// Tracer - Tracing component
pub struct Tracer {
    config: TracerConfig,
    processor: Arc<dyn SpanProcessor>,
}

impl Tracer {
    pub fn new(config: TracerConfig, processor: Arc<dyn SpanProcessor>) -> Self {
        Self { config, processor }
    }

    /// 不记录任何数据的 Tracer
    /// Tracer that records nothing
    pub fn noop(service_name: impl Into<String>) -> Self {
        Self::new(
            TracerConfig {
                service_name: service_name.into(),
                recording: false,
            },
            Arc::new(NoopSpanProcessor),
        )
    }

    pub fn is_recording(&self) -> bool {
        self.config.recording
    }

    /// 创建新的根 Span
    /// Create a new root Span
    pub fn start_span(&self, name: impl Into<String>) -> Span {
        self.start_span_with_kind(name, SpanKind::Internal, None)
    }

    /// 创建带类型的 Span
    /// Create a Span with a specific kind
    pub fn start_span_with_kind(
        &self,
        name: impl Into<String>,
        kind: SpanKind,
        parent: Option<&SpanContext>,
    ) -> Span {
        self.build(
            self.span_builder(name)
                .with_kind(kind)
                .with_optional_parent(parent.cloned()),
        )
    }

    /// 创建子 Span
    /// Create a child Span
    pub fn start_child_span(&self, name: impl Into<String>, parent: &SpanContext) -> Span {
        self.start_span_with_kind(name, SpanKind::Internal, Some(parent))
    }

    /// 获取 SpanBuilder
    /// Get a SpanBuilder bound to this tracer's service
    pub fn span_builder(&self, name: impl Into<String>) -> SpanBuilder {
        SpanBuilder::new(name, &self.config.service_name)
    }

    /// 使用 SpanBuilder 创建 Span
    /// Create a Span from a SpanBuilder
    pub fn build(&self, builder: SpanBuilder) -> Span {
        if self.config.recording {
            builder.start()
        } else {
            builder.start_non_recording()
        }
    }

    /// 结束 Span 并导出
    /// End Span and export
    pub async fn end_span(&self, span: &Span) {
        self.end_span_at(span, Utc::now()).await;
    }

    /// 以指定时间结束 Span 并导出；重复结束不会重复导出
    /// End Span at a given time and export; a second end exports nothing
    pub async fn end_span_at(&self, span: &Span, timestamp: DateTime<Utc>) {
        if span.end_with_timestamp(timestamp).await && span.is_recording().await {
            let data = span.get_data().await;
            self.processor.on_end(data).await;
        }
    }

    /// 获取服务名称
    /// Get service name
    pub fn service_name(&self) -> &str {
        &self.config.service_name
    }

    /// 关闭 Tracer
    /// Shutdown Tracer
    pub async fn shutdown(&self) -> ExportResult {
        self.processor.shutdown().await
    }

    /// 强制刷新
    /// Force flush
    pub async fn force_flush(&self) -> ExportResult {
        self.processor.force_flush().await
    }
}

impl std::fmt::Debug for Tracer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tracer")
            .field("service_name", &self.config.service_name)
            .field("recording", &self.config.recording)
            .finish()
    }
}

/// Tracer Provider - 管理多个 Tracer
/// Tracer Provider - Manages multiple Tracers
pub struct TracerProvider {
    config: TracerConfig,
    processor: Arc<dyn SpanProcessor>,
    tracers: Arc<RwLock<HashMap<String, Arc<Tracer>>>>,
}

impl TracerProvider {
    pub fn new(config: TracerConfig, processor: Arc<dyn SpanProcessor>) -> Self {
        Self {
            config,
            processor,
            tracers: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// 获取或创建 Tracer
    /// Get or create a Tracer
    pub async fn tracer(&self, name: &str) -> Arc<Tracer> {
        {
            let tracers = self.tracers.read().await;
            if let Some(tracer) = tracers.get(name) {
                return tracer.clone();
            }
        }

        let mut tracers = self.tracers.write().await;
        tracers
            .entry(name.to_string())
            .or_insert_with(|| {
                Arc::new(Tracer::new(
                    TracerConfig {
                        service_name: name.to_string(),
                        ..self.config.clone()
                    },
                    self.processor.clone(),
                ))
            })
            .clone()
    }

    /// 获取默认 Tracer
    /// Get default Tracer
    pub async fn default_tracer(&self) -> Arc<Tracer> {
        self.tracer(&self.config.service_name).await
    }

    pub fn service_name(&self) -> &str {
        &self.config.service_name
    }

    /// 强制刷新
    /// Force flush
    pub async fn force_flush(&self) -> ExportResult {
        self.processor.force_flush().await
    }

    /// 关闭 Provider
    /// Shutdown Provider
    pub async fn shutdown(&self) -> ExportResult {
        self.processor.shutdown().await
    }
}

impl std::fmt::Debug for TracerProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TracerProvider")
            .field("service_name", &self.config.service_name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracing::error::ExportError;
    use crate::tracing::exporter::{ConsoleExporter, ExporterConfig};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingExporter {
        exported: AtomicUsize,
        batches: AtomicUsize,
        shutdowns: AtomicUsize,
    }

    #[async_trait]
    impl TracingExporter for CountingExporter {
        async fn export(&self, spans: Vec<SpanData>) -> ExportResult {
            self.exported.fetch_add(spans.len(), Ordering::SeqCst);
            self.batches.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn shutdown(&self) -> ExportResult {
            self.shutdowns.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn force_flush(&self) -> ExportResult {
            Ok(())
        }
    }

    struct FailingExporter;

    #[async_trait]
    impl TracingExporter for FailingExporter {
        async fn export(&self, _spans: Vec<SpanData>) -> ExportResult {
            Err(ExportError::Status {
                endpoint: "test".into(),
                status: 500,
            })
        }

        async fn shutdown(&self) -> ExportResult {
            Ok(())
        }

        async fn force_flush(&self) -> ExportResult {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_tracer_creation() {
        let exporter = Arc::new(
            ConsoleExporter::new(ExporterConfig::new("test-service")).with_summary_only(),
        );
        let processor = Arc::new(SimpleSpanProcessor::new(exporter));
        let tracer = Tracer::new(TracerConfig::new("test-service"), processor);

        let span = tracer.start_span("test-operation");
        assert!(span.is_recording().await);

        tracer.end_span(&span).await;
        assert!(span.is_ended().await);
    }

    #[tokio::test]
    async fn test_simple_processor_exports_once_per_span() {
        let exporter = Arc::new(CountingExporter::default());
        let tracer = Tracer::new(
            TracerConfig::new("svc"),
            Arc::new(SimpleSpanProcessor::new(exporter.clone())),
        );

        let span = tracer.start_span("op");
        tracer.end_span(&span).await;
        tracer.end_span(&span).await;

        assert_eq!(exporter.exported.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_child_span_joins_parent_trace() {
        let tracer = Tracer::new(TracerConfig::new("svc"), Arc::new(NoopSpanProcessor));
        let root = tracer.start_span("root");
        let root_ctx = root.span_context().await;

        let child = tracer.start_child_span("child", &root_ctx);
        let data = child.get_data().await;
        assert_eq!(data.span_context.trace_id, root_ctx.trace_id);
        assert_eq!(data.parent_span_context, Some(root_ctx));
    }

    #[tokio::test]
    async fn test_noop_tracer_records_nothing() {
        let tracer = Tracer::noop("svc");
        let span = tracer.start_span("op");
        span.set_attribute("k", "v").await;
        tracer.end_span(&span).await;

        assert!(!tracer.is_recording());
        assert!(!span.is_recording().await);
        assert!(span.span_context().await.is_valid());
    }

    #[tokio::test]
    async fn test_batch_processor_flushes_at_batch_size() {
        let exporter = Arc::new(CountingExporter::default());
        let processor = BatchSpanProcessor::new(
            exporter.clone(),
            BatchConfig::default()
                .with_batch_size(2)
                .with_scheduled_delay(Duration::ZERO),
        );
        let tracer = Tracer::new(TracerConfig::new("svc"), Arc::new(processor));

        for name in ["a", "b", "c"] {
            let span = tracer.start_span(name);
            tracer.end_span(&span).await;
        }
        assert_eq!(exporter.exported.load(Ordering::SeqCst), 2);
        assert_eq!(exporter.batches.load(Ordering::SeqCst), 1);

        tracer.force_flush().await.unwrap();
        assert_eq!(exporter.exported.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_batch_processor_shutdown_flushes_and_closes() {
        let exporter = Arc::new(CountingExporter::default());
        let processor = BatchSpanProcessor::new(exporter.clone(), BatchConfig::default());

        let tracer = Tracer::new(TracerConfig::new("svc"), Arc::new(processor));
        let span = tracer.start_span("pending");
        tracer.end_span(&span).await;
        assert_eq!(exporter.exported.load(Ordering::SeqCst), 0);

        tracer.shutdown().await.unwrap();
        assert_eq!(exporter.exported.load(Ordering::SeqCst), 1);
        assert_eq!(exporter.shutdowns.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_processor_scheduled_export() {
        let exporter = Arc::new(CountingExporter::default());
        let processor = BatchSpanProcessor::new(
            exporter.clone(),
            BatchConfig::default().with_scheduled_delay(Duration::from_millis(100)),
        );

        processor
            .on_end(SpanBuilder::new("queued", "svc").start().get_data().await)
            .await;
        assert_eq!(processor.queued().await, 1);

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(exporter.exported.load(Ordering::SeqCst), 1);
        assert_eq!(processor.queued().await, 0);
    }

    #[tokio::test]
    async fn test_batch_processor_drops_past_queue_cap() {
        let exporter = Arc::new(CountingExporter::default());
        let processor = BatchSpanProcessor::new(
            exporter.clone(),
            BatchConfig::default()
                .with_max_queue_size(1)
                .with_scheduled_delay(Duration::ZERO),
        );

        for _ in 0..3 {
            processor
                .on_end(SpanBuilder::new("s", "svc").start().get_data().await)
                .await;
        }
        assert_eq!(processor.queued().await, 1);
    }

    #[tokio::test]
    async fn test_export_failure_is_reported_on_flush() {
        let processor = BatchSpanProcessor::new(
            Arc::new(FailingExporter),
            BatchConfig::default().with_scheduled_delay(Duration::ZERO),
        );
        processor
            .on_end(SpanBuilder::new("s", "svc").start().get_data().await)
            .await;

        assert!(processor.force_flush().await.is_err());
    }

    #[tokio::test]
    async fn test_tracer_provider() {
        let provider =
            TracerProvider::new(TracerConfig::new("test-service"), Arc::new(NoopSpanProcessor));

        let tracer1 = provider.tracer("service-a").await;
        let tracer2 = provider.tracer("service-a").await;
        assert!(Arc::ptr_eq(&tracer1, &tracer2));

        let default = provider.default_tracer().await;
        assert_eq!(default.service_name(), "test-service");
    }
}
