//! In-memory span capture

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use toolspan_monitoring::tracing::{
    ExportResult, SimpleSpanProcessor, SpanData, TracerConfig, TracerProvider, TracingBackend,
    TracingError, TracingExporter, TracingResult,
};

/// Exporter that keeps every span it receives
#[derive(Debug, Default)]
pub struct RecordingExporter {
    spans: Mutex<Vec<SpanData>>,
    shutdowns: AtomicUsize,
}

impl RecordingExporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spans(&self) -> Vec<SpanData> {
        self.spans.lock().clone()
    }

    pub fn named(&self, name: &str) -> Vec<SpanData> {
        self.spans
            .lock()
            .iter()
            .filter(|s| s.name == name)
            .cloned()
            .collect()
    }

    /// Spans whose name starts with `prefix`, in export order
    pub fn with_prefix(&self, prefix: &str) -> Vec<SpanData> {
        self.spans
            .lock()
            .iter()
            .filter(|s| s.name.starts_with(prefix))
            .cloned()
            .collect()
    }

    pub fn shutdowns(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TracingExporter for RecordingExporter {
    async fn export(&self, spans: Vec<SpanData>) -> ExportResult {
        self.spans.lock().extend(spans);
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

/// Backend exporting synchronously into a shared [`RecordingExporter`]
#[derive(Debug, Clone)]
pub struct RecordingBackend {
    exporter: Arc<RecordingExporter>,
    builds: Arc<AtomicUsize>,
    unavailable: Option<String>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self {
            exporter: Arc::new(RecordingExporter::new()),
            builds: Arc::new(AtomicUsize::new(0)),
            unavailable: None,
        }
    }

    /// Backend whose transport can never be built
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            unavailable: Some(reason.into()),
            ..Self::new()
        }
    }

    pub fn exporter(&self) -> Arc<RecordingExporter> {
        self.exporter.clone()
    }

    /// Number of providers built so far
    pub fn builds(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }
}

impl Default for RecordingBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl TracingBackend for RecordingBackend {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn build_provider(&self, label: &str) -> TracingResult<TracerProvider> {
        if let Some(reason) = &self.unavailable {
            return Err(TracingError::InvalidEndpoint {
                endpoint: "recording://".to_string(),
                reason: reason.clone(),
            });
        }
        self.builds.fetch_add(1, Ordering::SeqCst);
        Ok(TracerProvider::new(
            TracerConfig::new(label),
            Arc::new(SimpleSpanProcessor::new(self.exporter.clone())),
        ))
    }
}
