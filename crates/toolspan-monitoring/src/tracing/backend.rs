//! 追踪后端适配器
//! Tracing backend adapters
//!
//! A [`TracingRuntime`] owns at most one [`TracerProvider`] for one backend.
//! `init` creates it lazily and is idempotent; `shutdown` flushes and closes
//! it, and does nothing when `init` never succeeded. Construction failures
//! never escape `init`: callers get [`TracingHandle::Unavailable`] and keep
//! running with non-recording spans.

use super::error::{TracingError, TracingResult};
use super::exporter::{ConsoleExporter, ExporterConfig, OtlpConfig, OtlpExporter, OtlpProtocol};
use super::otlp::Resource;
use super::tracer::{
    BatchConfig, BatchSpanProcessor, SimpleSpanProcessor, Tracer, TracerConfig, TracerProvider,
};
use std::sync::Arc;
use toolspan_kernel::config::{OpenLumixConfig, PhoenixConfig};
use tracing::{debug, error, info, warn};

pub const OPENLUMIX_PROJECT_HEADER: &str = "x-openlumix-project-id";
pub const OPENINFERENCE_PROJECT_ATTRIBUTE: &str = "openinference.project.name";

/// 追踪后端 trait
/// Tracing backend trait
pub trait TracingBackend: Send + Sync {
    /// 后端名称（日志用）
    /// Backend name, used in logs
    fn name(&self) -> &'static str;

    /// 为给定标签构建 TracerProvider
    /// Build a TracerProvider for the given label
    fn build_provider(&self, label: &str) -> TracingResult<TracerProvider>;
}

/// OpenLumix：HTTP+JSON，批量导出
/// OpenLumix: HTTP+JSON, batched export
#[derive(Debug, Clone)]
pub struct OpenLumixBackend {
    config: OpenLumixConfig,
    batch: BatchConfig,
}

impl OpenLumixBackend {
    pub const NAME: &'static str = "openlumix";

    pub fn new(config: OpenLumixConfig) -> Self {
        Self {
            config,
            batch: BatchConfig::default(),
        }
    }

    pub fn from_env() -> TracingResult<Self> {
        Ok(Self::new(OpenLumixConfig::from_env()?))
    }

    pub fn with_batch_config(mut self, batch: BatchConfig) -> Self {
        self.batch = batch;
        self
    }

    pub fn config(&self) -> &OpenLumixConfig {
        &self.config
    }
}

impl TracingBackend for OpenLumixBackend {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn build_provider(&self, label: &str) -> TracingResult<TracerProvider> {
        let exporter = OtlpExporter::new(
            ExporterConfig::new(label),
            OtlpConfig::new(&self.config.url, OtlpProtocol::HttpJson)
                .with_header(OPENLUMIX_PROJECT_HEADER, &self.config.project_id),
        )?;
        let processor = BatchSpanProcessor::new(Arc::new(exporter), self.batch.clone());

        info!(
            backend = self.name(),
            label,
            endpoint = %self.config.url,
            project_id = %self.config.project_id,
            "OpenLumix tracing initialized"
        );
        Ok(TracerProvider::new(TracerConfig::new(label), Arc::new(processor)))
    }
}

/// Phoenix：HTTP+protobuf，逐个导出
/// Phoenix: HTTP+protobuf, per-span export
#[derive(Debug, Clone, Default)]
pub struct PhoenixBackend {
    config: PhoenixConfig,
}

impl PhoenixBackend {
    pub const NAME: &'static str = "phoenix";

    pub fn new(config: PhoenixConfig) -> Self {
        Self { config }
    }

    pub fn from_env() -> TracingResult<Self> {
        Ok(Self::new(PhoenixConfig::from_env()?))
    }

    pub fn config(&self) -> &PhoenixConfig {
        &self.config
    }
}

impl TracingBackend for PhoenixBackend {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn build_provider(&self, label: &str) -> TracingResult<TracerProvider> {
        let endpoint = self.config.collector_endpoint();
        let resource =
            Resource::new(label).with_attribute(OPENINFERENCE_PROJECT_ATTRIBUTE, label);
        let exporter = OtlpExporter::new(
            ExporterConfig::new(label).with_resource(resource),
            OtlpConfig::new(&endpoint, OtlpProtocol::HttpProtobuf),
        )?;
        let processor = SimpleSpanProcessor::new(Arc::new(exporter));

        info!(
            backend = self.name(),
            label,
            endpoint = %endpoint,
            ui = %self.config.projects_url(),
            "Phoenix tracing initialized"
        );
        Ok(TracerProvider::new(TracerConfig::new(label), Arc::new(processor)))
    }
}

/// Console：Span 写入日志，不需要采集器
/// Console: spans are written to the log, no collector needed
#[derive(Debug, Clone, Default)]
pub struct ConsoleBackend {
    detailed: bool,
}

impl ConsoleBackend {
    pub const NAME: &'static str = "console";

    /// One summary line per span
    pub fn new() -> Self {
        Self::default()
    }

    /// Full span dump with attributes
    pub fn detailed(mut self) -> Self {
        self.detailed = true;
        self
    }
}

impl TracingBackend for ConsoleBackend {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn build_provider(&self, label: &str) -> TracingResult<TracerProvider> {
        let exporter = ConsoleExporter::new(ExporterConfig::new(label));
        let exporter = if self.detailed {
            exporter
        } else {
            exporter.with_summary_only()
        };
        info!(backend = self.name(), label, "Console tracing initialized");
        Ok(TracerProvider::new(
            TracerConfig::new(label),
            Arc::new(SimpleSpanProcessor::new(Arc::new(exporter))),
        ))
    }
}

/// init 的结果
/// Outcome of `init`
#[derive(Debug, Clone)]
pub enum TracingHandle {
    Active(Arc<TracerProvider>),
    Unavailable {
        backend: &'static str,
        reason: String,
    },
}

impl TracingHandle {
    pub fn is_active(&self) -> bool {
        matches!(self, TracingHandle::Active(_))
    }

    pub fn provider(&self) -> Option<&Arc<TracerProvider>> {
        match self {
            TracingHandle::Active(provider) => Some(provider),
            TracingHandle::Unavailable { .. } => None,
        }
    }

    /// 获取 Tracer；不可用时返回不记录的 Tracer
    /// Get a tracer; a non-recording one when tracing is unavailable
    pub async fn tracer(&self, name: &str) -> Arc<Tracer> {
        match self {
            TracingHandle::Active(provider) => provider.tracer(name).await,
            TracingHandle::Unavailable { .. } => Arc::new(Tracer::noop(name)),
        }
    }
}

/// 进程级追踪状态
/// Process-scoped tracing state
pub struct TracingRuntime {
    backend: Box<dyn TracingBackend>,
    provider: parking_lot::Mutex<Option<Arc<TracerProvider>>>,
}

impl TracingRuntime {
    pub fn new(backend: impl TracingBackend + 'static) -> Self {
        Self {
            backend: Box::new(backend),
            provider: parking_lot::Mutex::new(None),
        }
    }

    /// OpenLumix runtime configured from `OPENLUMIX_*`
    pub fn openlumix_from_env() -> TracingResult<Self> {
        Ok(Self::new(OpenLumixBackend::from_env()?))
    }

    /// Phoenix runtime configured from `PHOENIX_*`
    pub fn phoenix_from_env() -> TracingResult<Self> {
        Ok(Self::new(PhoenixBackend::from_env()?))
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// 初始化（幂等）。已存在的 Provider 原样返回，label 被忽略
    /// Initialize (idempotent). An existing provider is returned as is and the
    /// label is ignored
    pub fn init(&self, label: &str) -> TracingHandle {
        let mut guard = self.provider.lock();
        if let Some(provider) = guard.as_ref() {
            debug!(
                backend = self.backend.name(),
                label,
                active = provider.service_name(),
                "Tracing already initialized"
            );
            return TracingHandle::Active(provider.clone());
        }

        match self.backend.build_provider(label) {
            Ok(provider) => {
                let provider = Arc::new(provider);
                *guard = Some(provider.clone());
                TracingHandle::Active(provider)
            }
            Err(e) => {
                error!(
                    backend = self.backend.name(),
                    label,
                    error = %e,
                    "Failed to initialize tracing, continuing without it"
                );
                TracingHandle::Unavailable {
                    backend: self.backend.name(),
                    reason: e.to_string(),
                }
            }
        }
    }

    pub fn provider(&self) -> Option<Arc<TracerProvider>> {
        self.provider.lock().clone()
    }

    pub fn is_initialized(&self) -> bool {
        self.provider.lock().is_some()
    }

    /// 刷新并关闭；未初始化时为空操作
    /// Flush then close; a no-op when never initialized
    pub async fn shutdown(&self) -> TracingResult<()> {
        let taken = self.provider.lock().take();
        let Some(provider) = taken else {
            debug!(backend = self.backend.name(), "Tracing shutdown without init");
            return Ok(());
        };

        let flushed = provider.force_flush().await;
        if let Err(e) = &flushed {
            warn!(backend = self.backend.name(), error = %e, "Failed to flush spans");
        }
        provider.shutdown().await?;
        info!(backend = self.backend.name(), "Tracing shut down");
        flushed.map_err(TracingError::from)
    }
}

impl std::fmt::Debug for TracingRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TracingRuntime")
            .field("backend", &self.backend.name())
            .field("initialized", &self.is_initialized())
            .finish()
    }
}
