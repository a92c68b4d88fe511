//! Tracing 导出器
//! Tracing Exporter
//!
//! 支持 Console 和 OTLP（HTTP+JSON / HTTP+protobuf）
//! Supports Console and OTLP (HTTP+JSON / HTTP+protobuf)

use super::error::{ExportError, ExportResult, TracingError, TracingResult};
use super::otlp::{self, Resource, Scope};
use super::span::SpanData;
use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info};

/// 导出器配置
/// Exporter configuration
#[derive(Debug, Clone)]
pub struct ExporterConfig {
    /// 资源属性
    /// Resource attributes
    pub resource: Resource,
    /// 仪表化范围
    /// Instrumentation scope
    pub scope: Scope,
}

impl ExporterConfig {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            resource: Resource::new(service_name),
            scope: Scope::default(),
        }
    }

    pub fn with_resource(mut self, resource: Resource) -> Self {
        self.resource = resource;
        self
    }
}

/// 追踪导出器 trait
/// Tracing exporter trait
#[async_trait]
pub trait TracingExporter: Send + Sync {
    /// 导出 spans
    /// Export spans
    async fn export(&self, spans: Vec<SpanData>) -> ExportResult;

    /// 关闭导出器
    /// Shutdown exporter
    async fn shutdown(&self) -> ExportResult;

    /// 强制刷新
    /// Force flush
    async fn force_flush(&self) -> ExportResult;
}

/// Console 导出器 - 输出到日志
/// Console Exporter - Writes spans to the log
pub struct ConsoleExporter {
    config: ExporterConfig,
    /// 是否使用 JSON 格式
    /// Whether to use JSON format
    json_format: bool,
    /// 是否只输出摘要
    /// Whether to output summary only
    summary_only: bool,
}

impl ConsoleExporter {
    pub fn new(config: ExporterConfig) -> Self {
        Self {
            config,
            json_format: false,
            summary_only: false,
        }
    }

    pub fn with_json_format(mut self) -> Self {
        self.json_format = true;
        self
    }

    pub fn with_summary_only(mut self) -> Self {
        self.summary_only = true;
        self
    }

    fn format_span(&self, span: &SpanData) -> String {
        if self.json_format {
            return serde_json::to_string_pretty(span).unwrap_or_else(|_| format!("{:?}", span));
        }

        let duration = span.duration_ms().unwrap_or(0);
        if self.summary_only {
            return format!(
                "[{}] {} | trace={} span={} | {}ms | {:?}",
                span.kind,
                span.name,
                span.span_context.trace_id,
                span.span_context.span_id,
                duration,
                span.status
            );
        }

        let parent = span
            .parent_span_context
            .as_ref()
            .map(|p| p.span_id.to_hex())
            .unwrap_or_else(|| "none".to_string());

        format!(
            r#"
┌─ Span ─────────────────────────────────────────────────────
│ Name:      {}
│ Service:   {}
│ Kind:      {}
│ TraceId:   {}
│ SpanId:    {}
│ ParentId:  {}
│ Duration:  {}ms
│ Status:    {:?}
│ Attributes: {:?}
│ Events:    {} events
└────────────────────────────────────────────────────────────"#,
            span.name,
            span.service_name,
            span.kind,
            span.span_context.trace_id,
            span.span_context.span_id,
            parent,
            duration,
            span.status,
            span.attributes,
            span.events.len()
        )
    }
}

#[async_trait]
impl TracingExporter for ConsoleExporter {
    async fn export(&self, spans: Vec<SpanData>) -> ExportResult {
        for span in spans {
            info!("{}", self.format_span(&span));
        }
        Ok(())
    }

    async fn shutdown(&self) -> ExportResult {
        debug!(
            service = ?self.config.resource.get("service.name"),
            "Console exporter shutdown"
        );
        Ok(())
    }

    async fn force_flush(&self) -> ExportResult {
        Ok(())
    }
}

/// OTLP 传输协议
/// OTLP transport protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtlpProtocol {
    HttpProtobuf,
    HttpJson,
}

impl OtlpProtocol {
    pub fn content_type(&self) -> &'static str {
        match self {
            OtlpProtocol::HttpProtobuf => "application/x-protobuf",
            OtlpProtocol::HttpJson => "application/json",
        }
    }
}

/// OTLP 导出器配置
/// OTLP exporter configuration
#[derive(Debug, Clone)]
pub struct OtlpConfig {
    /// 完整的 traces URL
    /// Full traces URL
    pub endpoint: String,
    pub protocol: OtlpProtocol,
    pub headers: HashMap<String, String>,
    /// 超时（毫秒）
    /// Timeout (milliseconds)
    pub timeout_ms: u64,
}

impl Default for OtlpConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:4318/v1/traces".to_string(),
            protocol: OtlpProtocol::HttpProtobuf,
            headers: HashMap::new(),
            timeout_ms: 10000,
        }
    }
}

impl OtlpConfig {
    pub fn new(endpoint: impl Into<String>, protocol: OtlpProtocol) -> Self {
        Self {
            endpoint: endpoint.into(),
            protocol,
            ..Default::default()
        }
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }
}

/// OTLP 导出器：每次 export 发送一个请求，批处理由处理器负责
/// OTLP Exporter: one request per export call; batching is the processor's job
pub struct OtlpExporter {
    config: ExporterConfig,
    otlp_config: OtlpConfig,
    client: Client,
    is_shutdown: AtomicBool,
}

impl OtlpExporter {
    /// 校验端点并构建 HTTP 客户端
    /// Validate the endpoint and build the HTTP client
    pub fn new(config: ExporterConfig, otlp_config: OtlpConfig) -> TracingResult<Self> {
        let url = reqwest::Url::parse(&otlp_config.endpoint).map_err(|e| {
            TracingError::InvalidEndpoint {
                endpoint: otlp_config.endpoint.clone(),
                reason: e.to_string(),
            }
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(TracingError::InvalidEndpoint {
                endpoint: otlp_config.endpoint.clone(),
                reason: format!("unsupported scheme `{}`", url.scheme()),
            });
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static(otlp_config.protocol.content_type()),
        );
        for (key, value) in &otlp_config.headers {
            let name = HeaderName::from_bytes(key.as_bytes()).map_err(|e| {
                TracingError::InvalidEndpoint {
                    endpoint: otlp_config.endpoint.clone(),
                    reason: format!("invalid header name `{key}`: {e}"),
                }
            })?;
            let value = HeaderValue::from_str(value).map_err(|e| {
                TracingError::InvalidEndpoint {
                    endpoint: otlp_config.endpoint.clone(),
                    reason: format!("invalid value for header `{key}`: {e}"),
                }
            })?;
            headers.insert(name, value);
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(otlp_config.timeout_ms))
            .build()
            .map_err(TracingError::Client)?;

        Ok(Self {
            config,
            otlp_config,
            client,
            is_shutdown: AtomicBool::new(false),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.otlp_config.endpoint
    }

    pub fn protocol(&self) -> OtlpProtocol {
        self.otlp_config.protocol
    }

    fn encode(&self, spans: &[SpanData]) -> ExportResult<Vec<u8>> {
        match self.otlp_config.protocol {
            OtlpProtocol::HttpProtobuf => Ok(otlp::encode_proto(
                &self.config.resource,
                &self.config.scope,
                spans,
            )),
            OtlpProtocol::HttpJson => Ok(serde_json::to_vec(&otlp::to_json_request(
                &self.config.resource,
                &self.config.scope,
                spans,
            ))?),
        }
    }

    async fn send_to_otlp(&self, spans: &[SpanData]) -> ExportResult {
        let body = self.encode(spans)?;
        let endpoint = &self.otlp_config.endpoint;

        let response = self
            .client
            .post(endpoint)
            .body(body)
            .send()
            .await
            .map_err(|source| ExportError::Transport {
                endpoint: endpoint.clone(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(ExportError::Status {
                endpoint: endpoint.clone(),
                status: response.status().as_u16(),
            });
        }

        debug!(
            count = spans.len(),
            endpoint = %endpoint,
            protocol = ?self.otlp_config.protocol,
            "Sent spans to OTLP endpoint"
        );
        Ok(())
    }
}

#[async_trait]
impl TracingExporter for OtlpExporter {
    async fn export(&self, spans: Vec<SpanData>) -> ExportResult {
        if self.is_shutdown.load(Ordering::Acquire) {
            return Err(ExportError::Shutdown);
        }
        if spans.is_empty() {
            return Ok(());
        }
        self.send_to_otlp(&spans).await
    }

    async fn shutdown(&self) -> ExportResult {
        if !self.is_shutdown.swap(true, Ordering::AcqRel) {
            info!(endpoint = %self.otlp_config.endpoint, "OTLP exporter shutdown");
        }
        Ok(())
    }

    async fn force_flush(&self) -> ExportResult {
        Ok(())
    }
}
