//! Span 定义和管理
//!
//! A [`Span`] is a cheap, cloneable handle; every clone refers to the same
//! underlying record. Mutations after `end` are ignored, and a non-recording
//! span ignores every mutation.

use super::context::SpanContext;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Span 类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SpanKind {
    /// 内部操作
    #[default]
    Internal,
    /// 服务器端（处理请求）
    Server,
    /// 客户端（发起请求）
    Client,
    /// 消息生产者
    Producer,
    /// 消息消费者
    Consumer,
}

impl SpanKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpanKind::Internal => "INTERNAL",
            SpanKind::Server => "SERVER",
            SpanKind::Client => "CLIENT",
            SpanKind::Producer => "PRODUCER",
            SpanKind::Consumer => "CONSUMER",
        }
    }

    /// OTLP `Span.SpanKind` value
    pub fn otlp_code(&self) -> i32 {
        match self {
            SpanKind::Internal => 1,
            SpanKind::Server => 2,
            SpanKind::Client => 3,
            SpanKind::Producer => 4,
            SpanKind::Consumer => 5,
        }
    }
}

impl std::fmt::Display for SpanKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Span 状态
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub enum SpanStatus {
    /// 未设置
    #[default]
    Unset,
    /// 成功
    Ok,
    /// 错误
    Error { message: String },
}

impl SpanStatus {
    /// OTLP `Status.StatusCode` value
    pub fn otlp_code(&self) -> i32 {
        match self {
            SpanStatus::Unset => 0,
            SpanStatus::Ok => 1,
            SpanStatus::Error { .. } => 2,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            SpanStatus::Error { message } => message,
            SpanStatus::Unset | SpanStatus::Ok => "",
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, SpanStatus::Error { .. })
    }
}

/// Span 属性值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SpanAttribute {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    StringArray(Vec<String>),
}

impl SpanAttribute {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            SpanAttribute::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SpanAttribute::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SpanAttribute::Float(v) => Some(*v),
            SpanAttribute::Int(v) => Some(*v as f64),
            _ => None,
        }
    }
}

impl From<&str> for SpanAttribute {
    fn from(v: &str) -> Self {
        SpanAttribute::String(v.to_string())
    }
}

impl From<String> for SpanAttribute {
    fn from(v: String) -> Self {
        SpanAttribute::String(v)
    }
}

impl From<&String> for SpanAttribute {
    fn from(v: &String) -> Self {
        SpanAttribute::String(v.clone())
    }
}

impl From<i64> for SpanAttribute {
    fn from(v: i64) -> Self {
        SpanAttribute::Int(v)
    }
}

impl From<i32> for SpanAttribute {
    fn from(v: i32) -> Self {
        SpanAttribute::Int(v as i64)
    }
}

impl From<u64> for SpanAttribute {
    fn from(v: u64) -> Self {
        SpanAttribute::Int(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<usize> for SpanAttribute {
    fn from(v: usize) -> Self {
        SpanAttribute::Int(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<f64> for SpanAttribute {
    fn from(v: f64) -> Self {
        SpanAttribute::Float(v)
    }
}

impl From<bool> for SpanAttribute {
    fn from(v: bool) -> Self {
        SpanAttribute::Bool(v)
    }
}

impl From<Vec<String>> for SpanAttribute {
    fn from(v: Vec<String>) -> Self {
        SpanAttribute::StringArray(v)
    }
}

/// Span 事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpanEvent {
    pub name: String,
    pub timestamp: DateTime<Utc>,
    pub attributes: HashMap<String, SpanAttribute>,
}

impl SpanEvent {
    pub fn new(name: impl Into<String>) -> Self {
        Self::at(name, Utc::now())
    }

    pub fn at(name: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            timestamp,
            attributes: HashMap::new(),
        }
    }

    pub fn with_attribute(
        mut self,
        key: impl Into<String>,
        value: impl Into<SpanAttribute>,
    ) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

/// Span 数据（导出用）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpanData {
    pub span_context: SpanContext,
    pub parent_span_context: Option<SpanContext>,
    pub name: String,
    pub kind: SpanKind,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub status: SpanStatus,
    pub attributes: HashMap<String, SpanAttribute>,
    pub events: Vec<SpanEvent>,
    pub service_name: String,
}

impl SpanData {
    /// 持续时间（毫秒），未结束时为 None
    pub fn duration_ms(&self) -> Option<i64> {
        self.end_time
            .map(|end| (end - self.start_time).num_milliseconds().max(0))
    }

    pub fn attribute(&self, key: &str) -> Option<&SpanAttribute> {
        self.attributes.get(key)
    }
}

/// Span 内部状态
struct SpanInner {
    data: SpanData,
    is_recording: bool,
    is_ended: bool,
}

/// Span - 追踪的基本单元
pub struct Span {
    inner: Arc<RwLock<SpanInner>>,
}

impl Span {
    pub(crate) fn from_data(data: SpanData) -> Self {
        Self {
            inner: Arc::new(RwLock::new(SpanInner {
                data,
                is_recording: true,
                is_ended: false,
            })),
        }
    }

    /// 创建非记录的 Span（追踪不可用时使用）
    pub fn non_recording(span_context: SpanContext) -> Self {
        let inner = SpanInner {
            data: SpanData {
                span_context,
                parent_span_context: None,
                name: String::new(),
                kind: SpanKind::Internal,
                start_time: Utc::now(),
                end_time: None,
                status: SpanStatus::Unset,
                attributes: HashMap::new(),
                events: Vec::new(),
                service_name: String::new(),
            },
            is_recording: false,
            is_ended: false,
        };
        Self {
            inner: Arc::new(RwLock::new(inner)),
        }
    }

    pub async fn span_context(&self) -> SpanContext {
        self.inner.read().await.data.span_context.clone()
    }

    pub async fn is_recording(&self) -> bool {
        self.inner.read().await.is_recording
    }

    pub async fn is_ended(&self) -> bool {
        self.inner.read().await.is_ended
    }

    /// 设置属性
    pub async fn set_attribute(&self, key: impl Into<String>, value: impl Into<SpanAttribute>) {
        let mut inner = self.inner.write().await;
        if inner.is_recording && !inner.is_ended {
            inner.data.attributes.insert(key.into(), value.into());
        }
    }

    /// 添加事件
    pub async fn add_event(&self, event: SpanEvent) {
        let mut inner = self.inner.write().await;
        if inner.is_recording && !inner.is_ended {
            inner.data.events.push(event);
        }
    }

    /// 设置状态
    pub async fn set_status(&self, status: SpanStatus) {
        let mut inner = self.inner.write().await;
        if inner.is_recording && !inner.is_ended {
            inner.data.status = status;
        }
    }

    pub async fn set_ok(&self) {
        self.set_status(SpanStatus::Ok).await;
    }

    pub async fn set_error(&self, message: impl Into<String>) {
        self.set_status(SpanStatus::Error {
            message: message.into(),
        })
        .await;
    }

    /// 记录异常：exception 事件 + 错误状态
    /// Record an `exception` event and mark the span as failed
    pub async fn record_exception(&self, exception_type: &str, message: &str) {
        let event = SpanEvent::new("exception")
            .with_attribute("exception.type", exception_type)
            .with_attribute("exception.message", message);
        self.add_event(event).await;
        self.set_error(message).await;
    }

    /// 结束 Span。返回是否由本次调用结束
    pub async fn end(&self) -> bool {
        self.end_with_timestamp(Utc::now()).await
    }

    /// 结束 Span 并指定时间；已结束时不做任何事
    pub async fn end_with_timestamp(&self, timestamp: DateTime<Utc>) -> bool {
        let mut inner = self.inner.write().await;
        if inner.is_ended {
            return false;
        }
        inner.is_ended = true;
        inner.data.end_time = Some(timestamp);
        true
    }

    pub async fn get_data(&self) -> SpanData {
        self.inner.read().await.data.clone()
    }

    pub async fn duration_ms(&self) -> Option<i64> {
        self.inner.read().await.data.duration_ms()
    }
}

impl Clone for Span {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl std::fmt::Debug for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Span").finish_non_exhaustive()
    }
}

/// Span 构建器
pub struct SpanBuilder {
    name: String,
    kind: SpanKind,
    parent_context: Option<SpanContext>,
    attributes: HashMap<String, SpanAttribute>,
    start_time: Option<DateTime<Utc>>,
    service_name: String,
}

impl SpanBuilder {
    pub fn new(name: impl Into<String>, service_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: SpanKind::Internal,
            parent_context: None,
            attributes: HashMap::new(),
            start_time: None,
            service_name: service_name.into(),
        }
    }

    pub fn with_kind(mut self, kind: SpanKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_parent(mut self, parent: SpanContext) -> Self {
        self.parent_context = Some(parent);
        self
    }

    pub fn with_optional_parent(mut self, parent: Option<SpanContext>) -> Self {
        self.parent_context = parent;
        self
    }

    pub fn with_attribute(
        mut self,
        key: impl Into<String>,
        value: impl Into<SpanAttribute>,
    ) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_start_time(mut self, start_time: DateTime<Utc>) -> Self {
        self.start_time = Some(start_time);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 构建 Span：有父上下文时加入父 trace，否则开启新 trace
    pub fn start(self) -> Span {
        let span_context = match &self.parent_context {
            Some(parent) => parent.new_child(),
            None => SpanContext::new_root(),
        };

        Span::from_data(SpanData {
            span_context,
            parent_span_context: self.parent_context,
            name: self.name,
            kind: self.kind,
            start_time: self.start_time.unwrap_or_else(Utc::now),
            end_time: None,
            status: SpanStatus::Unset,
            attributes: self.attributes,
            events: Vec::new(),
            service_name: self.service_name,
        })
    }

    /// 构建非记录 Span，仍然分配上下文以保持父子关系
    pub fn start_non_recording(self) -> Span {
        let span_context = match &self.parent_context {
            Some(parent) => parent.new_child(),
            None => SpanContext::new_root(),
        };
        Span::non_recording(span_context)
    }
}
