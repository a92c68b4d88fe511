//! OTLP 编码
//! OTLP encoding
//!
//! Two wire formats for `ExportTraceServiceRequest`:
//!
//! - protobuf, via prost messages mirroring
//!   `opentelemetry/proto/collector/trace/v1/trace_service.proto`
//!   (only the fields toolspan emits);
//! - JSON, following the OTLP/HTTP JSON mapping: lowerCamelCase keys,
//!   hex-encoded ids, 64-bit integers as decimal strings.

use super::span::{SpanAttribute, SpanData, SpanEvent};
use chrono::{DateTime, Utc};
use serde_json::{Value, json};

/// 资源属性（每个导出请求共享）
/// Resource attributes shared by every export request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resource {
    attributes: Vec<(String, SpanAttribute)>,
}

impl Resource {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self::default().with_attribute("service.name", service_name.into())
    }

    /// 设置属性，已存在的键被覆盖
    /// Set an attribute, replacing an existing key
    pub fn with_attribute(
        mut self,
        key: impl Into<String>,
        value: impl Into<SpanAttribute>,
    ) -> Self {
        let key = key.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((key, value)),
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<&SpanAttribute> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn attributes(&self) -> &[(String, SpanAttribute)] {
        &self.attributes
    }
}

/// Instrumentation scope reported with every batch
#[derive(Debug, Clone, PartialEq)]
pub struct Scope {
    pub name: String,
    pub version: String,
}

impl Default for Scope {
    fn default() -> Self {
        Self {
            name: "toolspan".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

pub mod proto {
    //! prost messages for `opentelemetry.proto.*.v1`

    #[derive(Clone, PartialEq, prost::Message)]
    pub struct ExportTraceServiceRequest {
        #[prost(message, repeated, tag = "1")]
        pub resource_spans: Vec<ResourceSpans>,
    }

    #[derive(Clone, PartialEq, prost::Message)]
    pub struct ResourceSpans {
        #[prost(message, optional, tag = "1")]
        pub resource: Option<Resource>,
        #[prost(message, repeated, tag = "2")]
        pub scope_spans: Vec<ScopeSpans>,
    }

    #[derive(Clone, PartialEq, prost::Message)]
    pub struct Resource {
        #[prost(message, repeated, tag = "1")]
        pub attributes: Vec<KeyValue>,
    }

    #[derive(Clone, PartialEq, prost::Message)]
    pub struct ScopeSpans {
        #[prost(message, optional, tag = "1")]
        pub scope: Option<InstrumentationScope>,
        #[prost(message, repeated, tag = "2")]
        pub spans: Vec<Span>,
    }

    #[derive(Clone, PartialEq, prost::Message)]
    pub struct InstrumentationScope {
        #[prost(string, tag = "1")]
        pub name: String,
        #[prost(string, tag = "2")]
        pub version: String,
    }

    #[derive(Clone, PartialEq, prost::Message)]
    pub struct Span {
        #[prost(bytes = "vec", tag = "1")]
        pub trace_id: Vec<u8>,
        #[prost(bytes = "vec", tag = "2")]
        pub span_id: Vec<u8>,
        #[prost(bytes = "vec", tag = "4")]
        pub parent_span_id: Vec<u8>,
        #[prost(string, tag = "5")]
        pub name: String,
        #[prost(int32, tag = "6")]
        pub kind: i32,
        #[prost(fixed64, tag = "7")]
        pub start_time_unix_nano: u64,
        #[prost(fixed64, tag = "8")]
        pub end_time_unix_nano: u64,
        #[prost(message, repeated, tag = "9")]
        pub attributes: Vec<KeyValue>,
        #[prost(message, repeated, tag = "11")]
        pub events: Vec<Event>,
        #[prost(message, optional, tag = "15")]
        pub status: Option<Status>,
        #[prost(fixed32, tag = "16")]
        pub flags: u32,
    }

    #[derive(Clone, PartialEq, prost::Message)]
    pub struct Event {
        #[prost(fixed64, tag = "1")]
        pub time_unix_nano: u64,
        #[prost(string, tag = "2")]
        pub name: String,
        #[prost(message, repeated, tag = "3")]
        pub attributes: Vec<KeyValue>,
    }

    #[derive(Clone, PartialEq, prost::Message)]
    pub struct Status {
        #[prost(string, tag = "2")]
        pub message: String,
        #[prost(int32, tag = "3")]
        pub code: i32,
    }

    #[derive(Clone, PartialEq, prost::Message)]
    pub struct KeyValue {
        #[prost(string, tag = "1")]
        pub key: String,
        #[prost(message, optional, tag = "2")]
        pub value: Option<AnyValue>,
    }

    #[derive(Clone, PartialEq, prost::Message)]
    pub struct AnyValue {
        #[prost(oneof = "any_value::Value", tags = "1, 2, 3, 4, 5, 7")]
        pub value: Option<any_value::Value>,
    }

    pub mod any_value {
        #[derive(Clone, PartialEq, prost::Oneof)]
        pub enum Value {
            #[prost(string, tag = "1")]
            StringValue(String),
            #[prost(bool, tag = "2")]
            BoolValue(bool),
            #[prost(int64, tag = "3")]
            IntValue(i64),
            #[prost(double, tag = "4")]
            DoubleValue(f64),
            #[prost(message, tag = "5")]
            ArrayValue(super::ArrayValue),
            #[prost(bytes = "vec", tag = "7")]
            BytesValue(Vec<u8>),
        }
    }

    #[derive(Clone, PartialEq, prost::Message)]
    pub struct ArrayValue {
        #[prost(message, repeated, tag = "1")]
        pub values: Vec<AnyValue>,
    }

    impl KeyValue {
        pub fn string_value(&self) -> Option<&str> {
            match self.value.as_ref()?.value.as_ref()? {
                any_value::Value::StringValue(s) => Some(s),
                _ => None,
            }
        }
    }
}

fn unix_nanos(ts: &DateTime<Utc>) -> u64 {
    ts.timestamp_nanos_opt()
        .and_then(|n| u64::try_from(n).ok())
        .unwrap_or(0)
}

/// 属性按键排序，保证编码稳定
/// Attributes sorted by key so encodings are stable
fn sorted<'a>(
    attributes: impl IntoIterator<Item = (&'a String, &'a SpanAttribute)>,
) -> Vec<(&'a String, &'a SpanAttribute)> {
    let mut attrs: Vec<_> = attributes.into_iter().collect();
    attrs.sort_by(|a, b| a.0.cmp(b.0));
    attrs
}

// ---------------------------------------------------------------------------
// protobuf
// ---------------------------------------------------------------------------

fn proto_value(value: &SpanAttribute) -> proto::AnyValue {
    use proto::any_value::Value;

    let value = match value {
        SpanAttribute::String(s) => Value::StringValue(s.clone()),
        SpanAttribute::Int(i) => Value::IntValue(*i),
        SpanAttribute::Float(f) => Value::DoubleValue(*f),
        SpanAttribute::Bool(b) => Value::BoolValue(*b),
        SpanAttribute::StringArray(items) => Value::ArrayValue(proto::ArrayValue {
            values: items
                .iter()
                .map(|s| proto::AnyValue {
                    value: Some(Value::StringValue(s.clone())),
                })
                .collect(),
        }),
    };
    proto::AnyValue { value: Some(value) }
}

fn proto_attributes<'a>(
    attributes: impl IntoIterator<Item = (&'a String, &'a SpanAttribute)>,
) -> Vec<proto::KeyValue> {
    sorted(attributes)
        .into_iter()
        .map(|(key, value)| proto::KeyValue {
            key: key.clone(),
            value: Some(proto_value(value)),
        })
        .collect()
}

fn proto_event(event: &SpanEvent) -> proto::Event {
    proto::Event {
        time_unix_nano: unix_nanos(&event.timestamp),
        name: event.name.clone(),
        attributes: proto_attributes(&event.attributes),
    }
}

fn proto_span(span: &SpanData) -> proto::Span {
    proto::Span {
        trace_id: span.span_context.trace_id.as_bytes().to_vec(),
        span_id: span.span_context.span_id.as_bytes().to_vec(),
        parent_span_id: span
            .parent_span_context
            .as_ref()
            .map(|p| p.span_id.as_bytes().to_vec())
            .unwrap_or_default(),
        name: span.name.clone(),
        kind: span.kind.otlp_code(),
        start_time_unix_nano: unix_nanos(&span.start_time),
        end_time_unix_nano: span.end_time.as_ref().map(unix_nanos).unwrap_or(0),
        attributes: proto_attributes(&span.attributes),
        events: span.events.iter().map(proto_event).collect(),
        status: Some(proto::Status {
            message: span.status.message().to_string(),
            code: span.status.otlp_code(),
        }),
        flags: u32::from(span.span_context.trace_flags.as_u8()),
    }
}

/// 构建 protobuf 导出请求
/// Build the protobuf export request
pub fn to_proto_request(
    resource: &Resource,
    scope: &Scope,
    spans: &[SpanData],
) -> proto::ExportTraceServiceRequest {
    proto::ExportTraceServiceRequest {
        resource_spans: vec![proto::ResourceSpans {
            resource: Some(proto::Resource {
                attributes: resource
                    .attributes()
                    .iter()
                    .map(|(key, value)| proto::KeyValue {
                        key: key.clone(),
                        value: Some(proto_value(value)),
                    })
                    .collect(),
            }),
            scope_spans: vec![proto::ScopeSpans {
                scope: Some(proto::InstrumentationScope {
                    name: scope.name.clone(),
                    version: scope.version.clone(),
                }),
                spans: spans.iter().map(proto_span).collect(),
            }],
        }],
    }
}

/// 编码为 protobuf 字节
/// Encode to protobuf bytes
pub fn encode_proto(resource: &Resource, scope: &Scope, spans: &[SpanData]) -> Vec<u8> {
    prost::Message::encode_to_vec(&to_proto_request(resource, scope, spans))
}

// ---------------------------------------------------------------------------
// JSON
// ---------------------------------------------------------------------------

fn json_value(value: &SpanAttribute) -> Value {
    match value {
        SpanAttribute::String(s) => json!({ "stringValue": s }),
        SpanAttribute::Int(i) => json!({ "intValue": i.to_string() }),
        SpanAttribute::Float(f) => json!({ "doubleValue": f }),
        SpanAttribute::Bool(b) => json!({ "boolValue": b }),
        SpanAttribute::StringArray(items) => json!({
            "arrayValue": {
                "values": items.iter().map(|s| json!({ "stringValue": s })).collect::<Vec<_>>()
            }
        }),
    }
}

fn json_attributes<'a>(
    attributes: impl IntoIterator<Item = (&'a String, &'a SpanAttribute)>,
) -> Vec<Value> {
    sorted(attributes)
        .into_iter()
        .map(|(key, value)| json!({ "key": key, "value": json_value(value) }))
        .collect()
}

fn json_span(span: &SpanData) -> Value {
    let mut out = json!({
        "traceId": span.span_context.trace_id.to_hex(),
        "spanId": span.span_context.span_id.to_hex(),
        "name": span.name,
        "kind": span.kind.otlp_code(),
        "startTimeUnixNano": unix_nanos(&span.start_time).to_string(),
        "endTimeUnixNano": span.end_time.as_ref().map(unix_nanos).unwrap_or(0).to_string(),
        "attributes": json_attributes(&span.attributes),
        "events": span.events.iter().map(|e| json!({
            "timeUnixNano": unix_nanos(&e.timestamp).to_string(),
            "name": e.name,
            "attributes": json_attributes(&e.attributes),
        })).collect::<Vec<_>>(),
        "status": {
            "code": span.status.otlp_code(),
            "message": span.status.message(),
        },
        "flags": span.span_context.trace_flags.as_u8(),
    });

    if let (Some(parent), Some(obj)) = (&span.parent_span_context, out.as_object_mut()) {
        obj.insert(
            "parentSpanId".to_string(),
            Value::String(parent.span_id.to_hex()),
        );
    }
    out
}

/// 构建 JSON 导出请求
/// Build the JSON export request
pub fn to_json_request(resource: &Resource, scope: &Scope, spans: &[SpanData]) -> Value {
    json!({
        "resourceSpans": [{
            "resource": {
                "attributes": resource.attributes().iter().map(|(key, value)| {
                    json!({ "key": key, "value": json_value(value) })
                }).collect::<Vec<_>>()
            },
            "scopeSpans": [{
                "scope": {
                    "name": scope.name,
                    "version": scope.version,
                },
                "spans": spans.iter().map(json_span).collect::<Vec<_>>()
            }]
        }]
    })
}
