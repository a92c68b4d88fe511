//! Trace Context 定义
//! Trace Context Definition
//!
//! Identifiers are random and never all-zero; OTLP collectors drop spans
//! whose trace or span id is zero.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! random_id {
    ($(#[$meta:meta])* $name:ident, $len:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name([u8; $len]);

        impl $name {
            pub const INVALID: $name = $name([0u8; $len]);

            /// Fresh random id
            pub fn new() -> Self {
                let mut bytes = [0u8; $len];
                while bytes.iter().all(|&b| b == 0) {
                    rand::thread_rng().fill(&mut bytes);
                }
                Self(bytes)
            }

            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }

            /// Lowercase hex, as used by the OTLP JSON encoding
            pub fn to_hex(&self) -> String {
                hex::encode(self.0)
            }

            pub fn is_valid(&self) -> bool {
                self.0.iter().any(|&b| b != 0)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.to_hex())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.to_hex())
            }
        }
    };
}

random_id!(
    /// 16 字节 Trace ID
    /// 16-byte trace id shared by every span of one agent run
    TraceId,
    16
);

random_id!(
    /// 8 字节 Span ID
    /// 8-byte span id
    SpanId,
    8
);

/// 采样标志
/// Sampling flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceFlags(u8);

impl TraceFlags {
    pub const SAMPLED: TraceFlags = TraceFlags(0x01);
    pub const NONE: TraceFlags = TraceFlags(0x00);

    pub fn is_sampled(&self) -> bool {
        self.0 & Self::SAMPLED.0 != 0
    }

    pub fn as_u8(&self) -> u8 {
        self.0
    }
}

impl Default for TraceFlags {
    fn default() -> Self {
        Self::SAMPLED
    }
}

/// Span 的不可变上下文
/// Immutable identity of a span
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanContext {
    pub trace_id: TraceId,
    pub span_id: SpanId,
    pub trace_flags: TraceFlags,
}

impl SpanContext {
    /// Start of a new trace
    pub fn new_root() -> Self {
        Self {
            trace_id: TraceId::new(),
            span_id: SpanId::new(),
            trace_flags: TraceFlags::SAMPLED,
        }
    }

    /// Sibling id in the same trace, for a child span
    pub fn new_child(&self) -> Self {
        Self {
            trace_id: self.trace_id,
            span_id: SpanId::new(),
            trace_flags: self.trace_flags,
        }
    }

    /// Context of a non-recording span
    pub fn invalid() -> Self {
        Self {
            trace_id: TraceId::INVALID,
            span_id: SpanId::INVALID,
            trace_flags: TraceFlags::NONE,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.trace_id.is_valid() && self.span_id.is_valid()
    }

    pub fn is_sampled(&self) -> bool {
        self.trace_flags.is_sampled()
    }
}

impl Default for SpanContext {
    fn default() -> Self {
        Self::invalid()
    }
}
