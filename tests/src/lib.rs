//! toolspan Testing Framework
//!
//! Utilities for exercising traced agents deterministically:
//! - [`ScriptedEngine`] replays a fixed event script and drives a
//!   [`ManualClock`] between events
//! - [`RecordingExporter`] / [`RecordingBackend`] keep every exported span in
//!   memory
//! - [`MockTool`] records its inputs and returns a stubbed result

pub mod engine;
pub mod exporter;
pub mod tools;

pub use engine::{ManualClock, ScriptedEngine, Step};
pub use exporter::{RecordingBackend, RecordingExporter};
pub use tools::MockTool;
