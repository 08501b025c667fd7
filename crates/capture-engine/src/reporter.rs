//! Structured error reporting.
//!
//! Every failure worth diagnosing ends up here as an [`ErrorRecord`]: the
//! message, the chain of underlying causes, and a free-form context map.

use std::fmt;
use std::sync::Mutex;

use serde::Serialize;
use serde_json::{Map, Value};

/// Where an error was caught.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorSource {
    /// The view failed to render; the session is abandoned.
    Render,
    /// A panic outside any boundary.
    Global,
    /// A background task panicked or returned an error nobody awaited.
    Unhandled,
    /// The capture pipeline or delivery failed.
    Capture,
    /// The media source failed to load.
    Load,
}

impl fmt::Display for ErrorSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ErrorSource::Render => "render",
            ErrorSource::Global => "global",
            ErrorSource::Unhandled => "unhandled",
            ErrorSource::Capture => "capture",
            ErrorSource::Load => "load",
        })
    }
}

/// One reported error.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorRecord {
    pub source: ErrorSource,
    pub message: String,
    /// Causes from outermost to innermost, the native stand-in for a stack.
    pub detail: Vec<String>,
    pub context: Map<String, Value>,
    /// RFC 3339 wall-clock time the record was created.
    pub reported_at: String,
}

impl ErrorRecord {
    pub fn new(source: ErrorSource, message: impl Into<String>) -> Self {
        Self {
            source,
            message: message.into(),
            detail: Vec::new(),
            context: Map::new(),
            reported_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Build a record from an error, walking its `source()` chain.
    pub fn from_error(source: ErrorSource, error: &(dyn std::error::Error + 'static)) -> Self {
        let mut record = Self::new(source, error.to_string());
        let mut cause = error.source();
        while let Some(inner) = cause {
            record.detail.push(inner.to_string());
            cause = inner.source();
        }
        record
    }

    pub fn with_detail(mut self, line: impl Into<String>) -> Self {
        self.detail.push(line.into());
        self
    }

    pub fn with_context(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.context.insert(key.to_string(), value.into());
        self
    }
}

/// Sink for error records.
pub trait ErrorReporter: Send + Sync {
    fn report(&self, record: ErrorRecord);
}

/// Emits every record as a `tracing` error event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn report(&self, record: ErrorRecord) {
        let context = Value::Object(record.context);
        tracing::error!(
            source = %record.source,
            detail = ?record.detail,
            context = %context,
            reported_at = %record.reported_at,
            "{}",
            record.message
        );
    }
}

/// Keeps records in memory, for embedding and tests.
#[derive(Debug, Default)]
pub struct MemoryReporter {
    records: Mutex<Vec<ErrorRecord>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<ErrorRecord> {
        self.records
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    pub fn count(&self, source: ErrorSource) -> usize {
        self.records
            .lock()
            .map(|r| r.iter().filter(|rec| rec.source == source).count())
            .unwrap_or(0)
    }
}

impl ErrorReporter for MemoryReporter {
    fn report(&self, record: ErrorRecord) {
        if let Ok(mut records) = self.records.lock() {
            records.push(record);
        }
    }
}
