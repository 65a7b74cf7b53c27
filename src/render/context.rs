//! Render context: where diagnostics of a render go.
//!
//! The library never installs a global logger. Every render receives a
//! `RenderContext` carrying a [`LogSink`]; the CLI uses [`TracingSink`],
//! tests use [`MemorySink`] to assert on what was reported.

use std::fmt;
use std::sync::{Arc, Mutex};

/// Severity of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        };
        f.write_str(name)
    }
}

/// One reported event, scoped to a record and optionally a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub level: Level,
    pub record: Option<String>,
    pub field: Option<String>,
    pub message: String,
}

/// Destination for diagnostics. Shared by all workers of a batch.
pub trait LogSink: Send + Sync {
    fn log(&self, diagnostic: Diagnostic);
}

/// Forwards diagnostics to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log(&self, d: Diagnostic) {
        let record = d.record.as_deref().unwrap_or("-");
        let field = d.field.as_deref().unwrap_or("-");
        match d.level {
            Level::Debug => tracing::debug!(record, field, "{}", d.message),
            Level::Info => tracing::info!(record, field, "{}", d.message),
            Level::Warn => tracing::warn!(record, field, "{}", d.message),
            Level::Error => tracing::error!(record, field, "{}", d.message),
        }
    }
}

/// Collects diagnostics in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    entries: Mutex<Vec<Diagnostic>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything logged so far.
    pub fn entries(&self) -> Vec<Diagnostic> {
        match self.entries.lock() {
            Ok(entries) => entries.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Entries at `level` or above.
    pub fn at_least(&self, level: Level) -> Vec<Diagnostic> {
        self.entries().into_iter().filter(|d| d.level >= level).collect()
    }

    /// Entries reported for one field key.
    pub fn for_field(&self, key: &str) -> Vec<Diagnostic> {
        self.entries()
            .into_iter()
            .filter(|d| d.field.as_deref() == Some(key))
            .collect()
    }
}

impl LogSink for MemorySink {
    fn log(&self, diagnostic: Diagnostic) {
        match self.entries.lock() {
            Ok(mut entries) => entries.push(diagnostic),
            Err(poisoned) => poisoned.into_inner().push(diagnostic),
        }
    }
}

/// Per-render diagnostics handle.
#[derive(Clone)]
pub struct RenderContext {
    sink: Arc<dyn LogSink>,
    record: Option<String>,
}

impl fmt::Debug for RenderContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderContext")
            .field("record", &self.record)
            .finish_non_exhaustive()
    }
}

impl RenderContext {
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self { sink, record: None }
    }

    /// Context that forwards to `tracing`.
    pub fn tracing() -> Self {
        Self::new(Arc::new(TracingSink))
    }

    /// Same sink, scoped to one record.
    pub fn for_record(&self, record: impl Into<String>) -> Self {
        Self {
            sink: Arc::clone(&self.sink),
            record: Some(record.into()),
        }
    }

    pub fn record(&self) -> Option<&str> {
        self.record.as_deref()
    }

    pub fn emit(&self, level: Level, field: Option<&str>, message: impl Into<String>) {
        self.sink.log(Diagnostic {
            level,
            record: self.record.clone(),
            field: field.map(str::to_string),
            message: message.into(),
        });
    }

    pub fn debug(&self, message: impl Into<String>) {
        self.emit(Level::Debug, None, message);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.emit(Level::Info, None, message);
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.emit(Level::Warn, None, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.emit(Level::Error, None, message);
    }

    pub fn field_warn(&self, field: &str, message: impl Into<String>) {
        self.emit(Level::Warn, Some(field), message);
    }

    pub fn field_error(&self, field: &str, message: impl Into<String>) {
        self.emit(Level::Error, Some(field), message);
    }
}
