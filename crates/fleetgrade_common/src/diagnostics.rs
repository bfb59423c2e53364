//! Diagnostics - injected event sink for the pipeline
//!
//! The extractor, classifier and batch runner never log through a global.
//! They receive an `Arc<dyn DiagnosticSink>` and emit `DiagnosticEvent`s:
//! - `TracingSink` forwards to `tracing` (used by the CLI)
//! - `MemorySink` keeps events in memory (used by tests)
//! - `NullSink` drops everything

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex};

/// Log level enum
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug = 1,
    #[default]
    Info = 2,
    Warn = 3,
    Error = 4,
}

/// What happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    FileProcessed,
    HeuristicFallback,
    UnparseableNumeric,
    AmbiguousDate,
    MissingMandatorySection,
    FileUnreadable,
    BatchCancelled,
}

impl DiagnosticKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticKind::FileProcessed => "file_processed",
            DiagnosticKind::HeuristicFallback => "heuristic_fallback",
            DiagnosticKind::UnparseableNumeric => "unparseable_numeric",
            DiagnosticKind::AmbiguousDate => "ambiguous_date",
            DiagnosticKind::MissingMandatorySection => "missing_mandatory_section",
            DiagnosticKind::FileUnreadable => "file_unreadable",
            DiagnosticKind::BatchCancelled => "batch_cancelled",
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single diagnostic event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticEvent {
    pub level: LogLevel,
    pub kind: DiagnosticKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    pub message: String,
}

impl DiagnosticEvent {
    pub fn new(level: LogLevel, kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            level,
            kind,
            file_name: None,
            message: message.into(),
        }
    }

    /// Attach the report file this event concerns
    pub fn for_file(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }
}

/// Receiver of pipeline diagnostics
pub trait DiagnosticSink: Send + Sync {
    fn emit(&self, event: DiagnosticEvent);

    fn info(&self, kind: DiagnosticKind, file_name: &str, message: String) {
        self.emit(DiagnosticEvent::new(LogLevel::Info, kind, message).for_file(file_name));
    }

    fn warn(&self, kind: DiagnosticKind, file_name: &str, message: String) {
        self.emit(DiagnosticEvent::new(LogLevel::Warn, kind, message).for_file(file_name));
    }

    fn error(&self, kind: DiagnosticKind, file_name: &str, message: String) {
        self.emit(DiagnosticEvent::new(LogLevel::Error, kind, message).for_file(file_name));
    }
}

/// Forwards events to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn emit(&self, event: DiagnosticEvent) {
        let file = event.file_name.as_deref().unwrap_or("-");
        let kind = event.kind.as_str();
        match event.level {
            LogLevel::Debug => tracing::debug!(kind, file, "{}", event.message),
            LogLevel::Info => tracing::info!(kind, file, "{}", event.message),
            LogLevel::Warn => tracing::warn!(kind, file, "{}", event.message),
            LogLevel::Error => tracing::error!(kind, file, "{}", event.message),
        }
    }
}

/// Discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn emit(&self, _event: DiagnosticEvent) {}
}

/// Collects events in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<DiagnosticEvent>>,
}

impl MemorySink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<DiagnosticEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.events().iter().filter(|e| e.kind == kind).count()
    }
}

impl DiagnosticSink for MemorySink {
    fn emit(&self, event: DiagnosticEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_ordering_and_serde() {
        assert!(LogLevel::Warn > LogLevel::Info);
        assert!(LogLevel::Error > LogLevel::Warn);
        assert_eq!(serde_json::to_string(&LogLevel::Warn).unwrap(), "\"warn\"");
    }

    #[test]
    fn test_memory_sink_records_in_order() {
        let sink = MemorySink::new();
        sink.info(DiagnosticKind::FileProcessed, "a.htm", "done".to_string());
        sink.warn(DiagnosticKind::HeuristicFallback, "a.htm", "guessed".to_string());

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].level, LogLevel::Info);
        assert_eq!(events[1].kind, DiagnosticKind::HeuristicFallback);
        assert_eq!(events[1].file_name.as_deref(), Some("a.htm"));
        assert_eq!(sink.count(DiagnosticKind::HeuristicFallback), 1);
    }

    #[test]
    fn test_sink_is_object_safe() {
        let sink: Arc<dyn DiagnosticSink> = Arc::new(NullSink);
        sink.error(DiagnosticKind::FileUnreadable, "x.htm", "gone".to_string());
    }
}
