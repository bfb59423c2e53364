//! Fleetgrade common library
//!
//! Hardware report extraction and health grading for a fleet of desktops:
//! - `extract`: AIDA64 HTML export -> [`RawFacts`]
//! - `classify`: rule table -> category 1/2/3 with problem text
//! - `batch`: directory runner with cancellation and live results
//! - `store`: SQLite persistence keyed by report file name
//! - `export`: CSV deliverables and batch statistics

pub mod batch;
pub mod classify;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod export;
pub mod extract;
pub mod facts;
pub mod sort;
pub mod store;

pub use batch::{BatchOutcome, BatchProgress, BatchRunner, CancelToken, FileFailure};
pub use classify::{Classification, Classifier};
pub use config::{FleetConfig, RuleConfig};
pub use diagnostics::{DiagnosticEvent, DiagnosticKind, DiagnosticSink, LogLevel, MemorySink, NullSink, TracingSink};
pub use error::{FleetError, Result};
pub use extract::{decode_report, ReportExtractor};
pub use facts::{Category, ClassifiedRecord, RawFacts, RecordField, SlotCount, SmartStatus, HEALTHY_MESSAGE, NOT_FOUND};
pub use store::RecordStore;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
