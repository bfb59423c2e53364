//! Batch runner - one directory of reports in, sorted records out
//!
//! Files are processed one at a time. Each result is handed to the caller
//! as soon as it exists, so a live view can show it out of order. The
//! cancel token is checked between files; records already produced are
//! kept. The final list is sorted by file name, numbers compared by value.

use crate::classify::Classifier;
use crate::config::RuleConfig;
use crate::diagnostics::{DiagnosticKind, DiagnosticSink};
use crate::error::{FleetError, Result};
use crate::extract::ReportExtractor;
use crate::facts::ClassifiedRecord;
use crate::sort::natural_cmp;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use walkdir::WalkDir;

/// Cooperative cancellation flag, cheap to clone across threads
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A report that could not be processed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFailure {
    pub file_name: String,
    pub reason: String,
}

/// Live progress, emitted while the batch runs
#[derive(Debug)]
pub enum BatchProgress<'a> {
    Started { total: usize },
    Processed { done: usize, total: usize, record: &'a ClassifiedRecord },
    Failed { done: usize, total: usize, failure: &'a FileFailure },
}

/// Everything a batch produced
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    /// Sorted by file name
    pub records: Vec<ClassifiedRecord>,
    pub failures: Vec<FileFailure>,
    pub total_files: usize,
    pub cancelled: bool,
}

impl BatchOutcome {
    pub fn is_complete(&self) -> bool {
        !self.cancelled && self.failures.is_empty()
    }
}

/// `.htm` and `.html` files directly inside `dir`, in natural order
pub fn list_report_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(FleetError::io(
            dir,
            std::io::Error::new(std::io::ErrorKind::NotFound, "report directory not found"),
        ));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(dir).to_path_buf();
            let io = e
                .into_io_error()
                .unwrap_or_else(|| std::io::Error::new(std::io::ErrorKind::Other, "directory walk failed"));
            FleetError::io(path, io)
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let is_report = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("htm") || e.eq_ignore_ascii_case("html"))
            .unwrap_or(false);
        if is_report {
            files.push(entry.into_path());
        }
    }

    files.sort_by(|a, b| natural_cmp(&file_name_of(a), &file_name_of(b)));
    Ok(files)
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Extract then classify, file by file
pub struct BatchRunner {
    extractor: ReportExtractor,
    classifier: Classifier,
    sink: Arc<dyn DiagnosticSink>,
}

impl BatchRunner {
    pub fn new(config: Arc<RuleConfig>, sink: Arc<dyn DiagnosticSink>) -> Self {
        Self {
            extractor: ReportExtractor::new(config.clone(), sink.clone()),
            classifier: Classifier::new(config, sink.clone()),
            sink,
        }
    }

    /// Use a prepared classifier, e.g. one pinned to a reference date
    pub fn with_classifier(mut self, classifier: Classifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn extractor(&self) -> &ReportExtractor {
        &self.extractor
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// Extract and classify one report
    pub fn process_file(&self, path: &Path) -> Result<ClassifiedRecord> {
        let facts = self.extractor.extract_file(path)?;
        Ok(self.classifier.classify_record(facts))
    }

    /// Process every report in `dir`
    pub fn run<F>(&self, dir: &Path, cancel: &CancelToken, on_progress: F) -> Result<BatchOutcome>
    where
        F: FnMut(BatchProgress<'_>),
    {
        let files = list_report_files(dir)?;
        Ok(self.run_files(&files, cancel, on_progress))
    }

    /// Process the given files; per-file errors never stop the batch
    pub fn run_files<F>(&self, files: &[PathBuf], cancel: &CancelToken, mut on_progress: F) -> BatchOutcome
    where
        F: FnMut(BatchProgress<'_>),
    {
        let total = files.len();
        let mut outcome = BatchOutcome {
            total_files: total,
            ..Default::default()
        };
        on_progress(BatchProgress::Started { total });

        for (i, path) in files.iter().enumerate() {
            if cancel.is_cancelled() {
                outcome.cancelled = true;
                self.sink.warn(
                    DiagnosticKind::BatchCancelled,
                    &file_name_of(path),
                    format!("batch cancelled after {} of {} files", i, total),
                );
                break;
            }

            let file_name = file_name_of(path);
            let done = i + 1;
            match self.process_file(path) {
                Ok(record) => {
                    self.sink.info(
                        DiagnosticKind::FileProcessed,
                        &file_name,
                        format!("category {}: {}", record.category, record.problems),
                    );
                    on_progress(BatchProgress::Processed {
                        done,
                        total,
                        record: &record,
                    });
                    outcome.records.push(record);
                }
                Err(err) => {
                    let kind = match err {
                        FleetError::MissingMandatorySection { .. } => DiagnosticKind::MissingMandatorySection,
                        _ => DiagnosticKind::FileUnreadable,
                    };
                    self.sink.error(kind, &file_name, err.to_string());
                    let failure = FileFailure {
                        file_name,
                        reason: err.to_string(),
                    };
                    on_progress(BatchProgress::Failed {
                        done,
                        total,
                        failure: &failure,
                    });
                    outcome.failures.push(failure);
                }
            }
        }

        outcome
            .records
            .sort_by(|a, b| natural_cmp(a.file_name(), b.file_name()));
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::MemorySink;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_cancel_token_shared_between_clones() {
        let token = CancelToken::new();
        let other = token.clone();
        assert!(!token.is_cancelled());
        other.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_list_report_files_filters_and_sorts() {
        let dir = TempDir::new().unwrap();
        for name in ["PC-10.htm", "PC-2.HTML", "notes.txt", "PC-1.htm"] {
            fs::write(dir.path().join(name), "x").unwrap();
        }
        fs::create_dir(dir.path().join("nested.htm")).unwrap();

        let names: Vec<String> = list_report_files(dir.path())
            .unwrap()
            .iter()
            .map(|p| file_name_of(p))
            .collect();
        assert_eq!(names, vec!["PC-1.htm", "PC-2.HTML", "PC-10.htm"]);
    }

    #[test]
    fn test_missing_directory_is_error() {
        let dir = TempDir::new().unwrap();
        let runner = BatchRunner::new(Arc::new(RuleConfig::default()), MemorySink::new());
        let result = runner.run(&dir.path().join("absent"), &CancelToken::new(), |_| {});
        assert!(result.is_err());
    }
}
