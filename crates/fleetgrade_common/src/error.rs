//! Error types for the report pipeline
//!
//! Only whole-file problems are errors. A field that cannot be found or
//! parsed degrades to a sentinel value and a diagnostic event instead.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by extraction, persistence, configuration and export
#[derive(Debug, Error)]
pub enum FleetError {
    /// The report has no overview section, nothing can be extracted
    #[error("{file_name}: mandatory overview section is missing")]
    MissingMandatorySection { file_name: String },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("database error: {0}")]
    Persistence(#[from] rusqlite::Error),

    #[error("unknown record field: {0}")]
    UnknownField(String),

    #[error("invalid value {value:?} for field {field}")]
    InvalidFieldValue { field: String, value: String },

    #[error("CSV write failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

impl FleetError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        FleetError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, FleetError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_section_names_file() {
        let err = FleetError::MissingMandatorySection {
            file_name: "PC-042.htm".to_string(),
        };
        assert!(err.to_string().contains("PC-042.htm"));
    }

    #[test]
    fn test_io_error_names_path() {
        let err = FleetError::io(
            "reports/PC-7.htm",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(err.to_string().contains("reports/PC-7.htm"));
    }
}
