//! Error types for the provcheck library.

use std::path::PathBuf;
use thiserror::Error;

use crate::record::FieldName;

/// Main error type for provcheck operations.
///
/// Field-level validation failures and scoring contradictions are data, not
/// errors; they live in `ValidationResult` and `QualityReport`.
#[derive(Debug, Error)]
pub enum ProvcheckError {
    /// Error reading or accessing a file.
    #[error("IO error for '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error parsing provider input data.
    #[error("Parse error at row {row}, column {column}: {message}")]
    Parse {
        row: usize,
        column: usize,
        message: String,
    },

    /// Error from the CSV library.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Empty file or no records to process.
    #[error("Empty data: {0}")]
    EmptyData(String),

    /// Configuration error. The only error class that is fatal at startup.
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML configuration parse error.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Attempt to overwrite a field that is fixed once assigned.
    #[error("Field '{0}' is immutable once assigned")]
    ImmutableField(FieldName),

    /// A reference source adapter failed a lookup.
    #[error("Reference source '{source_name}' failed: {message}")]
    Source {
        source_name: String,
        message: String,
    },

    /// Error saving or loading pipeline output.
    #[error("Persistence error: {0}")]
    Persistence(String),
}

impl ProvcheckError {
    /// Build a source failure for an adapter.
    pub fn source(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        ProvcheckError::Source {
            source_name: source_name.into(),
            message: message.into(),
        }
    }
}

/// Result type alias for provcheck operations.
pub type Result<T> = std::result::Result<T, ProvcheckError>;
