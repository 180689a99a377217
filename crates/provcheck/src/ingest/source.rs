//! Input file metadata.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata about an ingested provider file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceMetadata {
    /// File name without path.
    pub file: String,
    /// Full path to the file.
    pub path: PathBuf,
    /// SHA-256 hash of the file contents.
    pub hash: String,
    /// File size in bytes.
    pub size_bytes: u64,
    /// Detected format (csv, tsv, json, ...).
    pub format: String,
    /// Number of records read.
    pub record_count: usize,
    /// Input columns that map to a record field.
    pub mapped_columns: Vec<String>,
    /// Input columns that were ignored.
    pub unmapped_columns: Vec<String>,
    /// When the file was read.
    pub ingested_at: DateTime<Utc>,
}

impl SourceMetadata {
    /// Create metadata for a file that has been read.
    pub fn new(path: PathBuf, hash: String, size_bytes: u64, format: impl Into<String>) -> Self {
        let file = path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self {
            file,
            path,
            hash,
            size_bytes,
            format: format.into(),
            record_count: 0,
            mapped_columns: Vec::new(),
            unmapped_columns: Vec::new(),
            ingested_at: Utc::now(),
        }
    }
}
