//! Writing review queues, results and directory snapshots to disk.

use std::fmt;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

use serde::Serialize;

use crate::error::{ProvcheckError, Result};
use crate::pipeline::{PipelineResult, ResultStatus};
use crate::record::FieldName;
use crate::review::ReviewQueue;

/// Columns of the directory snapshot.
pub const DIRECTORY_COLUMNS: [&str; 10] = [
    "npi",
    "name",
    "specialty",
    "phone",
    "email",
    "city",
    "state",
    "status",
    "confidence",
    "priority",
];

/// Output format for exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    Csv,
    #[default]
    Json,
}

impl ExportFormat {
    /// Guess the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        ext.parse().ok()
    }
}

impl FromStr for ExportFormat {
    type Err = ProvcheckError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            other => Err(ProvcheckError::Config(format!(
                "unknown export format '{}' (expected csv or json)",
                other
            ))),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        })
    }
}

/// Status label for the directory snapshot.
pub fn status_label(result: &PipelineResult) -> &'static str {
    if result.status == ResultStatus::Degraded {
        "degraded"
    } else if result.needs_review {
        "needs_review"
    } else {
        "validated"
    }
}

/// Write the review queue as CSV.
pub fn write_queue_csv<W: Write>(queue: &ReviewQueue, writer: W) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(["priority_rank", "record_id", "risk_score", "priority", "confidence", "reasons"])?;
    for entry in &queue.entries {
        csv.write_record([
            entry.priority_rank.to_string(),
            entry.record_id.clone(),
            format!("{:.4}", entry.risk_score),
            entry.priority.as_str().to_string(),
            format!("{:.4}", entry.confidence),
            entry.reasons.join("; "),
        ])?;
    }
    csv.flush().map_err(|e| ProvcheckError::Persistence(format!("Failed to flush queue: {}", e)))
}

/// Write the review queue as pretty JSON.
pub fn write_queue_json<W: Write>(queue: &ReviewQueue, writer: W) -> Result<()> {
    serde_json::to_writer_pretty(writer, queue)
        .map_err(|e| ProvcheckError::Persistence(format!("Failed to serialize review queue: {}", e)))
}

/// Write a directory snapshot of processed records as CSV.
pub fn write_directory_csv<W: Write>(results: &[PipelineResult], writer: W) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(DIRECTORY_COLUMNS)?;
    for result in results {
        let record = &result.record;
        let value = |field| record.value(field).unwrap_or_default().to_string();
        csv.write_record([
            value(FieldName::Npi),
            value(FieldName::Name),
            value(FieldName::Specialty),
            value(FieldName::Phone),
            value(FieldName::Email),
            value(FieldName::City),
            value(FieldName::State),
            status_label(result).to_string(),
            format!("{:.4}", result.quality_report.confidence()),
            result.quality_report.priority().as_str().to_string(),
        ])?;
    }
    csv.flush().map_err(|e| ProvcheckError::Persistence(format!("Failed to flush directory: {}", e)))
}

/// Save the review queue to a file.
pub fn save_queue(queue: &ReviewQueue, path: impl AsRef<Path>, format: ExportFormat) -> Result<()> {
    let writer = create(path.as_ref())?;
    match format {
        ExportFormat::Csv => write_queue_csv(queue, writer),
        ExportFormat::Json => write_queue_json(queue, writer),
    }
}

/// Save per-record results. JSON keeps everything; CSV writes a directory snapshot.
pub fn save_results(results: &[PipelineResult], path: impl AsRef<Path>, format: ExportFormat) -> Result<()> {
    let writer = create(path.as_ref())?;
    match format {
        ExportFormat::Csv => write_directory_csv(results, writer),
        ExportFormat::Json => write_json(results, writer, "results"),
    }
}

/// Load results saved as JSON.
pub fn load_results(path: impl AsRef<Path>) -> Result<Vec<PipelineResult>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| {
        ProvcheckError::Persistence(format!("Failed to open file '{}': {}", path.display(), e))
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|e| {
        ProvcheckError::Persistence(format!("Failed to parse results '{}': {}", path.display(), e))
    })
}

fn write_json<T: Serialize + ?Sized, W: Write>(value: &T, writer: W, what: &str) -> Result<()> {
    serde_json::to_writer_pretty(writer, value)
        .map_err(|e| ProvcheckError::Persistence(format!("Failed to serialize {}: {}", what, e)))
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| {
                ProvcheckError::Persistence(format!("Failed to create directory '{}': {}", parent.display(), e))
            })?;
        }
    }
    let file = File::create(path).map_err(|e| {
        ProvcheckError::Persistence(format!("Failed to create file '{}': {}", path.display(), e))
    })?;
    Ok(BufWriter::new(file))
}
