//! provcheck: validation, enrichment and quality scoring for healthcare
//! provider directories.
//!
//! Records flow through four stages: field validation, enrichment from
//! reference sources, quality scoring, and review-queue prioritization.
//!
//! # Core Principles
//!
//! - **Provenance everywhere**: every value records where it came from and how confident we are
//! - **Failures are data**: bad fields become reason codes, not errors
//! - **Bounded work**: batches run with a fixed number of records in flight
//!
//! # Example
//!
//! ```no_run
//! use provcheck::{Pipeline, PipelineConfig, RecordParser};
//!
//! # async fn example() -> provcheck::Result<()> {
//! let (records, _meta) = RecordParser::new().parse_file("providers.csv")?;
//! let pipeline = Pipeline::new(PipelineConfig::default())?;
//! let report = pipeline.run(records).await;
//!
//! println!("Auto-validated: {}", report.summary.auto_validated);
//! println!("Queued for review: {}", report.queue.len());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod conflict;
pub mod enrichment;
pub mod error;
pub mod export;
pub mod ingest;
pub mod pipeline;
pub mod quality;
pub mod record;
pub mod reference;
pub mod review;
pub mod validation;

pub use config::{PipelineConfig, ScoringConfig, SourceSpec};
pub use conflict::{ConflictKind, FieldConflict};
pub use enrichment::{Candidate, EnrichmentOutcome, MockSource, ReferenceSource, Resolver};
pub use error::{ProvcheckError, Result};
pub use ingest::{RecordParser, SourceMetadata};
pub use pipeline::{BatchReport, BatchStats, BatchSummary, Pipeline, PipelineResult, ResultStatus};
pub use quality::{PriorityLevel, QualityReport, QualityScorer};
pub use record::{FieldName, FieldValue, Provenance, ProviderRecord};
pub use review::{Prioritizer, ReviewQueue, ReviewQueueEntry};
pub use validation::{FieldVerdict, ReasonCode, ValidationEngine, ValidationResult, is_valid_npi};
