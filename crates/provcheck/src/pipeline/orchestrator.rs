//! Per-record stage sequencing and bounded batch execution.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::enrichment::{EnrichmentOutcome, ReferenceSource, Resolver, build_sources};
use crate::error::Result;
use crate::quality::{QualityReport, QualityScorer};
use crate::record::ProviderRecord;
use crate::review::{Prioritizer, ReviewQueue};
use crate::validation::{ValidationEngine, ValidationResult};

use super::stats::{BatchStats, BatchSummary};

/// Pipeline stage that can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Enrichment,
    Merge,
    Scoring,
    /// The record's task failed outside a known stage.
    Pipeline,
}

/// An unexpected failure recorded on a result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageError {
    pub stage: Stage,
    pub message: String,
}

/// Whether a record was fully scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    Scored,
    Degraded,
}

/// Everything the pipeline produced for one record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineResult {
    /// The record after enrichment.
    pub record: ProviderRecord,
    pub validation: ValidationResult,
    pub enrichment: EnrichmentOutcome,
    pub quality_report: QualityReport,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<StageError>,
    pub status: ResultStatus,
    /// Below the acceptance threshold or terminally failed.
    pub needs_review: bool,
}

/// Results of one batch call.
#[derive(Debug, Clone)]
pub struct BatchRun {
    /// Results in input order, one per started record.
    pub results: Vec<PipelineResult>,
    /// Records never started because of cancellation.
    pub skipped: usize,
    pub cancelled: bool,
}

/// Results, summary and review queue for a whole run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub results: Vec<PipelineResult>,
    pub summary: BatchSummary,
    pub queue: ReviewQueue,
}

struct Stages {
    validation: ValidationEngine,
    resolver: Resolver,
    scorer: QualityScorer,
    prioritizer: Prioritizer,
}

impl Stages {
    /// Validate, enrich, merge and score one record, strictly in that order.
    async fn run(self: Arc<Self>, mut record: ProviderRecord) -> PipelineResult {
        let validation = self.validation.validate(&record);
        debug!(record_id = %record.id, failures = validation.reasons().len(), "validated");

        let mut errors = Vec::new();
        let enrichment = {
            let partial = Arc::new(Mutex::new(EnrichmentOutcome::empty(&record.id)));
            let task = {
                let stages = Arc::clone(&self);
                let partial = Arc::clone(&partial);
                let snapshot = record.clone();
                let checked = validation.clone();
                tokio::spawn(async move { stages.resolver.enrich_into(&snapshot, &checked, &partial).await })
            };
            if let Err(e) = task.await {
                let message = join_error_message(e);
                warn!(record_id = %record.id, error = %message, "enrichment failed");
                errors.push(StageError {
                    stage: Stage::Enrichment,
                    message,
                });
            }
            // Lookups that finished before a failure are kept.
            let mut shared = partial.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *shared, EnrichmentOutcome::empty(&record.id))
        };

        match enrichment.apply(&mut record) {
            Ok(applied) => debug!(record_id = %record.id, applied, "enriched"),
            Err(e) => {
                warn!(record_id = %record.id, error = %e, "merge failed");
                errors.push(StageError {
                    stage: Stage::Merge,
                    message: e.to_string(),
                });
            }
        }

        self.finish(record, validation, enrichment, errors)
    }

    /// Score a record and wrap everything into a result.
    fn finish(
        &self,
        record: ProviderRecord,
        validation: ValidationResult,
        enrichment: EnrichmentOutcome,
        errors: Vec<StageError>,
    ) -> PipelineResult {
        let quality_report = self.scorer.score(&record, &validation, &enrichment);
        let status = if errors.is_empty() && enrichment.degraded_fields().is_empty() {
            ResultStatus::Scored
        } else {
            ResultStatus::Degraded
        };
        let needs_review = self.prioritizer.needs_review(&quality_report);
        PipelineResult {
            record,
            validation,
            enrichment,
            quality_report,
            errors,
            status,
            needs_review,
        }
    }

    /// Result for a record whose task died: validation and scoring only.
    fn fallback(&self, record: ProviderRecord, message: String) -> PipelineResult {
        let validation = self.validation.validate(&record);
        let enrichment = EnrichmentOutcome::empty(&record.id);
        let errors = vec![StageError {
            stage: Stage::Pipeline,
            message,
        }];
        self.finish(record, validation, enrichment, errors)
    }

    /// Result for a record that could not even be re-scored.
    ///
    /// Built without calling any stage, so it cannot fail. The record always
    /// lands in the review queue.
    fn unscored(&self, record: ProviderRecord, errors: Vec<StageError>) -> PipelineResult {
        let quality_report = QualityReport::unscored(&record.id);
        PipelineResult {
            validation: ValidationResult::new(&record.id),
            enrichment: EnrichmentOutcome::empty(&record.id),
            needs_review: self.prioritizer.needs_review(&quality_report),
            record,
            quality_report,
            errors,
            status: ResultStatus::Degraded,
        }
    }

    /// Recover from a dead record task.
    ///
    /// Re-scoring runs on the blocking pool so a panic in scoring itself is
    /// caught again instead of unwinding through the batch stream.
    async fn recover(self: Arc<Self>, record: ProviderRecord, message: String) -> PipelineResult {
        let retry = {
            let stages = Arc::clone(&self);
            let record = record.clone();
            let message = message.clone();
            tokio::task::spawn_blocking(move || stages.fallback(record, message))
        };
        match retry.await {
            Ok(result) => result,
            Err(e) => {
                let second = join_error_message(e);
                warn!(record_id = %record.id, error = %second, "scoring failed");
                let errors = vec![
                    StageError {
                        stage: Stage::Pipeline,
                        message,
                    },
                    StageError {
                        stage: Stage::Scoring,
                        message: second,
                    },
                ];
                self.unscored(record, errors)
            }
        }
    }
}

fn join_error_message(e: JoinError) -> String {
    if e.is_panic() {
        let payload = e.into_panic();
        if let Some(s) = payload.downcast_ref::<&str>() {
            format!("panicked: {}", s)
        } else if let Some(s) = payload.downcast_ref::<String>() {
            format!("panicked: {}", s)
        } else {
            "panicked".to_string()
        }
    } else {
        e.to_string()
    }
}

/// The provider-record quality pipeline.
pub struct Pipeline {
    config: PipelineConfig,
    stages: Arc<Stages>,
}

impl Pipeline {
    /// Build a pipeline with the sources listed in the configuration.
    ///
    /// Fails on invalid configuration or unreadable source files.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let sources = build_sources(&config.sources)?;
        Self::with_sources(config, sources)
    }

    /// Build a pipeline with explicit sources, in query order.
    pub fn with_sources(config: PipelineConfig, sources: Vec<Arc<dyn ReferenceSource>>) -> Result<Self> {
        config.validate()?;
        let stages = Stages {
            validation: ValidationEngine::new(),
            resolver: Resolver::new(sources, config.enrichment.clone()),
            scorer: QualityScorer::new(config.scoring.clone()),
            prioritizer: Prioritizer::new(config.queue.clone(), config.scoring.acceptance_threshold),
        };
        Ok(Self {
            config,
            stages: Arc::new(stages),
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Names of the configured sources, in query order.
    pub fn source_names(&self) -> Vec<String> {
        self.stages
            .resolver
            .sources()
            .iter()
            .map(|s| s.name().to_string())
            .collect()
    }

    /// Run one record through validate, enrich and score.
    pub async fn process(&self, record: ProviderRecord) -> PipelineResult {
        Arc::clone(&self.stages).run(record).await
    }

    /// Process records with at most `parallelism` in flight.
    ///
    /// A failing record never aborts the batch. After `cancel` fires no new
    /// records start; in-flight records finish and the rest are counted as
    /// skipped. Results keep input order.
    pub async fn process_batch(
        &self,
        records: Vec<ProviderRecord>,
        parallelism: usize,
        stats: &mut BatchStats,
        cancel: &CancellationToken,
    ) -> BatchRun {
        let total = records.len();
        let parallelism = parallelism.max(1);
        info!(records = total, parallelism, "starting batch");

        let outcomes: Vec<Option<PipelineResult>> = stream::iter(records)
            .map(|record| {
                let stages = Arc::clone(&self.stages);
                let cancel = cancel.clone();
                async move {
                    if cancel.is_cancelled() {
                        return None;
                    }
                    let backup = record.clone();
                    let task = tokio::spawn(Arc::clone(&stages).run(record));
                    Some(match task.await {
                        Ok(result) => result,
                        Err(e) => {
                            let message = join_error_message(e);
                            warn!(record_id = %backup.id, error = %message, "record pipeline failed");
                            stages.recover(backup, message).await
                        }
                    })
                }
            })
            .buffered(parallelism)
            .collect()
            .await;

        let mut results = Vec::with_capacity(total);
        let mut skipped = 0;
        for outcome in outcomes {
            match outcome {
                Some(result) => {
                    stats.record(&result);
                    results.push(result);
                }
                None => skipped += 1,
            }
        }
        stats.record_skipped(skipped);

        let cancelled = cancel.is_cancelled();
        if cancelled {
            info!(processed = results.len(), skipped, "batch cancelled");
        } else {
            info!(processed = results.len(), "batch complete");
        }

        BatchRun {
            results,
            skipped,
            cancelled,
        }
    }

    /// Build the review queue from results.
    pub fn prioritize(&self, results: &[PipelineResult]) -> ReviewQueue {
        self.stages
            .prioritizer
            .prioritize(results.iter().map(|r| &r.quality_report))
    }

    /// Build the review queue from bare reports.
    pub fn prioritize_reports<'a>(&self, reports: impl IntoIterator<Item = &'a QualityReport>) -> ReviewQueue {
        self.stages.prioritizer.prioritize(reports)
    }

    /// Process a batch with the configured parallelism.
    pub async fn run(&self, records: Vec<ProviderRecord>) -> BatchReport {
        self.run_with_cancel(records, &CancellationToken::new()).await
    }

    /// Process a batch that can be cancelled.
    pub async fn run_with_cancel(&self, records: Vec<ProviderRecord>, cancel: &CancellationToken) -> BatchReport {
        let started = Instant::now();
        let mut stats = BatchStats::new();
        let run = self
            .process_batch(records, self.config.batch.parallelism, &mut stats, cancel)
            .await;
        let queue = self.prioritize(&run.results);
        BatchReport {
            summary: stats.summary(started.elapsed()),
            results: run.results,
            queue,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::enrichment::{FailureKind, MockSource};
    use crate::quality::PriorityLevel;
    use crate::record::FieldName;

    fn record(id: &str) -> ProviderRecord {
        ProviderRecord::new(id, "1234567893")
            .with_original(FieldName::Name, "Jane Smith", 0.8)
            .with_original(FieldName::State, "MA", 0.8)
    }

    #[tokio::test]
    async fn test_process_orders_stages() {
        let mock = Arc::new(MockSource::new("mock").with_response(FieldName::Phone, "617-555-0143", 0.9));
        let pipeline = Pipeline::with_sources(PipelineConfig::default(), vec![mock]).unwrap();

        let result = pipeline.process(record("r1")).await;
        assert_eq!(result.status, ResultStatus::Scored);
        assert!(result.validation.soft_failures().iter().any(|(f, _)| *f == FieldName::Phone));
        assert_eq!(result.record.value(FieldName::Phone), Some("617-555-0143"));
        assert_eq!(result.quality_report.record_id(), "r1");
    }

    #[tokio::test]
    async fn test_panicking_source_degrades_record() {
        let pipeline =
            Pipeline::with_sources(PipelineConfig::default(), vec![Arc::new(MockSource::panicking("boom"))]).unwrap();

        let result = pipeline.process(record("r1")).await;
        assert_eq!(result.status, ResultStatus::Degraded);
        assert_eq!(result.errors[0].stage, Stage::Enrichment);
        assert!(result.errors[0].message.contains("boom"));
        assert!(result.quality_report.completeness() > 0.0);
    }

    #[tokio::test]
    async fn test_cancelled_batch_skips_everything() {
        let pipeline = Pipeline::with_sources(PipelineConfig::default(), Vec::new()).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let mut stats = BatchStats::new();
        let run = pipeline
            .process_batch(vec![record("a"), record("b")], 2, &mut stats, &cancel)
            .await;
        assert!(run.cancelled);
        assert!(run.results.is_empty());
        assert_eq!(run.skipped, 2);
        assert_eq!(stats.skipped(), 2);
    }

    #[tokio::test]
    async fn test_enrichment_panic_keeps_earlier_failures() {
        let sources: Vec<Arc<dyn ReferenceSource>> = vec![
            Arc::new(MockSource::always_fail("down", "503")),
            Arc::new(MockSource::panicking("boom")),
        ];
        let pipeline = Pipeline::with_sources(PipelineConfig::default(), sources).unwrap();

        let result = pipeline.process(record("r1")).await;
        assert_eq!(result.status, ResultStatus::Degraded);
        assert_eq!(result.errors[0].stage, Stage::Enrichment);
        assert_eq!(result.enrichment.failures.len(), 1);
        assert_eq!(result.enrichment.failures[0].source, "down");
        assert_eq!(result.enrichment.failures[0].kind, FailureKind::Error);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_midway_finishes_in_flight_records() {
        let slow = Arc::new(MockSource::new("slow").with_delay(Duration::from_millis(100)));
        let pipeline = Pipeline::with_sources(PipelineConfig::default(), vec![slow]).unwrap();
        let records: Vec<_> = (0..6).map(|i| record(&format!("r{}", i))).collect();
        let total = records.len();

        let cancel = CancellationToken::new();
        {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(150)).await;
                cancel.cancel();
            });
        }

        let mut stats = BatchStats::new();
        let run = pipeline.process_batch(records, 1, &mut stats, &cancel).await;

        assert!(run.cancelled);
        assert!(!run.results.is_empty());
        assert!(run.results.len() < total);
        assert_eq!(run.skipped, total - run.results.len());
        assert_eq!(stats.skipped(), run.skipped);
        assert_eq!(stats.processed(), run.results.len());
        assert_eq!(run.results[0].record.id, "r0");
        for result in &run.results {
            assert_eq!(result.status, ResultStatus::Scored);
            assert!(result.errors.is_empty());
            assert_eq!(result.quality_report.record_id(), result.record.id);
            assert!(result.quality_report.completeness() > 0.0);
        }
    }

    #[tokio::test]
    async fn test_recover_rescores_record() {
        let pipeline = Pipeline::with_sources(PipelineConfig::default(), Vec::new()).unwrap();
        let stages = Arc::clone(&pipeline.stages);

        let result = stages.recover(record("r1"), "panicked: lost".to_string()).await;
        assert_eq!(result.status, ResultStatus::Degraded);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].stage, Stage::Pipeline);
        assert!(result.quality_report.completeness() > 0.0);
    }

    #[test]
    fn test_unscored_result_is_queued() {
        let pipeline = Pipeline::with_sources(PipelineConfig::default(), Vec::new()).unwrap();
        let errors = vec![StageError {
            stage: Stage::Scoring,
            message: "panicked: scorer".to_string(),
        }];

        let result = pipeline.stages.unscored(record("r1"), errors);
        assert_eq!(result.status, ResultStatus::Degraded);
        assert!(result.needs_review);
        assert_eq!(result.quality_report.confidence(), 0.0);
        assert_eq!(result.quality_report.priority(), PriorityLevel::High);

        let queue = pipeline.prioritize(std::slice::from_ref(&result));
        assert_eq!(queue.entries[0].record_id, "r1");
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = PipelineConfig::default();
        config.batch.parallelism = 0;
        assert!(Pipeline::with_sources(config, Vec::new()).is_err());
    }
}
