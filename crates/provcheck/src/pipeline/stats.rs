//! Run statistics accumulated across a batch.

use std::collections::HashMap;
use std::time::Duration;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::quality::PriorityLevel;
use crate::record::FieldName;

use super::orchestrator::{PipelineResult, ResultStatus};

/// How many entries the `common_*` lists keep.
const TOP_N: usize = 5;

/// Accumulates per-record outcomes for a batch.
///
/// Passed explicitly to batch calls so batches can be measured
/// independently.
#[derive(Debug, Clone, Default)]
pub struct BatchStats {
    processed: usize,
    skipped: usize,
    auto_validated: usize,
    needs_review: usize,
    degraded: usize,
    hard_failures: usize,
    completeness_sum: f64,
    consistency_sum: f64,
    confidence_sum: f64,
    fields_enriched: usize,
    source_failures: usize,
    contradictions: usize,
    priorities: HashMap<PriorityLevel, usize>,
    reasons: HashMap<String, usize>,
    missing: HashMap<FieldName, usize>,
}

/// Aggregate figures for a batch run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Records submitted, including skipped ones.
    pub total: usize,
    /// Records at or above the acceptance threshold.
    pub auto_validated: usize,
    /// Records routed to manual review.
    pub needs_review: usize,
    /// Records with a stage error or a field lost to source failures.
    pub degraded: usize,
    /// Records never started because the batch was cancelled.
    pub skipped: usize,
    /// Records with at least one terminal field failure.
    pub hard_failures: usize,
    pub average_completeness: f64,
    pub average_consistency: f64,
    pub average_confidence: f64,
    pub fields_enriched: usize,
    pub source_failures: usize,
    pub contradictions: usize,
    pub priority_distribution: IndexMap<PriorityLevel, usize>,
    /// Most frequent validation reasons as `field: CODE`.
    pub common_reasons: Vec<(String, usize)>,
    pub common_missing_fields: Vec<(FieldName, usize)>,
    pub elapsed_ms: u64,
    /// Processed records per second.
    pub throughput_per_sec: f64,
}

impl BatchStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a processed record.
    pub fn record(&mut self, result: &PipelineResult) {
        let report = &result.quality_report;
        self.processed += 1;
        if result.needs_review {
            self.needs_review += 1;
        } else {
            self.auto_validated += 1;
        }
        if result.status == ResultStatus::Degraded {
            self.degraded += 1;
        }
        if report.has_hard_failure() {
            self.hard_failures += 1;
        }
        self.completeness_sum += report.completeness();
        self.consistency_sum += report.consistency();
        self.confidence_sum += report.confidence();
        self.fields_enriched += result.enrichment.applied_fields().len();
        self.source_failures += result.enrichment.failures.len();
        self.contradictions += report.contradictions().len();
        *self.priorities.entry(report.priority()).or_default() += 1;
        for (field, reason) in result.validation.reasons() {
            *self.reasons.entry(format!("{}: {}", field, reason)).or_default() += 1;
        }
        for field in report.missing_fields() {
            *self.missing.entry(*field).or_default() += 1;
        }
    }

    /// Count records that were never started.
    pub fn record_skipped(&mut self, count: usize) {
        self.skipped += count;
    }

    /// Records processed so far.
    pub fn processed(&self) -> usize {
        self.processed
    }

    /// Records skipped so far.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Summarize the batch.
    pub fn summary(&self, elapsed: Duration) -> BatchSummary {
        let n = self.processed as f64;
        let average = |sum: f64| if self.processed == 0 { 0.0 } else { sum / n };
        let secs = elapsed.as_secs_f64();

        let priority_distribution = [PriorityLevel::High, PriorityLevel::Medium, PriorityLevel::Low]
            .into_iter()
            .map(|p| (p, self.priorities.get(&p).copied().unwrap_or(0)))
            .collect();

        BatchSummary {
            total: self.processed + self.skipped,
            auto_validated: self.auto_validated,
            needs_review: self.needs_review,
            degraded: self.degraded,
            skipped: self.skipped,
            hard_failures: self.hard_failures,
            average_completeness: average(self.completeness_sum),
            average_consistency: average(self.consistency_sum),
            average_confidence: average(self.confidence_sum),
            fields_enriched: self.fields_enriched,
            source_failures: self.source_failures,
            contradictions: self.contradictions,
            priority_distribution,
            common_reasons: top_n(&self.reasons),
            common_missing_fields: top_n(&self.missing),
            elapsed_ms: elapsed.as_millis() as u64,
            throughput_per_sec: if secs > 0.0 { n / secs } else { 0.0 },
        }
    }
}

/// Most frequent keys, ties broken by key order.
fn top_n<K: Clone + Ord>(counts: &HashMap<K, usize>) -> Vec<(K, usize)> {
    let mut items: Vec<(K, usize)> = counts.iter().map(|(k, v)| (k.clone(), *v)).collect();
    items.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    items.truncate(TOP_N);
    items
}
