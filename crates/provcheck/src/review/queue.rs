//! Review queue prioritization.

use std::cmp::Ordering;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::QueueConfig;
use crate::quality::{PriorityLevel, QualityReport};

/// A record waiting for manual review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewQueueEntry {
    pub record_id: String,
    /// Composite risk; higher is reviewed first.
    pub risk_score: f64,
    /// Why the record needs review, hard failures first.
    pub reasons: Vec<String>,
    /// 1-based position in the queue.
    pub priority_rank: usize,
    pub priority: PriorityLevel,
    pub confidence: f64,
}

/// Ordered, capped review work list.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ReviewQueue {
    /// Entries in review order.
    pub entries: Vec<ReviewQueueEntry>,
    /// Qualifying records cut by the size cap.
    pub dropped: usize,
    /// Qualifying records before the cap.
    pub total_candidates: usize,
}

impl ReviewQueue {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry for a record, if queued.
    pub fn get(&self, record_id: &str) -> Option<&ReviewQueueEntry> {
        self.entries.iter().find(|e| e.record_id == record_id)
    }

    /// Keep only the first `limit` entries, counting the rest as dropped.
    pub fn truncate(&mut self, limit: usize) {
        let cut = self.entries.len().saturating_sub(limit);
        self.entries.truncate(limit);
        self.dropped += cut;
    }
}

/// Builds the review queue from quality reports.
#[derive(Debug, Clone)]
pub struct Prioritizer {
    config: QueueConfig,
    acceptance_threshold: f64,
}

impl Prioritizer {
    pub fn new(config: QueueConfig, acceptance_threshold: f64) -> Self {
        Self {
            config,
            acceptance_threshold,
        }
    }

    /// Check if a report needs manual review.
    pub fn needs_review(&self, report: &QualityReport) -> bool {
        report.has_hard_failure() || report.confidence() < self.acceptance_threshold
    }

    /// Composite risk of a report.
    pub fn risk_score(&self, report: &QualityReport) -> f64 {
        let hard = if report.has_hard_failure() {
            self.config.hard_failure_penalty
        } else {
            0.0
        };
        self.config.confidence_weight * (1.0 - report.confidence())
            + hard
            + self.config.contradiction_weight * report.contradictions().len() as f64
    }

    /// Select, order and cap the records that need review.
    ///
    /// Only the newest report per record id is considered.
    pub fn prioritize<'a>(&self, reports: impl IntoIterator<Item = &'a QualityReport>) -> ReviewQueue {
        let mut latest: IndexMap<&str, &QualityReport> = IndexMap::new();
        for report in reports {
            match latest.get(report.record_id()) {
                Some(existing) if existing.generated_at() > report.generated_at() => {}
                _ => {
                    latest.insert(report.record_id(), report);
                }
            }
        }

        let mut entries: Vec<ReviewQueueEntry> = latest
            .values()
            .filter(|r| self.needs_review(r))
            .map(|r| ReviewQueueEntry {
                record_id: r.record_id().to_string(),
                risk_score: self.risk_score(r),
                reasons: self.reasons(r),
                priority_rank: 0,
                priority: r.priority(),
                confidence: r.confidence(),
            })
            .collect();

        entries.sort_by(|a, b| match b.risk_score.total_cmp(&a.risk_score) {
            Ordering::Equal => a.record_id.cmp(&b.record_id),
            other => other,
        });

        let total_candidates = entries.len();
        let dropped = total_candidates.saturating_sub(self.config.max_size);
        entries.truncate(self.config.max_size);
        for (i, entry) in entries.iter_mut().enumerate() {
            entry.priority_rank = i + 1;
        }

        if dropped > 0 {
            info!(dropped, kept = entries.len(), "review queue capped");
        }
        debug!(queued = entries.len(), "review queue built");

        ReviewQueue {
            entries,
            dropped,
            total_candidates,
        }
    }

    fn reasons(&self, report: &QualityReport) -> Vec<String> {
        let mut reasons: Vec<String> = report
            .hard_failures()
            .iter()
            .map(|(field, reason)| format!("{}: {}", field, reason))
            .collect();
        if report.confidence() < self.acceptance_threshold {
            reasons.push(format!(
                "confidence {:.2} below threshold {:.2}",
                report.confidence(),
                self.acceptance_threshold
            ));
        }
        reasons.extend(report.contradictions().iter().map(|c| c.detail.clone()));
        if !report.missing_fields().is_empty() {
            let missing: Vec<&str> = report.missing_fields().iter().map(|f| f.key()).collect();
            reasons.push(format!("missing: {}", missing.join(", ")));
        }
        reasons
    }
}
