//! Merges candidate values from reference sources into records.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::EnrichmentConfig;
use crate::conflict::FieldConflict;
use crate::error::Result;
use crate::record::{FieldName, FieldValue, Provenance, ProviderRecord};
use crate::validation::{FieldVerdict, ValidationResult, validate_field};

use super::source::{Candidate, ReferenceSource};

/// How a lookup failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Lookup exceeded the per-lookup timeout.
    Timeout,
    /// Adapter returned an error.
    Error,
}

/// A source lookup that produced no answer because it failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceFailure {
    /// Source name.
    pub source: String,
    /// Field being looked up.
    pub field: FieldName,
    /// Failure class.
    pub kind: FailureKind,
    /// Error detail.
    pub message: String,
}

/// What enrichment decided for one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FieldResolution {
    /// A candidate replaces the current value.
    Applied {
        candidate: Candidate,
        previous: Option<FieldValue>,
    },
    /// No acceptable candidate was found.
    Unresolved { attempted_sources: Vec<String> },
    /// The best candidate was not more confident than the current value.
    Kept { best: Candidate },
}

/// Per-field enrichment results for one record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentOutcome {
    /// The enriched record.
    pub record_id: String,
    /// Resolution of every targeted field.
    pub resolutions: IndexMap<FieldName, FieldResolution>,
    /// Reference values for present fields, used for cross-checks only.
    pub corroborations: IndexMap<FieldName, Candidate>,
    /// Fields where accepted candidates disagreed.
    pub conflicts: Vec<FieldConflict>,
    /// Lookups that timed out or errored.
    pub failures: Vec<SourceFailure>,
}

impl EnrichmentOutcome {
    /// Create an outcome with no resolutions.
    pub fn empty(record_id: impl Into<String>) -> Self {
        Self {
            record_id: record_id.into(),
            resolutions: IndexMap::new(),
            corroborations: IndexMap::new(),
            conflicts: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// Merge applied candidates into the record. Returns how many fields changed.
    pub fn apply(&self, record: &mut ProviderRecord) -> Result<usize> {
        let mut applied = 0;
        for (field, resolution) in &self.resolutions {
            if let FieldResolution::Applied { candidate, .. } = resolution {
                record.set_field(
                    *field,
                    FieldValue::new(
                        &candidate.value,
                        Provenance::enriched(&candidate.source_id),
                        candidate.confidence,
                    ),
                )?;
                applied += 1;
            }
        }
        Ok(applied)
    }

    /// Check if a candidate was applied to a field.
    pub fn is_applied(&self, field: FieldName) -> bool {
        matches!(
            self.resolutions.get(&field),
            Some(FieldResolution::Applied { .. })
        )
    }

    /// Fields that received a new value.
    pub fn applied_fields(&self) -> Vec<FieldName> {
        self.resolutions
            .iter()
            .filter(|(_, r)| matches!(r, FieldResolution::Applied { .. }))
            .map(|(f, _)| *f)
            .collect()
    }

    /// Fields left without an acceptable candidate.
    pub fn unresolved_fields(&self) -> Vec<FieldName> {
        self.resolutions
            .iter()
            .filter(|(_, r)| matches!(r, FieldResolution::Unresolved { .. }))
            .map(|(f, _)| *f)
            .collect()
    }

    /// Unresolved fields where at least one source failed.
    pub fn degraded_fields(&self) -> Vec<FieldName> {
        self.unresolved_fields()
            .into_iter()
            .filter(|f| self.failures.iter().any(|failure| failure.field == *f))
            .collect()
    }

    /// Reference value found for a field, applied or corroborating.
    pub fn reference_value(&self, field: FieldName) -> Option<&Candidate> {
        match self.resolutions.get(&field) {
            Some(FieldResolution::Applied { candidate, .. }) => Some(candidate),
            Some(FieldResolution::Kept { best }) => Some(best),
            _ => self.corroborations.get(&field),
        }
    }
}

/// Queries reference sources for weak fields and picks the best candidates.
pub struct Resolver {
    sources: Vec<Arc<dyn ReferenceSource>>,
    config: EnrichmentConfig,
}

impl Resolver {
    /// Create a resolver over sources in query order.
    pub fn new(sources: Vec<Arc<dyn ReferenceSource>>, config: EnrichmentConfig) -> Self {
        Self { sources, config }
    }

    /// Configured sources.
    pub fn sources(&self) -> &[Arc<dyn ReferenceSource>] {
        &self.sources
    }

    /// Fields that enrichment will try to fill or replace.
    ///
    /// Hard-failed fields and the NPI are never targets.
    pub fn targets(&self, record: &ProviderRecord, validation: &ValidationResult) -> Vec<FieldName> {
        FieldName::ALL
            .into_iter()
            .filter(|f| f.is_enrichable())
            .filter(|f| match validation.verdict(*f) {
                FieldVerdict::HardFail(_) => false,
                FieldVerdict::SoftFail(_) => true,
                FieldVerdict::Pass => {
                    !record.has_value(*f) || record.confidence(*f) < self.config.replace_below
                }
            })
            .collect()
    }

    /// Look up candidates for every target field.
    ///
    /// Never fails: timeouts and adapter errors are recorded on the outcome
    /// and the next source is tried.
    pub async fn enrich(&self, record: &ProviderRecord, validation: &ValidationResult) -> EnrichmentOutcome {
        let outcome = Mutex::new(EnrichmentOutcome::empty(&record.id));
        self.enrich_into(record, validation, &outcome).await;
        outcome.into_inner().unwrap_or_else(PoisonError::into_inner)
    }

    /// Like [`enrich`](Self::enrich), but writes into `outcome` as each lookup
    /// finishes. If the task dies midway, `outcome` still holds the failures
    /// and resolutions gathered so far.
    pub async fn enrich_into(
        &self,
        record: &ProviderRecord,
        validation: &ValidationResult,
        outcome: &Mutex<EnrichmentOutcome>,
    ) {
        if self.sources.is_empty() {
            return;
        }

        let targets = self.targets(record, validation);
        for &field in &targets {
            let candidates = self.collect(field, record, outcome).await;
            let Some(best) = best_candidate(&candidates) else {
                debug!(record_id = %record.id, field = %field, "no candidate found");
                lock(outcome).resolutions.insert(
                    field,
                    FieldResolution::Unresolved {
                        attempted_sources: self.sources.iter().map(|s| s.name().to_string()).collect(),
                    },
                );
                continue;
            };

            let conflict = disagreement(field, &candidates);
            if conflict.is_some() {
                debug!(record_id = %record.id, field = %field, "sources disagree");
            }

            let current = effective_confidence(record, validation, field);
            let resolution = if best.confidence > current {
                debug!(
                    record_id = %record.id,
                    field = %field,
                    source = %best.source_id,
                    confidence = best.confidence,
                    "applying candidate"
                );
                FieldResolution::Applied {
                    candidate: best.clone(),
                    previous: record.field(field).cloned(),
                }
            } else {
                FieldResolution::Kept { best: best.clone() }
            };

            let mut shared = lock(outcome);
            shared.conflicts.extend(conflict);
            shared.resolutions.insert(field, resolution);
        }

        for &field in &self.config.corroborate {
            if targets.contains(&field) || !field.is_enrichable() || !record.has_value(field) {
                continue;
            }
            if validation.verdict(field).is_hard() {
                continue;
            }
            let candidates = self.collect(field, record, outcome).await;
            if let Some(best) = best_candidate(&candidates) {
                lock(outcome).corroborations.insert(field, best.clone());
            }
        }
    }

    async fn collect(
        &self,
        field: FieldName,
        record: &ProviderRecord,
        outcome: &Mutex<EnrichmentOutcome>,
    ) -> Vec<Candidate> {
        let timeout = self.config.lookup_timeout();
        let mut accepted = Vec::new();

        for source in &self.sources {
            let name = source.name();
            match tokio::time::timeout(timeout, source.lookup(field, record)).await {
                Ok(Ok(Some(candidate))) => {
                    if candidate.confidence < self.config.confidence_floor {
                        debug!(
                            record_id = %record.id,
                            field = %field,
                            source = name,
                            confidence = candidate.confidence,
                            "candidate below confidence floor"
                        );
                    } else if !validate_field(field, &candidate.value).is_pass() {
                        debug!(record_id = %record.id, field = %field, source = name, "candidate failed validation");
                    } else {
                        accepted.push(candidate);
                    }
                }
                Ok(Ok(None)) => {}
                Ok(Err(e)) => {
                    warn!(record_id = %record.id, field = %field, source = name, error = %e, "source lookup failed");
                    lock(outcome).failures.push(SourceFailure {
                        source: name.to_string(),
                        field,
                        kind: FailureKind::Error,
                        message: e.to_string(),
                    });
                }
                Err(_) => {
                    warn!(record_id = %record.id, field = %field, source = name, "source lookup timed out");
                    lock(outcome).failures.push(SourceFailure {
                        source: name.to_string(),
                        field,
                        kind: FailureKind::Timeout,
                        message: format!("no answer within {} ms", timeout.as_millis()),
                    });
                }
            }
        }
        accepted
    }
}

/// Lock a shared outcome. Writes are single statements, so a poisoned lock
/// still holds a consistent outcome.
fn lock(outcome: &Mutex<EnrichmentOutcome>) -> MutexGuard<'_, EnrichmentOutcome> {
    outcome.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Highest-confidence candidate; ties go to the earlier source.
fn best_candidate(candidates: &[Candidate]) -> Option<&Candidate> {
    candidates.iter().fold(None, |best, c| match best {
        Some(b) if c.confidence <= b.confidence => Some(b),
        _ => Some(c),
    })
}

fn disagreement(field: FieldName, candidates: &[Candidate]) -> Option<FieldConflict> {
    let first = candidates.first()?;
    let key = comparable(&first.value);
    if candidates.iter().all(|c| comparable(&c.value) == key) {
        return None;
    }
    Some(FieldConflict::disagreement(
        field,
        candidates
            .iter()
            .map(|c| format!("{} ({}, {:.2})", c.value, c.source_id, c.confidence))
            .collect(),
    ))
}

fn comparable(value: &str) -> String {
    value
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Confidence a candidate must beat to replace the current value.
fn effective_confidence(record: &ProviderRecord, validation: &ValidationResult, field: FieldName) -> f64 {
    match record.field(field) {
        None => 0.0,
        Some(value) if value.source == Provenance::Original && validation.verdict(field).is_soft() => 0.0,
        Some(value) => value.confidence,
    }
}
