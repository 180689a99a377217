//! Quality report types.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::ScoringConfig;
use crate::conflict::FieldConflict;
use crate::record::FieldName;
use crate::validation::ReasonCode;

/// Review urgency derived from confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriorityLevel {
    Low,
    Medium,
    High,
}

impl PriorityLevel {
    /// Priority for a confidence score.
    pub fn from_confidence(confidence: f64, config: &ScoringConfig) -> Self {
        if confidence >= config.low_priority_at {
            PriorityLevel::Low
        } else if confidence >= config.medium_priority_at {
            PriorityLevel::Medium
        } else {
            PriorityLevel::High
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PriorityLevel::Low => "low",
            PriorityLevel::Medium => "medium",
            PriorityLevel::High => "high",
        }
    }
}

impl fmt::Display for PriorityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity of a quality issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
    Critical,
}

/// Category of a quality issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// A field failed terminally.
    HardFailure,
    /// A present value failed validation and was not replaced.
    SuspiciousValue,
    /// A counted value has low confidence.
    LowConfidence,
    /// A cross-field check found a contradiction.
    Discrepancy,
    /// Reference sources disagreed.
    SourceDisagreement,
}

/// A single finding on a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityIssue {
    pub kind: IssueKind,
    pub severity: Severity,
    /// Field concerned, when the issue is about one field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<FieldName>,
    pub message: String,
}

impl QualityIssue {
    pub fn new(kind: IssueKind, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity,
            field: None,
            message: message.into(),
        }
    }

    /// Builder: attach the field concerned.
    pub fn with_field(mut self, field: FieldName) -> Self {
        self.field = Some(field);
        self
    }
}

/// Scores and findings for one record.
///
/// Immutable once produced. Re-processing a record yields a new report whose
/// `generated_at` supersedes this one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    record_id: String,
    completeness: f64,
    consistency: f64,
    confidence: f64,
    mean_field_confidence: f64,
    checks_performed: usize,
    contradictions: Vec<FieldConflict>,
    hard_failures: Vec<(FieldName, ReasonCode)>,
    missing_fields: Vec<FieldName>,
    issues: Vec<QualityIssue>,
    recommendations: Vec<String>,
    priority: PriorityLevel,
    generated_at: DateTime<Utc>,
}

/// Inputs assembled by the scorer.
pub(crate) struct ReportParts {
    pub record_id: String,
    pub completeness: f64,
    pub consistency: f64,
    pub confidence: f64,
    pub mean_field_confidence: f64,
    pub checks_performed: usize,
    pub contradictions: Vec<FieldConflict>,
    pub hard_failures: Vec<(FieldName, ReasonCode)>,
    pub missing_fields: Vec<FieldName>,
    pub issues: Vec<QualityIssue>,
    pub recommendations: Vec<String>,
    pub priority: PriorityLevel,
}

impl QualityReport {
    pub(crate) fn from_parts(parts: ReportParts) -> Self {
        Self {
            record_id: parts.record_id,
            completeness: parts.completeness,
            consistency: parts.consistency,
            confidence: parts.confidence,
            mean_field_confidence: parts.mean_field_confidence,
            checks_performed: parts.checks_performed,
            contradictions: parts.contradictions,
            hard_failures: parts.hard_failures,
            missing_fields: parts.missing_fields,
            issues: parts.issues,
            recommendations: parts.recommendations,
            priority: parts.priority,
            generated_at: Utc::now(),
        }
    }

    /// Report for a record that could not be scored: zero scores, high priority.
    pub(crate) fn unscored(record_id: &str) -> Self {
        Self::from_parts(ReportParts {
            record_id: record_id.to_string(),
            completeness: 0.0,
            consistency: 0.0,
            confidence: 0.0,
            mean_field_confidence: 0.0,
            checks_performed: 0,
            contradictions: Vec::new(),
            hard_failures: Vec::new(),
            missing_fields: Vec::new(),
            issues: vec![QualityIssue::new(
                IssueKind::HardFailure,
                Severity::Critical,
                "record could not be scored",
            )],
            recommendations: vec!["Review the record manually; automated scoring failed".to_string()],
            priority: PriorityLevel::High,
        })
    }

    pub fn record_id(&self) -> &str {
        &self.record_id
    }

    /// Weighted share of expected fields with a usable value.
    pub fn completeness(&self) -> f64 {
        self.completeness
    }

    /// Share of applicable cross-checks that found no contradiction.
    pub fn consistency(&self) -> f64 {
        self.consistency
    }

    /// Overall confidence in [0, 1].
    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    /// Mean confidence of the counted fields.
    pub fn mean_field_confidence(&self) -> f64 {
        self.mean_field_confidence
    }

    /// Number of cross-checks that applied.
    pub fn checks_performed(&self) -> usize {
        self.checks_performed
    }

    /// Cross-field contradictions and source disagreements.
    pub fn contradictions(&self) -> &[FieldConflict] {
        &self.contradictions
    }

    /// Fields that failed terminally in validation.
    pub fn hard_failures(&self) -> &[(FieldName, ReasonCode)] {
        &self.hard_failures
    }

    pub fn has_hard_failure(&self) -> bool {
        !self.hard_failures.is_empty()
    }

    /// Fields with no value after enrichment.
    pub fn missing_fields(&self) -> &[FieldName] {
        &self.missing_fields
    }

    pub fn issues(&self) -> &[QualityIssue] {
        &self.issues
    }

    pub fn recommendations(&self) -> &[String] {
        &self.recommendations
    }

    pub fn priority(&self) -> PriorityLevel {
        self.priority
    }

    pub fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }

    /// Check if the report meets the acceptance threshold.
    pub fn is_accepted(&self, acceptance_threshold: f64) -> bool {
        !self.has_hard_failure() && self.confidence >= acceptance_threshold
    }

    #[cfg(test)]
    pub(crate) fn stub(record_id: &str, confidence: f64, hard: bool, contradictions: usize) -> Self {
        let conflict = FieldConflict::cross_field(
            "zip_prefix_vs_state",
            (FieldName::ZipCode, "90210"),
            (FieldName::State, "MA"),
        );
        Self::from_parts(ReportParts {
            record_id: record_id.to_string(),
            completeness: confidence,
            consistency: 1.0,
            confidence,
            mean_field_confidence: confidence,
            checks_performed: contradictions,
            contradictions: vec![conflict; contradictions],
            hard_failures: if hard {
                vec![(FieldName::Npi, ReasonCode::InvalidChecksum)]
            } else {
                Vec::new()
            },
            missing_fields: Vec::new(),
            issues: Vec::new(),
            recommendations: Vec::new(),
            priority: PriorityLevel::from_confidence(confidence, &ScoringConfig::default()),
        })
    }

    #[cfg(test)]
    pub(crate) fn with_generated_at(mut self, at: DateTime<Utc>) -> Self {
        self.generated_at = at;
        self
    }
}
