//! Quality scoring of enriched records.

use tracing::debug;

use crate::config::ScoringConfig;
use crate::conflict::FieldConflict;
use crate::enrichment::EnrichmentOutcome;
use crate::record::{FieldName, ProviderRecord, clamp_unit};
use crate::validation::ValidationResult;

use super::checks::{CROSS_CHECKS, Operand};
use super::report::{IssueKind, PriorityLevel, QualityIssue, QualityReport, ReportParts, Severity};

/// Computes completeness, consistency and confidence for records.
#[derive(Debug, Clone, Default)]
pub struct QualityScorer {
    config: ScoringConfig,
}

impl QualityScorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Score a record after enrichment has been applied.
    ///
    /// Deterministic for identical inputs apart from `generated_at`.
    pub fn score(
        &self,
        record: &ProviderRecord,
        validation: &ValidationResult,
        enrichment: &EnrichmentOutcome,
    ) -> QualityReport {
        let counted = |field: FieldName| {
            record
                .value(field)
                .filter(|_| validation.passed(field) || enrichment.is_applied(field))
        };

        // Completeness
        let (mut have, mut total) = (0.0, 0.0);
        for field in FieldName::ALL {
            let weight = self.config.field_weight(field);
            total += weight;
            if counted(field).is_some() {
                have += weight;
            }
        }
        let completeness = if total > 0.0 { have / total } else { 0.0 };

        // Consistency
        let mut checks_performed = 0;
        let mut contradictions = Vec::new();
        for check in CROSS_CHECKS {
            let Some(a) = counted(check.first) else {
                continue;
            };
            let (second_field, b) = match check.second {
                Operand::Field(field) => (field, counted(field)),
                Operand::Reference(field) => {
                    let from_reference = record
                        .provenance(check.first)
                        .is_some_and(|p| p.is_enriched());
                    let reference = enrichment
                        .reference_value(field)
                        .filter(|_| !from_reference)
                        .map(|c| c.value.as_str());
                    (field, reference)
                }
            };
            let Some(b) = b else {
                continue;
            };
            if let Some(consistent) = (check.check)(a, b, &self.config) {
                checks_performed += 1;
                if !consistent {
                    contradictions.push(FieldConflict::cross_field(
                        check.name,
                        (check.first, a),
                        (second_field, b),
                    ));
                }
            }
        }
        let consistency = if checks_performed == 0 {
            1.0
        } else {
            1.0 - contradictions.len() as f64 / checks_performed as f64
        };
        let discrepancies = contradictions.len();
        contradictions.extend(enrichment.conflicts.iter().cloned());

        // Field confidence
        let counted_fields: Vec<FieldName> = FieldName::ALL
            .into_iter()
            .filter(|f| counted(*f).is_some())
            .collect();
        let confidences: Vec<f64> = counted_fields.iter().map(|f| record.confidence(*f)).collect();
        let mean_field_confidence = if confidences.is_empty() {
            0.0
        } else {
            confidences.iter().sum::<f64>() / confidences.len() as f64
        };

        let w = self.config.weights;
        let mut confidence = clamp_unit(
            w.completeness * completeness + w.consistency * consistency + w.enrichment * mean_field_confidence,
        );
        let hard_failures = validation.hard_failures();
        if !hard_failures.is_empty() {
            confidence = confidence.min(self.config.hard_failure_ceiling);
        }

        let missing_fields = record.missing_fields();
        let issues = self.issues(record, validation, enrichment, &contradictions, &counted_fields);
        let recommendations = self.recommendations(&issues, &missing_fields);
        let priority = PriorityLevel::from_confidence(confidence, &self.config);

        debug!(
            record_id = %record.id,
            completeness,
            consistency,
            confidence,
            contradictions = discrepancies,
            "scored record"
        );

        QualityReport::from_parts(ReportParts {
            record_id: record.id.clone(),
            completeness,
            consistency,
            confidence,
            mean_field_confidence,
            checks_performed,
            contradictions,
            hard_failures,
            missing_fields,
            issues,
            recommendations,
            priority,
        })
    }

    fn issues(
        &self,
        record: &ProviderRecord,
        validation: &ValidationResult,
        enrichment: &EnrichmentOutcome,
        contradictions: &[FieldConflict],
        counted: &[FieldName],
    ) -> Vec<QualityIssue> {
        let mut issues = Vec::new();

        for (field, reason) in validation.hard_failures() {
            issues.push(
                QualityIssue::new(
                    IssueKind::HardFailure,
                    Severity::Critical,
                    format!("{} failed validation: {}", field.label(), reason),
                )
                .with_field(field),
            );
        }

        for (field, reason) in validation.soft_failures() {
            if record.has_value(field) && !enrichment.is_applied(field) {
                issues.push(
                    QualityIssue::new(
                        IssueKind::SuspiciousValue,
                        Severity::Warning,
                        format!("{} looks wrong: {}", field.label(), reason),
                    )
                    .with_field(field),
                );
            }
        }

        for &field in counted {
            let confidence = record.confidence(field);
            if confidence < self.config.low_field_confidence {
                issues.push(
                    QualityIssue::new(
                        IssueKind::LowConfidence,
                        Severity::Warning,
                        format!("{} has low confidence ({:.2})", field.label(), confidence),
                    )
                    .with_field(field),
                );
            }
        }

        for conflict in contradictions {
            let (kind, severity) = if conflict.is_cross_field() {
                (IssueKind::Discrepancy, Severity::Error)
            } else {
                (IssueKind::SourceDisagreement, Severity::Info)
            };
            let mut issue = QualityIssue::new(kind, severity, conflict.detail.clone());
            if let Some(field) = conflict.fields.first() {
                issue = issue.with_field(*field);
            }
            issues.push(issue);
        }

        issues
    }

    fn recommendations(&self, issues: &[QualityIssue], missing: &[FieldName]) -> Vec<String> {
        let mut out = Vec::new();
        for issue in issues {
            let label = issue.field.map(|f| f.label()).unwrap_or("record");
            let text = match issue.kind {
                IssueKind::HardFailure => format!("Verify {} against the issuing registry", label),
                IssueKind::SuspiciousValue => format!("Correct {}", label),
                IssueKind::LowConfidence => format!("Confirm {} with the provider", label),
                IssueKind::Discrepancy => format!("Resolve inconsistency: {}", issue.message),
                IssueKind::SourceDisagreement => format!("Reconcile source values for {}", label),
            };
            if !out.contains(&text) {
                out.push(text);
            }
        }
        let important: Vec<&str> = missing
            .iter()
            .filter(|f| self.config.field_weight(**f) >= 2.0)
            .map(|f| f.label())
            .collect();
        if !important.is_empty() {
            out.push(format!("Obtain missing {}", important.join(", ")));
        }
        out
    }
}

/// Score a record with default scoring configuration.
pub fn score(
    record: &ProviderRecord,
    validation: &ValidationResult,
    enrichment: &EnrichmentOutcome,
) -> QualityReport {
    QualityScorer::default().score(record, validation, enrichment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrichment::Candidate;
    use crate::validation::validate;

    fn complete_record() -> ProviderRecord {
        ProviderRecord::new("r1", "1234567893")
            .with_original(FieldName::Name, "Jane Smith", 0.8)
            .with_original(FieldName::Phone, "617-555-0143", 0.8)
            .with_original(FieldName::Email, "jsmith@clinic.org", 0.8)
            .with_original(FieldName::AddressLine1, "100 Main Street", 0.8)
            .with_original(FieldName::City, "Boston", 0.8)
            .with_original(FieldName::State, "MA", 0.8)
            .with_original(FieldName::ZipCode, "02115", 0.8)
            .with_original(FieldName::Specialty, "Internal Medicine", 0.8)
            .with_original(FieldName::Credential, "MD", 0.8)
            .with_original(FieldName::LicenseNumber, "MD12345", 0.8)
            .with_original(FieldName::LicenseState, "MA", 0.8)
    }

    fn score_record(record: &ProviderRecord) -> QualityReport {
        let validation = validate(record);
        score(record, &validation, &EnrichmentOutcome::empty(&record.id))
    }

    #[test]
    fn test_complete_consistent_record_is_accepted() {
        let report = score_record(&complete_record());
        assert_eq!(report.completeness(), 1.0);
        assert_eq!(report.consistency(), 1.0);
        assert_eq!(report.checks_performed(), 3);
        let mean = (1.0 + 11.0 * 0.8) / 12.0;
        assert!((report.mean_field_confidence() - mean).abs() < 1e-9);
        assert!((report.confidence() - (0.8 + 0.2 * mean)).abs() < 1e-9);
        assert!(report.is_accepted(0.75));
        assert_eq!(report.priority(), PriorityLevel::Low);
        assert!(report.issues().is_empty());
    }

    #[test]
    fn test_completeness_is_weighted() {
        let record = ProviderRecord::new("r2", "1234567893").with_original(FieldName::Name, "Jane Smith", 0.8);
        let report = score_record(&record);
        let total: f64 = ScoringConfig::default().field_weights.values().sum();
        assert!((report.completeness() - 6.0 / total).abs() < 1e-9);
        assert_eq!(report.missing_fields().len(), 10);
        assert!(report
            .recommendations()
            .iter()
            .any(|r| r.starts_with("Obtain missing")));
    }

    #[test]
    fn test_contradictions_lower_consistency() {
        let record = complete_record()
            .with_original(FieldName::Phone, "212-555-0100", 0.8)
            .with_original(FieldName::LicenseState, "CA", 0.8);
        let report = score_record(&record);
        assert_eq!(report.checks_performed(), 3);
        assert_eq!(report.contradictions().len(), 2);
        assert!((report.consistency() - 1.0 / 3.0).abs() < 1e-9);
        assert!(report
            .issues()
            .iter()
            .any(|i| i.kind == IssueKind::Discrepancy));
    }

    #[test]
    fn test_hard_failure_caps_confidence() {
        let record = ProviderRecord::new("bad", "1234567890").with_original(FieldName::Name, "Jane Smith", 0.8);
        let report = score_record(&record);
        assert!(report.confidence() <= 0.2);
        assert!(report.has_hard_failure());
        assert_eq!(report.priority(), PriorityLevel::High);
        assert!(!report.is_accepted(0.75));
    }

    #[test]
    fn test_hard_failure_caps_even_complete_record() {
        let complete = complete_record();
        let mut record = ProviderRecord::new("bad", "1234567894");
        for (field, value) in complete.fields() {
            if field != FieldName::Npi {
                record = record.with_original(field, value.value.clone(), value.confidence);
            }
        }
        let report = score_record(&record);
        assert_eq!(report.confidence(), 0.2);
        assert_eq!(report.hard_failures().len(), 1);
    }

    #[test]
    fn test_name_reference_check() {
        let record = complete_record();
        let validation = validate(&record);
        let mut enrichment = EnrichmentOutcome::empty("r1");
        enrichment
            .corroborations
            .insert(FieldName::Name, Candidate::new("Robert Johnson", 0.95, "registry"));

        let report = score(&record, &validation, &enrichment);
        assert_eq!(report.checks_performed(), 4);
        assert_eq!(report.contradictions()[0].check, "name_vs_reference");
    }

    #[test]
    fn test_source_disagreement_excluded_from_ratio() {
        let record = complete_record();
        let validation = validate(&record);
        let mut enrichment = EnrichmentOutcome::empty("r1");
        enrichment.conflicts.push(FieldConflict::disagreement(
            FieldName::Email,
            vec!["a@x.org (a, 0.90)".into(), "b@x.org (b, 0.80)".into()],
        ));

        let report = score(&record, &validation, &enrichment);
        assert_eq!(report.consistency(), 1.0);
        assert_eq!(report.contradictions().len(), 1);
    }

    #[test]
    fn test_weights_are_configurable() {
        let scorer = QualityScorer::new(ScoringConfig::default().with_weights(0.0, 0.0, 1.0));
        let record = complete_record();
        let report = scorer.score(&record, &validate(&record), &EnrichmentOutcome::empty("r1"));
        assert!((report.confidence() - (1.0 + 11.0 * 0.8) / 12.0).abs() < 1e-9);
    }

    #[test]
    fn test_soft_failed_value_not_counted() {
        let record = complete_record().with_original(FieldName::Phone, "000-000-0000", 0.8);
        let report = score_record(&record);
        assert!(report.completeness() < 1.0);
        assert!(report
            .issues()
            .iter()
            .any(|i| i.kind == IssueKind::SuspiciousValue && i.field == Some(FieldName::Phone)));
    }
}
