//! Field conflicts shared by enrichment and quality scoring.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::record::FieldName;

/// Where a conflict was detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    /// Reference sources returned different values for one field.
    SourceDisagreement,
    /// Two fields of the record are implausible together.
    CrossField,
}

/// A contradiction between values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldConflict {
    /// Where the conflict came from.
    pub kind: ConflictKind,
    /// Name of the check that raised it.
    pub check: String,
    /// Fields involved.
    pub fields: Vec<FieldName>,
    /// Conflicting values, annotated with their origin.
    pub values: Vec<String>,
    /// Human-readable explanation.
    pub detail: String,
}

impl FieldConflict {
    /// Conflict between candidates from different sources for one field.
    pub fn disagreement(field: FieldName, values: Vec<String>) -> Self {
        let detail = format!("sources disagree on {}: {}", field, values.join(" vs "));
        Self {
            kind: ConflictKind::SourceDisagreement,
            check: "source_disagreement".to_string(),
            fields: vec![field],
            values,
            detail,
        }
    }

    /// Failed cross-check between two record fields.
    pub fn cross_field(
        check: impl Into<String>,
        (a, a_value): (FieldName, &str),
        (b, b_value): (FieldName, &str),
    ) -> Self {
        let check = check.into();
        Self {
            kind: ConflictKind::CrossField,
            detail: format!("{}: {}={} vs {}={}", check, a, a_value, b, b_value),
            check,
            fields: vec![a, b],
            values: vec![a_value.to_string(), b_value.to_string()],
        }
    }

    /// Check if the conflict came from a record cross-check.
    pub fn is_cross_field(&self) -> bool {
        self.kind == ConflictKind::CrossField
    }
}

impl fmt::Display for FieldConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.detail)
    }
}
