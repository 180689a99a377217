//! Validation verdicts and reason codes.

use std::fmt;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::record::FieldName;

/// Why a field failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReasonCode {
    /// Field has no value.
    MissingValue,
    /// Record has no NPI.
    MissingNpi,
    /// NPI is not exactly ten digits.
    InvalidNpiFormat,
    /// NPI check digit does not match.
    InvalidChecksum,
    /// Phone is not a valid NANP number.
    MalformedPhone,
    /// Phone is a known placeholder such as 000-000-0000.
    PlaceholderPhone,
    /// Email is not shaped like an address.
    MalformedEmail,
    /// Street line lacks a number or street name.
    IncompleteAddress,
    /// City contains unexpected characters.
    MalformedCity,
    /// State is not a USPS code.
    InvalidState,
    /// ZIP is not 5 or 9 digits.
    MalformedZip,
    /// Name is too short or contains unexpected characters.
    MalformedName,
    /// Specialty contains unexpected characters.
    MalformedSpecialty,
    /// Credential is not recognized.
    UnknownCredential,
    /// License number has an unexpected shape.
    MalformedLicense,
}

impl ReasonCode {
    /// The wire code, e.g. `INVALID_CHECKSUM`.
    pub fn code(&self) -> &'static str {
        match self {
            ReasonCode::MissingValue => "MISSING_VALUE",
            ReasonCode::MissingNpi => "MISSING_NPI",
            ReasonCode::InvalidNpiFormat => "INVALID_NPI_FORMAT",
            ReasonCode::InvalidChecksum => "INVALID_CHECKSUM",
            ReasonCode::MalformedPhone => "MALFORMED_PHONE",
            ReasonCode::PlaceholderPhone => "PLACEHOLDER_PHONE",
            ReasonCode::MalformedEmail => "MALFORMED_EMAIL",
            ReasonCode::IncompleteAddress => "INCOMPLETE_ADDRESS",
            ReasonCode::MalformedCity => "MALFORMED_CITY",
            ReasonCode::InvalidState => "INVALID_STATE",
            ReasonCode::MalformedZip => "MALFORMED_ZIP",
            ReasonCode::MalformedName => "MALFORMED_NAME",
            ReasonCode::MalformedSpecialty => "MALFORMED_SPECIALTY",
            ReasonCode::UnknownCredential => "UNKNOWN_CREDENTIAL",
            ReasonCode::MalformedLicense => "MALFORMED_LICENSE",
        }
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Outcome of validating one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum FieldVerdict {
    /// Value is present and well-formed.
    Pass,
    /// Value is missing or malformed; enrichment may recover it.
    SoftFail(ReasonCode),
    /// Value is terminally wrong; never auto-corrected.
    HardFail(ReasonCode),
}

impl FieldVerdict {
    /// Check if the verdict is a pass.
    pub fn is_pass(&self) -> bool {
        matches!(self, FieldVerdict::Pass)
    }

    /// Check if the verdict is a hard failure.
    pub fn is_hard(&self) -> bool {
        matches!(self, FieldVerdict::HardFail(_))
    }

    /// Check if the verdict is a soft failure.
    pub fn is_soft(&self) -> bool {
        matches!(self, FieldVerdict::SoftFail(_))
    }

    /// The failure reason, if any.
    pub fn reason(&self) -> Option<ReasonCode> {
        match self {
            FieldVerdict::Pass => None,
            FieldVerdict::SoftFail(r) | FieldVerdict::HardFail(r) => Some(*r),
        }
    }
}

/// Per-field validation results for one record.
///
/// Produced by the validation stage and read-only downstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// The validated record.
    pub record_id: String,
    /// Verdict for every field in canonical order.
    pub verdicts: IndexMap<FieldName, FieldVerdict>,
    /// When validation ran.
    pub validated_at: DateTime<Utc>,
}

impl ValidationResult {
    /// Create an empty result for a record.
    pub fn new(record_id: impl Into<String>) -> Self {
        Self {
            record_id: record_id.into(),
            verdicts: IndexMap::new(),
            validated_at: Utc::now(),
        }
    }

    /// Verdict for a field (fields never checked read as pass).
    pub fn verdict(&self, field: FieldName) -> FieldVerdict {
        self.verdicts.get(&field).copied().unwrap_or(FieldVerdict::Pass)
    }

    /// Check if a field passed.
    pub fn passed(&self, field: FieldName) -> bool {
        self.verdict(field).is_pass()
    }

    /// Fields that failed terminally, with their reasons.
    pub fn hard_failures(&self) -> Vec<(FieldName, ReasonCode)> {
        self.failures(FieldVerdict::is_hard)
    }

    /// Fields that failed recoverably, with their reasons.
    pub fn soft_failures(&self) -> Vec<(FieldName, ReasonCode)> {
        self.failures(FieldVerdict::is_soft)
    }

    /// All failure reasons in field order.
    pub fn reasons(&self) -> Vec<(FieldName, ReasonCode)> {
        self.failures(|v| !v.is_pass())
    }

    /// Check if any field failed terminally.
    pub fn has_hard_failure(&self) -> bool {
        self.verdicts.values().any(FieldVerdict::is_hard)
    }

    /// Check if every field passed.
    pub fn is_clean(&self) -> bool {
        self.verdicts.values().all(FieldVerdict::is_pass)
    }

    fn failures(&self, keep: impl Fn(&FieldVerdict) -> bool) -> Vec<(FieldName, ReasonCode)> {
        self.verdicts
            .iter()
            .filter(|(_, v)| keep(v))
            .filter_map(|(f, v)| v.reason().map(|r| (*f, r)))
            .collect()
    }
}
