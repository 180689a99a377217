//! Provider record.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{ProvcheckError, Result};

use super::field::{FieldName, FieldValue, Provenance};

/// A healthcare provider directory record.
///
/// Every value carries its provenance and confidence. The NPI is the record
/// identity: once assigned it cannot be replaced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderRecord {
    /// Record identifier (stable across re-processing).
    pub id: String,
    fields: IndexMap<FieldName, FieldValue>,
}

impl ProviderRecord {
    /// Create a record with an NPI as an original value of full confidence.
    pub fn new(id: impl Into<String>, npi: impl Into<String>) -> Self {
        Self::with_npi_confidence(id, npi, 1.0)
    }

    /// Create a record with an NPI carrying the given confidence.
    pub fn with_npi_confidence(id: impl Into<String>, npi: impl Into<String>, confidence: f64) -> Self {
        let mut record = Self::empty(id);
        let npi = npi.into();
        if !npi.trim().is_empty() {
            record
                .fields
                .insert(FieldName::Npi, FieldValue::original(npi.trim(), confidence));
        }
        record
    }

    /// Create a record with no fields (not even an NPI).
    pub fn empty(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: IndexMap::new(),
        }
    }

    /// Builder: add an original value with the given confidence.
    ///
    /// Empty values are skipped so they read as missing.
    pub fn with_original(mut self, field: FieldName, value: impl Into<String>, confidence: f64) -> Self {
        let value = value.into();
        if field != FieldName::Npi && !value.trim().is_empty() {
            self.fields
                .insert(field, FieldValue::original(value.trim(), confidence));
        }
        self
    }

    /// Set a field value.
    ///
    /// Fails with [`ProvcheckError::ImmutableField`] when replacing an
    /// assigned NPI.
    pub fn set_field(&mut self, field: FieldName, value: FieldValue) -> Result<()> {
        if field == FieldName::Npi && self.fields.contains_key(&FieldName::Npi) {
            return Err(ProvcheckError::ImmutableField(FieldName::Npi));
        }
        self.fields.insert(field, value);
        Ok(())
    }

    /// The NPI, if present.
    pub fn npi(&self) -> Option<&str> {
        self.value(FieldName::Npi)
    }

    /// Get a field with provenance and confidence.
    pub fn field(&self, field: FieldName) -> Option<&FieldValue> {
        self.fields.get(&field).filter(|v| !v.is_empty())
    }

    /// Get a field's value text.
    pub fn value(&self, field: FieldName) -> Option<&str> {
        self.field(field).map(|v| v.value.as_str())
    }

    /// Check if a field has a non-empty value.
    pub fn has_value(&self, field: FieldName) -> bool {
        self.field(field).is_some()
    }

    /// Current confidence of a field (0.0 when missing).
    pub fn confidence(&self, field: FieldName) -> f64 {
        self.field(field).map(|v| v.confidence).unwrap_or(0.0)
    }

    /// Provenance of a field, if present.
    pub fn provenance(&self, field: FieldName) -> Option<&Provenance> {
        self.field(field).map(|v| &v.source)
    }

    /// Iterate over the populated fields in insertion order.
    pub fn fields(&self) -> impl Iterator<Item = (FieldName, &FieldValue)> {
        self.fields
            .iter()
            .filter(|(_, v)| !v.is_empty())
            .map(|(k, v)| (*k, v))
    }

    /// Fields in [`FieldName::ALL`] with no value.
    pub fn missing_fields(&self) -> Vec<FieldName> {
        FieldName::ALL
            .iter()
            .copied()
            .filter(|f| !self.has_value(*f))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_npi_is_immutable_once_assigned() {
        let mut record = ProviderRecord::new("p1", "1234567893");
        let err = record
            .set_field(FieldName::Npi, FieldValue::original("1245319599", 1.0))
            .unwrap_err();
        assert!(matches!(err, ProvcheckError::ImmutableField(FieldName::Npi)));
        assert_eq!(record.npi(), Some("1234567893"));
    }

    #[test]
    fn test_npi_can_be_assigned_when_absent() {
        let mut record = ProviderRecord::empty("p2");
        record
            .set_field(FieldName::Npi, FieldValue::original("1234567893", 1.0))
            .unwrap();
        assert_eq!(record.npi(), Some("1234567893"));
    }

    #[test]
    fn test_empty_values_read_as_missing() {
        let record = ProviderRecord::new("p3", "1234567893")
            .with_original(FieldName::Phone, "   ", 0.8)
            .with_original(FieldName::City, "Boston", 0.8);

        assert!(!record.has_value(FieldName::Phone));
        assert_eq!(record.value(FieldName::City), Some("Boston"));
        assert!(record.missing_fields().contains(&FieldName::Phone));
        assert_eq!(record.confidence(FieldName::Phone), 0.0);
    }

    #[test]
    fn test_original_provenance() {
        let record = ProviderRecord::new("p4", "1234567893")
            .with_original(FieldName::Email, "dr@clinic.org", 0.8);
        assert_eq!(
            record.provenance(FieldName::Email),
            Some(&Provenance::Original)
        );
    }
}
