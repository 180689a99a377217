//! Field names, provenance tags and field values.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A directory field on a provider record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldName {
    /// National Provider Identifier.
    Npi,
    /// Provider or organization name.
    Name,
    /// Practice phone number.
    Phone,
    /// Contact email.
    Email,
    /// Street address line.
    AddressLine1,
    /// Practice city.
    City,
    /// Practice state (USPS code).
    State,
    /// Practice ZIP code.
    ZipCode,
    /// Primary specialty.
    Specialty,
    /// Professional credential (MD, DO, NP, ...).
    Credential,
    /// State license number.
    LicenseNumber,
    /// State that issued the license.
    LicenseState,
}

impl FieldName {
    /// Every field, in canonical order.
    pub const ALL: [FieldName; 12] = [
        FieldName::Npi,
        FieldName::Name,
        FieldName::Phone,
        FieldName::Email,
        FieldName::AddressLine1,
        FieldName::City,
        FieldName::State,
        FieldName::ZipCode,
        FieldName::Specialty,
        FieldName::Credential,
        FieldName::LicenseNumber,
        FieldName::LicenseState,
    ];

    /// The snake_case key used in configuration and exports.
    pub fn key(&self) -> &'static str {
        match self {
            FieldName::Npi => "npi",
            FieldName::Name => "name",
            FieldName::Phone => "phone",
            FieldName::Email => "email",
            FieldName::AddressLine1 => "address_line1",
            FieldName::City => "city",
            FieldName::State => "state",
            FieldName::ZipCode => "zip_code",
            FieldName::Specialty => "specialty",
            FieldName::Credential => "credential",
            FieldName::LicenseNumber => "license_number",
            FieldName::LicenseState => "license_state",
        }
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            FieldName::Npi => "NPI Number",
            FieldName::Name => "Provider Name",
            FieldName::Phone => "Phone Number",
            FieldName::Email => "Email",
            FieldName::AddressLine1 => "Street Address",
            FieldName::City => "City",
            FieldName::State => "State",
            FieldName::ZipCode => "ZIP Code",
            FieldName::Specialty => "Specialty",
            FieldName::Credential => "Credential",
            FieldName::LicenseNumber => "License Number",
            FieldName::LicenseState => "License State",
        }
    }

    /// Whether reference sources may fill or replace this field.
    ///
    /// The NPI is the record identity and is never enriched.
    pub fn is_enrichable(&self) -> bool {
        !matches!(self, FieldName::Npi)
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for FieldName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FieldName::ALL
            .iter()
            .copied()
            .find(|f| f.key() == s.trim().to_lowercase())
            .ok_or_else(|| format!("Unknown field: {}", s))
    }
}

/// Which stage or source produced a field's current value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Provenance {
    /// Value came with the ingested record.
    Original,
    /// Value was filled by the named reference source.
    Enriched(String),
    /// Value was corrected by a reviewer.
    Corrected,
}

impl Provenance {
    /// Create an enrichment provenance for a source.
    pub fn enriched(source: impl Into<String>) -> Self {
        Provenance::Enriched(source.into())
    }

    /// Check if the value came from enrichment.
    pub fn is_enriched(&self) -> bool {
        matches!(self, Provenance::Enriched(_))
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provenance::Original => f.write_str("original"),
            Provenance::Enriched(source) => write!(f, "enriched:{}", source),
            Provenance::Corrected => f.write_str("corrected"),
        }
    }
}

impl FromStr for Provenance {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "original" => Ok(Provenance::Original),
            "corrected" => Ok(Provenance::Corrected),
            other => match other.strip_prefix("enriched:") {
                Some(source) if !source.is_empty() => Ok(Provenance::Enriched(source.to_string())),
                _ => Err(format!("Unknown provenance tag: {}", other)),
            },
        }
    }
}

impl From<Provenance> for String {
    fn from(p: Provenance) -> Self {
        p.to_string()
    }
}

impl TryFrom<String> for Provenance {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl PartialEq<str> for Provenance {
    fn eq(&self, other: &str) -> bool {
        match (self, other) {
            (Provenance::Original, "original") | (Provenance::Corrected, "corrected") => true,
            (Provenance::Enriched(source), tag) => tag
                .strip_prefix("enriched:")
                .map(|s| s == source)
                .unwrap_or(false),
            _ => false,
        }
    }
}

impl PartialEq<&str> for Provenance {
    fn eq(&self, other: &&str) -> bool {
        self == *other
    }
}

/// A field value with its provenance and confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldValue {
    /// The value as text.
    pub value: String,
    /// Where the value came from.
    pub source: Provenance,
    /// Trust in the value (0.0-1.0).
    pub confidence: f64,
}

impl FieldValue {
    /// Create a field value, clamping confidence into [0, 1].
    pub fn new(value: impl Into<String>, source: Provenance, confidence: f64) -> Self {
        Self {
            value: value.into(),
            source,
            confidence: clamp_unit(confidence),
        }
    }

    /// Create an original (ingested) value.
    pub fn original(value: impl Into<String>, confidence: f64) -> Self {
        Self::new(value, Provenance::Original, confidence)
    }

    /// Check if the value is empty after trimming.
    pub fn is_empty(&self) -> bool {
        self.value.trim().is_empty()
    }
}

/// Clamp a score into [0, 1], mapping NaN to 0.
pub(crate) fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provenance_round_trip_strings() {
        assert_eq!(Provenance::Original.to_string(), "original");
        assert_eq!(Provenance::enriched("registry").to_string(), "enriched:registry");
        assert_eq!("corrected".parse::<Provenance>().unwrap(), Provenance::Corrected);
        assert_eq!(
            "enriched:npi_registry".parse::<Provenance>().unwrap(),
            Provenance::enriched("npi_registry")
        );
        assert!("enriched:".parse::<Provenance>().is_err());
        assert!("scraped".parse::<Provenance>().is_err());
    }

    #[test]
    fn test_provenance_compares_with_str() {
        assert!(Provenance::enriched("mock") == "enriched:mock");
        assert!(Provenance::Original == "original");
        assert!(Provenance::enriched("mock") != "enriched:other");
    }

    #[test]
    fn test_provenance_serde_as_string() {
        let value = FieldValue::new("555", Provenance::enriched("registry"), 0.9);
        let json = serde_json::to_value(&value).unwrap();
        assert_eq!(json["source"], "enriched:registry");

        let back: FieldValue = serde_json::from_value(json).unwrap();
        assert_eq!(back.source, Provenance::enriched("registry"));
    }

    #[test]
    fn test_confidence_is_clamped() {
        assert_eq!(FieldValue::original("x", 1.7).confidence, 1.0);
        assert_eq!(FieldValue::original("x", -0.2).confidence, 0.0);
        assert_eq!(FieldValue::original("x", f64::NAN).confidence, 0.0);
    }

    #[test]
    fn test_field_name_parse() {
        assert_eq!("zip_code".parse::<FieldName>().unwrap(), FieldName::ZipCode);
        assert_eq!(" NPI ".parse::<FieldName>().unwrap(), FieldName::Npi);
        assert!("fax".parse::<FieldName>().is_err());
        assert!(!FieldName::Npi.is_enrichable());
        assert!(FieldName::Phone.is_enrichable());
    }
}
