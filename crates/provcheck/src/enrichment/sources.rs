//! Concrete reference sources.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::SourceSpec;
use crate::error::{ProvcheckError, Result};
use crate::record::{FieldName, ProviderRecord};
use crate::reference;

use super::source::{Candidate, ReferenceSource};

/// Default confidence of registry values.
pub const REGISTRY_CONFIDENCE: f64 = 0.95;
/// Default confidence of practice directory values.
pub const DIRECTORY_CONFIDENCE: f64 = 0.7;
/// Default confidence of synthetic values.
pub const SYNTHETIC_CONFIDENCE: f64 = 0.3;

/// Field values known for one provider.
pub type FieldTable = IndexMap<FieldName, String>;

/// NPI-keyed provider registry held in memory.
///
/// The JSON form maps each NPI to its field table:
/// `{"1234567893": {"name": "Jane Smith", "phone": "617-555-0143"}}`.
#[derive(Debug, Clone)]
pub struct RegistrySource {
    name: String,
    confidence: f64,
    entries: IndexMap<String, FieldTable>,
}

impl RegistrySource {
    /// Create an empty registry.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            confidence: REGISTRY_CONFIDENCE,
            entries: IndexMap::new(),
        }
    }

    /// Builder: set the confidence reported for every value.
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    /// Builder: add a field value for an NPI.
    pub fn with_entry(mut self, npi: impl Into<String>, field: FieldName, value: impl Into<String>) -> Self {
        self.entries
            .entry(npi.into())
            .or_default()
            .insert(field, value.into());
        self
    }

    /// Parse registry entries from JSON text.
    pub fn from_json(name: impl Into<String>, json: &str) -> Result<Self> {
        let entries: IndexMap<String, FieldTable> = serde_json::from_str(json)?;
        Ok(Self {
            entries,
            ..Self::new(name)
        })
    }

    /// Load registry entries from a JSON file.
    pub fn from_file(name: impl Into<String>, path: impl AsRef<Path>) -> Result<Self> {
        let json = read_source_file(path.as_ref())?;
        Self::from_json(name, &json)
    }

    /// Number of providers in the registry.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the registry has no providers.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl ReferenceSource for RegistrySource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn lookup(&self, field: FieldName, context: &ProviderRecord) -> Result<Option<Candidate>> {
        let Some(npi) = context.npi() else {
            return Ok(None);
        };
        Ok(self
            .entries
            .get(npi)
            .and_then(|table| table.get(&field))
            .map(|value| Candidate::new(value, self.confidence, &self.name)))
    }
}

/// One practice listing in a directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    /// Listed provider name.
    pub name: String,
    /// Listed practice state, if known.
    #[serde(default)]
    pub state: Option<String>,
    /// Listed field values.
    #[serde(default)]
    pub fields: FieldTable,
}

/// Practice directory keyed by provider name and state.
///
/// Stands in for practice websites and online directories, which are matched
/// by name rather than by identifier.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    name: String,
    confidence: f64,
    entries: Vec<DirectoryEntry>,
}

impl DirectorySource {
    /// Create a directory from listings.
    pub fn new(name: impl Into<String>, entries: Vec<DirectoryEntry>) -> Self {
        Self {
            name: name.into(),
            confidence: DIRECTORY_CONFIDENCE,
            entries,
        }
    }

    /// Builder: set the confidence reported for every value.
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    /// Parse listings from a JSON array.
    pub fn from_json(name: impl Into<String>, json: &str) -> Result<Self> {
        let entries: Vec<DirectoryEntry> = serde_json::from_str(json)?;
        Ok(Self::new(name, entries))
    }

    /// Load listings from a JSON file.
    pub fn from_file(name: impl Into<String>, path: impl AsRef<Path>) -> Result<Self> {
        let json = read_source_file(path.as_ref())?;
        Self::from_json(name, &json)
    }

    fn find(&self, record: &ProviderRecord) -> Option<&DirectoryEntry> {
        let name = normalize_name(record.value(FieldName::Name)?);
        let state = record.value(FieldName::State).map(reference::normalize_state);
        self.entries.iter().find(|entry| {
            normalize_name(&entry.name) == name
                && match (&state, &entry.state) {
                    (Some(a), Some(b)) => *a == reference::normalize_state(b),
                    _ => true,
                }
        })
    }
}

#[async_trait]
impl ReferenceSource for DirectorySource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn lookup(&self, field: FieldName, context: &ProviderRecord) -> Result<Option<Candidate>> {
        let Some(entry) = self.find(context) else {
            return Ok(None);
        };
        let value = match field {
            FieldName::Name => Some(&entry.name),
            FieldName::State => entry.state.as_ref().or_else(|| entry.fields.get(&field)),
            _ => entry.fields.get(&field),
        };
        Ok(value.map(|v| Candidate::new(v, self.confidence, &self.name)))
    }
}

/// Lowercase letters and digits only, single-spaced.
pub(crate) fn normalize_name(name: &str) -> String {
    name.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

const SYNTHETIC_PLACES: &[(&str, &str, &str, &str)] = &[
    ("Boston", "MA", "02115", "617"),
    ("New York", "NY", "10016", "212"),
    ("Chicago", "IL", "60611", "312"),
    ("Houston", "TX", "77030", "713"),
    ("Phoenix", "AZ", "85006", "602"),
    ("Seattle", "WA", "98104", "206"),
    ("Atlanta", "GA", "30308", "404"),
    ("Denver", "CO", "80218", "303"),
];

const SYNTHETIC_STREETS: &[&str] = &[
    "Main Street",
    "Medical Center Drive",
    "Oak Avenue",
    "Park Boulevard",
    "Washington Street",
    "Hospital Road",
];

const SYNTHETIC_SPECIALTIES: &[&str] = &[
    "Family Medicine",
    "Internal Medicine",
    "Pediatrics",
    "Cardiology",
    "Dermatology",
    "Orthopedic Surgery",
];

const SYNTHETIC_CREDENTIALS: &[&str] = &["MD", "DO", "NP", "PA"];

/// Deterministic pseudo source seeded from the NPI.
///
/// Produces plausible but unverified values at low confidence. The same NPI
/// and field always yield the same value.
#[derive(Debug, Clone)]
pub struct SyntheticSource {
    name: String,
    confidence: f64,
}

impl SyntheticSource {
    /// Create a synthetic source.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            confidence: SYNTHETIC_CONFIDENCE,
        }
    }

    /// Builder: set the confidence reported for every value.
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    fn generate(&self, field: FieldName, record: &ProviderRecord) -> Option<String> {
        let seed = record.npi()?.parse::<u64>().ok()?;
        let mut rng = fastrand::Rng::with_seed(seed);
        // Draws depend only on the seed so related fields agree.
        let place = SYNTHETIC_PLACES[rng.usize(..SYNTHETIC_PLACES.len())];
        let street_no = rng.u32(1..2000);
        let street = SYNTHETIC_STREETS[rng.usize(..SYNTHETIC_STREETS.len())];
        let exchange = rng.u32(200..1000);
        let line = rng.u32(100..10000);
        let specialty = SYNTHETIC_SPECIALTIES[rng.usize(..SYNTHETIC_SPECIALTIES.len())];
        let credential = SYNTHETIC_CREDENTIALS[rng.usize(..SYNTHETIC_CREDENTIALS.len())];
        let license = rng.u32(10000..1000000);

        let value = match field {
            FieldName::Phone => format!("{}-{:03}-{:04}", place.3, exchange, line),
            FieldName::Email => {
                let name = record.value(FieldName::Name).map(normalize_name)?;
                let local = name.split(' ').collect::<Vec<_>>().join(".");
                format!("{}@practice.example.com", local)
            }
            FieldName::AddressLine1 => format!("{} {}", street_no, street),
            FieldName::City => place.0.to_string(),
            FieldName::State | FieldName::LicenseState => place.1.to_string(),
            FieldName::ZipCode => place.2.to_string(),
            FieldName::Specialty => specialty.to_string(),
            FieldName::Credential => credential.to_string(),
            FieldName::LicenseNumber => format!("{}{}", place.1, license),
            FieldName::Npi | FieldName::Name => return None,
        };
        Some(value)
    }
}

#[async_trait]
impl ReferenceSource for SyntheticSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn lookup(&self, field: FieldName, context: &ProviderRecord) -> Result<Option<Candidate>> {
        Ok(self
            .generate(field, context)
            .map(|value| Candidate::new(value, self.confidence, &self.name)))
    }
}

/// Build the configured sources in query order.
pub fn build_sources(specs: &[SourceSpec]) -> Result<Vec<Arc<dyn ReferenceSource>>> {
    let mut sources: Vec<Arc<dyn ReferenceSource>> = Vec::with_capacity(specs.len());
    for spec in specs {
        let source: Arc<dyn ReferenceSource> = match spec {
            SourceSpec::Registry { path, name, confidence } => {
                let name = name.clone().unwrap_or_else(|| "registry".to_string());
                let source = RegistrySource::from_file(name, path)?
                    .with_confidence(confidence.unwrap_or(REGISTRY_CONFIDENCE));
                debug!(source = source.name(), providers = source.len(), "loaded registry");
                Arc::new(source)
            }
            SourceSpec::Directory { path, name, confidence } => {
                let name = name.clone().unwrap_or_else(|| "directory".to_string());
                Arc::new(
                    DirectorySource::from_file(name, path)?
                        .with_confidence(confidence.unwrap_or(DIRECTORY_CONFIDENCE)),
                )
            }
            SourceSpec::Synthetic { name, confidence } => {
                let name = name.clone().unwrap_or_else(|| "synthetic".to_string());
                Arc::new(
                    SyntheticSource::new(name)
                        .with_confidence(confidence.unwrap_or(SYNTHETIC_CONFIDENCE)),
                )
            }
        };
        sources.push(source);
    }
    Ok(sources)
}

fn read_source_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| ProvcheckError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::validate_field;

    fn record() -> ProviderRecord {
        ProviderRecord::new("r1", "1234567893")
            .with_original(FieldName::Name, "Dr. Jane Smith", 0.8)
            .with_original(FieldName::State, "MA", 0.8)
    }

    #[tokio::test]
    async fn test_registry_lookup_by_npi() {
        let registry = RegistrySource::from_json(
            "npi_registry",
            r#"{"1234567893": {"phone": "617-555-0143", "specialty": "Cardiology"}}"#,
        )
        .unwrap();

        let c = registry
            .lookup(FieldName::Phone, &record())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(c.value, "617-555-0143");
        assert_eq!(c.confidence, REGISTRY_CONFIDENCE);
        assert_eq!(c.source_id, "npi_registry");

        let other = ProviderRecord::new("r2", "1245319599");
        assert!(registry.lookup(FieldName::Phone, &other).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_directory_matches_normalized_name_and_state() {
        let directory = DirectorySource::new(
            "web",
            vec![DirectoryEntry {
                name: "dr jane smith".to_string(),
                state: Some("ma".to_string()),
                fields: FieldTable::from([(FieldName::Email, "jane@smithclinic.org".to_string())]),
            }],
        );

        let c = directory
            .lookup(FieldName::Email, &record())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(c.value, "jane@smithclinic.org");
        assert_eq!(c.confidence, DIRECTORY_CONFIDENCE);

        let other_state = record().with_original(FieldName::State, "TX", 0.8);
        assert!(directory.lookup(FieldName::Email, &other_state).await.unwrap().is_none());

        let other_name = ProviderRecord::new("r3", "1234567893")
            .with_original(FieldName::Name, "Jane Smith", 0.8)
            .with_original(FieldName::State, "MA", 0.8);
        assert!(directory.lookup(FieldName::Email, &other_name).await.unwrap().is_none());

        let no_state = ProviderRecord::new("r4", "1234567893")
            .with_original(FieldName::Name, "Dr Jane Smith", 0.8);
        assert!(directory.lookup(FieldName::Email, &no_state).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_synthetic_is_deterministic_and_valid() {
        let source = SyntheticSource::new("synthetic");
        let record = record();
        for field in FieldName::ALL.into_iter().filter(|f| f.is_enrichable()) {
            let a = source.lookup(field, &record).await.unwrap();
            let b = source.lookup(field, &record).await.unwrap();
            assert_eq!(a, b);
            if let Some(candidate) = a {
                assert_eq!(candidate.confidence, SYNTHETIC_CONFIDENCE);
                assert!(
                    validate_field(field, &candidate.value).is_pass(),
                    "{} = {:?}",
                    field,
                    candidate.value
                );
            }
        }
        assert!(source.lookup(FieldName::Name, &record).await.unwrap().is_none());
    }

    #[test]
    fn test_build_sources_from_specs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.json");
        fs::write(&path, r#"{"1234567893": {"phone": "617-555-0143"}}"#).unwrap();

        let sources = build_sources(&[
            SourceSpec::Registry {
                path,
                name: None,
                confidence: Some(0.9),
            },
            SourceSpec::Synthetic {
                name: Some("demo".to_string()),
                confidence: None,
            },
        ])
        .unwrap();
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].name(), "registry");
        assert_eq!(sources[1].name(), "demo");
    }

    #[test]
    fn test_missing_registry_file_is_io_error() {
        let err = build_sources(&[SourceSpec::Registry {
            path: "/nonexistent/registry.json".into(),
            name: None,
            confidence: None,
        }])
        .err().unwrap();
        assert!(matches!(err, ProvcheckError::Io { .. }));
    }
}
