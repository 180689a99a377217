//! Pipeline configuration.
//!
//! Values resolve from built-in defaults, then an optional TOML file, then
//! `PROVCHECK_*` environment overrides. The CLI applies its flags last.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ProvcheckError, Result};
use crate::record::FieldName;

/// Environment variable overriding `scoring.acceptance_threshold`.
pub const ENV_ACCEPTANCE_THRESHOLD: &str = "PROVCHECK_ACCEPTANCE_THRESHOLD";
/// Environment variable overriding `enrichment.confidence_floor`.
pub const ENV_CONFIDENCE_FLOOR: &str = "PROVCHECK_CONFIDENCE_FLOOR";
/// Environment variable overriding `enrichment.lookup_timeout_ms`.
pub const ENV_LOOKUP_TIMEOUT_MS: &str = "PROVCHECK_LOOKUP_TIMEOUT_MS";
/// Environment variable overriding `batch.parallelism`.
pub const ENV_PARALLELISM: &str = "PROVCHECK_PARALLELISM";
/// Environment variable overriding `queue.max_size`.
pub const ENV_QUEUE_MAX_SIZE: &str = "PROVCHECK_QUEUE_MAX_SIZE";

const WEIGHT_TOLERANCE: f64 = 1e-6;

/// Complete pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PipelineConfig {
    /// Quality scoring.
    pub scoring: ScoringConfig,
    /// Enrichment lookups.
    pub enrichment: EnrichmentConfig,
    /// Review queue.
    pub queue: QueueConfig,
    /// Batch execution.
    pub batch: BatchConfig,
    /// Input parsing.
    pub ingest: IngestConfig,
    /// Reference sources, in query order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<SourceSpec>,
}

/// Weights of the three confidence components.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub completeness: f64,
    pub consistency: f64,
    pub enrichment: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            completeness: 0.4,
            consistency: 0.4,
            enrichment: 0.2,
        }
    }
}

impl ScoreWeights {
    fn sum(&self) -> f64 {
        self.completeness + self.consistency + self.enrichment
    }
}

/// Quality scoring configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Records at or above this confidence are auto-validated.
    pub acceptance_threshold: f64,
    /// Importance weight per field for completeness.
    pub field_weights: IndexMap<FieldName, f64>,
    /// Confidence formula weights (must sum to 1).
    pub weights: ScoreWeights,
    /// Confidence cap applied when any field failed terminally.
    pub hard_failure_ceiling: f64,
    /// Minimum name similarity for a reference name to count as a match.
    pub name_similarity_threshold: f64,
    /// Fields below this confidence are reported as low-confidence issues.
    pub low_field_confidence: f64,
    /// Confidence at or above which priority is low.
    pub low_priority_at: f64,
    /// Confidence at or above which priority is medium.
    pub medium_priority_at: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            acceptance_threshold: 0.75,
            field_weights: default_field_weights(),
            weights: ScoreWeights::default(),
            hard_failure_ceiling: 0.2,
            name_similarity_threshold: 0.8,
            low_field_confidence: 0.5,
            low_priority_at: 0.8,
            medium_priority_at: 0.5,
        }
    }
}

impl ScoringConfig {
    /// Builder: set the confidence formula weights.
    pub fn with_weights(mut self, completeness: f64, consistency: f64, enrichment: f64) -> Self {
        self.weights = ScoreWeights {
            completeness,
            consistency,
            enrichment,
        };
        self
    }

    /// Builder: set the acceptance threshold.
    pub fn with_acceptance_threshold(mut self, threshold: f64) -> Self {
        self.acceptance_threshold = threshold;
        self
    }

    /// Importance weight of a field (0 when not listed).
    pub fn field_weight(&self, field: FieldName) -> f64 {
        self.field_weights.get(&field).copied().unwrap_or(0.0)
    }
}

/// Default per-field importance: identity fields weigh most.
pub fn default_field_weights() -> IndexMap<FieldName, f64> {
    IndexMap::from([
        (FieldName::Npi, 3.0),
        (FieldName::Name, 3.0),
        (FieldName::Phone, 2.0),
        (FieldName::AddressLine1, 2.0),
        (FieldName::Specialty, 2.0),
        (FieldName::City, 1.5),
        (FieldName::State, 1.5),
        (FieldName::LicenseNumber, 1.5),
        (FieldName::ZipCode, 1.0),
        (FieldName::Email, 1.0),
        (FieldName::Credential, 1.0),
        (FieldName::LicenseState, 1.0),
    ])
}

/// Enrichment configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    /// Candidates below this confidence are discarded.
    pub confidence_floor: f64,
    /// Present values below this confidence are re-queried.
    pub replace_below: f64,
    /// Per-lookup timeout in milliseconds.
    pub lookup_timeout_ms: u64,
    /// Present fields looked up only to cross-check the record.
    pub corroborate: Vec<FieldName>,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            confidence_floor: 0.5,
            replace_below: 0.6,
            lookup_timeout_ms: 5000,
            corroborate: vec![FieldName::Name],
        }
    }
}

impl EnrichmentConfig {
    /// Per-lookup timeout.
    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.lookup_timeout_ms)
    }
}

/// Review queue configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Maximum entries kept; the rest are dropped and counted.
    pub max_size: usize,
    /// Risk weight of `1 - confidence`.
    pub confidence_weight: f64,
    /// Fixed risk added for any hard failure.
    pub hard_failure_penalty: f64,
    /// Risk added per contradiction.
    pub contradiction_weight: f64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_size: 500,
            confidence_weight: 1.0,
            hard_failure_penalty: 1.0,
            contradiction_weight: 0.1,
        }
    }
}

/// Batch execution configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Records processed concurrently.
    pub parallelism: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self { parallelism: 5 }
    }
}

/// Input parsing configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Delimiter to use (None = auto-detect).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delimiter: Option<char>,
    /// Whether CSV input has a header row.
    pub has_header: bool,
    /// Confidence given to ingested values.
    pub original_confidence: f64,
    /// Maximum records to read (None = all).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_records: Option<usize>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            delimiter: None,
            has_header: true,
            original_confidence: 0.8,
            max_records: None,
        }
    }
}

/// A reference source to build at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceSpec {
    /// NPI-keyed registry loaded from a JSON file.
    Registry {
        path: PathBuf,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        confidence: Option<f64>,
    },
    /// Name and state keyed practice directory loaded from a JSON file.
    Directory {
        path: PathBuf,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        confidence: Option<f64>,
    },
    /// Deterministic pseudo values seeded from the NPI.
    Synthetic {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        confidence: Option<f64>,
    },
}

impl PipelineConfig {
    /// Parse configuration from TOML text. Missing keys take defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: PipelineConfig = toml::from_str(text)?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| ProvcheckError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        debug!(path = %path.display(), "loaded configuration file");
        Self::from_toml_str(&text)
    }

    /// Load an optional file, then apply environment overrides and validate.
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `PROVCHECK_*` environment overrides.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from a key lookup.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(v) = lookup(ENV_ACCEPTANCE_THRESHOLD) {
            self.scoring.acceptance_threshold = parse_override(ENV_ACCEPTANCE_THRESHOLD, &v)?;
        }
        if let Some(v) = lookup(ENV_CONFIDENCE_FLOOR) {
            self.enrichment.confidence_floor = parse_override(ENV_CONFIDENCE_FLOOR, &v)?;
        }
        if let Some(v) = lookup(ENV_LOOKUP_TIMEOUT_MS) {
            self.enrichment.lookup_timeout_ms = parse_override(ENV_LOOKUP_TIMEOUT_MS, &v)?;
        }
        if let Some(v) = lookup(ENV_PARALLELISM) {
            self.batch.parallelism = parse_override(ENV_PARALLELISM, &v)?;
        }
        if let Some(v) = lookup(ENV_QUEUE_MAX_SIZE) {
            self.queue.max_size = parse_override(ENV_QUEUE_MAX_SIZE, &v)?;
        }
        Ok(())
    }

    /// Check every option. Configuration errors are fatal at startup.
    pub fn validate(&self) -> Result<()> {
        let s = &self.scoring;
        for (name, w) in [
            ("completeness", s.weights.completeness),
            ("consistency", s.weights.consistency),
            ("enrichment", s.weights.enrichment),
        ] {
            if !w.is_finite() || w < 0.0 {
                return Err(config_error(format!(
                    "scoring weight '{}' must be a non-negative number, got {}",
                    name, w
                )));
            }
        }
        if (s.weights.sum() - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(config_error(format!(
                "scoring weights must sum to 1.0, got {:.4}",
                s.weights.sum()
            )));
        }

        if s.field_weights.is_empty() {
            return Err(config_error("field weight table is empty"));
        }
        for (field, w) in &s.field_weights {
            if !w.is_finite() || *w < 0.0 {
                return Err(config_error(format!(
                    "field weight for '{}' must be a non-negative number, got {}",
                    field, w
                )));
            }
        }
        if s.field_weights.values().sum::<f64>() <= 0.0 {
            return Err(config_error("field weights must not all be zero"));
        }

        for (name, v) in [
            ("scoring.acceptance_threshold", s.acceptance_threshold),
            ("scoring.hard_failure_ceiling", s.hard_failure_ceiling),
            ("scoring.name_similarity_threshold", s.name_similarity_threshold),
            ("scoring.low_field_confidence", s.low_field_confidence),
            ("scoring.low_priority_at", s.low_priority_at),
            ("scoring.medium_priority_at", s.medium_priority_at),
            ("enrichment.confidence_floor", self.enrichment.confidence_floor),
            ("enrichment.replace_below", self.enrichment.replace_below),
            ("ingest.original_confidence", self.ingest.original_confidence),
        ] {
            check_unit(name, v)?;
        }

        if s.hard_failure_ceiling >= s.acceptance_threshold {
            return Err(config_error(format!(
                "hard_failure_ceiling ({}) must be below acceptance_threshold ({})",
                s.hard_failure_ceiling, s.acceptance_threshold
            )));
        }
        if s.medium_priority_at > s.low_priority_at {
            return Err(config_error(
                "medium_priority_at must not exceed low_priority_at",
            ));
        }

        for (name, w) in [
            ("queue.confidence_weight", self.queue.confidence_weight),
            ("queue.hard_failure_penalty", self.queue.hard_failure_penalty),
            ("queue.contradiction_weight", self.queue.contradiction_weight),
        ] {
            if !w.is_finite() || w < 0.0 {
                return Err(config_error(format!(
                    "{} must be a non-negative number, got {}",
                    name, w
                )));
            }
        }
        if self.queue.max_size == 0 {
            return Err(config_error("queue.max_size must be at least 1"));
        }
        if self.batch.parallelism == 0 {
            return Err(config_error("batch.parallelism must be at least 1"));
        }
        if self.enrichment.lookup_timeout_ms == 0 {
            return Err(config_error("enrichment.lookup_timeout_ms must be positive"));
        }

        for spec in &self.sources {
            if let Some(c) = spec.confidence() {
                check_unit("sources.confidence", c)?;
            }
        }
        Ok(())
    }

    /// Render as TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| config_error(e.to_string()))
    }
}

impl SourceSpec {
    /// Configured confidence override, if any.
    pub fn confidence(&self) -> Option<f64> {
        match self {
            SourceSpec::Registry { confidence, .. }
            | SourceSpec::Directory { confidence, .. }
            | SourceSpec::Synthetic { confidence, .. } => *confidence,
        }
    }
}

fn parse_override<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| config_error(format!("invalid value for {}: '{}'", key, value)))
}

fn check_unit(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(config_error(format!("{} must be within [0, 1], got {}", name, value)))
    }
}

fn config_error(message: impl Into<String>) -> ProvcheckError {
    ProvcheckError::Config(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_are_valid() {
        let config = PipelineConfig::default();
        config.validate().unwrap();
        assert_eq!(config.scoring.acceptance_threshold, 0.75);
        assert_eq!(config.batch.parallelism, 5);
        assert_eq!(config.enrichment.lookup_timeout(), Duration::from_secs(5));
        assert_eq!(config.scoring.field_weight(FieldName::Npi), 3.0);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = PipelineConfig::from_toml_str(
            r#"
            [scoring]
            acceptance_threshold = 0.9

            [scoring.weights]
            completeness = 0.5
            consistency = 0.3
            enrichment = 0.2

            [queue]
            max_size = 10

            [[sources]]
            kind = "synthetic"
            name = "demo"
            "#,
        )
        .unwrap();

        assert_eq!(config.scoring.acceptance_threshold, 0.9);
        assert_eq!(config.scoring.weights.completeness, 0.5);
        assert_eq!(config.queue.max_size, 10);
        assert_eq!(config.enrichment.confidence_floor, 0.5);
        assert_eq!(config.sources.len(), 1);
        config.validate().unwrap();
    }

    #[test]
    fn test_weights_must_sum_to_one() {
        let mut config = PipelineConfig::default();
        config.scoring = config.scoring.with_weights(0.5, 0.5, 0.5);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("sum to 1.0"));
    }

    #[test]
    fn test_ceiling_below_threshold() {
        let mut config = PipelineConfig::default();
        config.scoring = config.scoring.with_acceptance_threshold(0.1);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_bad_tables() {
        let mut config = PipelineConfig::default();
        config.scoring.field_weights.clear();
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.scoring.field_weights.insert(FieldName::Email, f64::NAN);
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.batch.parallelism = 0;
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.queue.max_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_ACCEPTANCE_THRESHOLD, "0.8"),
            (ENV_PARALLELISM, "12"),
            (ENV_LOOKUP_TIMEOUT_MS, "250"),
        ]);
        let mut config = PipelineConfig::default();
        config
            .apply_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.scoring.acceptance_threshold, 0.8);
        assert_eq!(config.batch.parallelism, 12);
        assert_eq!(config.enrichment.lookup_timeout_ms, 250);
        assert_eq!(config.queue.max_size, 500);
    }

    #[test]
    fn test_bad_override_is_config_error() {
        let mut config = PipelineConfig::default();
        let err = config
            .apply_overrides(|k| (k == ENV_PARALLELISM).then(|| "many".to_string()))
            .unwrap_err();
        assert!(matches!(err, ProvcheckError::Config(_)));
    }

    #[test]
    fn test_toml_render_parses_back() {
        let config = PipelineConfig::default();
        let text = config.to_toml().unwrap();
        let back = PipelineConfig::from_toml_str(&text).unwrap();
        assert_eq!(back, config);
    }
}
