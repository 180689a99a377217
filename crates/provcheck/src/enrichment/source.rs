//! Reference source adapter trait and a scriptable mock.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{ProvcheckError, Result};
use crate::record::{FieldName, ProviderRecord, clamp_unit};

/// A candidate value returned by a reference source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Proposed value.
    pub value: String,
    /// Source's confidence in the value (0.0-1.0).
    pub confidence: f64,
    /// Name of the source that produced it.
    pub source_id: String,
}

impl Candidate {
    /// Create a candidate, clamping confidence into [0, 1].
    pub fn new(value: impl Into<String>, confidence: f64, source_id: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            confidence: clamp_unit(confidence),
            source_id: source_id.into(),
        }
    }
}

/// A reference source that can propose values for record fields.
///
/// Sources are shared across concurrently processed records and must be safe
/// for concurrent use.
#[async_trait]
pub trait ReferenceSource: Send + Sync {
    /// Source name, used in provenance tags (`enriched:<name>`).
    fn name(&self) -> &str;

    /// Look up a value for `field` given the rest of the record.
    ///
    /// `Ok(None)` means the source has nothing for this field.
    async fn lookup(&self, field: FieldName, context: &ProviderRecord) -> Result<Option<Candidate>>;
}

#[derive(Debug, Clone)]
enum MockBehavior {
    Respond,
    Timeout,
    Fail(String),
    Panic,
}

/// Scriptable source for tests and demos.
#[derive(Debug)]
pub struct MockSource {
    name: String,
    responses: HashMap<FieldName, (String, f64)>,
    record_responses: HashMap<(String, FieldName), (String, f64)>,
    behavior: MockBehavior,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl MockSource {
    /// Create a mock that returns nothing until scripted.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            responses: HashMap::new(),
            record_responses: HashMap::new(),
            behavior: MockBehavior::Respond,
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Builder: answer `field` with `value` for every record.
    pub fn with_response(mut self, field: FieldName, value: impl Into<String>, confidence: f64) -> Self {
        self.responses.insert(field, (value.into(), confidence));
        self
    }

    /// Builder: answer `field` with `value` for one record id only.
    pub fn with_record_response(
        mut self,
        record_id: impl Into<String>,
        field: FieldName,
        value: impl Into<String>,
        confidence: f64,
    ) -> Self {
        self.record_responses
            .insert((record_id.into(), field), (value.into(), confidence));
        self
    }

    /// Builder: wait before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Create a mock whose lookups never complete.
    pub fn always_timeout(name: impl Into<String>) -> Self {
        Self {
            behavior: MockBehavior::Timeout,
            ..Self::new(name)
        }
    }

    /// Create a mock whose lookups always error.
    pub fn always_fail(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            behavior: MockBehavior::Fail(message.into()),
            ..Self::new(name)
        }
    }

    /// Create a mock whose lookups panic.
    pub fn panicking(name: impl Into<String>) -> Self {
        Self {
            behavior: MockBehavior::Panic,
            ..Self::new(name)
        }
    }

    /// Number of lookups made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReferenceSource for MockSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn lookup(&self, field: FieldName, context: &ProviderRecord) -> Result<Option<Candidate>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.behavior {
            MockBehavior::Timeout => std::future::pending().await,
            MockBehavior::Fail(message) => Err(ProvcheckError::source(&self.name, message.clone())),
            MockBehavior::Panic => panic!("mock source '{}' panicked", self.name),
            MockBehavior::Respond => Ok(self
                .record_responses
                .get(&(context.id.clone(), field))
                .or_else(|| self.responses.get(&field))
                .map(|(value, confidence)| Candidate::new(value, *confidence, &self.name))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_scripted_responses() {
        let source = MockSource::new("mock")
            .with_response(FieldName::Phone, "617-555-0143", 0.9)
            .with_record_response("r2", FieldName::Phone, "212-555-0100", 0.7);

        let r1 = ProviderRecord::new("r1", "1234567893");
        let r2 = ProviderRecord::new("r2", "1245319599");

        let c1 = source.lookup(FieldName::Phone, &r1).await.unwrap().unwrap();
        assert_eq!(c1.value, "617-555-0143");
        assert_eq!(c1.source_id, "mock");

        let c2 = source.lookup(FieldName::Phone, &r2).await.unwrap().unwrap();
        assert_eq!(c2.value, "212-555-0100");

        assert!(source.lookup(FieldName::Email, &r1).await.unwrap().is_none());
        assert_eq!(source.calls(), 3);
    }

    #[tokio::test]
    async fn test_mock_failure() {
        let source = MockSource::always_fail("broken", "upstream unavailable");
        let record = ProviderRecord::new("r1", "1234567893");
        let err = source.lookup(FieldName::Phone, &record).await.unwrap_err();
        assert!(err.to_string().contains("upstream unavailable"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_mock_timeout_never_resolves() {
        let source = MockSource::always_timeout("slow");
        let record = ProviderRecord::new("r1", "1234567893");
        let result = tokio::time::timeout(
            Duration::from_secs(1),
            source.lookup(FieldName::Phone, &record),
        )
        .await;
        assert!(result.is_err());
    }
}
