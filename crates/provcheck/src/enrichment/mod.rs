//! Enrichment of weak or missing fields from reference sources.

mod resolver;
mod source;
mod sources;

pub use resolver::{EnrichmentOutcome, FailureKind, FieldResolution, Resolver, SourceFailure};
pub use source::{Candidate, MockSource, ReferenceSource};
pub use sources::{
    DIRECTORY_CONFIDENCE, DirectoryEntry, DirectorySource, FieldTable, REGISTRY_CONFIDENCE,
    RegistrySource, SYNTHETIC_CONFIDENCE, SyntheticSource, build_sources,
};

pub(crate) use sources::normalize_name;
