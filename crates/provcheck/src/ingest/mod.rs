//! Reading provider records from CSV, TSV or JSON files.

mod parser;
mod source;

pub use parser::RecordParser;
pub use source::SourceMetadata;

use std::path::Path;

use crate::config::IngestConfig;
use crate::error::Result;
use crate::record::ProviderRecord;

/// Read a provider file with the given ingest settings.
pub fn load_records(path: impl AsRef<Path>, config: &IngestConfig) -> Result<(Vec<ProviderRecord>, SourceMetadata)> {
    RecordParser::with_config(config.clone()).parse_file(path)
}
