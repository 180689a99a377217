//! Provider file parser: CSV/TSV with delimiter detection, or a JSON array.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::config::IngestConfig;
use crate::error::{ProvcheckError, Result};
use crate::record::{FieldName, ProviderRecord};

use super::source::SourceMetadata;

/// Delimiters to try when auto-detecting.
const DELIMITERS: &[u8] = &[b'\t', b',', b';', b'|'];

/// Values treated as empty.
const NULL_VALUES: &[&str] = &["", "na", "n/a", "null", "none", "-", "."];

/// What an input column maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    Id,
    Field(FieldName),
    FirstName,
    LastName,
    Ignored,
}

impl Column {
    fn from_header(header: &str) -> Self {
        let key: String = header
            .trim()
            .to_lowercase()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        match key.trim_matches('_') {
            "id" | "record_id" | "provider_id" => Column::Id,
            "npi" | "npi_number" | "provider_npi" => Column::Field(FieldName::Npi),
            "name" | "provider_name" | "full_name" | "organization_name" => Column::Field(FieldName::Name),
            "first_name" | "given_name" => Column::FirstName,
            "last_name" | "surname" | "family_name" => Column::LastName,
            "phone" | "phone_number" | "telephone" | "practice_phone" => Column::Field(FieldName::Phone),
            "email" | "email_address" => Column::Field(FieldName::Email),
            "address" | "address_line1" | "address_1" | "address1" | "street" | "street_address" => {
                Column::Field(FieldName::AddressLine1)
            }
            "city" | "practice_city" => Column::Field(FieldName::City),
            "state" | "practice_state" => Column::Field(FieldName::State),
            "zip" | "zip_code" | "zipcode" | "postal_code" => Column::Field(FieldName::ZipCode),
            "specialty" | "primary_specialty" | "taxonomy" => Column::Field(FieldName::Specialty),
            "credential" | "credentials" | "degree" => Column::Field(FieldName::Credential),
            "license" | "license_number" | "license_no" => Column::Field(FieldName::LicenseNumber),
            "license_state" | "licensing_state" => Column::Field(FieldName::LicenseState),
            _ => Column::Ignored,
        }
    }
}

/// Records parsed from one input, with column bookkeeping.
struct Parsed {
    records: Vec<ProviderRecord>,
    mapped: Vec<String>,
    unmapped: Vec<String>,
}

/// Parses provider files into records.
pub struct RecordParser {
    config: IngestConfig,
}

impl RecordParser {
    /// Create a new parser with default configuration.
    pub fn new() -> Self {
        Self {
            config: IngestConfig::default(),
        }
    }

    /// Create a parser with custom configuration.
    pub fn with_config(config: IngestConfig) -> Self {
        Self { config }
    }

    /// Parse a file and return the records and metadata.
    pub fn parse_file(&self, path: impl AsRef<Path>) -> Result<(Vec<ProviderRecord>, SourceMetadata)> {
        let path = path.as_ref();
        let io_err = |e| ProvcheckError::Io {
            path: path.to_path_buf(),
            source: e,
        };

        let mut file = File::open(path).map_err(io_err)?;
        let mut contents = Vec::new();
        file.read_to_end(&mut contents).map_err(io_err)?;

        let mut hasher = Sha256::new();
        hasher.update(&contents);
        let hash = format!("sha256:{:x}", hasher.finalize());

        let is_json = path
            .extension()
            .is_some_and(|e| e.eq_ignore_ascii_case("json"))
            || looks_like_json(&contents);

        let (parsed, format) = if is_json {
            (self.parse_json(&contents)?, "json".to_string())
        } else {
            let delimiter = self.delimiter(&contents)?;
            let format = match delimiter {
                b'\t' => "tsv",
                b',' => "csv",
                b';' => "csv-semicolon",
                b'|' => "psv",
                _ => "delimited",
            };
            (self.parse_delimited(&contents, delimiter)?, format.to_string())
        };

        let mut metadata = SourceMetadata::new(path.to_path_buf(), hash, contents.len() as u64, format);
        metadata.record_count = parsed.records.len();
        metadata.mapped_columns = parsed.mapped;
        metadata.unmapped_columns = parsed.unmapped;
        debug!(file = %metadata.file, records = metadata.record_count, format = %metadata.format, "ingested");

        Ok((parsed.records, metadata))
    }

    /// Parse in-memory input, detecting JSON or the delimiter.
    pub fn parse_bytes(&self, bytes: &[u8]) -> Result<Vec<ProviderRecord>> {
        let parsed = if looks_like_json(bytes) {
            self.parse_json(bytes)?
        } else {
            let delimiter = self.delimiter(bytes)?;
            self.parse_delimited(bytes, delimiter)?
        };
        Ok(parsed.records)
    }

    fn delimiter(&self, bytes: &[u8]) -> Result<u8> {
        match self.config.delimiter {
            Some(c) if c.is_ascii() => Ok(c as u8),
            Some(c) => Err(ProvcheckError::Config(format!("delimiter must be ASCII, got {:?}", c))),
            None => detect_delimiter(bytes),
        }
    }

    fn parse_delimited(&self, bytes: &[u8], delimiter: u8) -> Result<Parsed> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(self.config.has_header)
            .flexible(true)
            .from_reader(bytes);

        let headers: Vec<String> = if self.config.has_header {
            reader.headers()?.iter().map(|s| s.to_string()).collect()
        } else {
            default_headers()
        };
        if headers.iter().all(|h| h.trim().is_empty()) {
            return Err(ProvcheckError::EmptyData("No columns found".to_string()));
        }
        let columns = map_columns(&headers)?;

        let mut builder = RowBuilder::new(&self.config);
        for (row_idx, result) in reader.records().enumerate() {
            if self.config.max_records.is_some_and(|max| row_idx >= max) {
                break;
            }
            let row = result?;
            if row.iter().all(is_null) {
                continue;
            }
            builder.push(row_idx, columns.iter().zip(row.iter()).map(|(c, v)| (*c, v)));
        }

        builder.finish(&headers, &columns)
    }

    fn parse_json(&self, bytes: &[u8]) -> Result<Parsed> {
        let rows: Vec<Map<String, Value>> = serde_json::from_slice(bytes)?;

        let mut headers: Vec<String> = Vec::new();
        for row in &rows {
            for key in row.keys() {
                if !headers.contains(key) {
                    headers.push(key.clone());
                }
            }
        }
        let columns = map_columns(&headers)?;

        let mut builder = RowBuilder::new(&self.config);
        for (row_idx, row) in rows.iter().enumerate() {
            if self.config.max_records.is_some_and(|max| row_idx >= max) {
                break;
            }
            let mut cells = Vec::with_capacity(row.len());
            for (col_idx, (key, value)) in row.iter().enumerate() {
                let text = match value {
                    Value::Null => continue,
                    Value::String(s) => s.clone(),
                    Value::Number(n) => n.to_string(),
                    Value::Bool(b) => b.to_string(),
                    _ => {
                        return Err(ProvcheckError::Parse {
                            row: row_idx + 1,
                            column: col_idx + 1,
                            message: format!("field '{}' must be a scalar", key),
                        });
                    }
                };
                cells.push((Column::from_header(key), text));
            }
            builder.push(row_idx, cells.iter().map(|(c, v)| (*c, v.as_str())));
        }

        builder.finish(&headers, &columns)
    }
}

impl Default for RecordParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Assembles records row by row.
struct RowBuilder<'a> {
    config: &'a IngestConfig,
    records: Vec<ProviderRecord>,
}

impl<'a> RowBuilder<'a> {
    fn new(config: &'a IngestConfig) -> Self {
        Self {
            config,
            records: Vec::new(),
        }
    }

    fn push<'v>(&mut self, row_idx: usize, cells: impl Iterator<Item = (Column, &'v str)>) {
        let mut id = None;
        let mut npi = String::new();
        let mut first = None;
        let mut last = None;
        let mut values: Vec<(FieldName, &str)> = Vec::new();

        for (column, value) in cells {
            if is_null(value) {
                continue;
            }
            let value = value.trim();
            match column {
                Column::Id => id = Some(value.to_string()),
                Column::Field(FieldName::Npi) => npi = value.to_string(),
                Column::Field(field) => values.push((field, value)),
                Column::FirstName => first = Some(value),
                Column::LastName => last = Some(value),
                Column::Ignored => {}
            }
        }

        let id = id.unwrap_or_else(|| format!("row-{}", row_idx + 1));
        let confidence = self.config.original_confidence;
        let mut record = ProviderRecord::with_npi_confidence(id, npi, confidence);
        for (field, value) in values {
            record = record.with_original(field, value, confidence);
        }
        if !record.has_value(FieldName::Name) {
            let joined = [first, last].into_iter().flatten().collect::<Vec<_>>().join(" ");
            record = record.with_original(FieldName::Name, joined, confidence);
        }
        self.records.push(record);
    }

    fn finish(self, headers: &[String], columns: &[Column]) -> Result<Parsed> {
        if self.records.is_empty() {
            return Err(ProvcheckError::EmptyData("No data rows found".to_string()));
        }
        let (mapped, unmapped): (Vec<_>, Vec<_>) = headers
            .iter()
            .zip(columns)
            .partition(|(_, c)| **c != Column::Ignored);
        Ok(Parsed {
            records: self.records,
            mapped: mapped.into_iter().map(|(h, _)| h.clone()).collect(),
            unmapped: unmapped.into_iter().map(|(h, _)| h.clone()).collect(),
        })
    }
}

fn map_columns(headers: &[String]) -> Result<Vec<Column>> {
    let columns: Vec<Column> = headers.iter().map(|h| Column::from_header(h)).collect();
    if columns.iter().all(|c| *c == Column::Ignored) {
        return Err(ProvcheckError::Parse {
            row: 0,
            column: 0,
            message: format!("no recognized provider columns in: {}", headers.join(", ")),
        });
    }
    Ok(columns)
}

/// Column order assumed for header-less files.
fn default_headers() -> Vec<String> {
    FieldName::ALL.iter().map(|f| f.key().to_string()).collect()
}

fn is_null(value: &str) -> bool {
    NULL_VALUES.contains(&value.trim().to_lowercase().as_str())
}

fn looks_like_json(bytes: &[u8]) -> bool {
    bytes
        .iter()
        .find(|b| !b.is_ascii_whitespace())
        .is_some_and(|b| *b == b'[')
}

/// Detect the delimiter by analyzing the first few lines.
fn detect_delimiter(bytes: &[u8]) -> Result<u8> {
    let reader = BufReader::new(bytes);
    let lines: Vec<String> = reader
        .lines()
        .take(10)
        .filter_map(|l| l.ok())
        .filter(|l| !l.trim().is_empty())
        .collect();

    if lines.is_empty() {
        return Err(ProvcheckError::EmptyData("No lines to analyze".to_string()));
    }

    let mut best_delimiter = b',';
    let mut best_score = 0;

    for &delim in DELIMITERS {
        let counts: Vec<usize> = lines.iter().map(|line| count_delimiter(line, delim)).collect();
        let first_count = counts[0];
        if first_count == 0 {
            continue;
        }

        // Consistent counts across lines win; tabs break ties.
        let consistent = counts.iter().all(|&c| c == first_count);
        let score = if consistent {
            first_count * 1000 + if delim == b'\t' { 100 } else { 0 }
        } else {
            first_count
        };

        if score > best_score {
            best_score = score;
            best_delimiter = delim;
        }
    }

    Ok(best_delimiter)
}

/// Count delimiter occurrences in a line, respecting quotes.
fn count_delimiter(line: &str, delimiter: u8) -> usize {
    let delim = delimiter as char;
    let mut count = 0;
    let mut in_quotes = false;

    for ch in line.chars() {
        match ch {
            '"' => in_quotes = !in_quotes,
            c if c == delim && !in_quotes => count += 1,
            _ => {}
        }
    }

    count
}
