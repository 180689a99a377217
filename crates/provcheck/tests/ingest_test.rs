//! Integration tests for reading provider files and writing exports.

use std::io::Write;

use tempfile::{NamedTempFile, TempDir};

use provcheck::config::IngestConfig;
use provcheck::export::{self, ExportFormat};
use provcheck::ingest::load_records;
use provcheck::{FieldName, Pipeline, PipelineConfig, ProvcheckError, RecordParser};

/// Helper to create a temporary file with given content and suffix.
fn create_test_file(content: &str, suffix: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(suffix)
        .tempfile()
        .expect("Failed to create temp file");
    file.write_all(content.as_bytes())
        .expect("Failed to write to temp file");
    file
}

const PROVIDERS_CSV: &str = "provider_id,npi,provider_name,phone_number,address,city,state,zip,specialty,credentials,license,license_state,fax\n\
p1,1234567893,Jane Smith,617-555-0143,100 Main Street,Boston,MA,02115,Internal Medicine,MD,MD12345,MA,617-555-0000\n\
p2,1234567890,Robert Johnson,,200 Oak Avenue,Austin,TX,78701,Cardiology,DO,TX99881,TX,\n\
p3,1245319599,\"Garcia, Maria\",212-555-0100,,New York,NY,10001,Pediatrics,MD,,,\n";

#[test]
fn test_parse_csv_file_with_aliases() {
    let file = create_test_file(PROVIDERS_CSV, ".csv");
    let (records, meta) = RecordParser::new().parse_file(file.path()).unwrap();

    assert_eq!(records.len(), 3);
    assert_eq!(meta.record_count, 3);
    assert_eq!(meta.format, "csv");
    assert!(meta.hash.starts_with("sha256:"));
    assert_eq!(meta.unmapped_columns, vec!["fax"]);
    assert_eq!(meta.mapped_columns.len(), 12);

    let jane = &records[0];
    assert_eq!(jane.id, "p1");
    assert_eq!(jane.value(FieldName::AddressLine1), Some("100 Main Street"));
    assert_eq!(jane.value(FieldName::ZipCode), Some("02115"));
    assert_eq!(jane.value(FieldName::LicenseNumber), Some("MD12345"));
    assert_eq!(jane.provenance(FieldName::Phone).map(|p| p.to_string()), Some("original".to_string()));

    assert!(!records[1].has_value(FieldName::Phone));
    assert_eq!(records[2].value(FieldName::Name), Some("Garcia, Maria"));
}

#[test]
fn test_parse_tsv_file() {
    let file = create_test_file("npi\tname\tstate\n1234567893\tJane Smith\tMA\n", ".tsv");
    let (records, meta) = RecordParser::new().parse_file(file.path()).unwrap();
    assert_eq!(meta.format, "tsv");
    assert_eq!(records[0].id, "row-1");
    assert_eq!(records[0].value(FieldName::State), Some("MA"));
}

#[test]
fn test_parse_json_file() {
    let file = create_test_file(
        r#"[
            {"id": "j1", "npi": "1234567893", "first_name": "Jane", "last_name": "Smith", "zip_code": 2115},
            {"npi": "1245319599", "name": "Maria Garcia", "phone": null}
        ]"#,
        ".json",
    );
    let (records, meta) = RecordParser::new().parse_file(file.path()).unwrap();
    assert_eq!(meta.format, "json");
    assert_eq!(records[0].value(FieldName::Name), Some("Jane Smith"));
    assert_eq!(records[0].value(FieldName::ZipCode), Some("2115"));
    assert_eq!(records[1].id, "row-2");
    assert!(!records[1].has_value(FieldName::Phone));
}

#[test]
fn test_same_content_same_hash() {
    let a = create_test_file(PROVIDERS_CSV, ".csv");
    let b = create_test_file(PROVIDERS_CSV, ".csv");
    let (_, meta_a) = RecordParser::new().parse_file(a.path()).unwrap();
    let (_, meta_b) = RecordParser::new().parse_file(b.path()).unwrap();
    assert_eq!(meta_a.hash, meta_b.hash);
    assert_ne!(meta_a.file, meta_b.file);
}

#[test]
fn test_ingest_config_is_honored() {
    let file = create_test_file("1234567893;Jane Smith\n1245319599;Maria Garcia\n", ".txt");
    let config = IngestConfig {
        delimiter: Some(';'),
        has_header: false,
        original_confidence: 0.6,
        max_records: None,
    };
    let (records, _) = load_records(file.path(), &config).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[1].value(FieldName::Name), Some("Maria Garcia"));
    assert_eq!(records[1].confidence(FieldName::Name), 0.6);
    assert_eq!(records[1].confidence(FieldName::Npi), 0.6);
}

#[test]
fn test_missing_file() {
    let err = RecordParser::new().parse_file("/nonexistent/providers.csv").unwrap_err();
    assert!(matches!(err, ProvcheckError::Io { .. }));
}

#[test]
fn test_empty_file() {
    let file = create_test_file("", ".csv");
    let err = RecordParser::new().parse_file(file.path()).unwrap_err();
    assert!(matches!(err, ProvcheckError::EmptyData(_)));
}

#[tokio::test]
async fn test_ingest_process_export_round_trip() {
    let file = create_test_file(PROVIDERS_CSV, ".csv");
    let (records, _) = RecordParser::new().parse_file(file.path()).unwrap();

    let pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
    let report = pipeline.run(records).await;
    assert_eq!(report.results.len(), 3);

    let dir = TempDir::new().unwrap();
    let results_path = dir.path().join("results.json");
    export::save_results(&report.results, &results_path, ExportFormat::Json).unwrap();

    let loaded = export::load_results(&results_path).unwrap();
    assert_eq!(loaded, report.results);
    assert_eq!(pipeline.prioritize(&loaded), report.queue);

    let directory_path = dir.path().join("directory.csv");
    export::save_results(&report.results, &directory_path, ExportFormat::Csv).unwrap();
    let directory = std::fs::read_to_string(&directory_path).unwrap();
    let mut lines = directory.lines();
    assert_eq!(
        lines.next(),
        Some("npi,name,specialty,phone,email,city,state,status,confidence,priority")
    );
    assert!(lines.next().unwrap().starts_with("1234567893,Jane Smith,Internal Medicine,"));

    let queue_path = dir.path().join("queue.csv");
    export::save_queue(&report.queue, &queue_path, ExportFormat::Csv).unwrap();
    let queue = std::fs::read_to_string(&queue_path).unwrap();
    assert!(queue.contains("p2"));
    assert!(queue.contains("INVALID_CHECKSUM"));
}
