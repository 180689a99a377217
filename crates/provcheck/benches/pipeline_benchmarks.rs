//! Ingestion and batch pipeline benchmarks.
//!
//! Measures parsing throughput and end-to-end batch processing with
//! in-memory reference sources.

use std::io::Write;
use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tempfile::NamedTempFile;

use provcheck::enrichment::{RegistrySource, SyntheticSource};
use provcheck::validation::npi_check_digit;
use provcheck::{FieldName, Pipeline, PipelineConfig, RecordParser, ReferenceSource};

const NAMES: &[&str] = &["Jane Smith", "Robert Johnson", "Maria Garcia", "David Lee", "Susan Chen"];
const PLACES: &[(&str, &str, &str, &str)] = &[
    ("Boston", "MA", "02115", "617"),
    ("Austin", "TX", "78701", "512"),
    ("Denver", "CO", "80202", "303"),
    ("Chicago", "IL", "60601", "312"),
];

fn random_npi(rng: &mut StdRng) -> String {
    let body = format!("1{:08}", rng.gen_range(0..100_000_000u32));
    let digit = npi_check_digit(&body).unwrap_or(0);
    format!("{}{}", body, digit)
}

/// Generate provider CSV with some gaps and broken values.
fn generate_csv(rows: usize) -> String {
    let mut rng = StdRng::seed_from_u64(42);
    let mut data = String::from("npi,name,phone,email,address,city,state,zip,specialty,credential\n");
    for row in 0..rows {
        let (city, state, zip, area) = PLACES[row % PLACES.len()];
        let npi = if rng.gen_bool(0.05) {
            "1234567890".to_string()
        } else {
            random_npi(&mut rng)
        };
        let phone = if rng.gen_bool(0.2) {
            String::new()
        } else {
            format!("{}-555-{:04}", area, rng.gen_range(100..9999))
        };
        data.push_str(&format!(
            "{},{},{},p{}@clinic.org,{} Main Street,{},{},{},Family Medicine,MD\n",
            npi,
            NAMES[row % NAMES.len()],
            phone,
            row,
            rng.gen_range(1..999),
            city,
            state,
            zip,
        ));
    }
    data
}

/// Benchmark parsing provider files of various sizes.
fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_csv");

    for rows in [100, 1_000, 10_000].iter() {
        let data = generate_csv(*rows);
        group.throughput(Throughput::Bytes(data.len() as u64));
        group.bench_with_input(BenchmarkId::new("rows", rows), &data, |b, data| {
            b.iter_with_setup(
                || {
                    let mut temp = NamedTempFile::with_suffix(".csv").unwrap();
                    temp.write_all(data.as_bytes()).unwrap();
                    temp
                },
                |temp| black_box(RecordParser::new().parse_file(temp.path()).unwrap()),
            )
        });
    }

    group.finish();
}

/// Benchmark whole batches at different parallelism settings.
fn bench_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch");
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let records = RecordParser::new().parse_bytes(generate_csv(500).as_bytes()).unwrap();

    let mut registry = RegistrySource::new("registry");
    for record in records.iter().step_by(3) {
        if let Some(npi) = record.npi() {
            registry = registry.with_entry(npi, FieldName::Phone, "617-555-0100");
        }
    }
    let sources: Vec<Arc<dyn ReferenceSource>> =
        vec![Arc::new(registry), Arc::new(SyntheticSource::new("synthetic"))];

    group.throughput(Throughput::Elements(records.len() as u64));
    for parallelism in [1, 5, 20].iter() {
        let mut config = PipelineConfig::default();
        config.batch.parallelism = *parallelism;
        let pipeline = Pipeline::with_sources(config, sources.clone()).unwrap();

        group.bench_with_input(BenchmarkId::new("parallelism", parallelism), &records, |b, records| {
            b.iter(|| black_box(runtime.block_on(pipeline.run(records.clone()))))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_parse, bench_batch);
criterion_main!(benches);
