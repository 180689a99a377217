//! Property-based tests for provcheck.
//!
//! # Running Property Tests
//!
//! ```bash
//! cargo test -p provcheck --test property_tests
//!
//! # More cases
//! PROPTEST_CASES=10000 cargo test -p provcheck --test property_tests
//! ```

use proptest::prelude::*;

use provcheck::enrichment::EnrichmentOutcome;
use provcheck::quality::score;
use provcheck::validation::{npi_check_digit, validate, validate_field};
use provcheck::{FieldName, FieldVerdict, ProviderRecord, ReasonCode, RecordParser, is_valid_npi};

// =============================================================================
// Test Strategies
// =============================================================================

/// Nine-digit NPI bodies.
fn npi_body() -> impl Strategy<Value = String> {
    "[0-9]{9}"
}

/// Values that look like provider field input.
fn field_value() -> impl Strategy<Value = String> {
    prop_oneof![
        "[A-Za-z ]{0,30}",
        "[0-9()\\- ]{0,16}",
        "[a-z]{1,10}@[a-z]{1,10}\\.(com|org)",
        "[0-9]{1,5} [A-Z][a-z]{2,10} (St|Ave|Road)",
        ".{0,40}",
    ]
}

fn with_check_digit(body: &str) -> String {
    let digit = npi_check_digit(body).expect("nine digits");
    format!("{}{}", body, digit)
}

// =============================================================================
// NPI checksum
// =============================================================================

proptest! {
    #[test]
    fn npi_with_computed_check_digit_is_valid(body in npi_body()) {
        prop_assert!(is_valid_npi(&with_check_digit(&body)));
    }

    #[test]
    fn single_digit_mutation_is_detected(body in npi_body(), pos in 0usize..10, delta in 1u8..10) {
        let npi = with_check_digit(&body);
        let mut bytes = npi.into_bytes();
        bytes[pos] = b'0' + (bytes[pos] - b'0' + delta) % 10;
        let mutated = String::from_utf8(bytes).unwrap();

        prop_assert!(!is_valid_npi(&mutated));
        prop_assert_eq!(
            validate_field(FieldName::Npi, &mutated),
            FieldVerdict::HardFail(ReasonCode::InvalidChecksum)
        );
    }

    #[test]
    fn wrong_length_is_never_valid(digits in "[0-9]{0,9}|[0-9]{11,15}") {
        prop_assert!(!is_valid_npi(&digits));
    }

    #[test]
    fn validators_never_panic(value in ".{0,60}") {
        for field in FieldName::ALL {
            let _ = validate_field(field, &value);
        }
    }
}

// =============================================================================
// Scoring
// =============================================================================

proptest! {
    #[test]
    fn confidence_is_in_unit_interval(
        body in npi_body(),
        values in proptest::collection::vec(field_value(), 11),
        confidences in proptest::collection::vec(-1.0f64..2.0, 11),
    ) {
        let mut record = ProviderRecord::new("r", with_check_digit(&body));
        for ((field, value), confidence) in FieldName::ALL[1..].iter().zip(&values).zip(&confidences) {
            record = record.with_original(*field, value.clone(), *confidence);
        }

        let validation = validate(&record);
        let report = score(&record, &validation, &EnrichmentOutcome::empty("r"));

        prop_assert!((0.0..=1.0).contains(&report.confidence()));
        prop_assert!((0.0..=1.0).contains(&report.completeness()));
        prop_assert!((0.0..=1.0).contains(&report.consistency()));
    }

    #[test]
    fn validation_is_deterministic(values in proptest::collection::vec(field_value(), 11)) {
        let mut record = ProviderRecord::new("r", "1234567893");
        for (field, value) in FieldName::ALL[1..].iter().zip(&values) {
            record = record.with_original(*field, value.clone(), 0.8);
        }
        prop_assert_eq!(validate(&record).verdicts, validate(&record).verdicts);
    }
}

// =============================================================================
// Ingestion
// =============================================================================

proptest! {
    #[test]
    fn parser_never_panics(data in proptest::collection::vec(any::<u8>(), 0..512)) {
        let _ = RecordParser::new().parse_bytes(&data);
    }

    #[test]
    fn parsed_rows_get_ids(names in proptest::collection::vec("[A-Z][a-z]{2,8} [A-Z][a-z]{2,8}", 1..20)) {
        let mut csv = String::from("npi,name\n");
        for name in &names {
            csv.push_str(&format!("1234567893,{}\n", name));
        }
        let records = RecordParser::new().parse_bytes(csv.as_bytes()).unwrap();
        prop_assert_eq!(records.len(), names.len());
        for (i, record) in records.iter().enumerate() {
            prop_assert_eq!(&record.id, &format!("row-{}", i + 1));
        }
    }
}
