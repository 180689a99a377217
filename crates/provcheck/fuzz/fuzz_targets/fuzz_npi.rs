//! Fuzz target for NPI validation.
//!
//! Checks that validation never panics and that the verdict agrees with
//! the checksum helper.

#![no_main]

use libfuzzer_sys::fuzz_target;
use provcheck::validation::{is_valid_npi, validate_field};
use provcheck::FieldName;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let verdict = validate_field(FieldName::Npi, s);
        assert_eq!(verdict.is_pass(), is_valid_npi(s));
    }
});
