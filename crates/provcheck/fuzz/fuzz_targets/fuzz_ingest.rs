//! Fuzz target for the provider file parser.
//!
//! The parser must never panic on malformed CSV, TSV or JSON input.

#![no_main]

use libfuzzer_sys::fuzz_target;
use provcheck::RecordParser;
use std::io::Write;

fuzz_target!(|data: &[u8]| {
    // Only process reasonable-sized inputs to avoid OOM
    if data.len() > 100_000 {
        return;
    }

    let parser = RecordParser::new();
    let _ = parser.parse_bytes(data);

    if let Ok(mut temp_file) = tempfile::NamedTempFile::new() {
        if temp_file.write_all(data).is_ok() {
            let _ = parser.parse_file(temp_file.path());
        }
    }
});
