//! Check-npi command - validate identifiers and show check digits.

use colored::Colorize;
use provcheck::validation::{npi_check_digit, validate_field};
use provcheck::{FieldName, FieldVerdict};

pub fn run(npis: Vec<String>, json_output: bool) -> Result<(), Box<dyn std::error::Error>> {
    let checks: Vec<(String, FieldVerdict, Option<u8>)> = npis
        .into_iter()
        .map(|npi| {
            let npi = npi.trim().to_string();
            let verdict = validate_field(FieldName::Npi, &npi);
            let expected = npi.get(..9).and_then(npi_check_digit);
            (npi, verdict, expected)
        })
        .collect();

    if json_output {
        let rows: Vec<_> = checks
            .iter()
            .map(|(npi, verdict, expected)| {
                serde_json::json!({
                    "npi": npi,
                    "valid": verdict.is_pass(),
                    "reason": verdict.reason().map(|r| r.code()),
                    "expected_check_digit": expected,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    for (npi, verdict, expected) in &checks {
        let status = match verdict.reason() {
            None => "valid".green().bold(),
            Some(reason) => reason.code().red().bold(),
        };
        match expected {
            Some(digit) => println!("{:12} {:20} check digit {}", npi, status, digit),
            None => println!("{:12} {}", npi, status),
        }
    }

    let invalid = checks.iter().filter(|(_, v, _)| !v.is_pass()).count();
    if invalid > 0 {
        return Err(format!("{} of {} NPIs failed validation", invalid, checks.len()).into());
    }
    Ok(())
}
