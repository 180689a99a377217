//! Field validators for provider records.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::record::{FieldName, ProviderRecord};
use crate::reference;

use super::result::{FieldVerdict, ReasonCode, ValidationResult};

static PHONE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:\+?1[\s.-]?)?\(?[2-9]\d{2}\)?[\s.-]?[2-9]\d{2}[\s.-]?\d{4}$").unwrap()
});

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9-]+(?:\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,}$").unwrap()
});

static ADDRESS_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+[A-Za-z]?(?:-\d+)?\s+\S*\p{L}{2,}").unwrap());

static CITY_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\p{L}[\p{L} .'-]*$").unwrap());

static ZIP_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{5}(?:-\d{4})?$").unwrap());

static NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\p{L}[\p{L} .,'-]*$").unwrap());

static SPECIALTY_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\p{L}[\p{L} &/,()-]*$").unwrap());

static LICENSE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9-]{4,20}$").unwrap());

/// Digit strings used as filler phone numbers.
const PLACEHOLDER_PHONES: &[&str] = &["1234567890", "0123456789", "9876543210"];

/// Trait for field validators.
pub trait Validator: Send + Sync {
    /// Field this validator checks.
    fn field(&self) -> FieldName;

    /// Check a non-empty value.
    fn check(&self, value: &str) -> FieldVerdict;
}

/// Validates NPI format and check digit. Every NPI failure is terminal.
pub struct NpiValidator;

impl Validator for NpiValidator {
    fn field(&self) -> FieldName {
        FieldName::Npi
    }

    fn check(&self, value: &str) -> FieldVerdict {
        let npi = value.trim();
        if npi.len() != 10 || !npi.bytes().all(|b| b.is_ascii_digit()) {
            return FieldVerdict::HardFail(ReasonCode::InvalidNpiFormat);
        }
        if is_valid_npi(npi) {
            FieldVerdict::Pass
        } else {
            FieldVerdict::HardFail(ReasonCode::InvalidChecksum)
        }
    }
}

/// Validates NANP phone numbers.
pub struct PhoneValidator;

impl Validator for PhoneValidator {
    fn field(&self) -> FieldName {
        FieldName::Phone
    }

    fn check(&self, value: &str) -> FieldVerdict {
        if let Some(digits) = reference::phone_digits(value) {
            if is_placeholder_phone(&digits) {
                return FieldVerdict::SoftFail(ReasonCode::PlaceholderPhone);
            }
        }
        if PHONE_PATTERN.is_match(value.trim()) {
            FieldVerdict::Pass
        } else {
            FieldVerdict::SoftFail(ReasonCode::MalformedPhone)
        }
    }
}

fn is_placeholder_phone(digits: &str) -> bool {
    let first = digits.as_bytes()[0];
    digits.bytes().all(|b| b == first)
        || PLACEHOLDER_PHONES.contains(&digits)
        || (digits.len() == 10 && &digits[3..6] == "555" && &digits[6..] == "5555")
}

/// Validates email shape.
pub struct EmailValidator;

impl Validator for EmailValidator {
    fn field(&self) -> FieldName {
        FieldName::Email
    }

    fn check(&self, value: &str) -> FieldVerdict {
        soft_match(&EMAIL_PATTERN, value, ReasonCode::MalformedEmail)
    }
}

/// Validates that the street line has a number and a street name.
pub struct AddressValidator;

impl Validator for AddressValidator {
    fn field(&self) -> FieldName {
        FieldName::AddressLine1
    }

    fn check(&self, value: &str) -> FieldVerdict {
        soft_match(&ADDRESS_PATTERN, value, ReasonCode::IncompleteAddress)
    }
}

/// Validates city names.
pub struct CityValidator;

impl Validator for CityValidator {
    fn field(&self) -> FieldName {
        FieldName::City
    }

    fn check(&self, value: &str) -> FieldVerdict {
        soft_match(&CITY_PATTERN, value, ReasonCode::MalformedCity)
    }
}

/// Validates a USPS state code. Used for both practice and license state.
pub struct StateValidator {
    field: FieldName,
}

impl StateValidator {
    /// Create a state validator for the given field.
    pub fn new(field: FieldName) -> Self {
        Self { field }
    }
}

impl Validator for StateValidator {
    fn field(&self) -> FieldName {
        self.field
    }

    fn check(&self, value: &str) -> FieldVerdict {
        if reference::is_state_code(value) {
            FieldVerdict::Pass
        } else {
            FieldVerdict::SoftFail(ReasonCode::InvalidState)
        }
    }
}

/// Validates 5 or 9 digit ZIP codes.
pub struct ZipValidator;

impl Validator for ZipValidator {
    fn field(&self) -> FieldName {
        FieldName::ZipCode
    }

    fn check(&self, value: &str) -> FieldVerdict {
        soft_match(&ZIP_PATTERN, value, ReasonCode::MalformedZip)
    }
}

/// Validates provider names.
pub struct NameValidator;

impl Validator for NameValidator {
    fn field(&self) -> FieldName {
        FieldName::Name
    }

    fn check(&self, value: &str) -> FieldVerdict {
        let letters = value.chars().filter(|c| c.is_alphabetic()).count();
        if letters < 2 {
            return FieldVerdict::SoftFail(ReasonCode::MalformedName);
        }
        soft_match(&NAME_PATTERN, value, ReasonCode::MalformedName)
    }
}

/// Validates specialty text.
pub struct SpecialtyValidator;

impl Validator for SpecialtyValidator {
    fn field(&self) -> FieldName {
        FieldName::Specialty
    }

    fn check(&self, value: &str) -> FieldVerdict {
        soft_match(&SPECIALTY_PATTERN, value, ReasonCode::MalformedSpecialty)
    }
}

/// Validates credentials against the known set.
pub struct CredentialValidator;

impl Validator for CredentialValidator {
    fn field(&self) -> FieldName {
        FieldName::Credential
    }

    fn check(&self, value: &str) -> FieldVerdict {
        if reference::is_known_credential(value) {
            FieldVerdict::Pass
        } else {
            FieldVerdict::SoftFail(ReasonCode::UnknownCredential)
        }
    }
}

/// Validates license number shape.
pub struct LicenseValidator;

impl Validator for LicenseValidator {
    fn field(&self) -> FieldName {
        FieldName::LicenseNumber
    }

    fn check(&self, value: &str) -> FieldVerdict {
        soft_match(&LICENSE_PATTERN, value, ReasonCode::MalformedLicense)
    }
}

fn soft_match(pattern: &Regex, value: &str, reason: ReasonCode) -> FieldVerdict {
    if pattern.is_match(value.trim()) {
        FieldVerdict::Pass
    } else {
        FieldVerdict::SoftFail(reason)
    }
}

/// Runs every field validator over a record.
pub struct ValidationEngine {
    validators: Vec<Box<dyn Validator>>,
}

impl ValidationEngine {
    /// Create an engine with the default validators.
    pub fn new() -> Self {
        Self {
            validators: vec![
                Box::new(NpiValidator),
                Box::new(NameValidator),
                Box::new(PhoneValidator),
                Box::new(EmailValidator),
                Box::new(AddressValidator),
                Box::new(CityValidator),
                Box::new(StateValidator::new(FieldName::State)),
                Box::new(ZipValidator),
                Box::new(SpecialtyValidator),
                Box::new(CredentialValidator),
                Box::new(LicenseValidator),
                Box::new(StateValidator::new(FieldName::LicenseState)),
            ],
        }
    }

    /// Validate every field of a record. Never mutates the record.
    pub fn validate(&self, record: &ProviderRecord) -> ValidationResult {
        let mut result = ValidationResult::new(&record.id);
        for field in FieldName::ALL {
            let verdict = match record.value(field) {
                Some(value) => self.check_field(field, value),
                None if field == FieldName::Npi => FieldVerdict::HardFail(ReasonCode::MissingNpi),
                None => FieldVerdict::SoftFail(ReasonCode::MissingValue),
            };
            result.verdicts.insert(field, verdict);
        }
        result
    }

    /// Validate a single value for a field.
    pub fn check_field(&self, field: FieldName, value: &str) -> FieldVerdict {
        if value.trim().is_empty() {
            return match field {
                FieldName::Npi => FieldVerdict::HardFail(ReasonCode::MissingNpi),
                _ => FieldVerdict::SoftFail(ReasonCode::MissingValue),
            };
        }
        self.validators
            .iter()
            .find(|v| v.field() == field)
            .map(|v| v.check(value))
            .unwrap_or(FieldVerdict::Pass)
    }
}

impl Default for ValidationEngine {
    fn default() -> Self {
        Self::new()
    }
}

static ENGINE: Lazy<ValidationEngine> = Lazy::new(ValidationEngine::new);

/// Validate a record with the default validators.
pub fn validate(record: &ProviderRecord) -> ValidationResult {
    ENGINE.validate(record)
}

/// Validate one candidate value for a field.
pub fn validate_field(field: FieldName, value: &str) -> FieldVerdict {
    ENGINE.check_field(field, value)
}

/// Compute the NPI check digit for the first nine digits.
///
/// Uses the Luhn algorithm over the `80840` card-issuer prefix, which
/// contributes a constant 24 to the sum.
pub fn npi_check_digit(first_nine: &str) -> Option<u8> {
    if first_nine.len() != 9 || !first_nine.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let mut sum: u32 = 24;
    for (i, b) in first_nine.bytes().rev().enumerate() {
        let mut d = u32::from(b - b'0');
        if i % 2 == 0 {
            d *= 2;
            if d > 9 {
                d -= 9;
            }
        }
        sum += d;
    }
    Some(((10 - sum % 10) % 10) as u8)
}

/// Check if a 10-digit NPI has a valid check digit.
pub fn is_valid_npi(npi: &str) -> bool {
    let npi = npi.trim();
    if npi.len() != 10 || !npi.is_ascii() {
        return false;
    }
    match (npi_check_digit(&npi[..9]), npi.as_bytes()[9]) {
        (Some(expected), last) if last.is_ascii_digit() => expected == last - b'0',
        _ => false,
    }
}
