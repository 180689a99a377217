//! Field-level validation of provider records.
//!
//! Validators are pure: they never mutate the record and never error.
//! Failures are reported as [`ReasonCode`]s on a [`ValidationResult`].

mod result;
mod validators;

pub use result::{FieldVerdict, ReasonCode, ValidationResult};
pub use validators::{
    AddressValidator, CityValidator, CredentialValidator, EmailValidator, LicenseValidator,
    NameValidator, NpiValidator, PhoneValidator, SpecialtyValidator, StateValidator,
    ValidationEngine, Validator, ZipValidator, is_valid_npi, npi_check_digit, validate,
    validate_field,
};
