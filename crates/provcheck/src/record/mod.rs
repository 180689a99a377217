//! Provider records and their field values.

mod field;
mod provider;

pub use field::{FieldName, FieldValue, Provenance};
pub use provider::ProviderRecord;

pub(crate) use field::clamp_unit;
