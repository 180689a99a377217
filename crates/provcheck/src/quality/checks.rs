//! Pairwise cross-field plausibility checks.
//!
//! Each check returns `Some(true)` when the pair is consistent,
//! `Some(false)` on a contradiction and `None` when the check does not apply
//! (unknown area code, territory without a region, ...).

use crate::config::ScoringConfig;
use crate::enrichment::normalize_name;
use crate::record::FieldName;
use crate::reference;

/// Signature shared by all cross-checks.
pub type CheckFn = fn(&str, &str, &ScoringConfig) -> Option<bool>;

/// Where the second value of a check comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    /// A field of the record.
    Field(FieldName),
    /// The value a reference source reported for a field.
    Reference(FieldName),
}

/// A named check over two values.
#[derive(Debug, Clone, Copy)]
pub struct CrossCheck {
    /// Check name, used in conflicts.
    pub name: &'static str,
    /// First field (always from the record).
    pub first: FieldName,
    /// Second value.
    pub second: Operand,
    /// The check itself.
    pub check: CheckFn,
}

/// Every cross-check, in evaluation order.
pub const CROSS_CHECKS: &[CrossCheck] = &[
    CrossCheck {
        name: "phone_area_code_vs_state",
        first: FieldName::Phone,
        second: Operand::Field(FieldName::State),
        check: phone_area_code_vs_state,
    },
    CrossCheck {
        name: "zip_prefix_vs_state",
        first: FieldName::ZipCode,
        second: Operand::Field(FieldName::State),
        check: zip_prefix_vs_state,
    },
    CrossCheck {
        name: "name_vs_reference",
        first: FieldName::Name,
        second: Operand::Reference(FieldName::Name),
        check: name_vs_reference,
    },
    CrossCheck {
        name: "license_state_vs_practice_region",
        first: FieldName::LicenseState,
        second: Operand::Field(FieldName::State),
        check: license_state_vs_practice_region,
    },
    CrossCheck {
        name: "credential_vs_specialty",
        first: FieldName::Credential,
        second: Operand::Field(FieldName::Specialty),
        check: credential_vs_specialty,
    },
];

/// The phone's area code is assigned to the practice state.
pub fn phone_area_code_vs_state(phone: &str, state: &str, _: &ScoringConfig) -> Option<bool> {
    let digits = reference::phone_digits(phone)?;
    let area_state = reference::area_code_state(&digits[..3])?;
    if !reference::is_state_code(state) {
        return None;
    }
    Some(area_state == reference::normalize_state(state))
}

/// The ZIP's leading digit belongs to a zone containing the state.
pub fn zip_prefix_vs_state(zip: &str, state: &str, _: &ScoringConfig) -> Option<bool> {
    let states = reference::zip_zone_states(zip)?;
    if !reference::is_state_code(state) {
        return None;
    }
    Some(states.contains(&reference::normalize_state(state).as_str()))
}

/// Honorifics and credential suffixes ignored when comparing names.
const NAME_NOISE: &[&str] = &["dr", "mr", "mrs", "ms", "md", "do", "np", "pa", "jr", "sr", "phd"];

/// The record name is similar enough to the name a reference source holds.
pub fn name_vs_reference(name: &str, reference_name: &str, config: &ScoringConfig) -> Option<bool> {
    let a = name_tokens(name);
    let b = name_tokens(reference_name);
    if a.is_empty() || b.is_empty() {
        return None;
    }
    let direct = strsim::normalized_levenshtein(&a.join(" "), &b.join(" "));
    let sorted = {
        let (mut a, mut b) = (a.clone(), b.clone());
        a.sort();
        b.sort();
        strsim::normalized_levenshtein(&a.join(" "), &b.join(" "))
    };
    Some(direct.max(sorted) >= config.name_similarity_threshold)
}

fn name_tokens(name: &str) -> Vec<String> {
    normalize_name(name)
        .split(' ')
        .filter(|t| !t.is_empty() && !NAME_NOISE.contains(t))
        .map(str::to_string)
        .collect()
}

/// The license was issued in the practice's census region.
pub fn license_state_vs_practice_region(license_state: &str, state: &str, _: &ScoringConfig) -> Option<bool> {
    let licensed = reference::state_region(license_state)?;
    let practice = reference::state_region(state)?;
    Some(licensed == practice)
}

/// Restricted-scope credentials practice in their own specialty family.
///
/// Only applies to dental, podiatry, optometry and chiropractic credentials.
pub fn credential_vs_specialty(credential: &str, specialty: &str, _: &ScoringConfig) -> Option<bool> {
    let family = reference::credential_family(credential)?;
    Some(reference::specialty_family(specialty) == Some(family))
}
