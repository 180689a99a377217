//! Quality assurance: completeness, consistency and confidence scoring.

mod checks;
mod report;
mod scorer;

pub use checks::{
    CROSS_CHECKS, CheckFn, CrossCheck, Operand, credential_vs_specialty,
    license_state_vs_practice_region, name_vs_reference, phone_area_code_vs_state,
    zip_prefix_vs_state,
};
pub use report::{IssueKind, PriorityLevel, QualityIssue, QualityReport, Severity};
pub use scorer::{QualityScorer, score};
