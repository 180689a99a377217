//! CLI command implementations.

pub mod check_npi;
pub mod config;
pub mod queue;
pub mod run;
