//! Waybill lifecycle orchestration

mod doctor;
mod seed;
mod service;

#[cfg(test)]
mod tests;

pub use doctor::{check_consistency, Diagnostic, Severity};
pub use seed::seed_organization;
pub use service::{TransitionOutcome, TransitionRequest, WaybillService};
