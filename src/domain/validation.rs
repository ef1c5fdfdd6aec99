//! Validation rules for state transitions and new waybills

use crate::schemas::{FeeType, Waybill, WaybillDraft, WaybillState};

use super::get_allowed_next_states;
use super::transitions::TransitionInput;

/// Result of a validation check
#[derive(Debug, Clone)]
pub struct ValidationResult {
    /// Whether the validation passed
    pub valid: bool,

    /// Reason for failure (if valid is false)
    pub reason: Option<String>,
}

impl ValidationResult {
    /// Create a successful validation result
    pub fn success() -> Self {
        ValidationResult {
            valid: true,
            reason: None,
        }
    }

    /// Create a failed validation result
    pub fn failure(reason: impl Into<String>) -> Self {
        ValidationResult {
            valid: false,
            reason: Some(reason.into()),
        }
    }
}

/// Validate entering the "dispatched" state
pub fn can_enter_dispatched(waybill: &Waybill) -> ValidationResult {
    if waybill.has_open_disputes() {
        return ValidationResult::failure("waybill has open disputes");
    }
    ValidationResult::success()
}

/// Validate entering the "in_transit" state
pub fn can_enter_in_transit(loading_complete: bool) -> ValidationResult {
    if !loading_complete {
        return ValidationResult::failure("loading not confirmed complete");
    }
    ValidationResult::success()
}

/// Validate entering the "arrived_at_branch" state
pub fn can_enter_arrived(declared_destination: &str, receiving_branch: &str) -> ValidationResult {
    if declared_destination != receiving_branch.trim() {
        return ValidationResult::failure(format!(
            "receiving branch {} does not match declared destination {}",
            receiving_branch, declared_destination
        ));
    }
    ValidationResult::success()
}

/// Validate entering the "signed_by_customer" state
pub fn can_enter_signed(signer_name: &str, credential_number: &str) -> ValidationResult {
    if signer_name.trim().is_empty() {
        return ValidationResult::failure("signature is missing the signer name");
    }
    if credential_number.trim().is_empty() {
        return ValidationResult::failure("signature is missing the credential number");
    }
    ValidationResult::success()
}

/// Validate entering the "voided" state
pub fn can_enter_voided(current: WaybillState, reason: &str) -> ValidationResult {
    if current == WaybillState::SignedByCustomer {
        return ValidationResult::failure("waybill already signed by customer");
    }
    if current == WaybillState::Voided {
        return ValidationResult::failure("waybill already voided");
    }
    if reason.trim().is_empty() {
        return ValidationResult::failure("void reason is required");
    }
    ValidationResult::success()
}

/// Validate a requested transition against the waybill's current state.
///
/// Checks the edge first (no skipping), then the edge's precondition.
pub fn validate_transition(waybill: &Waybill, input: &TransitionInput) -> ValidationResult {
    if let TransitionInput::Void { reason } = input {
        return can_enter_voided(waybill.state, reason);
    }

    let target = input.kind().target();
    let allowed = get_allowed_next_states(waybill.state);
    if !allowed.contains(&target) {
        return ValidationResult::failure(format!(
            "cannot transition from {} to {}",
            waybill.state, target
        ));
    }

    match input {
        TransitionInput::Dispatch => can_enter_dispatched(waybill),
        TransitionInput::Load {
            loading_complete, ..
        } => can_enter_in_transit(*loading_complete),
        TransitionInput::ReceiveAtBranch { branch } => {
            can_enter_arrived(&waybill.destination, branch)
        }
        TransitionInput::CustomerSign {
            signer_name,
            credential_number,
        } => can_enter_signed(signer_name, credential_number),
        TransitionInput::Void { reason } => can_enter_voided(waybill.state, reason),
    }
}

/// Validate a draft before it becomes a waybill
pub fn validate_draft(draft: &WaybillDraft) -> ValidationResult {
    let checks: [(bool, &str); 11] = [
        (!draft.origin.trim().is_empty(), "origin is required"),
        (!draft.destination.trim().is_empty(), "destination is required"),
        (
            draft.origin.trim() != draft.destination.trim(),
            "origin and destination must differ",
        ),
        (!draft.sender.name.trim().is_empty(), "sender name is required"),
        (!draft.receiver.name.trim().is_empty(), "receiver name is required"),
        (
            !draft.cargo.description.trim().is_empty(),
            "goods description is required",
        ),
        (draft.cargo.pieces >= 1, "piece count must be at least 1"),
        (draft.cargo.volume >= 0.01, "volume must be at least 0.01"),
        (draft.cargo.weight >= 0.1, "weight must be at least 0.1"),
        (draft.fee >= 1, "freight fee must be at least 1"),
        (
            draft.fee_type != FeeType::Deduction || draft.fee <= draft.cargo.declared_value,
            "deducted freight fee cannot exceed the declared goods value",
        ),
    ];
    for (ok, reason) in checks {
        if !ok {
            return ValidationResult::failure(reason);
        }
    }
    ValidationResult::success()
}
