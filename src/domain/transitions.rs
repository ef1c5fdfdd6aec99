//! State transition logic
//!
//! Pure functions for applying a requested edge to a waybill.

use serde::{Deserialize, Serialize};

use crate::schemas::{CustomerSignature, TransitionKind, Waybill};

use super::validation::validate_transition;

/// A requested edge together with the facts its precondition needs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TransitionInput {
    /// Created -> Dispatched
    Dispatch,
    /// Dispatched -> InTransit, confirmed by the dock worker
    Load {
        loading_complete: bool,
        #[serde(default)]
        vehicle: Option<String>,
    },
    /// InTransit -> ArrivedAtBranch at the given branch
    ReceiveAtBranch { branch: String },
    /// ArrivedAtBranch -> SignedByCustomer
    CustomerSign {
        signer_name: String,
        credential_number: String,
    },
    /// Any non-terminal state -> Voided
    Void { reason: String },
}

impl TransitionInput {
    /// The lifecycle edge this input requests
    pub fn kind(&self) -> TransitionKind {
        match self {
            TransitionInput::Dispatch => TransitionKind::Dispatch,
            TransitionInput::Load { .. } => TransitionKind::Load,
            TransitionInput::ReceiveAtBranch { .. } => TransitionKind::ReceiveAtBranch,
            TransitionInput::CustomerSign { .. } => TransitionKind::CustomerSign,
            TransitionInput::Void { .. } => TransitionKind::Void,
        }
    }

    /// Detail recorded on the waybill's history entry
    fn note(&self) -> Option<String> {
        match self {
            TransitionInput::Dispatch | TransitionInput::CustomerSign { .. } => None,
            TransitionInput::Load { vehicle, .. } => {
                vehicle.as_ref().map(|plate| format!("vehicle {}", plate))
            }
            TransitionInput::ReceiveAtBranch { branch } => Some(format!("received at {}", branch)),
            TransitionInput::Void { reason } => Some(reason.clone()),
        }
    }
}

/// Result of a state transition attempt
#[derive(Debug)]
pub enum TransitionResult {
    /// Successful transition with the new waybill state
    Success {
        /// The waybill with updated state, history and timestamp
        next_waybill: Waybill,
    },
    /// Failed transition with error message
    Error {
        /// Description of why the transition failed
        error: String,
    },
}

impl TransitionResult {
    /// Check if the transition was successful
    pub fn is_success(&self) -> bool {
        matches!(self, TransitionResult::Success { .. })
    }

    /// Check if the transition failed
    pub fn is_error(&self) -> bool {
        matches!(self, TransitionResult::Error { .. })
    }

    /// Get the next waybill if the transition was successful
    pub fn waybill(self) -> Option<Waybill> {
        match self {
            TransitionResult::Success { next_waybill } => Some(next_waybill),
            TransitionResult::Error { .. } => None,
        }
    }

    /// Get the error message if the transition failed
    pub fn error(self) -> Option<String> {
        match self {
            TransitionResult::Success { .. } => None,
            TransitionResult::Error { error } => Some(error),
        }
    }
}

/// Pure function that applies a requested edge to a waybill.
///
/// This function:
/// - Never mutates the input waybill
/// - Validates the edge and its precondition before applying
/// - Returns a new Waybill with updated state, history entry and side data
///   (signature, void reason)
/// - Leaves `version` untouched; the store bumps it on commit
pub fn apply_state_transition(
    waybill: &Waybill,
    input: &TransitionInput,
    actor: &str,
) -> TransitionResult {
    let validation = validate_transition(waybill, input);
    if !validation.valid {
        return TransitionResult::Error {
            error: validation
                .reason
                .unwrap_or_else(|| "Transition validation failed".to_string()),
        };
    }

    let target = input.kind().target();
    let mut next_waybill = waybill.clone().with_state_change(actor, target, input.note());

    match input {
        TransitionInput::CustomerSign {
            signer_name,
            credential_number,
        } => {
            let signature = CustomerSignature {
                signer_name: signer_name.trim().to_string(),
                credential_number: credential_number.trim().to_string(),
                signed_at: next_waybill.updated_at.clone(),
            };
            next_waybill = next_waybill.with_signature(signature);
        }
        TransitionInput::Void { reason } => {
            next_waybill = next_waybill.with_void_reason(reason.trim());
        }
        _ => {}
    }

    TransitionResult::Success { next_waybill }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schemas::fixtures::waybill;
    use crate::schemas::WaybillState;

    fn load() -> TransitionInput {
        TransitionInput::Load {
            loading_complete: true,
            vehicle: Some("HU-A1234".to_string()),
        }
    }

    #[test]
    fn test_transition_created_to_dispatched() {
        let created = waybill(1, WaybillState::Created);
        let result = apply_state_transition(&created, &TransitionInput::Dispatch, "dispatcher");
        assert!(result.is_success());

        let next = result.waybill().unwrap();
        assert_eq!(next.state, WaybillState::Dispatched);
        assert_eq!(next.history.last().unwrap().actor, "dispatcher");
    }

    #[test]
    fn test_transition_dispatched_to_in_transit_records_vehicle() {
        let dispatched = waybill(1, WaybillState::Dispatched);
        let next = apply_state_transition(&dispatched, &load(), "zxg_1")
            .waybill()
            .unwrap();
        assert_eq!(next.state, WaybillState::InTransit);
        assert_eq!(next.history[0].note.as_deref(), Some("vehicle HU-A1234"));
    }

    #[test]
    fn test_transition_in_transit_to_arrived() {
        let in_transit = waybill(1, WaybillState::InTransit);
        let input = TransitionInput::ReceiveAtBranch {
            branch: "east-branch".to_string(),
        };
        let next = apply_state_transition(&in_transit, &input, "branch").waybill().unwrap();
        assert_eq!(next.state, WaybillState::ArrivedAtBranch);
    }

    #[test]
    fn test_transition_arrived_to_signed_captures_signature() {
        let arrived = waybill(1, WaybillState::ArrivedAtBranch);
        let input = TransitionInput::CustomerSign {
            signer_name: " Zhang Min ".to_string(),
            credential_number: "110101199001011234".to_string(),
        };
        let next = apply_state_transition(&arrived, &input, "branch").waybill().unwrap();
        assert_eq!(next.state, WaybillState::SignedByCustomer);
        let signature = next.signature.unwrap();
        assert_eq!(signature.signer_name, "Zhang Min");
        assert!(!signature.signed_at.is_empty());
    }

    #[test]
    fn test_transition_void_keeps_reason() {
        let dispatched = waybill(1, WaybillState::Dispatched);
        let input = TransitionInput::Void {
            reason: "customer cancelled".to_string(),
        };
        let next = apply_state_transition(&dispatched, &input, "clerk").waybill().unwrap();
        assert_eq!(next.state, WaybillState::Voided);
        assert_eq!(next.void_reason.as_deref(), Some("customer cancelled"));
    }

    #[test]
    fn test_transition_from_terminal_state() {
        let signed = waybill(1, WaybillState::SignedByCustomer);
        let result = apply_state_transition(&signed, &TransitionInput::Dispatch, "dispatcher");
        assert!(result.is_error());
        assert!(result.error().unwrap().contains("cannot transition"));
    }

    #[test]
    fn test_transition_unconfirmed_loading() {
        let dispatched = waybill(1, WaybillState::Dispatched);
        let input = TransitionInput::Load {
            loading_complete: false,
            vehicle: None,
        };
        let result = apply_state_transition(&dispatched, &input, "zxg_1");
        assert!(result.is_error());
        assert!(result.error().unwrap().contains("loading"));
    }

    #[test]
    fn test_transition_does_not_mutate_original() {
        let created = waybill(1, WaybillState::Created);
        let original = created.clone();

        let _ = apply_state_transition(&created, &TransitionInput::Dispatch, "dispatcher");

        assert_eq!(created, original);
    }

    #[test]
    fn test_transition_leaves_version_to_store() {
        let created = waybill(1, WaybillState::Created);
        let next = apply_state_transition(&created, &TransitionInput::Dispatch, "dispatcher")
            .waybill()
            .unwrap();
        assert_eq!(next.version, created.version);
    }

    #[test]
    fn test_transition_input_wire_shape() {
        let json = r#"{"action": "receive_at_branch", "branch": "east-branch"}"#;
        let input: TransitionInput = serde_json::from_str(json).unwrap();
        assert_eq!(input.kind(), TransitionKind::ReceiveAtBranch);

        let load: TransitionInput =
            serde_json::from_str(r#"{"action": "load", "loading_complete": true}"#).unwrap();
        assert_eq!(
            load,
            TransitionInput::Load {
                loading_complete: true,
                vehicle: None
            }
        );
    }
}
