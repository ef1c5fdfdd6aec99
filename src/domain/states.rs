//! Waybill state machine definitions
//!
//! The forward path is linear:
//! created → dispatched → in_transit → arrived_at_branch → signed_by_customer
//!
//! `voided` is reachable from every non-terminal state and is itself terminal.

use crate::schemas::WaybillState;

/// The canonical ordering of the forward path.
///
/// `Voided` is a side exit, not a step.
pub const WAYBILL_STATES: &[WaybillState] = &[
    WaybillState::Created,
    WaybillState::Dispatched,
    WaybillState::InTransit,
    WaybillState::ArrivedAtBranch,
    WaybillState::SignedByCustomer,
];

/// Get the 0-based index of a state on the forward path.
///
/// Returns `None` for `Voided`.
pub fn get_state_index(state: WaybillState) -> Option<usize> {
    WAYBILL_STATES.iter().position(|&s| s == state)
}

/// Returns the next state on the forward path.
///
/// Returns None for `SignedByCustomer` and `Voided`.
pub fn get_next_state(current: WaybillState) -> Option<WaybillState> {
    let index = get_state_index(current)?;
    WAYBILL_STATES.get(index + 1).copied()
}

/// Returns every state reachable in one step from `current`.
///
/// At most two entries: the next forward state and `Voided`.
pub fn get_allowed_next_states(current: WaybillState) -> Vec<WaybillState> {
    if is_terminal_state(current) {
        return vec![];
    }
    let mut allowed = Vec::with_capacity(2);
    if let Some(next) = get_next_state(current) {
        allowed.push(next);
    }
    allowed.push(WaybillState::Voided);
    allowed
}

/// Whether `current` lies strictly beyond `state` on the forward path.
///
/// Always false when either side is `Voided`.
pub fn has_moved_past(current: WaybillState, state: WaybillState) -> bool {
    match (get_state_index(current), get_state_index(state)) {
        (Some(current), Some(state)) => current > state,
        _ => false,
    }
}

/// Check if a state is terminal (signed or voided).
pub fn is_terminal_state(state: WaybillState) -> bool {
    matches!(state, WaybillState::SignedByCustomer | WaybillState::Voided)
}
