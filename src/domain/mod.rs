//! Domain logic for waybill states and transitions

mod states;
mod transitions;
mod validation;


pub use states::{
    get_allowed_next_states, get_next_state, get_state_index, has_moved_past, is_terminal_state,
    WAYBILL_STATES,
};
pub use transitions::{apply_state_transition, TransitionInput, TransitionResult};
pub use validation::{
    can_enter_arrived, can_enter_dispatched, can_enter_in_transit, can_enter_signed,
    can_enter_voided, validate_draft, validate_transition, ValidationResult,
};
