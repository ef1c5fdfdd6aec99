//! Transition schema - Edges of the lifecycle and the audit records they leave

use serde::{Deserialize, Serialize};

use super::permission::{
    WAYBILL_CUSTOMER_SIGN, WAYBILL_DISPATCH, WAYBILL_LOAD, WAYBILL_RECEIVE_AT_BRANCH, WAYBILL_VOID,
};
use super::{WaybillId, WaybillState};

/// A requested lifecycle edge.
///
/// The required permission is fixed per edge, never per current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    Dispatch,
    Load,
    ReceiveAtBranch,
    CustomerSign,
    Void,
}

impl TransitionKind {
    /// Permission code the actor must hold
    pub fn required_permission(self) -> &'static str {
        match self {
            TransitionKind::Dispatch => WAYBILL_DISPATCH,
            TransitionKind::Load => WAYBILL_LOAD,
            TransitionKind::ReceiveAtBranch => WAYBILL_RECEIVE_AT_BRANCH,
            TransitionKind::CustomerSign => WAYBILL_CUSTOMER_SIGN,
            TransitionKind::Void => WAYBILL_VOID,
        }
    }

    /// State the edge leads to
    pub fn target(self) -> WaybillState {
        match self {
            TransitionKind::Dispatch => WaybillState::Dispatched,
            TransitionKind::Load => WaybillState::InTransit,
            TransitionKind::ReceiveAtBranch => WaybillState::ArrivedAtBranch,
            TransitionKind::CustomerSign => WaybillState::SignedByCustomer,
            TransitionKind::Void => WaybillState::Voided,
        }
    }

    /// State the edge leaves from; `Void` leaves from any non-terminal state
    pub fn source(self) -> Option<WaybillState> {
        match self {
            TransitionKind::Dispatch => Some(WaybillState::Created),
            TransitionKind::Load => Some(WaybillState::Dispatched),
            TransitionKind::ReceiveAtBranch => Some(WaybillState::InTransit),
            TransitionKind::CustomerSign => Some(WaybillState::ArrivedAtBranch),
            TransitionKind::Void => None,
        }
    }

    /// The edge that enters `target`, if any
    pub fn entering(target: WaybillState) -> Option<Self> {
        match target {
            WaybillState::Created => None,
            WaybillState::Dispatched => Some(TransitionKind::Dispatch),
            WaybillState::InTransit => Some(TransitionKind::Load),
            WaybillState::ArrivedAtBranch => Some(TransitionKind::ReceiveAtBranch),
            WaybillState::SignedByCustomer => Some(TransitionKind::CustomerSign),
            WaybillState::Voided => Some(TransitionKind::Void),
        }
    }
}

impl std::fmt::Display for TransitionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransitionKind::Dispatch => write!(f, "dispatch"),
            TransitionKind::Load => write!(f, "load"),
            TransitionKind::ReceiveAtBranch => write!(f, "receive_at_branch"),
            TransitionKind::CustomerSign => write!(f, "customer_sign"),
            TransitionKind::Void => write!(f, "void"),
        }
    }
}

/// What happened to a transition attempt.
///
/// Every failed attempt is either `Denied` or `Rejected`. Consumers that want
/// all refused attempts should filter on [`Outcome::is_refused`] rather than
/// on `Denied` alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// State changed
    Applied,
    /// Actor lacked the permission
    Denied,
    /// Permission held but the edge or its precondition failed
    Rejected,
}

impl Outcome {
    /// Attempt left the waybill unchanged (denied or rejected)
    pub fn is_refused(self) -> bool {
        !matches!(self, Outcome::Applied)
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Applied => write!(f, "applied"),
            Outcome::Denied => write!(f, "denied"),
            Outcome::Rejected => write!(f, "rejected"),
        }
    }
}

/// Immutable audit entry; `seq` is assigned by the record store on append
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionRecord {
    #[serde(default)]
    pub seq: u64,

    pub waybill: WaybillId,

    /// User id of the actor
    pub actor: String,

    /// Permission code that was checked
    pub permission: String,

    pub from: WaybillState,
    pub to: WaybillState,
    pub outcome: Outcome,

    /// Why the attempt failed (denied/rejected only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// ISO 8601 timestamp
    pub timestamp: String,
}

impl TransitionRecord {
    /// Create an unsequenced record stamped with the current time
    pub fn new(
        waybill: WaybillId,
        actor: impl Into<String>,
        kind: TransitionKind,
        from: WaybillState,
        outcome: Outcome,
    ) -> Self {
        TransitionRecord {
            seq: 0,
            waybill,
            actor: actor.into(),
            permission: kind.required_permission().to_string(),
            from,
            to: kind.target(),
            outcome,
            reason: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Return a new record carrying a failure reason
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}
