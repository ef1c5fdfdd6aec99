//! Waybill schema - The shipment record moved through the lifecycle

use serde::{Deserialize, Serialize};

/// Numeric waybill identifier, displayed zero-padded to eight digits
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WaybillId(pub u64);

impl std::fmt::Display for WaybillId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:08}", self.0)
    }
}

impl std::str::FromStr for WaybillId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(WaybillId)
            .map_err(|_| format!("Invalid waybill id: {}", s))
    }
}

/// Lifecycle state of a waybill
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaybillState {
    /// Entered at the origin receiving point
    Created,
    /// Released from the transfer branch
    Dispatched,
    /// Loaded and on the road
    InTransit,
    /// Signed off at the destination branch
    ArrivedAtBranch,
    /// Picked up and signed by the end customer
    SignedByCustomer,
    /// Soft-deleted; kept for the audit trail
    Voided,
}

impl std::fmt::Display for WaybillState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WaybillState::Created => write!(f, "created"),
            WaybillState::Dispatched => write!(f, "dispatched"),
            WaybillState::InTransit => write!(f, "in_transit"),
            WaybillState::ArrivedAtBranch => write!(f, "arrived_at_branch"),
            WaybillState::SignedByCustomer => write!(f, "signed_by_customer"),
            WaybillState::Voided => write!(f, "voided"),
        }
    }
}

impl std::str::FromStr for WaybillState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(WaybillState::Created),
            "dispatched" => Ok(WaybillState::Dispatched),
            "in_transit" => Ok(WaybillState::InTransit),
            "arrived_at_branch" => Ok(WaybillState::ArrivedAtBranch),
            "signed_by_customer" => Ok(WaybillState::SignedByCustomer),
            "voided" => Ok(WaybillState::Voided),
            _ => Err(format!("Unknown waybill state: {}", s)),
        }
    }
}

/// Who pays the freight fee, and when
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeeType {
    /// Collected from the receiver at sign-off
    SignFor,
    /// Paid by the sender at the origin
    Now,
    /// Deducted from the collected goods value
    Deduction,
}

impl std::fmt::Display for FeeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeeType::SignFor => write!(f, "sign_for"),
            FeeType::Now => write!(f, "now"),
            FeeType::Deduction => write!(f, "deduction"),
        }
    }
}

impl std::str::FromStr for FeeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sign_for" => Ok(FeeType::SignFor),
            "now" => Ok(FeeType::Now),
            "deduction" => Ok(FeeType::Deduction),
            _ => Err(format!("Unknown fee type: {}", s)),
        }
    }
}

/// Sender or receiver contact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Party {
    pub name: String,
    pub phone: String,
}

impl Party {
    pub fn new(name: impl Into<String>, phone: impl Into<String>) -> Self {
        Party {
            name: name.into(),
            phone: phone.into(),
        }
    }
}

/// Goods carried under a waybill
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cargo {
    /// Goods description
    pub description: String,

    /// Number of pieces
    pub pieces: u32,

    /// Volume in cubic metres
    pub volume: f64,

    /// Weight in kilograms
    pub weight: f64,

    /// Declared goods value collected on delivery (0 = nothing to collect)
    #[serde(default)]
    pub declared_value: u64,
}

/// Customer sign-off captured at pickup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerSignature {
    pub signer_name: String,
    pub credential_number: String,

    /// ISO 8601 signing timestamp
    pub signed_at: String,
}

/// A blocking issue raised against a waybill before dispatch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dispute {
    pub id: u32,
    pub reason: String,
    pub opened_by: String,
    pub opened_at: String,
    #[serde(default)]
    pub resolved_by: Option<String>,
    #[serde(default)]
    pub resolved_at: Option<String>,
}

impl Dispute {
    pub fn is_open(&self) -> bool {
        self.resolved_at.is_none()
    }
}

/// One applied state change in the waybill's own history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateChange {
    pub actor: String,
    pub from: WaybillState,
    pub to: WaybillState,

    /// ISO 8601 timestamp
    pub at: String,

    /// Free-form detail (vehicle plate, receiving branch, void reason)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Data entered by the receiving clerk; becomes a waybill once validated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaybillDraft {
    /// Origin receiving point
    pub origin: String,

    /// Declared destination branch
    pub destination: String,

    pub sender: Party,
    pub receiver: Party,
    pub cargo: Cargo,

    /// Freight fee
    pub fee: u64,
    pub fee_type: FeeType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remark: Option<String>,
}

/// A freight shipment tracked end-to-end
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waybill {
    /// Schema version for forward compatibility
    pub schema_version: u32,

    pub id: WaybillId,

    /// Optimistic concurrency version, bumped by every committed write
    pub version: u64,

    pub origin: String,
    pub destination: String,
    pub sender: Party,
    pub receiver: Party,
    pub cargo: Cargo,
    pub fee: u64,
    pub fee_type: FeeType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remark: Option<String>,

    /// Current lifecycle state
    pub state: WaybillState,

    /// Applied transitions, oldest first
    #[serde(default)]
    pub history: Vec<StateChange>,

    #[serde(default)]
    pub signature: Option<CustomerSignature>,

    #[serde(default)]
    pub disputes: Vec<Dispute>,

    #[serde(default)]
    pub void_reason: Option<String>,

    /// User who entered the waybill
    pub created_by: String,

    /// ISO 8601 creation timestamp
    pub created_at: String,

    /// ISO 8601 last update timestamp
    pub updated_at: String,
}

impl Waybill {
    /// Create a new waybill in the `Created` state from a validated draft
    pub fn from_draft(id: WaybillId, draft: WaybillDraft, created_by: impl Into<String>) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Waybill {
            schema_version: 1,
            id,
            version: 1,
            origin: draft.origin,
            destination: draft.destination,
            sender: draft.sender,
            receiver: draft.receiver,
            cargo: draft.cargo,
            fee: draft.fee,
            fee_type: draft.fee_type,
            remark: draft.remark,
            state: WaybillState::Created,
            history: Vec::new(),
            signature: None,
            disputes: Vec::new(),
            void_reason: None,
            created_by: created_by.into(),
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Whether any dispute is still unresolved
    pub fn has_open_disputes(&self) -> bool {
        self.disputes.iter().any(Dispute::is_open)
    }

    /// Timestamp of the most recent change into `state`, if any
    pub fn entered_at(&self, state: WaybillState) -> Option<&str> {
        self.history
            .iter()
            .rev()
            .find(|c| c.to == state)
            .map(|c| c.at.as_str())
    }

    // ===== IMMUTABLE BUILDER METHODS =====

    /// Return a new Waybill moved to `state`, with the change appended to history
    pub fn with_state_change(
        mut self,
        actor: impl Into<String>,
        state: WaybillState,
        note: Option<String>,
    ) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        self.history.push(StateChange {
            actor: actor.into(),
            from: self.state,
            to: state,
            at: now.clone(),
            note,
        });
        self.state = state;
        self.updated_at = now;
        self
    }

    /// Return a new Waybill carrying the customer signature
    pub fn with_signature(mut self, signature: CustomerSignature) -> Self {
        self.signature = Some(signature);
        self.touch_returning()
    }

    /// Return a new Waybill carrying the void reason
    pub fn with_void_reason(mut self, reason: impl Into<String>) -> Self {
        self.void_reason = Some(reason.into());
        self.touch_returning()
    }

    /// Return a new Waybill with an additional open dispute
    pub fn with_dispute(mut self, reason: impl Into<String>, opened_by: impl Into<String>) -> Self {
        let id = self.disputes.iter().map(|d| d.id).max().unwrap_or(0) + 1;
        self.disputes.push(Dispute {
            id,
            reason: reason.into(),
            opened_by: opened_by.into(),
            opened_at: chrono::Utc::now().to_rfc3339(),
            resolved_by: None,
            resolved_at: None,
        });
        self.touch_returning()
    }

    /// Return a new Waybill with the given dispute resolved
    ///
    /// If the dispute is unknown or already resolved, returns the Waybill unchanged.
    pub fn with_dispute_resolved(mut self, dispute_id: u32, resolved_by: impl Into<String>) -> Self {
        let Some(dispute) = self
            .disputes
            .iter_mut()
            .find(|d| d.id == dispute_id && d.is_open())
        else {
            return self;
        };
        dispute.resolved_by = Some(resolved_by.into());
        dispute.resolved_at = Some(chrono::Utc::now().to_rfc3339());
        self.touch_returning()
    }

    /// Return a new Waybill with the version set (used by stores on commit)
    pub fn with_version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }

    // ===== PRIVATE HELPER =====

    fn touch_returning(mut self) -> Self {
        self.updated_at = chrono::Utc::now().to_rfc3339();
        self
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::{draft, waybill};
    use super::*;

    #[test]
    fn test_waybill_id_display_is_zero_padded() {
        assert_eq!(WaybillId(42).to_string(), "00000042");
        assert_eq!("00000042".parse::<WaybillId>().unwrap(), WaybillId(42));
        assert!("W1".parse::<WaybillId>().is_err());
    }

    #[test]
    fn test_waybill_state_serialization() {
        assert_eq!(serde_json::to_string(&WaybillState::Created).unwrap(), "\"created\"");
        assert_eq!(serde_json::to_string(&WaybillState::InTransit).unwrap(), "\"in_transit\"");
        assert_eq!(
            serde_json::to_string(&WaybillState::SignedByCustomer).unwrap(),
            "\"signed_by_customer\""
        );
        assert_eq!(
            serde_json::from_str::<WaybillState>("\"arrived_at_branch\"").unwrap(),
            WaybillState::ArrivedAtBranch
        );
    }

    #[test]
    fn test_waybill_state_display_matches_from_str() {
        for state in [
            WaybillState::Created,
            WaybillState::Dispatched,
            WaybillState::InTransit,
            WaybillState::ArrivedAtBranch,
            WaybillState::SignedByCustomer,
            WaybillState::Voided,
        ] {
            assert_eq!(state.to_string().parse::<WaybillState>().unwrap(), state);
        }
        assert!("lost".parse::<WaybillState>().is_err());
    }

    #[test]
    fn test_from_draft_starts_created() {
        let waybill = Waybill::from_draft(WaybillId(1), draft(), "clerk");
        assert_eq!(waybill.state, WaybillState::Created);
        assert_eq!(waybill.version, 1);
        assert!(waybill.history.is_empty());
        assert!(waybill.signature.is_none());
        assert_eq!(waybill.created_by, "clerk");
    }

    #[test]
    fn test_with_state_change_appends_history() {
        let original = waybill(1, WaybillState::Created);
        let next = original
            .clone()
            .with_state_change("dispatcher", WaybillState::Dispatched, None);

        assert_eq!(next.state, WaybillState::Dispatched);
        assert_eq!(next.history.len(), 1);
        assert_eq!(next.history[0].from, WaybillState::Created);
        assert_eq!(next.history[0].to, WaybillState::Dispatched);
        assert_eq!(next.history[0].actor, "dispatcher");
        assert!(next.entered_at(WaybillState::Dispatched).is_some());
        assert_eq!(original.state, WaybillState::Created); // Original unchanged
    }

    #[test]
    fn test_disputes_open_and_resolve() {
        let waybill = waybill(1, WaybillState::Created).with_dispute("damaged crate", "clerk");
        assert!(waybill.has_open_disputes());
        assert_eq!(waybill.disputes[0].id, 1);

        let resolved = waybill.with_dispute_resolved(1, "supervisor");
        assert!(!resolved.has_open_disputes());
        assert_eq!(resolved.disputes[0].resolved_by.as_deref(), Some("supervisor"));

        let unchanged = resolved.clone().with_dispute_resolved(9, "supervisor");
        assert_eq!(unchanged, resolved);
    }

    #[test]
    fn test_fee_type_round_trip_through_str() {
        assert_eq!("deduction".parse::<FeeType>().unwrap(), FeeType::Deduction);
        assert_eq!(FeeType::SignFor.to_string(), "sign_for");
        assert!("cash".parse::<FeeType>().is_err());
    }

    #[test]
    fn test_waybill_skips_none_remark() {
        let json = serde_json::to_string(&waybill(3, WaybillState::Created)).unwrap();
        assert!(!json.contains("\"remark\":"));
        assert!(json.contains("\"id\":3"));
    }
}
