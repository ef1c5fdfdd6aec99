//! Permission schema - Capability catalog and the flat group records

use serde::{Deserialize, Serialize};

/// Create a new waybill at a receiving point
pub const WAYBILL_CREATE: &str = "waybill.create";
/// Created -> Dispatched
pub const WAYBILL_DISPATCH: &str = "waybill.dispatch";
/// Dispatched -> InTransit
pub const WAYBILL_LOAD: &str = "waybill.load";
/// InTransit -> ArrivedAtBranch
pub const WAYBILL_RECEIVE_AT_BRANCH: &str = "waybill.receive_at_branch";
/// ArrivedAtBranch -> SignedByCustomer
pub const WAYBILL_CUSTOMER_SIGN: &str = "waybill.customer_sign";
/// Any non-terminal state -> Voided
pub const WAYBILL_VOID: &str = "waybill.void";
/// Open or resolve disputes
pub const WAYBILL_DISPUTE: &str = "waybill.dispute";
/// Read the reconciliation ledger
pub const LEDGER_VIEW: &str = "ledger.view";

/// Stable identifier of a permission group
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(pub u64);

impl std::fmt::Display for GroupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A leaf capability
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    /// Stable code, e.g. `waybill.dispatch`
    pub code: String,

    /// Human-readable label
    pub label: String,
}

impl Permission {
    pub fn new(code: impl Into<String>, label: impl Into<String>) -> Self {
        Permission {
            code: code.into(),
            label: label.into(),
        }
    }
}

/// The built-in catalog shipped with a fresh workspace
pub fn default_catalog() -> Vec<Permission> {
    vec![
        Permission::new(WAYBILL_CREATE, "Create waybills"),
        Permission::new(WAYBILL_DISPATCH, "Dispatch waybills"),
        Permission::new(WAYBILL_LOAD, "Confirm loading"),
        Permission::new(WAYBILL_RECEIVE_AT_BRANCH, "Receive at branch"),
        Permission::new(WAYBILL_CUSTOMER_SIGN, "Customer sign-off"),
        Permission::new(WAYBILL_VOID, "Void waybills"),
        Permission::new(WAYBILL_DISPUTE, "Manage disputes"),
        Permission::new(LEDGER_VIEW, "View reconciliation ledger"),
    ]
}

/// Flat, persisted form of a permission group.
///
/// Children are not stored; they are derived from `father` links when the
/// forest is assembled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionGroup {
    pub id: GroupId,

    /// Unique machine name
    pub name: String,

    /// Display label
    pub label: String,

    /// Parent group; `None` marks a root
    #[serde(default)]
    pub father: Option<GroupId>,

    /// Directly granted permission codes, in grant order
    #[serde(default)]
    pub permissions: Vec<String>,

    /// Creation sequence; orders siblings deterministically
    pub seq: u64,
}
