//! Schema types for the waybill core
//!
//! Every persisted type round-trips through serde JSON.

mod config;
mod ledger;
pub mod permission;
mod transition;
mod user;
mod waybill;

pub use config::Config;
pub use ledger::LedgerEvent;
pub use permission::{default_catalog, GroupId, Permission, PermissionGroup};
pub use transition::{Outcome, TransitionKind, TransitionRecord};
pub use user::{RoleCategory, User};
pub use waybill::{
    Cargo, CustomerSignature, Dispute, FeeType, Party, StateChange, Waybill, WaybillDraft,
    WaybillId, WaybillState,
};

#[cfg(test)]
pub(crate) use waybill::fixtures;
