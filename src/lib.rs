//! Waybill - Freight waybill lifecycle with permission-tree authorization
//!
//! This library provides the core functionality for the waybill CLI, including:
//! - Schema definitions for waybills, users, permission groups and ledger events
//! - Domain logic for lifecycle states and transitions
//! - The permission forest, its tree view and the authorizer
//! - An optimistic-concurrency waybill store with an append-only audit trail
//! - The reconciliation ledger feed emitted on customer sign-off
//! - File system utilities for reading/writing workspace JSON

pub mod cli;
pub mod config;
pub mod domain;
pub mod errors;
pub mod fs;
pub mod ledger;
pub mod permissions;
pub mod schemas;
pub mod store;
pub mod workflow;

// Re-export commonly used types
pub use errors::{CyclicGroupError, Result, WaybillError};
pub use permissions::{PermissionDirectory, PermissionForest};
pub use schemas::{Config, User, Waybill, WaybillId, WaybillState};
pub use workflow::{TransitionRequest, WaybillService};
