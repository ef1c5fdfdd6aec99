//! Whole-system snapshot for file persistence

use serde::{Deserialize, Serialize};

use crate::errors::{Result, WaybillError};
use crate::ledger::{Ledger, LedgerFeed, LedgerPolicy};
use crate::permissions::{PermissionDirectory, PermissionForest};
use crate::schemas::{LedgerEvent, Permission, PermissionGroup, TransitionRecord, User, Waybill};

use super::MemoryStore;

pub const SNAPSHOT_SCHEMA_VERSION: u32 = 1;

/// Everything a workspace persists, in one document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub schema_version: u32,

    #[serde(default)]
    pub permissions: Vec<Permission>,

    #[serde(default)]
    pub groups: Vec<PermissionGroup>,

    #[serde(default)]
    pub users: Vec<User>,

    #[serde(default)]
    pub waybills: Vec<Waybill>,

    #[serde(default)]
    pub records: Vec<TransitionRecord>,

    #[serde(default)]
    pub ledger: Vec<LedgerEvent>,

    #[serde(default = "default_next_waybill_id")]
    pub next_waybill_id: u64,
}

fn default_next_waybill_id() -> u64 {
    1
}

impl Default for Snapshot {
    fn default() -> Self {
        Snapshot {
            schema_version: SNAPSHOT_SCHEMA_VERSION,
            permissions: Vec::new(),
            groups: Vec::new(),
            users: Vec::new(),
            waybills: Vec::new(),
            records: Vec::new(),
            ledger: Vec::new(),
            next_waybill_id: default_next_waybill_id(),
        }
    }
}

impl Snapshot {
    /// Capture the current state of the three collaborators
    pub fn capture(directory: &PermissionDirectory, store: &MemoryStore, ledger: &Ledger) -> Self {
        let view = directory.snapshot();
        let (waybills, records, next_waybill_id) = store.export();
        Snapshot {
            schema_version: SNAPSHOT_SCHEMA_VERSION,
            permissions: view.forest.permissions().cloned().collect(),
            groups: view.forest.groups().into_iter().cloned().collect(),
            users: view.users.values().cloned().collect(),
            waybills,
            records,
            ledger: ledger.events(),
            next_waybill_id,
        }
    }

    /// Rebuild the collaborators.
    ///
    /// Father links and permission codes are checked here; father loops are
    /// left for `doctor` and the authorizer to report.
    pub fn restore(self, policy: LedgerPolicy) -> Result<(PermissionDirectory, MemoryStore, Ledger)> {
        if self.schema_version > SNAPSHOT_SCHEMA_VERSION {
            return Err(WaybillError::InvalidJson(format!(
                "state schema version {} is newer than supported version {}",
                self.schema_version, SNAPSHOT_SCHEMA_VERSION
            )));
        }
        let forest = PermissionForest::from_parts(self.permissions, self.groups)?;
        let directory = PermissionDirectory::new(forest, self.users);
        let store = MemoryStore::restore(self.waybills, self.records, self.next_waybill_id);
        let ledger = Ledger::restore(policy, self.ledger)?;
        Ok((directory, store, ledger))
    }
}
