//! Persistence boundary for waybills and their audit trail

mod memory;
mod snapshot;

pub use memory::MemoryStore;
pub use snapshot::{Snapshot, SNAPSHOT_SCHEMA_VERSION};

use crate::errors::Result;
use crate::schemas::{TransitionRecord, Waybill, WaybillId};

/// Hook run inside a commit, after the version check and before the write.
///
/// An error aborts the commit.
pub type CommitHook<'a> = &'a dyn Fn(&Waybill) -> Result<()>;

/// Transactional store of waybills plus the append-only record log.
///
/// Implementations must make `compare_and_swap` atomic: the version check,
/// the commit hook, the waybill write and the record append all happen or
/// none do.
pub trait WaybillRepository: Send + Sync {
    /// Reserve the next waybill id
    fn next_waybill_id(&self) -> WaybillId;

    /// Store a brand-new waybill; fails if the id is taken
    fn insert(&self, waybill: Waybill) -> Result<Waybill>;

    fn load(&self, id: WaybillId) -> Result<Waybill>;

    /// All waybills ordered by id
    fn list(&self) -> Vec<Waybill>;

    /// Replace the stored waybill if its version still equals
    /// `expected_version`.
    ///
    /// The committed waybill gets version `expected_version + 1`. Fails with
    /// `ConcurrentModification` on a version mismatch, leaving the store
    /// untouched.
    fn compare_and_swap(
        &self,
        expected_version: u64,
        next: Waybill,
        record: Option<TransitionRecord>,
        on_commit: CommitHook<'_>,
    ) -> Result<(Waybill, Option<TransitionRecord>)>;

    /// Append a record that carries no state change (denied or rejected)
    fn append_record(&self, record: TransitionRecord) -> Result<TransitionRecord>;

    /// Records for one waybill, oldest first
    fn records_for(&self, id: WaybillId) -> Vec<TransitionRecord>;

    /// Every record, oldest first
    fn records(&self) -> Vec<TransitionRecord>;
}
