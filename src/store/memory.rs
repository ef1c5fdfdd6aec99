//! In-memory waybill store
//!
//! A single lock guards waybills, records and the id counter together, which is
//! what makes a commit atomic.

use std::collections::BTreeMap;

use parking_lot::Mutex;
use tracing::debug;

use crate::errors::{Result, WaybillError};
use crate::schemas::{TransitionRecord, Waybill, WaybillId};

use super::{CommitHook, WaybillRepository};

#[derive(Debug, Default)]
struct StoreState {
    waybills: BTreeMap<WaybillId, Waybill>,
    records: Vec<TransitionRecord>,
    next_waybill_id: u64,
}

impl StoreState {
    fn push_record(&mut self, mut record: TransitionRecord) -> TransitionRecord {
        record.seq = self.records.last().map(|r| r.seq).unwrap_or(0) + 1;
        self.records.push(record.clone());
        record
    }
}

#[derive(Debug)]
pub struct MemoryStore {
    state: Mutex<StoreState>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        MemoryStore::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore {
            state: Mutex::new(StoreState {
                next_waybill_id: 1,
                ..Default::default()
            }),
        }
    }

    /// Rebuild from persisted parts.
    ///
    /// `next_waybill_id` is raised past the highest stored id if needed.
    pub fn restore(
        waybills: Vec<Waybill>,
        records: Vec<TransitionRecord>,
        next_waybill_id: u64,
    ) -> Self {
        let highest = waybills.iter().map(|w| w.id.0).max().unwrap_or(0);
        let state = StoreState {
            waybills: waybills.into_iter().map(|w| (w.id, w)).collect(),
            records,
            next_waybill_id: next_waybill_id.max(highest + 1),
        };
        debug!(
            waybills = state.waybills.len(),
            records = state.records.len(),
            "Restored waybill store"
        );
        MemoryStore {
            state: Mutex::new(state),
        }
    }

    /// Copy out everything needed to persist the store
    pub fn export(&self) -> (Vec<Waybill>, Vec<TransitionRecord>, u64) {
        let state = self.state.lock();
        (
            state.waybills.values().cloned().collect(),
            state.records.clone(),
            state.next_waybill_id,
        )
    }
}

impl WaybillRepository for MemoryStore {
    fn next_waybill_id(&self) -> WaybillId {
        let mut state = self.state.lock();
        let id = WaybillId(state.next_waybill_id);
        state.next_waybill_id += 1;
        id
    }

    fn insert(&self, waybill: Waybill) -> Result<Waybill> {
        let mut state = self.state.lock();
        if state.waybills.contains_key(&waybill.id) {
            return Err(WaybillError::Validation(format!(
                "waybill {} already exists",
                waybill.id
            )));
        }
        if waybill.id.0 >= state.next_waybill_id {
            state.next_waybill_id = waybill.id.0 + 1;
        }
        state.waybills.insert(waybill.id, waybill.clone());
        Ok(waybill)
    }

    fn load(&self, id: WaybillId) -> Result<Waybill> {
        self.state
            .lock()
            .waybills
            .get(&id)
            .cloned()
            .ok_or_else(|| WaybillError::not_found("waybill", id))
    }

    fn list(&self) -> Vec<Waybill> {
        self.state.lock().waybills.values().cloned().collect()
    }

    fn compare_and_swap(
        &self,
        expected_version: u64,
        next: Waybill,
        record: Option<TransitionRecord>,
        on_commit: CommitHook<'_>,
    ) -> Result<(Waybill, Option<TransitionRecord>)> {
        let mut state = self.state.lock();
        let found = state
            .waybills
            .get(&next.id)
            .map(|w| w.version)
            .ok_or_else(|| WaybillError::not_found("waybill", next.id))?;
        if found != expected_version {
            return Err(WaybillError::ConcurrentModification {
                waybill: next.id.to_string(),
                expected: Some(expected_version),
                found,
            });
        }

        let committed = next.with_version(expected_version + 1);
        on_commit(&committed)?;

        state.waybills.insert(committed.id, committed.clone());
        let record = record.map(|r| state.push_record(r));
        debug!(waybill = %committed.id, version = committed.version, "Committed waybill");
        Ok((committed, record))
    }

    fn append_record(&self, record: TransitionRecord) -> Result<TransitionRecord> {
        let mut state = self.state.lock();
        if !state.waybills.contains_key(&record.waybill) {
            return Err(WaybillError::not_found("waybill", record.waybill));
        }
        Ok(state.push_record(record))
    }

    fn records_for(&self, id: WaybillId) -> Vec<TransitionRecord> {
        self.state
            .lock()
            .records
            .iter()
            .filter(|r| r.waybill == id)
            .cloned()
            .collect()
    }

    fn records(&self) -> Vec<TransitionRecord> {
        self.state.lock().records.clone()
    }
}
