//! Waybill service
//!
//! Runs every lifecycle operation against the permission directory, the store
//! and the ledger feed. A transition follows one protocol:
//!
//! 1. Load the waybill
//! 2. Authorize the permission of the requested edge
//! 3. Denied: append a `denied` record, fail `PermissionDenied`
//! 4. Stale caller version, or no version and the waybill already moved past
//!    the edge's source state: fail `ConcurrentModification` without a record
//! 5. Edge or precondition fails: append a `rejected` record, fail `InvalidTransition`
//! 6. Otherwise commit state and the `applied` record with one compare-and-swap,
//!    emitting the ledger event inside the same commit when the waybill is signed

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::domain::{
    apply_state_transition, has_moved_past, is_terminal_state, validate_draft, TransitionInput,
    TransitionResult,
};
use crate::errors::{Result, WaybillError};
use crate::ledger::LedgerFeed;
use crate::permissions::{Capabilities, PermissionDirectory};
use crate::schemas::permission::{LEDGER_VIEW, WAYBILL_CREATE, WAYBILL_DISPUTE};
use crate::schemas::{
    LedgerEvent, Outcome, TransitionRecord, User, Waybill, WaybillDraft, WaybillId, WaybillState,
};
use crate::store::WaybillRepository;

/// A requested edge on one waybill
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionRequest {
    pub waybill: WaybillId,

    pub input: TransitionInput,

    /// Version the caller last observed; a mismatch fails fast
    #[serde(default)]
    pub expected_version: Option<u64>,
}

impl TransitionRequest {
    pub fn new(waybill: WaybillId, input: TransitionInput) -> Self {
        TransitionRequest {
            waybill,
            input,
            expected_version: None,
        }
    }

    pub fn at_version(mut self, version: u64) -> Self {
        self.expected_version = Some(version);
        self
    }
}

/// Result of an applied transition
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransitionOutcome {
    pub waybill: Waybill,
    pub record: TransitionRecord,

    /// Present when the transition reached `SignedByCustomer`
    pub ledger_event: Option<LedgerEvent>,
}

fn no_side_effect(_: &Waybill) -> Result<()> {
    Ok(())
}

#[derive(Clone)]
pub struct WaybillService {
    permissions: Arc<PermissionDirectory>,
    store: Arc<dyn WaybillRepository>,
    ledger: Arc<dyn LedgerFeed>,
}

impl WaybillService {
    pub fn new(
        permissions: Arc<PermissionDirectory>,
        store: Arc<dyn WaybillRepository>,
        ledger: Arc<dyn LedgerFeed>,
    ) -> Self {
        WaybillService {
            permissions,
            store,
            ledger,
        }
    }

    pub fn permissions(&self) -> &PermissionDirectory {
        &self.permissions
    }

    // ===== CAPABILITY QUERIES =====

    pub fn authorize(&self, user: &User, code: &str) -> Result<bool> {
        self.permissions.authorize(user, code)
    }

    pub fn capabilities(&self, user: &User) -> Result<Capabilities> {
        self.permissions.capabilities(user)
    }

    fn require(&self, user: &User, code: &str, waybill: Option<WaybillId>) -> Result<()> {
        if self.authorize(user, code)? {
            return Ok(());
        }
        warn!(actor = %user.id, permission = code, "Permission denied");
        Err(WaybillError::PermissionDenied {
            actor: user.id.clone(),
            permission: code.to_string(),
            waybill: waybill.map(|id| id.to_string()),
        })
    }

    // ===== WAYBILL ENTRY =====

    /// Validate a draft and store it as a new `Created` waybill
    pub fn create_waybill(&self, user: &User, draft: WaybillDraft) -> Result<Waybill> {
        self.require(user, WAYBILL_CREATE, None)?;
        let validation = validate_draft(&draft);
        if !validation.valid {
            return Err(WaybillError::Validation(
                validation.reason.unwrap_or_else(|| "invalid waybill".to_string()),
            ));
        }

        let id = self.store.next_waybill_id();
        let waybill = self.store.insert(Waybill::from_draft(id, draft, user.id.as_str()))?;
        info!(
            waybill = %waybill.id,
            actor = %user.id,
            destination = %waybill.destination,
            "Created waybill"
        );
        Ok(waybill)
    }

    // ===== TRANSITIONS =====

    /// Apply one lifecycle edge on behalf of `actor`
    pub fn transition(&self, actor: &User, request: TransitionRequest) -> Result<TransitionOutcome> {
        let current = self.store.load(request.waybill)?;
        let kind = request.input.kind();
        let permission = kind.required_permission();

        if !self.authorize(actor, permission)? {
            self.store.append_record(TransitionRecord::new(
                current.id,
                actor.id.as_str(),
                kind,
                current.state,
                Outcome::Denied,
            ))?;
            warn!(
                actor = %actor.id,
                permission,
                waybill = %current.id,
                "Transition denied"
            );
            return Err(WaybillError::PermissionDenied {
                actor: actor.id.clone(),
                permission: permission.to_string(),
                waybill: Some(current.id.to_string()),
            });
        }

        check_version(&current, request.expected_version)?;
        if request.expected_version.is_none() {
            if let Some(source) = kind.source().filter(|s| has_moved_past(current.state, *s)) {
                warn!(
                    actor = %actor.id,
                    waybill = %current.id,
                    source = %source,
                    found = %current.state,
                    "Waybill moved on before the transition ran"
                );
                return Err(WaybillError::ConcurrentModification {
                    waybill: current.id.to_string(),
                    expected: None,
                    found: current.version,
                });
            }
        }

        let next = match apply_state_transition(&current, &request.input, &actor.id) {
            TransitionResult::Success { next_waybill } => next_waybill,
            TransitionResult::Error { error } => {
                let rejected = TransitionRecord::new(
                    current.id,
                    actor.id.as_str(),
                    kind,
                    current.state,
                    Outcome::Rejected,
                );
                self.store.append_record(rejected.with_reason(error.clone()))?;
                warn!(
                    actor = %actor.id,
                    waybill = %current.id,
                    from = %current.state,
                    reason = %error,
                    "Transition rejected"
                );
                return Err(WaybillError::InvalidTransition {
                    waybill: current.id.to_string(),
                    reason: error,
                });
            }
        };

        let record = TransitionRecord::new(
            current.id,
            actor.id.as_str(),
            kind,
            current.state,
            Outcome::Applied,
        );
        let ledger = Arc::clone(&self.ledger);
        let emit_on_sign = move |committed: &Waybill| -> Result<()> {
            if committed.state == WaybillState::SignedByCustomer {
                ledger.on_signed(committed)?;
            }
            Ok(())
        };

        let (waybill, record) = self
            .store
            .compare_and_swap(current.version, next, Some(record), &emit_on_sign)
            .map_err(|e| {
                if e.is_retryable() {
                    warn!(actor = %actor.id, waybill = %current.id, "Lost transition race");
                }
                e
            })?;
        let record = record.ok_or_else(|| {
            WaybillError::wrap("record missing after commit", format!("waybill {}", waybill.id))
        })?;

        let ledger_event = match waybill.state {
            WaybillState::SignedByCustomer => self.ledger.event_for(waybill.id),
            _ => None,
        };
        info!(
            actor = %actor.id,
            waybill = %waybill.id,
            from = %record.from,
            to = %record.to,
            version = waybill.version,
            "Transition applied"
        );
        Ok(TransitionOutcome {
            waybill,
            record,
            ledger_event,
        })
    }

    // ===== DISPUTES =====

    /// Open a dispute; blocks dispatch until resolved
    pub fn open_dispute(
        &self,
        user: &User,
        id: WaybillId,
        reason: &str,
        expected_version: Option<u64>,
    ) -> Result<Waybill> {
        self.require(user, WAYBILL_DISPUTE, Some(id))?;
        let current = self.load_expecting(id, expected_version)?;
        if is_terminal_state(current.state) {
            return Err(WaybillError::InvalidTransition {
                waybill: id.to_string(),
                reason: format!("cannot open a dispute on a {} waybill", current.state),
            });
        }
        if reason.trim().is_empty() {
            return Err(WaybillError::Validation("dispute reason is required".to_string()));
        }

        let next = current.clone().with_dispute(reason.trim(), user.id.as_str());
        let (waybill, _) = self
            .store
            .compare_and_swap(current.version, next, None, &no_side_effect)?;
        info!(waybill = %id, actor = %user.id, "Opened dispute");
        Ok(waybill)
    }

    /// Resolve an open dispute
    pub fn resolve_dispute(
        &self,
        user: &User,
        id: WaybillId,
        dispute_id: u32,
        expected_version: Option<u64>,
    ) -> Result<Waybill> {
        self.require(user, WAYBILL_DISPUTE, Some(id))?;
        let current = self.load_expecting(id, expected_version)?;
        let dispute = current
            .disputes
            .iter()
            .find(|d| d.id == dispute_id)
            .ok_or_else(|| WaybillError::not_found("dispute", format!("{}#{}", id, dispute_id)))?;
        if !dispute.is_open() {
            return Err(WaybillError::Validation(format!(
                "dispute {} on waybill {} is already resolved",
                dispute_id, id
            )));
        }

        let next = current.clone().with_dispute_resolved(dispute_id, user.id.as_str());
        let (waybill, _) = self
            .store
            .compare_and_swap(current.version, next, None, &no_side_effect)?;
        info!(waybill = %id, actor = %user.id, dispute = dispute_id, "Resolved dispute");
        Ok(waybill)
    }

    // ===== READS =====

    pub fn waybill(&self, id: WaybillId) -> Result<Waybill> {
        self.store.load(id)
    }

    /// All waybills, optionally only those in `state`
    pub fn waybills(&self, state: Option<WaybillState>) -> Vec<Waybill> {
        self.store
            .list()
            .into_iter()
            .filter(|w| state.map_or(true, |s| w.state == s))
            .collect()
    }

    /// Audit trail of one waybill, oldest first
    pub fn history(&self, id: WaybillId) -> Result<Vec<TransitionRecord>> {
        self.store.load(id)?;
        Ok(self.store.records_for(id))
    }

    /// Ledger events, for holders of `ledger.view`
    pub fn ledger_events(&self, user: &User) -> Result<Vec<LedgerEvent>> {
        self.require(user, LEDGER_VIEW, None)?;
        Ok(self.ledger.events())
    }

    // ===== PRIVATE HELPERS =====

    fn load_expecting(&self, id: WaybillId, expected_version: Option<u64>) -> Result<Waybill> {
        let current = self.store.load(id)?;
        check_version(&current, expected_version)?;
        Ok(current)
    }
}

/// Fail fast when the caller observed an older version
fn check_version(current: &Waybill, expected_version: Option<u64>) -> Result<()> {
    match expected_version {
        Some(expected) if expected != current.version => {
            warn!(waybill = %current.id, expected, found = current.version, "Stale waybill version");
            Err(WaybillError::ConcurrentModification {
                waybill: current.id.to_string(),
                expected: Some(expected),
                found: current.version,
            })
        }
        _ => Ok(()),
    }
}
