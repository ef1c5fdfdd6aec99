//! In-process ledger keyed by waybill id

use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::{debug, info};

use crate::errors::{Result, WaybillError};
use crate::schemas::{Config, FeeType, LedgerEvent, Waybill, WaybillId, WaybillState};

use super::LedgerFeed;

/// Ratios applied when pricing a ledger event
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LedgerPolicy {
    pub handling_fee_ratio: f64,
    pub customer_score_ratio: f64,
}

impl Default for LedgerPolicy {
    fn default() -> Self {
        LedgerPolicy {
            handling_fee_ratio: 0.002,
            customer_score_ratio: 1.0,
        }
    }
}

impl From<&Config> for LedgerPolicy {
    fn from(config: &Config) -> Self {
        LedgerPolicy {
            handling_fee_ratio: config.handling_fee_ratio,
            customer_score_ratio: config.customer_score_ratio,
        }
    }
}

impl LedgerPolicy {
    /// Price a signed waybill. `seq` and `emitted_at` are filled by the caller.
    fn price(&self, waybill: &Waybill, signed_at: String) -> LedgerEvent {
        let cargo_price = waybill.cargo.declared_value;
        let handling_fee = ceil_share(cargo_price, self.handling_fee_ratio);
        let sign_for_fee = match waybill.fee_type {
            FeeType::SignFor => waybill.fee,
            FeeType::Now | FeeType::Deduction => 0,
        };
        let deducted_fee = match waybill.fee_type {
            FeeType::Deduction => waybill.fee,
            FeeType::SignFor | FeeType::Now => 0,
        };

        LedgerEvent {
            seq: 0,
            waybill: waybill.id,
            destination: waybill.destination.clone(),
            fee_type: waybill.fee_type,
            freight_fee: waybill.fee,
            cargo_price,
            handling_fee,
            receivable: sign_for_fee + cargo_price,
            payable_to_sender: cargo_price
                .saturating_sub(handling_fee)
                .saturating_sub(deducted_fee),
            customer_score: ceil_share(waybill.fee, self.customer_score_ratio),
            signed_at,
            emitted_at: String::new(),
        }
    }
}

/// `ceil(amount * ratio)`, tolerant of binary rounding noise in the ratio
fn ceil_share(amount: u64, ratio: f64) -> u64 {
    let raw = amount as f64 * ratio;
    (raw - 1e-9).ceil().max(0.0) as u64
}

#[derive(Debug, Default)]
struct LedgerState {
    events: Vec<LedgerEvent>,
    by_waybill: HashMap<WaybillId, usize>,
}

/// Idempotent ledger held in memory
#[derive(Debug, Default)]
pub struct Ledger {
    policy: LedgerPolicy,
    state: RwLock<LedgerState>,
}

impl Ledger {
    pub fn new(policy: LedgerPolicy) -> Self {
        Ledger {
            policy,
            state: RwLock::new(LedgerState::default()),
        }
    }

    /// Rebuild from persisted events, keeping their order and sequence numbers
    pub fn restore(policy: LedgerPolicy, events: Vec<LedgerEvent>) -> Result<Self> {
        let mut state = LedgerState::default();
        for event in events {
            if state.by_waybill.contains_key(&event.waybill) {
                return Err(WaybillError::Validation(format!(
                    "duplicate ledger event for waybill {}",
                    event.waybill
                )));
            }
            state.by_waybill.insert(event.waybill, state.events.len());
            state.events.push(event);
        }
        debug!(events = state.events.len(), "Restored ledger");
        Ok(Ledger {
            policy,
            state: RwLock::new(state),
        })
    }

    pub fn policy(&self) -> LedgerPolicy {
        self.policy
    }

    pub fn len(&self) -> usize {
        self.state.read().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LedgerFeed for Ledger {
    fn on_signed(&self, waybill: &Waybill) -> Result<LedgerEvent> {
        if waybill.state != WaybillState::SignedByCustomer {
            return Err(WaybillError::Validation(format!(
                "waybill {} is {}, not signed by customer",
                waybill.id, waybill.state
            )));
        }
        let signed_at = match &waybill.signature {
            Some(signature) => signature.signed_at.clone(),
            None => {
                return Err(WaybillError::Validation(format!(
                    "waybill {} has no customer signature",
                    waybill.id
                )))
            }
        };

        let mut state = self.state.write();
        if let Some(&index) = state.by_waybill.get(&waybill.id) {
            debug!(waybill = %waybill.id, "Ledger event already emitted");
            return Ok(state.events[index].clone());
        }

        let mut event = self.policy.price(waybill, signed_at);
        event.seq = state.events.last().map(|e| e.seq).unwrap_or(0) + 1;
        event.emitted_at = chrono::Utc::now().to_rfc3339();

        let index = state.events.len();
        state.by_waybill.insert(waybill.id, index);
        state.events.push(event.clone());
        info!(
            waybill = %waybill.id,
            seq = event.seq,
            receivable = event.receivable,
            "Emitted ledger event"
        );
        Ok(event)
    }

    fn events(&self) -> Vec<LedgerEvent> {
        self.state.read().events.clone()
    }

    fn event_for(&self, waybill: WaybillId) -> Option<LedgerEvent> {
        let state = self.state.read();
        state
            .by_waybill
            .get(&waybill)
            .map(|&index| state.events[index].clone())
    }
}
