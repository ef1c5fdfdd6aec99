//! Ledger schema - Financial line items emitted for signed waybills

use serde::{Deserialize, Serialize};

use super::{FeeType, WaybillId};

/// One receivable entry per signed waybill
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEvent {
    /// Emission sequence, starting at 1
    pub seq: u64,

    /// Idempotency key
    pub waybill: WaybillId,

    /// Branch that collects the money
    pub destination: String,

    pub fee_type: FeeType,

    /// Freight fee on the waybill
    pub freight_fee: u64,

    /// Goods value collected on delivery
    pub cargo_price: u64,

    /// ceil(cargo_price * handling_fee_ratio)
    pub handling_fee: u64,

    /// Collected at the destination branch: sign-for freight plus cargo price
    pub receivable: u64,

    /// Owed back to the sender: cargo price minus handling fee and deducted freight
    pub payable_to_sender: u64,

    /// Loyalty score accrued by the sender
    pub customer_score: u64,

    /// ISO 8601 signing timestamp
    pub signed_at: String,

    /// ISO 8601 emission timestamp
    pub emitted_at: String,
}
