//! Reconciliation ledger boundary
//!
//! The accounting side only ever sees `LedgerEvent`s emitted here; it never
//! reads waybill state directly.

mod feed;

pub use feed::{Ledger, LedgerPolicy};

use crate::errors::Result;
use crate::schemas::{LedgerEvent, Waybill, WaybillId};

/// Sink for signed waybills
pub trait LedgerFeed: Send + Sync {
    /// Emit the event for a signed waybill.
    ///
    /// Idempotent per waybill id: a second call returns the event emitted by
    /// the first and records nothing new.
    fn on_signed(&self, waybill: &Waybill) -> Result<LedgerEvent>;

    /// All events in emission order
    fn events(&self) -> Vec<LedgerEvent>;

    fn event_for(&self, waybill: WaybillId) -> Option<LedgerEvent>;
}
