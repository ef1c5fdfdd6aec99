//! Consistency checks across the forest, users, waybills and ledger

use std::collections::HashMap;

use serde::Serialize;

use crate::permissions::DirectorySnapshot;
use crate::schemas::{LedgerEvent, Waybill, WaybillState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

/// One problem found by [`check_consistency`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: &'static str,
    pub message: String,
}

impl Diagnostic {
    fn error(code: &'static str, message: String) -> Self {
        Diagnostic {
            severity: Severity::Error,
            code,
            message,
        }
    }

    fn warning(code: &'static str, message: String) -> Self {
        Diagnostic {
            severity: Severity::Warning,
            code,
            message,
        }
    }
}

/// Check the permission forest and the ledger boundary.
///
/// Returns an empty list when everything is consistent.
pub fn check_consistency(
    directory: &DirectorySnapshot,
    waybills: &[Waybill],
    events: &[LedgerEvent],
) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    if let Err(e) = directory.forest.validate() {
        diagnostics.push(Diagnostic::error("CYCLIC_GROUP", e.to_string()));
    }

    for user in directory.users.values() {
        for group in user.groups.iter().filter(|g| !directory.forest.contains(**g)) {
            diagnostics.push(Diagnostic::warning(
                "UNKNOWN_GROUP",
                format!("user {} references unknown group {}", user.id, group),
            ));
        }
    }

    let mut per_waybill: HashMap<_, usize> = HashMap::new();
    for event in events {
        *per_waybill.entry(event.waybill).or_default() += 1;
    }
    let states: HashMap<_, _> = waybills.iter().map(|w| (w.id, w.state)).collect();

    for waybill in waybills {
        let count = per_waybill.get(&waybill.id).copied().unwrap_or(0);
        if waybill.state == WaybillState::SignedByCustomer {
            if waybill.signature.is_none() {
                diagnostics.push(Diagnostic::error(
                    "MISSING_SIGNATURE",
                    format!("waybill {} is signed but carries no signature", waybill.id),
                ));
            }
            if count != 1 {
                diagnostics.push(Diagnostic::error(
                    "LEDGER_MISMATCH",
                    format!("signed waybill {} has {} ledger events", waybill.id, count),
                ));
            }
        }
    }

    for (waybill, _) in per_waybill {
        match states.get(&waybill) {
            Some(WaybillState::SignedByCustomer) => {}
            Some(state) => diagnostics.push(Diagnostic::error(
                "ORPHAN_LEDGER_EVENT",
                format!("ledger event for waybill {} which is {}", waybill, state),
            )),
            None => diagnostics.push(Diagnostic::error(
                "ORPHAN_LEDGER_EVENT",
                format!("ledger event for unknown waybill {}", waybill),
            )),
        }
    }

    diagnostics
}
