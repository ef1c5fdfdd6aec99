//! Transition commands - dispatch, load, receive, sign, void

use std::path::Path;

use crate::cli::workspace::parse_waybill_id;
use crate::cli::Workspace;
use crate::domain::TransitionInput;
use crate::errors::Result;
use crate::workflow::TransitionRequest;

/// Apply one edge and persist the outcome.
///
/// State is saved even when the transition fails, so denied and rejected
/// attempts stay in the audit trail.
pub async fn run(
    cwd: Option<&Path>,
    user: Option<&str>,
    id: &str,
    input: TransitionInput,
    expected_version: Option<u64>,
) -> Result<()> {
    let workspace = Workspace::open(cwd)?;
    let actor = workspace.actor(user)?;
    let request = TransitionRequest {
        waybill: parse_waybill_id(id)?,
        input,
        expected_version,
    };

    let result = workspace.service.transition(&actor, request);
    workspace.save()?;
    let outcome = result?;

    println!(
        "Waybill {}: {} -> {} (version {})",
        outcome.waybill.id, outcome.record.from, outcome.record.to, outcome.waybill.version
    );
    if let Some(event) = outcome.ledger_event {
        println!(
            "Ledger event #{}: receivable {}, payable to sender {}",
            event.seq, event.receivable, event.payable_to_sender
        );
    }
    Ok(())
}
