//! Dispute command - Open or resolve disputes

use std::path::Path;

use crate::cli::workspace::parse_waybill_id;
use crate::cli::{DisputeAction, Workspace};
use crate::errors::Result;

pub async fn run(cwd: Option<&Path>, user: Option<&str>, action: DisputeAction) -> Result<()> {
    let workspace = Workspace::open(cwd)?;
    let actor = workspace.actor(user)?;

    let waybill = match action {
        DisputeAction::Open {
            id,
            reason,
            version,
        } => {
            let id = parse_waybill_id(&id)?;
            let waybill = workspace
                .service
                .open_dispute(&actor, id, &reason, version.expected)?;
            if let Some(dispute) = waybill.disputes.last() {
                println!("Opened dispute #{} on waybill {}", dispute.id, waybill.id);
            }
            waybill
        }
        DisputeAction::Resolve {
            id,
            dispute,
            version,
        } => {
            let id = parse_waybill_id(&id)?;
            let waybill = workspace
                .service
                .resolve_dispute(&actor, id, dispute, version.expected)?;
            println!("Resolved dispute #{} on waybill {}", dispute, waybill.id);
            waybill
        }
    };

    workspace.save()?;
    if waybill.has_open_disputes() {
        println!("Waybill {} still has open disputes", waybill.id);
    }
    Ok(())
}
