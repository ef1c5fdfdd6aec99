//! History command - Audit trail of a waybill

use std::path::Path;

use crate::cli::workspace::{parse_waybill_id, print_json};
use crate::cli::Workspace;
use crate::errors::Result;

pub async fn run(cwd: Option<&Path>, id: &str, json: bool) -> Result<()> {
    let workspace = Workspace::open(cwd)?;
    let id = parse_waybill_id(id)?;
    let records = workspace.service.history(id)?;

    if json {
        return print_json(&records);
    }

    if records.is_empty() {
        println!("No transition attempts recorded for waybill {}", id);
        return Ok(());
    }

    for record in &records {
        let reason = record
            .reason
            .as_deref()
            .map(|r| format!(" ({})", r))
            .unwrap_or_default();
        println!(
            "#{:<5} {} {:<9} {} -> {} by {} [{}]{}",
            record.seq,
            record.timestamp,
            record.outcome.to_string(),
            record.from,
            record.to,
            record.actor,
            record.permission,
            reason
        );
    }

    let refused = records.iter().filter(|r| r.outcome.is_refused()).count();
    if refused > 0 {
        println!("{} of {} attempts refused", refused, records.len());
    }
    Ok(())
}
