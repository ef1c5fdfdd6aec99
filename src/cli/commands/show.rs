//! Show command - Show details of a single waybill

use std::path::Path;

use crate::cli::workspace::{parse_waybill_id, print_json};
use crate::cli::Workspace;
use crate::errors::Result;

pub async fn run(cwd: Option<&Path>, id: &str, json: bool) -> Result<()> {
    let workspace = Workspace::open(cwd)?;
    let waybill = workspace.service.waybill(parse_waybill_id(id)?)?;

    if json {
        return print_json(&waybill);
    }

    println!("Waybill:     {}", waybill.id);
    println!("State:       {}", waybill.state);
    println!("Version:     {}", waybill.version);
    println!("Route:       {} -> {}", waybill.origin, waybill.destination);
    println!("Sender:      {} {}", waybill.sender.name, waybill.sender.phone);
    println!("Receiver:    {} {}", waybill.receiver.name, waybill.receiver.phone);
    println!(
        "Cargo:       {} x{} ({} m3, {} kg, value {})",
        waybill.cargo.description,
        waybill.cargo.pieces,
        waybill.cargo.volume,
        waybill.cargo.weight,
        waybill.cargo.declared_value
    );
    println!("Fee:         {} ({})", waybill.fee, waybill.fee_type);
    if let Some(remark) = &waybill.remark {
        println!("Remark:      {}", remark);
    }
    if let Some(signature) = &waybill.signature {
        println!(
            "Signed by:   {} [{}] at {}",
            signature.signer_name, signature.credential_number, signature.signed_at
        );
    }
    if let Some(reason) = &waybill.void_reason {
        println!("Voided:      {}", reason);
    }
    for dispute in &waybill.disputes {
        let status = if dispute.is_open() { "open" } else { "resolved" };
        println!(
            "Dispute #{}:  {} ({}, opened by {})",
            dispute.id, dispute.reason, status, dispute.opened_by
        );
    }
    println!("Created by:  {} at {}", waybill.created_by, waybill.created_at);

    if !waybill.history.is_empty() {
        println!();
        for change in &waybill.history {
            println!("  {} {} -> {} by {}", change.at, change.from, change.to, change.actor);
        }
    }
    Ok(())
}
