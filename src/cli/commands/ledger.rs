//! Ledger command - Reconciliation events for accounting

use std::path::Path;

use crate::cli::workspace::print_json;
use crate::cli::Workspace;
use crate::errors::Result;

pub async fn run(cwd: Option<&Path>, user: Option<&str>, json: bool) -> Result<()> {
    let workspace = Workspace::open(cwd)?;
    let actor = workspace.actor(user)?;
    let events = workspace.service.ledger_events(&actor)?;

    if json {
        return print_json(&events);
    }

    if events.is_empty() {
        println!("No ledger events");
        return Ok(());
    }

    println!(
        "{:<5} {:<10} {:<10} {:>8} {:>8} {:>8} {:>10} {:>10} {:>6}",
        "SEQ", "WAYBILL", "FEE TYPE", "FREIGHT", "CARGO", "HANDLING", "RECEIVABLE", "PAYABLE", "SCORE"
    );
    for event in &events {
        println!(
            "{:<5} {:<10} {:<10} {:>8} {:>8} {:>8} {:>10} {:>10} {:>6}",
            event.seq,
            event.waybill.to_string(),
            event.fee_type.to_string(),
            event.freight_fee,
            event.cargo_price,
            event.handling_fee,
            event.receivable,
            event.payable_to_sender,
            event.customer_score
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::workspace::fixtures::seeded;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_ledger_requires_view_permission() {
        let temp = TempDir::new().unwrap();
        seeded(&temp);
        let err = run(Some(temp.path()), Some("zxg_1"), false).await.unwrap_err();
        assert_eq!(err.code(), "PERMISSION_DENIED");
        assert!(run(Some(temp.path()), Some("acct_1"), true).await.is_ok());
    }
}
