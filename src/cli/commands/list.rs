//! List command - List waybills with optional filtering

use std::path::Path;

use crate::cli::workspace::{parse_state, print_json};
use crate::cli::Workspace;
use crate::errors::Result;

pub async fn run(cwd: Option<&Path>, state: Option<&str>, json: bool) -> Result<()> {
    let state = state.map(parse_state).transpose()?;
    let workspace = Workspace::open(cwd)?;
    let waybills = workspace.service.waybills(state);

    if json {
        return print_json(&waybills);
    }

    if waybills.is_empty() {
        println!("No waybills found");
        return Ok(());
    }

    println!(
        "{:<10} {:<20} {:<16} {:<16} {:>8}",
        "ID", "STATE", "ORIGIN", "DESTINATION", "VERSION"
    );
    for waybill in &waybills {
        println!(
            "{:<10} {:<20} {:<16} {:<16} {:>8}",
            waybill.id.to_string(),
            waybill.state.to_string(),
            waybill.origin,
            waybill.destination,
            waybill.version
        );
    }
    Ok(())
}
