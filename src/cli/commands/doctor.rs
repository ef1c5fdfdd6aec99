//! Doctor command - Report consistency problems in the workspace

use std::path::Path;

use crate::cli::Workspace;
use crate::errors::{Result, WaybillError};
use crate::workflow::{check_consistency, Severity};

/// Print every diagnostic; any error-level finding fails the command
pub async fn run(cwd: Option<&Path>) -> Result<()> {
    let workspace = Workspace::open(cwd)?;
    let snapshot = workspace.directory().snapshot();
    let waybills = workspace.service.waybills(None);
    let events = workspace.ledger_events();

    let diagnostics = check_consistency(&snapshot, &waybills, &events);
    if diagnostics.is_empty() {
        println!("No issues found");
        return Ok(());
    }

    for diagnostic in &diagnostics {
        let label = match diagnostic.severity {
            Severity::Error => "ERROR",
            Severity::Warning => "WARN",
        };
        println!("[{}] {}: {}", label, diagnostic.code, diagnostic.message);
    }

    let errors = diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .count();
    if errors > 0 {
        return Err(WaybillError::Validation(format!(
            "{} consistency error(s) found",
            errors
        )));
    }
    Ok(())
}
