//! Authorize and capabilities commands - Capability queries for the acting user

use std::path::Path;

use serde::Serialize;

use crate::cli::workspace::print_json;
use crate::cli::Workspace;
use crate::errors::{Result, WaybillError};
use crate::permissions::Capabilities;

/// Print whether the acting user holds `code`; denial is an error exit
pub async fn authorize(cwd: Option<&Path>, user: Option<&str>, code: &str) -> Result<()> {
    let workspace = Workspace::open(cwd)?;
    let actor = workspace.actor(user)?;

    if workspace.service.authorize(&actor, code)? {
        println!("{} may {}", actor.id, code);
        Ok(())
    } else {
        Err(WaybillError::PermissionDenied {
            actor: actor.id,
            permission: code.to_string(),
            waybill: None,
        })
    }
}

#[derive(Serialize)]
struct CapabilityReport<'a> {
    user: &'a str,
    superuser: bool,
    permissions: Vec<String>,
}

pub async fn capabilities(cwd: Option<&Path>, user: Option<&str>, json: bool) -> Result<()> {
    let workspace = Workspace::open(cwd)?;
    let actor = workspace.actor(user)?;
    let capabilities = workspace.service.capabilities(&actor)?;
    let snapshot = workspace.directory().snapshot();

    let report = CapabilityReport {
        user: &actor.id,
        superuser: capabilities == Capabilities::All,
        permissions: capabilities.codes(&snapshot.forest),
    };
    if json {
        return print_json(&report);
    }

    if report.superuser {
        println!("{} is a superuser", actor.id);
    }
    if report.permissions.is_empty() {
        println!("{} holds no permissions", actor.id);
    }
    for code in &report.permissions {
        let label = snapshot
            .forest
            .permission(code)
            .map(|p| p.label.as_str())
            .unwrap_or("");
        println!("{:<28} {}", code, label);
    }
    Ok(())
}
