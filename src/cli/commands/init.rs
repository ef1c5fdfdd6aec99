//! Init command - Create a .waybill workspace

use std::path::Path;

use tracing::info;

use crate::cli::Workspace;
use crate::errors::{Result, WaybillError};
use crate::fs::{get_config_path, get_state_path, get_waybill_dir, resolve_cwd, write_config};
use crate::ledger::{Ledger, LedgerPolicy};
use crate::permissions::PermissionDirectory;
use crate::schemas::Config;
use crate::store::MemoryStore;
use crate::workflow::seed_organization;

/// Write the default config and the starter organization.
///
/// An existing `state.json` is only replaced with `force`; an existing
/// `config.json` is always kept.
pub async fn run(cwd: Option<&Path>, force: bool) -> Result<()> {
    let root = resolve_cwd(cwd);
    let state_path = get_state_path(&root);
    if state_path.exists() && !force {
        return Err(WaybillError::Validation(format!(
            "{} already exists; use --force to reset it",
            state_path.display()
        )));
    }

    std::fs::create_dir_all(get_waybill_dir(&root))?;
    if !get_config_path(&root).exists() {
        write_config(&root, &Config::default())?;
    }

    let (forest, users) = seed_organization()?;
    let user_ids: Vec<String> = users.iter().map(|u| u.id.clone()).collect();
    let workspace = Workspace::assemble(
        root.clone(),
        Config::default(),
        PermissionDirectory::new(forest, users),
        MemoryStore::new(),
        Ledger::new(LedgerPolicy::default()),
    )?;
    workspace.save()?;

    info!(root = %root.display(), "Initialized waybill workspace");
    println!("Initialized {}", get_waybill_dir(&root).display());
    println!("Users: {}", user_ids.join(", "));
    Ok(())
}
