//! Path resolution utilities for waybill workspaces
//!
//! A workspace is any directory holding a `.waybill/` directory.

use std::path::{Path, PathBuf};

use crate::errors::{Result, WaybillError};

/// Name of the workspace marker directory
pub const WORKSPACE_DIR: &str = ".waybill";

/// Find the nearest directory at or above `start_cwd` that holds `.waybill/`.
///
/// # Errors
/// * `WorkspaceNotFound` - If the path cannot be resolved or no ancestor qualifies
pub fn find_workspace_root(start_cwd: &Path) -> Result<PathBuf> {
    let mut current = start_cwd
        .canonicalize()
        .map_err(|e| WaybillError::WorkspaceNotFound(format!("Cannot resolve path: {}", e)))?;

    loop {
        if current.join(WORKSPACE_DIR).is_dir() {
            return Ok(current);
        }

        match current.parent() {
            Some(parent) if parent != current => {
                current = parent.to_path_buf();
            }
            _ => {
                return Err(WaybillError::WorkspaceNotFound(
                    "Could not find a .waybill directory; run `waybill init` first".to_string(),
                ));
            }
        }
    }
}

/// Resolve the current working directory, optionally using an override.
pub fn resolve_cwd(cwd_option: Option<&Path>) -> PathBuf {
    match cwd_option {
        Some(path) => path.to_path_buf(),
        None => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

/// Get the path to the .waybill directory.
pub fn get_waybill_dir(root: &Path) -> PathBuf {
    root.join(WORKSPACE_DIR)
}

/// Get the path to the config.json file.
pub fn get_config_path(root: &Path) -> PathBuf {
    get_waybill_dir(root).join("config.json")
}

/// Get the path to the state.json file.
pub fn get_state_path(root: &Path) -> PathBuf {
    get_waybill_dir(root).join("state.json")
}

/// Get the path to the lock file guarding state.json.
pub fn get_lock_path(root: &Path) -> PathBuf {
    get_waybill_dir(root).join("state.lock")
}
