//! JSON file operations
//!
//! Reads go through serde so a malformed file fails loudly; writes are atomic.

use std::fs;
use std::io::Write;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::errors::{Result, WaybillError};
use crate::schemas::Config;
use crate::store::Snapshot;

use super::paths::{get_config_path, get_state_path};

/// Read and deserialize a JSON file.
///
/// # Errors
/// * `FileNotFound` - If the file does not exist
/// * `InvalidJson` - If the file does not parse into `T`
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            WaybillError::FileNotFound(path.display().to_string())
        } else {
            WaybillError::Io(e)
        }
    })?;

    serde_json::from_str(&content).map_err(|e| {
        WaybillError::InvalidJson(format!("{}: {}", path.display(), e))
    })
}

/// Write a value as pretty JSON.
///
/// Writes a sibling temp file, syncs it, then renames it over `path`, so
/// readers see either the old document or the new one.
pub fn write_json<T: Serialize>(path: &Path, data: &T) -> Result<()> {
    let content =
        serde_json::to_string_pretty(data).map_err(|e| WaybillError::InvalidJson(e.to_string()))?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let temp_path = path.with_extension("json.tmp");
    let mut file = fs::File::create(&temp_path)?;
    file.write_all(content.as_bytes())?;
    file.write_all(b"\n")?;
    file.sync_all()?;
    drop(file);

    fs::rename(&temp_path, path)?;
    Ok(())
}

/// Read `.waybill/config.json`, or defaults when it is absent
pub fn read_config(root: &Path) -> Result<Config> {
    let path = get_config_path(root);
    if !path.exists() {
        return Ok(Config::default());
    }
    read_json(&path)
}

pub fn write_config(root: &Path, config: &Config) -> Result<()> {
    write_json(&get_config_path(root), config)
}

/// Read `.waybill/state.json`, or an empty snapshot when it is absent
pub fn read_state(root: &Path) -> Result<Snapshot> {
    let path = get_state_path(root);
    if !path.exists() {
        return Ok(Snapshot::default());
    }
    read_json(&path)
}

pub fn write_state(root: &Path, snapshot: &Snapshot) -> Result<()> {
    write_json(&get_state_path(root), snapshot)
}
