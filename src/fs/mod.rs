//! File system utilities for waybill workspaces
//!
//! Provides path resolution, JSON file operations and the workspace lock.

mod json;
mod lock;
mod paths;

pub use json::{read_config, read_json, read_state, write_config, write_json, write_state};
pub use lock::WorkspaceLock;
pub use paths::{
    find_workspace_root, get_config_path, get_lock_path, get_state_path, get_waybill_dir,
    resolve_cwd, WORKSPACE_DIR,
};
