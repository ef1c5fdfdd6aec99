//! Exclusive lock on a workspace's state
//!
//! One CLI invocation at a time may read-modify-write `state.json`. The lock is
//! an OS file lock on `.waybill/state.lock`, released when the guard drops.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use fs2::FileExt;
use tracing::{debug, warn};

use crate::errors::{Result, WaybillError};

use super::paths::get_lock_path;

/// How long to wait for another invocation before giving up
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(10);

const MAX_RETRY_DELAY: Duration = Duration::from_millis(500);

/// RAII guard over `.waybill/state.lock`
#[derive(Debug)]
pub struct WorkspaceLock {
    file: File,
    path: PathBuf,
}

impl WorkspaceLock {
    /// Acquire the lock, waiting up to [`DEFAULT_LOCK_TIMEOUT`]
    pub fn acquire(root: &Path) -> Result<Self> {
        Self::acquire_within(root, DEFAULT_LOCK_TIMEOUT)
    }

    /// Acquire the lock, retrying with exponential backoff until `timeout`
    pub fn acquire_within(root: &Path, timeout: Duration) -> Result<Self> {
        let path = get_lock_path(root);
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)?;

        let deadline = Instant::now() + timeout;
        let mut retry_delay = Duration::from_millis(20);
        loop {
            match file.try_lock_exclusive() {
                Ok(()) => {
                    debug!(path = %path.display(), "Acquired workspace lock");
                    return Ok(WorkspaceLock { file, path });
                }
                Err(e) if Instant::now() >= deadline => {
                    warn!(path = %path.display(), error = %e, "Gave up waiting for workspace lock");
                    return Err(WaybillError::WorkspaceBusy(format!(
                        "{} is held by another invocation",
                        path.display()
                    )));
                }
                Err(_) => {
                    thread::sleep(retry_delay);
                    retry_delay = (retry_delay * 2).min(MAX_RETRY_DELAY);
                }
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for WorkspaceLock {
    fn drop(&mut self) {
        if let Err(e) = self.file.unlock() {
            warn!(path = %self.path.display(), error = %e, "Failed to release workspace lock");
        }
    }
}
