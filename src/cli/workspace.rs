//! Loading and saving a workspace for one CLI invocation

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::config::load_config;
use crate::errors::{Result, WaybillError};
use crate::fs::{find_workspace_root, read_state, resolve_cwd, write_state, WorkspaceLock};
use crate::ledger::{Ledger, LedgerFeed, LedgerPolicy};
use crate::permissions::PermissionDirectory;
use crate::schemas::{Config, LedgerEvent, User, WaybillId, WaybillState};
use crate::store::{MemoryStore, Snapshot};
use crate::workflow::WaybillService;

/// An opened workspace: configuration plus live collaborators.
///
/// Holds the workspace lock from `open` until dropped, so a whole
/// read-modify-save cycle runs alone against `state.json`.
pub struct Workspace {
    pub root: PathBuf,
    pub config: Config,
    pub service: WaybillService,
    directory: Arc<PermissionDirectory>,
    store: Arc<MemoryStore>,
    ledger: Arc<Ledger>,
    _lock: WorkspaceLock,
}

impl Workspace {
    /// Locate the workspace above `cwd`, lock it and load its state
    pub fn open(cwd: Option<&Path>) -> Result<Self> {
        let root = find_workspace_root(&resolve_cwd(cwd))?;
        let lock = WorkspaceLock::acquire(&root)?;
        let config = load_config(&root)?;
        let snapshot = read_state(&root)?;
        debug!(root = %root.display(), waybills = snapshot.waybills.len(), "Opened workspace");

        let (directory, store, ledger) = snapshot.restore(LedgerPolicy::from(&config))?;
        Ok(Self::with_lock(lock, root, config, directory, store, ledger))
    }

    /// Lock `root` and wrap freshly built collaborators
    pub(crate) fn assemble(
        root: PathBuf,
        config: Config,
        directory: PermissionDirectory,
        store: MemoryStore,
        ledger: Ledger,
    ) -> Result<Self> {
        let lock = WorkspaceLock::acquire(&root)?;
        Ok(Self::with_lock(lock, root, config, directory, store, ledger))
    }

    fn with_lock(
        lock: WorkspaceLock,
        root: PathBuf,
        config: Config,
        directory: PermissionDirectory,
        store: MemoryStore,
        ledger: Ledger,
    ) -> Self {
        let directory = Arc::new(directory);
        let store = Arc::new(store);
        let ledger = Arc::new(ledger);
        let service = WaybillService::new(directory.clone(), store.clone(), ledger.clone());
        Workspace {
            root,
            config,
            service,
            directory,
            store,
            ledger,
            _lock: lock,
        }
    }

    pub fn directory(&self) -> &PermissionDirectory {
        &self.directory
    }

    /// Every ledger event, bypassing the `ledger.view` check
    pub(crate) fn ledger_events(&self) -> Vec<LedgerEvent> {
        self.ledger.events()
    }

    /// Resolve the acting user named by `--user`
    pub fn actor(&self, user: Option<&str>) -> Result<User> {
        let id = user.ok_or_else(|| {
            WaybillError::Validation("this command needs --user <id>".to_string())
        })?;
        self.directory.user(id)
    }

    /// Persist the whole state atomically
    pub fn save(&self) -> Result<()> {
        let snapshot = Snapshot::capture(&self.directory, &self.store, &self.ledger);
        write_state(&self.root, &snapshot)?;
        debug!(records = snapshot.records.len(), "Saved workspace state");
        Ok(())
    }
}

/// Parse a waybill id as typed by a user (`42` or `00000042`)
pub fn parse_waybill_id(raw: &str) -> Result<WaybillId> {
    raw.parse()
        .map_err(|_| WaybillError::Validation(format!("invalid waybill id: {}", raw)))
}

pub fn parse_state(raw: &str) -> Result<WaybillState> {
    raw.parse().map_err(WaybillError::Validation)
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let json =
        serde_json::to_string_pretty(value).map_err(|e| WaybillError::InvalidJson(e.to_string()))?;
    println!("{}", json);
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::fixtures::seeded;
    use super::*;
    use crate::domain::TransitionInput;
    use crate::schemas::fixtures::draft;
    use crate::workflow::TransitionRequest;
    use tempfile::TempDir;

    #[test]
    fn test_save_then_open() {
        let temp = TempDir::new().unwrap();
        seeded(&temp);

        let reopened = Workspace::open(Some(temp.path())).unwrap();
        let zxg = reopened.actor(Some("zxg_1")).unwrap();
        assert!(reopened.service.authorize(&zxg, "waybill.load").unwrap());
    }

    #[test]
    fn test_actor_requires_user_flag() {
        let temp = TempDir::new().unwrap();
        let ws = seeded(&temp);
        assert!(matches!(ws.actor(None), Err(WaybillError::Validation(_))));
        assert!(matches!(
            ws.actor(Some("ghost")),
            Err(WaybillError::NotFound { kind: "user", .. })
        ));
    }

    #[test]
    fn test_concurrent_opens_do_not_lose_writes() {
        let temp = TempDir::new().unwrap();
        drop(seeded(&temp));
        let first = {
            let ws = Workspace::open(Some(temp.path())).unwrap();
            let clerk = ws.actor(Some("clerk_1")).unwrap();
            let created = ws.service.create_waybill(&clerk, draft()).unwrap();
            ws.save().unwrap();
            created.id
        };

        let a = Workspace::open(Some(temp.path())).unwrap();
        let root = temp.path().to_path_buf();
        let b = std::thread::spawn(move || {
            let b = Workspace::open(Some(root.as_path()))?;
            let clerk = b.actor(Some("clerk_1"))?;
            b.service.create_waybill(&clerk, draft())?;
            b.save()
        });

        let dispatcher = a.actor(Some("dispatcher_1")).unwrap();
        let request = TransitionRequest::new(first, TransitionInput::Dispatch);
        a.service.transition(&dispatcher, request).unwrap();
        a.save().unwrap();
        drop(a);
        b.join().unwrap().unwrap();

        let after = Workspace::open(Some(temp.path())).unwrap();
        assert_eq!(
            after.service.waybill(first).unwrap().state,
            WaybillState::Dispatched
        );
        assert_eq!(after.service.waybills(None).len(), 2);
        assert_eq!(after.service.history(first).unwrap().len(), 1);
    }

    #[test]
    fn test_open_waits_for_lock_holder() {
        let temp = TempDir::new().unwrap();
        let held = seeded(&temp);
        let err = WorkspaceLock::acquire_within(temp.path(), std::time::Duration::from_millis(50))
            .unwrap_err();
        assert_eq!(err.code(), "WORKSPACE_BUSY");
        drop(held);
        assert!(Workspace::open(Some(temp.path())).is_ok());
    }

    #[test]
    fn test_open_outside_workspace_fails() {
        let temp = TempDir::new().unwrap();
        assert!(matches!(
            Workspace::open(Some(temp.path())),
            Err(WaybillError::WorkspaceNotFound(_))
        ));
    }

    #[test]
    fn test_parse_ids_and_states() {
        assert_eq!(parse_waybill_id("00000042").unwrap(), WaybillId(42));
        assert_eq!(parse_waybill_id(" 7 ").unwrap(), WaybillId(7));
        assert!(parse_waybill_id("W1").is_err());
        assert_eq!(parse_state("in_transit").unwrap(), WaybillState::InTransit);
        assert!(parse_state("lost").is_err());
    }
}
