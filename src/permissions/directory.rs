//! Shared permission directory
//!
//! Holds the current forest and user roster as an immutable, versioned
//! snapshot. Readers clone the `Arc` and work against a consistent view;
//! writers copy the snapshot, mutate the copy and swap it in on success, so an
//! edit is never observed half-applied.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::debug;

use crate::errors::{Result, WaybillError};
use crate::schemas::{GroupId, User};

use super::authz::{Authorizer, Capabilities};
use super::forest::{DeletePolicy, PermissionForest};
use super::tree::{build_permission_tree, PermissionTreeNode};

/// One consistent view of groups and users
#[derive(Debug, Clone, Default)]
pub struct DirectorySnapshot {
    /// Bumped on every successful mutation
    pub version: u64,
    pub forest: PermissionForest,
    pub users: BTreeMap<String, User>,
}

impl DirectorySnapshot {
    pub fn user(&self, id: &str) -> Option<&User> {
        self.users.get(id)
    }

    /// Groups referenced by at least one user
    pub fn assigned_groups(&self) -> BTreeSet<GroupId> {
        self.users
            .values()
            .flat_map(|user| user.groups.iter().copied())
            .collect()
    }

    pub fn authorizer(&self) -> Authorizer<'_> {
        Authorizer::new(&self.forest)
    }
}

type CachedTree = (u64, Arc<Vec<PermissionTreeNode>>);

/// Versioned, copy-on-write handle to the permission state
#[derive(Debug)]
pub struct PermissionDirectory {
    current: RwLock<Arc<DirectorySnapshot>>,
    tree_cache: Mutex<Option<CachedTree>>,
}

impl PermissionDirectory {
    pub fn new(forest: PermissionForest, users: impl IntoIterator<Item = User>) -> Self {
        let snapshot = DirectorySnapshot {
            version: 1,
            forest,
            users: users.into_iter().map(|u| (u.id.clone(), u)).collect(),
        };
        PermissionDirectory {
            current: RwLock::new(Arc::new(snapshot)),
            tree_cache: Mutex::new(None),
        }
    }

    /// Current snapshot; stays valid while later edits land
    pub fn snapshot(&self) -> Arc<DirectorySnapshot> {
        Arc::clone(&self.current.read())
    }

    pub fn version(&self) -> u64 {
        self.current.read().version
    }

    /// Apply a mutation to a copy of the current snapshot.
    ///
    /// The copy replaces the current snapshot, with a bumped version, only if
    /// `mutate` succeeds. Writers are serialized by the write lock.
    pub fn update<T>(&self, mutate: impl FnOnce(&mut DirectorySnapshot) -> Result<T>) -> Result<T> {
        let mut current = self.current.write();
        let mut next = DirectorySnapshot::clone(&current);
        let value = mutate(&mut next)?;
        next.version = current.version + 1;
        debug!(version = next.version, "Swapped permission directory snapshot");
        *current = Arc::new(next);
        Ok(value)
    }

    /// Mutate the forest only
    pub fn update_forest<T>(
        &self,
        mutate: impl FnOnce(&mut PermissionForest) -> Result<T>,
    ) -> Result<T> {
        self.update(|snapshot| mutate(&mut snapshot.forest))
    }

    /// Delete a group, refusing groups still assigned to users
    pub fn delete_group(&self, id: GroupId, policy: DeletePolicy) -> Result<Vec<GroupId>> {
        self.update(|snapshot| {
            let assigned = snapshot.assigned_groups();
            snapshot.forest.delete_group(id, policy, &assigned)
        })
    }

    /// Insert or replace a user; every assigned group must exist
    pub fn upsert_user(&self, user: User) -> Result<()> {
        self.update(|snapshot| {
            if let Some(missing) = user.groups.iter().find(|g| !snapshot.forest.contains(**g)) {
                return Err(WaybillError::not_found("group", missing));
            }
            snapshot.users.insert(user.id.clone(), user);
            Ok(())
        })
    }

    pub fn user(&self, id: &str) -> Result<User> {
        self.snapshot()
            .user(id)
            .cloned()
            .ok_or_else(|| WaybillError::not_found("user", id))
    }

    pub fn authorize(&self, user: &User, code: &str) -> Result<bool> {
        Ok(self.snapshot().authorizer().authorize(user, code)?)
    }

    pub fn capabilities(&self, user: &User) -> Result<Capabilities> {
        Ok(self.snapshot().authorizer().capabilities(user)?)
    }

    /// Nested tree of the current forest, rebuilt only after a mutation
    pub fn tree(&self) -> Result<Arc<Vec<PermissionTreeNode>>> {
        let snapshot = self.snapshot();
        let mut cache = self.tree_cache.lock();
        if let Some((version, tree)) = cache.as_ref() {
            if *version == snapshot.version {
                return Ok(Arc::clone(tree));
            }
        }

        debug!(version = snapshot.version, "Rebuilding permission tree");
        let tree = Arc::new(build_permission_tree(&snapshot.forest)?);
        *cache = Some((snapshot.version, Arc::clone(&tree)));
        Ok(tree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::forest::fixtures::three_level;
    use crate::schemas::permission::{WAYBILL_DISPATCH, WAYBILL_LOAD};
    use crate::schemas::RoleCategory;

    fn directory() -> (PermissionDirectory, GroupId, GroupId) {
        let f = three_level();
        let dock = f.dock;
        let yard = f.yard;
        let zxg = User::new("zxg_1", "Zhang", RoleCategory::DockWorker).with_groups([dock]);
        (PermissionDirectory::new(f.forest, [zxg]), dock, yard)
    }

    #[test]
    fn test_update_bumps_version() {
        let (dir, dock, _) = directory();
        assert_eq!(dir.version(), 1);
        dir.update_forest(|forest| forest.rename_group(dock, "Loading dock"))
            .unwrap();
        assert_eq!(dir.version(), 2);
        assert_eq!(dir.snapshot().forest.group(dock).unwrap().label, "Loading dock");
    }

    #[test]
    fn test_failed_update_leaves_snapshot_untouched() {
        let (dir, dock, yard) = directory();
        let err = dir
            .update_forest(|forest| {
                forest.grant(dock, WAYBILL_DISPATCH)?;
                forest.reparent(yard, Some(dock))
            })
            .unwrap_err();
        assert!(err.to_string().contains("cycle"));
        assert_eq!(dir.version(), 1);

        let user = dir.user("zxg_1").unwrap();
        assert!(!dir.authorize(&user, WAYBILL_DISPATCH).unwrap());
    }

    #[test]
    fn test_old_snapshot_survives_edit() {
        let (dir, dock, _) = directory();
        let before = dir.snapshot();
        dir.update_forest(|forest| forest.revoke(dock, WAYBILL_LOAD)).unwrap();

        let user = dir.user("zxg_1").unwrap();
        assert!(before.authorizer().authorize(&user, WAYBILL_LOAD).unwrap());
        assert!(!dir.authorize(&user, WAYBILL_LOAD).unwrap());
    }

    #[test]
    fn test_tree_cache_follows_version() {
        let (dir, _, yard) = directory();
        let first = dir.tree().unwrap();
        let again = dir.tree().unwrap();
        assert!(Arc::ptr_eq(&first, &again));

        dir.update_forest(|forest| forest.create_group("night", "Night", Some(yard)))
            .unwrap();
        let rebuilt = dir.tree().unwrap();
        assert!(!Arc::ptr_eq(&first, &rebuilt));
        assert_eq!(rebuilt[0].children[0].children.len(), 3);
    }

    #[test]
    fn test_delete_group_respects_assignments() {
        let (dir, dock, yard) = directory();
        assert!(dir.delete_group(dock, DeletePolicy::Refuse).is_err());
        assert!(dir.delete_group(yard, DeletePolicy::Cascade).is_err());
        assert_eq!(dir.version(), 1);

        let user = dir.user("zxg_1").unwrap().with_groups([yard]);
        dir.upsert_user(user).unwrap();
        dir.delete_group(dock, DeletePolicy::Refuse).unwrap();
        assert!(!dir.snapshot().forest.contains(dock));
    }

    #[test]
    fn test_upsert_user_requires_known_groups() {
        let (dir, _, _) = directory();
        let ghost = User::new("ghost", "Ghost", RoleCategory::DockWorker).with_groups([GroupId(99)]);
        assert!(matches!(
            dir.upsert_user(ghost),
            Err(WaybillError::NotFound { kind: "group", .. })
        ));
        assert!(dir.user("ghost").is_err());
    }

    #[test]
    fn test_concurrent_readers_see_whole_snapshots() {
        let (dir, dock, _) = directory();
        let dir = Arc::new(dir);
        let writer = {
            let dir = Arc::clone(&dir);
            std::thread::spawn(move || {
                for i in 0..50 {
                    dir.update_forest(|forest| {
                        forest.rename_group(dock, format!("Dock {}", i))?;
                        forest.rename_group(GroupId(1), format!("Operations {}", i))
                    })
                    .unwrap();
                }
            })
        };
        for _ in 0..200 {
            let snapshot = dir.snapshot();
            let dock_label = &snapshot.forest.group(dock).unwrap().label;
            let ops_label = &snapshot.forest.group(GroupId(1)).unwrap().label;
            let dock_n = dock_label.trim_start_matches("Dock").trim();
            let ops_n = ops_label.trim_start_matches("Operations").trim();
            assert_eq!(dock_n, ops_n);
        }
        writer.join().unwrap();
        assert_eq!(dir.version(), 51);
    }
}
