//! Permission forest arena
//!
//! Groups live in a flat arena indexed by slot. Each slot holds the persisted
//! `PermissionGroup` record plus derived `father`/`children` slot indices, so no
//! node owns another. Links are rebuilt from the records after every mutation.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use lazy_static::lazy_static;
use regex::Regex;

use crate::errors::{CyclicGroupError, Result, WaybillError};
use crate::schemas::{GroupId, Permission, PermissionGroup};

lazy_static! {
    static ref PERMISSION_CODE_REGEX: Regex =
        Regex::new(r"^[a-z][a-z0-9_]*(\.[a-z][a-z0-9_]*)*$").expect("valid permission code regex");
    static ref GROUP_NAME_REGEX: Regex =
        Regex::new(r"^[A-Za-z0-9_-]+$").expect("valid group name regex");
}

/// What to do with the children of a group being deleted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletePolicy {
    /// Refuse if the group has children
    Refuse,
    /// Move the children up to the deleted group's father
    ReparentChildren,
    /// Delete the whole subtree
    Cascade,
}

#[derive(Debug, Clone)]
struct GroupNode {
    group: PermissionGroup,
    father: Option<usize>,
    children: Vec<usize>,
}

/// Permission catalog plus the group forest
#[derive(Debug, Clone, Default)]
pub struct PermissionForest {
    catalog: BTreeMap<String, Permission>,
    nodes: Vec<GroupNode>,
    index: HashMap<GroupId, usize>,
    next_group_id: u64,
    next_seq: u64,
}

impl PermissionForest {
    /// Create an empty forest
    pub fn new() -> Self {
        PermissionForest {
            next_group_id: 1,
            next_seq: 1,
            ..Default::default()
        }
    }

    /// Assemble a forest from persisted records.
    ///
    /// Checks identifiers, names, father references and permission codes, but
    /// not acyclicity: a malformed father chain is reported later by
    /// [`validate`](Self::validate), the tree builder or the authorizer.
    pub fn from_parts(permissions: Vec<Permission>, groups: Vec<PermissionGroup>) -> Result<Self> {
        let mut forest = PermissionForest::new();
        for permission in permissions {
            forest.define_permission(permission.code, permission.label)?;
        }

        let mut ids = HashSet::new();
        let mut names = HashSet::new();
        for group in &groups {
            if !ids.insert(group.id) {
                return Err(WaybillError::Validation(format!(
                    "duplicate group id {}",
                    group.id
                )));
            }
            if !names.insert(group.name.as_str()) {
                return Err(WaybillError::Validation(format!(
                    "duplicate group name {}",
                    group.name
                )));
            }
            for code in &group.permissions {
                if !forest.catalog.contains_key(code) {
                    return Err(WaybillError::not_found("permission", code));
                }
            }
        }
        for group in &groups {
            if let Some(father) = group.father {
                if !ids.contains(&father) {
                    return Err(WaybillError::not_found("group", father));
                }
            }
        }

        forest.next_group_id = groups.iter().map(|g| g.id.0).max().unwrap_or(0) + 1;
        forest.next_seq = groups.iter().map(|g| g.seq).max().unwrap_or(0) + 1;
        forest.nodes = groups
            .into_iter()
            .map(|group| GroupNode {
                group,
                father: None,
                children: Vec::new(),
            })
            .collect();
        forest.rebuild_links();
        Ok(forest)
    }

    // ===== CATALOG =====

    /// Add a permission to the catalog
    pub fn define_permission(&mut self, code: impl Into<String>, label: impl Into<String>) -> Result<()> {
        let code = code.into();
        if !PERMISSION_CODE_REGEX.is_match(&code) {
            return Err(WaybillError::Validation(format!(
                "invalid permission code: {}",
                code
            )));
        }
        if self.catalog.contains_key(&code) {
            return Err(WaybillError::Validation(format!(
                "permission {} already defined",
                code
            )));
        }
        self.catalog.insert(code.clone(), Permission::new(code, label));
        Ok(())
    }

    pub fn permission(&self, code: &str) -> Option<&Permission> {
        self.catalog.get(code)
    }

    /// Catalog entries ordered by code
    pub fn permissions(&self) -> impl Iterator<Item = &Permission> {
        self.catalog.values()
    }

    // ===== GROUP MUTATIONS =====

    /// Create a group under `father` (or as a new root)
    pub fn create_group(
        &mut self,
        name: impl Into<String>,
        label: impl Into<String>,
        father: Option<GroupId>,
    ) -> Result<GroupId> {
        let name = name.into();
        if !GROUP_NAME_REGEX.is_match(&name) {
            return Err(WaybillError::Validation(format!("invalid group name: {}", name)));
        }
        if self.group_by_name(&name).is_some() {
            return Err(WaybillError::Validation(format!(
                "group {} already exists",
                name
            )));
        }
        if let Some(father) = father {
            self.slot(father)?;
        }

        let id = GroupId(self.next_group_id);
        self.next_group_id += 1;
        let seq = self.next_seq;
        self.next_seq += 1;

        self.nodes.push(GroupNode {
            group: PermissionGroup {
                id,
                name,
                label: label.into(),
                father,
                permissions: Vec::new(),
                seq,
            },
            father: None,
            children: Vec::new(),
        });
        self.rebuild_links();
        Ok(id)
    }

    /// Change a group's display label
    pub fn rename_group(&mut self, id: GroupId, label: impl Into<String>) -> Result<()> {
        let slot = self.slot(id)?;
        self.nodes[slot].group.label = label.into();
        Ok(())
    }

    /// Grant a catalog permission directly to a group. Granting twice is a no-op.
    pub fn grant(&mut self, id: GroupId, code: &str) -> Result<()> {
        if !self.catalog.contains_key(code) {
            return Err(WaybillError::not_found("permission", code));
        }
        let slot = self.slot(id)?;
        let permissions = &mut self.nodes[slot].group.permissions;
        if !permissions.iter().any(|c| c == code) {
            permissions.push(code.to_string());
        }
        Ok(())
    }

    /// Remove a direct grant. Revoking an absent grant is a no-op.
    pub fn revoke(&mut self, id: GroupId, code: &str) -> Result<()> {
        let slot = self.slot(id)?;
        self.nodes[slot].group.permissions.retain(|c| c != code);
        Ok(())
    }

    /// Move a group under a new father (or make it a root).
    ///
    /// Refuses moves under the group itself or one of its descendants.
    pub fn reparent(&mut self, id: GroupId, new_father: Option<GroupId>) -> Result<()> {
        let slot = self.slot(id)?;
        if let Some(father) = new_father {
            let father_slot = self.slot(father)?;
            if self.subtree_slots(slot).contains(&father_slot) {
                return Err(WaybillError::Validation(format!(
                    "moving group {} under {} would create a cycle",
                    self.nodes[slot].group.name, self.nodes[father_slot].group.name
                )));
            }
        }
        self.nodes[slot].group.father = new_father;
        self.rebuild_links();
        Ok(())
    }

    /// Delete a group according to `policy`.
    ///
    /// Groups listed in `assigned` are still held by users and are never
    /// deleted. Returns the ids actually removed.
    pub fn delete_group(
        &mut self,
        id: GroupId,
        policy: DeletePolicy,
        assigned: &BTreeSet<GroupId>,
    ) -> Result<Vec<GroupId>> {
        let slot = self.slot(id)?;
        let has_children = !self.nodes[slot].children.is_empty();

        let doomed: Vec<usize> = match policy {
            DeletePolicy::Refuse if has_children => {
                return Err(WaybillError::Validation(format!(
                    "group {} has children; reparent or cascade explicitly",
                    self.nodes[slot].group.name
                )));
            }
            DeletePolicy::Cascade => self.subtree_slots(slot),
            DeletePolicy::Refuse | DeletePolicy::ReparentChildren => vec![slot],
        };

        let doomed_ids: Vec<GroupId> = doomed.iter().map(|&s| self.nodes[s].group.id).collect();
        if let Some(held) = doomed_ids.iter().find(|g| assigned.contains(g)) {
            return Err(WaybillError::Validation(format!(
                "group {} is still assigned to users",
                held
            )));
        }

        if policy == DeletePolicy::ReparentChildren {
            let grandfather = self.nodes[slot].group.father;
            for child in self.nodes[slot].children.clone() {
                self.nodes[child].group.father = grandfather;
            }
        }

        let doomed: HashSet<GroupId> = doomed_ids.iter().copied().collect();
        self.nodes.retain(|node| !doomed.contains(&node.group.id));
        self.rebuild_links();
        Ok(doomed_ids)
    }

    // ===== QUERIES =====

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: GroupId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn group(&self, id: GroupId) -> Option<&PermissionGroup> {
        self.index.get(&id).map(|&slot| &self.nodes[slot].group)
    }

    pub fn group_by_name(&self, name: &str) -> Option<&PermissionGroup> {
        self.nodes
            .iter()
            .map(|node| &node.group)
            .find(|group| group.name == name)
    }

    /// All group records in creation order
    pub fn groups(&self) -> Vec<&PermissionGroup> {
        let mut groups: Vec<_> = self.nodes.iter().map(|node| &node.group).collect();
        groups.sort_by_key(|group| group.seq);
        groups
    }

    /// Root groups in creation order
    pub fn roots(&self) -> Vec<GroupId> {
        self.groups()
            .into_iter()
            .filter(|group| group.father.is_none())
            .map(|group| group.id)
            .collect()
    }

    /// Direct children in creation order
    pub fn children(&self, id: GroupId) -> Vec<GroupId> {
        match self.index.get(&id) {
            Some(&slot) => self.nodes[slot]
                .children
                .iter()
                .map(|&child| self.nodes[child].group.id)
                .collect(),
            None => Vec::new(),
        }
    }

    /// The group itself followed by each ancestor up to its root.
    ///
    /// Fails if the father chain loops.
    pub fn lineage(&self, id: GroupId) -> std::result::Result<Vec<GroupId>, CyclicGroupError> {
        let mut lineage = Vec::new();
        let mut seen = HashSet::new();
        let mut cursor = self.index.get(&id).copied();
        while let Some(slot) = cursor {
            let group = &self.nodes[slot].group;
            if !seen.insert(slot) {
                let mut chain: Vec<String> = lineage
                    .iter()
                    .filter_map(|g| self.group(*g))
                    .map(|g: &PermissionGroup| g.name.clone())
                    .collect();
                chain.push(group.name.clone());
                return Err(CyclicGroupError { chain });
            }
            lineage.push(group.id);
            cursor = self.nodes[slot].father;
        }
        Ok(lineage)
    }

    /// Own permissions plus every ancestor's, in lineage order without repeats
    pub fn effective_permissions(
        &self,
        id: GroupId,
    ) -> std::result::Result<BTreeSet<String>, CyclicGroupError> {
        let mut effective = BTreeSet::new();
        for group in self.lineage(id)? {
            if let Some(group) = self.group(group) {
                effective.extend(group.permissions.iter().cloned());
            }
        }
        Ok(effective)
    }

    /// Ancestor chain rendered root first, e.g. `Operations - Dock`
    pub fn tree_path(&self, id: GroupId) -> std::result::Result<String, CyclicGroupError> {
        let labels: Vec<&str> = self
            .lineage(id)?
            .into_iter()
            .rev()
            .filter_map(|g| self.group(g))
            .map(|g| g.label.as_str())
            .collect();
        Ok(labels.join(" - "))
    }

    /// Check that every father chain terminates at a root
    pub fn validate(&self) -> std::result::Result<(), CyclicGroupError> {
        for node in &self.nodes {
            self.lineage(node.group.id)?;
        }
        Ok(())
    }

    // ===== PRIVATE HELPERS =====

    fn slot(&self, id: GroupId) -> Result<usize> {
        self.index
            .get(&id)
            .copied()
            .ok_or_else(|| WaybillError::not_found("group", id))
    }

    /// The slot and all slots below it, guarded against malformed links
    fn subtree_slots(&self, slot: usize) -> Vec<usize> {
        let mut seen = HashSet::new();
        let mut stack = vec![slot];
        let mut out = Vec::new();
        while let Some(current) = stack.pop() {
            if !seen.insert(current) {
                continue;
            }
            out.push(current);
            stack.extend(self.nodes[current].children.iter().copied());
        }
        out
    }

    fn rebuild_links(&mut self) {
        self.index = self
            .nodes
            .iter()
            .enumerate()
            .map(|(slot, node)| (node.group.id, slot))
            .collect();
        for slot in 0..self.nodes.len() {
            let father = self.nodes[slot]
                .group
                .father
                .and_then(|f| self.index.get(&f).copied());
            self.nodes[slot].father = father;
            self.nodes[slot].children.clear();
        }
        let mut order: Vec<usize> = (0..self.nodes.len()).collect();
        order.sort_by_key(|&slot| self.nodes[slot].group.seq);
        for slot in order {
            if let Some(father) = self.nodes[slot].father {
                self.nodes[father].children.push(slot);
            }
        }
    }
}
