//! Nested permission tree for display
//!
//! Built from the flat forest on demand. Every node carries its own direct
//! permissions resolved against the catalog; inheritance is not flattened in.

use std::collections::HashSet;

use serde::Serialize;

use crate::errors::CyclicGroupError;
use crate::schemas::{GroupId, Permission};

use super::forest::PermissionForest;

/// A group with its permissions and children, ready to serialize
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PermissionTreeNode {
    pub id: GroupId,
    pub name: String,
    pub label: String,
    pub permissions: Vec<Permission>,
    pub children: Vec<PermissionTreeNode>,
}

impl PermissionTreeNode {
    /// Number of nodes in this subtree, including itself
    pub fn node_count(&self) -> usize {
        1 + count_nodes(&self.children)
    }
}

/// Total nodes across a list of trees
pub fn count_nodes(nodes: &[PermissionTreeNode]) -> usize {
    nodes.iter().map(PermissionTreeNode::node_count).sum()
}

/// Build one tree per root, children ordered by creation sequence.
///
/// Every group must be reachable from a root. Groups that are not belong to a
/// father loop, which is reported as a [`CyclicGroupError`].
pub fn build_permission_tree(
    forest: &PermissionForest,
) -> Result<Vec<PermissionTreeNode>, CyclicGroupError> {
    forest.validate()?;

    let mut visited = HashSet::new();
    let roots: Vec<PermissionTreeNode> = forest
        .roots()
        .into_iter()
        .filter_map(|root| build_node(forest, root, &mut visited))
        .collect();

    if visited.len() != forest.len() {
        let chain = forest
            .groups()
            .into_iter()
            .filter(|group| !visited.contains(&group.id))
            .map(|group| group.name.clone())
            .collect();
        return Err(CyclicGroupError { chain });
    }
    Ok(roots)
}

fn build_node(
    forest: &PermissionForest,
    id: GroupId,
    visited: &mut HashSet<GroupId>,
) -> Option<PermissionTreeNode> {
    if !visited.insert(id) {
        return None;
    }
    let group = forest.group(id)?;
    let permissions = group
        .permissions
        .iter()
        .filter_map(|code| forest.permission(code).cloned())
        .collect();
    let children = forest
        .children(id)
        .into_iter()
        .filter_map(|child| build_node(forest, child, visited))
        .collect();

    Some(PermissionTreeNode {
        id,
        name: group.name.clone(),
        label: group.label.clone(),
        permissions,
        children,
    })
}

/// Render trees as indented text, one group per line
pub fn render(nodes: &[PermissionTreeNode]) -> String {
    let mut out = String::new();
    for node in nodes {
        render_node(node, "", None, &mut out);
    }
    out
}

fn render_node(node: &PermissionTreeNode, prefix: &str, last: Option<bool>, out: &mut String) {
    let (branch, extension) = match last {
        None => ("", ""),
        Some(true) => ("└── ", "    "),
        Some(false) => ("├── ", "│   "),
    };
    let codes: Vec<&str> = node.permissions.iter().map(|p| p.code.as_str()).collect();
    out.push_str(&format!(
        "{}{}{} ({}) [{}]\n",
        prefix,
        branch,
        node.label,
        node.name,
        codes.join(", ")
    ));

    let child_prefix = format!("{}{}", prefix, extension);
    let count = node.children.len();
    for (i, child) in node.children.iter().enumerate() {
        render_node(child, &child_prefix, Some(i + 1 == count), out);
    }
}
