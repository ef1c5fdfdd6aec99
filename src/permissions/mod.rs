//! Permission forest, tree builder and authorization engine

mod authz;
mod directory;
pub(crate) mod forest;
mod tree;

pub use authz::{Authorizer, Capabilities};
pub use directory::{DirectorySnapshot, PermissionDirectory};
pub use forest::{DeletePolicy, PermissionForest};
pub use tree::{build_permission_tree, count_nodes, render, PermissionTreeNode};
