//! User schema - The authenticated actor handed in by the identity layer

use serde::{Deserialize, Serialize};

use super::GroupId;

/// Role category fixed at creation; changed only by explicit reassignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleCategory {
    ReceivingClerk,
    BranchClerk,
    Accountant,
    DockWorker,
    Administrator,
}

impl std::fmt::Display for RoleCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RoleCategory::ReceivingClerk => write!(f, "receiving_clerk"),
            RoleCategory::BranchClerk => write!(f, "branch_clerk"),
            RoleCategory::Accountant => write!(f, "accountant"),
            RoleCategory::DockWorker => write!(f, "dock_worker"),
            RoleCategory::Administrator => write!(f, "administrator"),
        }
    }
}

impl std::str::FromStr for RoleCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "receiving_clerk" => Ok(RoleCategory::ReceivingClerk),
            "branch_clerk" => Ok(RoleCategory::BranchClerk),
            "accountant" => Ok(RoleCategory::Accountant),
            "dock_worker" => Ok(RoleCategory::DockWorker),
            "administrator" => Ok(RoleCategory::Administrator),
            _ => Err(format!("Unknown role category: {}", s)),
        }
    }
}

/// A system user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Login identifier, e.g. `zxg_1`
    pub id: String,

    pub display_name: String,

    pub role: RoleCategory,

    /// Assigned permission groups
    #[serde(default)]
    pub groups: Vec<GroupId>,

    /// Bypasses the permission tree; never granted through group edits
    #[serde(default)]
    pub superuser: bool,

    /// Deactivated users are denied everything
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Home branch or receiving point
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,

    /// ISO 8601 creation timestamp
    pub created_at: String,
}

fn default_enabled() -> bool {
    true
}

impl User {
    /// Create an enabled user with no groups
    pub fn new(id: impl Into<String>, display_name: impl Into<String>, role: RoleCategory) -> Self {
        User {
            id: id.into(),
            display_name: display_name.into(),
            role,
            groups: Vec::new(),
            superuser: false,
            enabled: true,
            branch: None,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    // ===== IMMUTABLE BUILDER METHODS =====

    /// Return a new User assigned to the given groups
    pub fn with_groups(mut self, groups: impl IntoIterator<Item = GroupId>) -> Self {
        self.groups = groups.into_iter().collect();
        self
    }

    /// Return a new User with the superuser flag set
    pub fn as_superuser(mut self) -> Self {
        self.superuser = true;
        self
    }

    /// Return a new User with the given home branch
    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }

    /// Return a new User with the role explicitly reassigned
    pub fn reassigned(mut self, role: RoleCategory) -> Self {
        self.role = role;
        self
    }

    /// Return a new User that is deactivated
    pub fn deactivated(mut self) -> Self {
        self.enabled = false;
        self
    }
}
