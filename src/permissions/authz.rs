//! Authorization engine
//!
//! Answers "may this user exercise this permission" against one forest
//! snapshot. The decision order is fixed: deactivated users are denied, then
//! superusers are allowed, then the union of the user's groups' effective
//! permissions decides.

use std::collections::BTreeSet;

use tracing::{error, warn};

use crate::errors::CyclicGroupError;
use crate::schemas::User;

use super::forest::PermissionForest;

/// Everything a user may do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Capabilities {
    /// Superuser: not restricted to the catalog
    All,
    /// Union of the effective permissions of the user's groups
    Set(BTreeSet<String>),
}

impl Capabilities {
    pub fn allows(&self, code: &str) -> bool {
        match self {
            Capabilities::All => true,
            Capabilities::Set(codes) => codes.contains(code),
        }
    }

    /// Codes for display; superusers see the whole catalog
    pub fn codes(&self, forest: &PermissionForest) -> Vec<String> {
        match self {
            Capabilities::All => forest.permissions().map(|p| p.code.clone()).collect(),
            Capabilities::Set(codes) => codes.iter().cloned().collect(),
        }
    }
}

/// Borrowing view over a forest snapshot
#[derive(Debug, Clone, Copy)]
pub struct Authorizer<'a> {
    forest: &'a PermissionForest,
}

impl<'a> Authorizer<'a> {
    pub fn new(forest: &'a PermissionForest) -> Self {
        Authorizer { forest }
    }

    /// Decide whether `user` holds `code`
    pub fn authorize(&self, user: &User, code: &str) -> Result<bool, CyclicGroupError> {
        Ok(self.capabilities(user)?.allows(code))
    }

    /// Compute the user's full capability set
    pub fn capabilities(&self, user: &User) -> Result<Capabilities, CyclicGroupError> {
        if !user.enabled {
            return Ok(Capabilities::Set(BTreeSet::new()));
        }
        if user.superuser {
            return Ok(Capabilities::All);
        }

        let mut codes = BTreeSet::new();
        for group in &user.groups {
            if !self.forest.contains(*group) {
                warn!(user = %user.id, group = %group, "User references an unknown group, skipping");
                continue;
            }
            match self.forest.effective_permissions(*group) {
                Ok(effective) => codes.extend(effective),
                Err(e) => {
                    error!(user = %user.id, group = %group, error = %e, "Permission forest is malformed");
                    return Err(e);
                }
            }
        }
        Ok(Capabilities::Set(codes))
    }
}
