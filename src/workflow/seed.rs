//! Starter organization written by `waybill init`

use crate::errors::Result;
use crate::permissions::PermissionForest;
use crate::schemas::permission::{
    LEDGER_VIEW, WAYBILL_CREATE, WAYBILL_CUSTOMER_SIGN, WAYBILL_DISPATCH, WAYBILL_DISPUTE,
    WAYBILL_LOAD, WAYBILL_RECEIVE_AT_BRANCH, WAYBILL_VOID,
};
use crate::schemas::{default_catalog, RoleCategory, User};

/// Default catalog, one operations tree, an accounting root and a user per role.
///
/// ```text
/// Operations
/// ├── Receiving  [create, void, dispute]
/// ├── Dispatch   [dispatch]
/// ├── Dock       [load]
/// └── Branch     [receive_at_branch, customer_sign]
/// Accounting     [ledger.view]
/// ```
pub fn seed_organization() -> Result<(PermissionForest, Vec<User>)> {
    let mut forest = PermissionForest::new();
    for permission in default_catalog() {
        forest.define_permission(permission.code, permission.label)?;
    }

    let operations = forest.create_group("operations", "Operations", None)?;
    let receiving = forest.create_group("receiving", "Receiving", Some(operations))?;
    let dispatch = forest.create_group("dispatch", "Dispatch", Some(operations))?;
    let dock = forest.create_group("dock", "Dock", Some(operations))?;
    let branch = forest.create_group("branch", "Branch", Some(operations))?;
    let accounting = forest.create_group("accounting", "Accounting", None)?;

    for code in [WAYBILL_CREATE, WAYBILL_VOID, WAYBILL_DISPUTE] {
        forest.grant(receiving, code)?;
    }
    forest.grant(dispatch, WAYBILL_DISPATCH)?;
    forest.grant(dock, WAYBILL_LOAD)?;
    forest.grant(branch, WAYBILL_RECEIVE_AT_BRANCH)?;
    forest.grant(branch, WAYBILL_CUSTOMER_SIGN)?;
    forest.grant(accounting, LEDGER_VIEW)?;

    let users = vec![
        User::new("admin", "Administrator", RoleCategory::Administrator).as_superuser(),
        User::new("clerk_1", "Receiving clerk", RoleCategory::ReceivingClerk)
            .with_groups([receiving])
            .with_branch("north-yard"),
        User::new("dispatcher_1", "Dispatcher", RoleCategory::ReceivingClerk)
            .with_groups([dispatch])
            .with_branch("north-yard"),
        User::new("zxg_1", "Dock worker", RoleCategory::DockWorker)
            .with_groups([dock])
            .with_branch("north-yard"),
        User::new("branch_1", "Branch clerk", RoleCategory::BranchClerk)
            .with_groups([branch])
            .with_branch("east-branch"),
        User::new("acct_1", "Accountant", RoleCategory::Accountant).with_groups([accounting]),
    ];
    Ok((forest, users))
}
