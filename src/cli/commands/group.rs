//! Group command - Permission group administration
//!
//! Only superusers may edit the forest. Every edit lands as one snapshot swap.

use std::path::Path;

use tracing::info;

use crate::cli::{GroupAction, Workspace};
use crate::errors::{Result, WaybillError};
use crate::permissions::PermissionForest;
use crate::schemas::GroupId;

fn group_id(forest: &PermissionForest, name: &str) -> Result<GroupId> {
    forest
        .group_by_name(name)
        .map(|group| group.id)
        .ok_or_else(|| WaybillError::not_found("group", name))
}

fn parent_id(forest: &PermissionForest, parent: Option<&str>) -> Result<Option<GroupId>> {
    parent.map(|name| group_id(forest, name)).transpose()
}

pub async fn run(cwd: Option<&Path>, user: Option<&str>, action: GroupAction) -> Result<()> {
    let workspace = Workspace::open(cwd)?;
    let actor = workspace.actor(user)?;
    if !(actor.enabled && actor.superuser) {
        return Err(WaybillError::PermissionDenied {
            actor: actor.id,
            permission: "superuser".to_string(),
            waybill: None,
        });
    }
    let directory = workspace.directory();

    let summary = match action {
        GroupAction::Create {
            name,
            label,
            parent,
        } => {
            let label = label.unwrap_or_else(|| name.clone());
            let id = directory.update_forest(|forest| {
                let father = parent_id(forest, parent.as_deref())?;
                forest.create_group(name.as_str(), label, father)
            })?;
            format!("Created group {} (id {})", name, id)
        }
        GroupAction::Rename { name, label } => {
            directory.update_forest(|forest| {
                let id = group_id(forest, &name)?;
                forest.rename_group(id, label)
            })?;
            format!("Renamed group {}", name)
        }
        GroupAction::Grant { name, code } => {
            directory.update_forest(|forest| {
                let id = group_id(forest, &name)?;
                forest.grant(id, &code)
            })?;
            format!("Granted {} to {}", code, name)
        }
        GroupAction::Revoke { name, code } => {
            directory.update_forest(|forest| {
                let id = group_id(forest, &name)?;
                forest.revoke(id, &code)
            })?;
            format!("Revoked {} from {}", code, name)
        }
        GroupAction::Move { name, parent } => {
            directory.update_forest(|forest| {
                let id = group_id(forest, &name)?;
                let father = parent_id(forest, parent.as_deref())?;
                forest.reparent(id, father)
            })?;
            format!("Moved group {}", name)
        }
        GroupAction::Delete { name, policy } => {
            let id = group_id(&directory.snapshot().forest, &name)?;
            let removed = directory.delete_group(id, policy.into())?;
            format!("Deleted {} group(s)", removed.len())
        }
        GroupAction::Assign { user, groups } => {
            let snapshot = directory.snapshot();
            let ids = groups
                .iter()
                .map(|name| group_id(&snapshot.forest, name))
                .collect::<Result<Vec<_>>>()?;
            let target = directory.user(&user)?.with_groups(ids);
            directory.upsert_user(target)?;
            format!("Assigned {} to {}", user, groups.join(", "))
        }
    };

    workspace.save()?;
    info!(actor = %actor.id, version = directory.version(), "{}", summary);
    println!("{}", summary);
    Ok(())
}
