//! Create command - Enter a new waybill

use std::path::Path;

use crate::cli::{CreateArgs, Workspace};
use crate::errors::Result;
use crate::schemas::{Cargo, Party, WaybillDraft};

impl From<CreateArgs> for WaybillDraft {
    fn from(args: CreateArgs) -> Self {
        WaybillDraft {
            origin: args.origin,
            destination: args.destination,
            sender: Party::new(args.sender, args.sender_phone),
            receiver: Party::new(args.receiver, args.receiver_phone),
            cargo: Cargo {
                description: args.goods,
                pieces: args.pieces,
                volume: args.volume,
                weight: args.weight,
                declared_value: args.declared_value,
            },
            fee: args.fee,
            fee_type: args.fee_type.into(),
            remark: args.remark,
        }
    }
}

pub async fn run(cwd: Option<&Path>, user: Option<&str>, args: CreateArgs) -> Result<()> {
    let workspace = Workspace::open(cwd)?;
    let actor = workspace.actor(user)?;

    let waybill = workspace.service.create_waybill(&actor, args.into())?;
    workspace.save()?;

    println!(
        "Created waybill {} ({} -> {})",
        waybill.id, waybill.origin, waybill.destination
    );
    Ok(())
}
