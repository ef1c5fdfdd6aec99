//! CLI module for waybill
//!
//! Provides the command-line interface using clap.

pub mod commands;
mod workspace;

pub use workspace::Workspace;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::permissions::DeletePolicy;
use crate::schemas::FeeType;

/// Waybill - Freight waybill lifecycle with permission-tree authorization
#[derive(Parser, Debug)]
#[command(name = "waybill")]
#[command(version)]
#[command(about = "Freight waybill lifecycle with permission-tree authorization")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress info-level output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Override the working directory
    #[arg(long, global = true)]
    pub cwd: Option<PathBuf>,

    /// Act as this user
    #[arg(short, long, global = true)]
    pub user: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a .waybill workspace with the starter organization
    Init {
        /// Overwrite an existing workspace state
        #[arg(long)]
        force: bool,
    },

    /// Print the permission tree
    Tree {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check whether the acting user holds a permission
    Authorize {
        /// Permission code, e.g. waybill.dispatch
        code: String,
    },

    /// List every permission the acting user holds
    Capabilities {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Enter a new waybill
    Create(CreateArgs),

    /// Created -> Dispatched
    Dispatch {
        /// Waybill id
        id: String,

        #[command(flatten)]
        version: VersionArg,
    },

    /// Dispatched -> InTransit, confirming loading is complete
    Load {
        /// Waybill id
        id: String,

        /// Vehicle plate
        #[arg(long)]
        vehicle: Option<String>,

        #[command(flatten)]
        version: VersionArg,
    },

    /// InTransit -> ArrivedAtBranch
    Receive {
        /// Waybill id
        id: String,

        /// Receiving branch; must match the declared destination
        #[arg(long)]
        branch: String,

        #[command(flatten)]
        version: VersionArg,
    },

    /// ArrivedAtBranch -> SignedByCustomer
    Sign {
        /// Waybill id
        id: String,

        /// Name of the person collecting the goods
        #[arg(long)]
        signer: String,

        /// Identity document number of the signer
        #[arg(long)]
        credential: String,

        #[command(flatten)]
        version: VersionArg,
    },

    /// Void a waybill that has not been signed
    Void {
        /// Waybill id
        id: String,

        /// Why the waybill is voided
        #[arg(long)]
        reason: String,

        #[command(flatten)]
        version: VersionArg,
    },

    /// Open or resolve disputes
    Dispute {
        #[command(subcommand)]
        action: DisputeAction,
    },

    /// Administer permission groups (superuser only)
    Group {
        #[command(subcommand)]
        action: GroupAction,
    },

    /// Show details of a waybill
    Show {
        /// Waybill id
        id: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List waybills with optional filtering
    List {
        /// Filter by state (created, dispatched, in_transit, arrived_at_branch, signed_by_customer, voided)
        #[arg(long)]
        state: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the transition records of a waybill
    History {
        /// Waybill id
        id: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show reconciliation ledger events
    Ledger {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check the workspace for consistency problems
    Doctor,
}

/// Optimistic concurrency guard shared by mutating commands
#[derive(clap::Args, Debug, Clone, Copy)]
pub struct VersionArg {
    /// Fail unless the waybill is still at this version
    #[arg(long = "expect-version")]
    pub expected: Option<u64>,
}

#[derive(clap::Args, Debug, Clone)]
pub struct CreateArgs {
    /// Origin receiving point
    #[arg(long)]
    pub origin: String,

    /// Destination branch
    #[arg(long)]
    pub destination: String,

    #[arg(long)]
    pub sender: String,

    #[arg(long, default_value = "")]
    pub sender_phone: String,

    #[arg(long)]
    pub receiver: String,

    #[arg(long, default_value = "")]
    pub receiver_phone: String,

    /// Goods description
    #[arg(long)]
    pub goods: String,

    #[arg(long, default_value_t = 1)]
    pub pieces: u32,

    /// Cubic metres
    #[arg(long)]
    pub volume: f64,

    /// Kilograms
    #[arg(long)]
    pub weight: f64,

    /// Goods value collected on delivery
    #[arg(long, default_value_t = 0)]
    pub declared_value: u64,

    /// Freight fee
    #[arg(long)]
    pub fee: u64,

    #[arg(long, value_enum, default_value_t = FeeTypeArg::SignFor)]
    pub fee_type: FeeTypeArg,

    #[arg(long)]
    pub remark: Option<String>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeTypeArg {
    /// Paid by the receiver on pickup
    SignFor,
    /// Paid at the origin
    Now,
    /// Deducted from the collected goods value
    Deduction,
}

impl From<FeeTypeArg> for FeeType {
    fn from(arg: FeeTypeArg) -> Self {
        match arg {
            FeeTypeArg::SignFor => FeeType::SignFor,
            FeeTypeArg::Now => FeeType::Now,
            FeeTypeArg::Deduction => FeeType::Deduction,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum DisputeAction {
    /// Open a dispute; blocks dispatch until resolved
    Open {
        /// Waybill id
        id: String,

        #[arg(long)]
        reason: String,

        #[command(flatten)]
        version: VersionArg,
    },

    /// Resolve an open dispute
    Resolve {
        /// Waybill id
        id: String,

        /// Dispute number on the waybill
        #[arg(long)]
        dispute: u32,

        #[command(flatten)]
        version: VersionArg,
    },
}

#[derive(Subcommand, Debug)]
pub enum GroupAction {
    /// Create a group
    Create {
        /// Machine name
        name: String,

        /// Display label (defaults to the name)
        #[arg(long)]
        label: Option<String>,

        /// Parent group name; omit for a new root
        #[arg(long)]
        parent: Option<String>,
    },

    /// Change a group's display label
    Rename { name: String, label: String },

    /// Grant a permission to a group
    Grant { name: String, code: String },

    /// Revoke a directly granted permission
    Revoke { name: String, code: String },

    /// Move a group under another parent
    Move {
        name: String,

        /// New parent group name; omit to make the group a root
        #[arg(long)]
        parent: Option<String>,
    },

    /// Delete a group
    Delete {
        name: String,

        #[arg(long, value_enum, default_value_t = DeletePolicyArg::Refuse)]
        policy: DeletePolicyArg,
    },

    /// Assign a user to groups, replacing the current assignment
    Assign {
        user: String,

        /// Group names
        #[arg(required = true)]
        groups: Vec<String>,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletePolicyArg {
    /// Refuse when the group has children
    Refuse,
    /// Move children up to the deleted group's parent
    Reparent,
    /// Delete the whole subtree
    Cascade,
}

impl From<DeletePolicyArg> for DeletePolicy {
    fn from(arg: DeletePolicyArg) -> Self {
        match arg {
            DeletePolicyArg::Refuse => DeletePolicy::Refuse,
            DeletePolicyArg::Reparent => DeletePolicy::ReparentChildren,
            DeletePolicyArg::Cascade => DeletePolicy::Cascade,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_load_with_version_guard() {
        let cli = Cli::try_parse_from([
            "waybill", "--user", "zxg_1", "load", "00000001", "--vehicle", "HU-A1234",
            "--expect-version", "2",
        ])
        .unwrap();
        assert_eq!(cli.user.as_deref(), Some("zxg_1"));
        match cli.command {
            Some(Commands::Load {
                id,
                vehicle,
                version,
            }) => {
                assert_eq!(id, "00000001");
                assert_eq!(vehicle.as_deref(), Some("HU-A1234"));
                assert_eq!(version.expected, Some(2));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_create_defaults() {
        let cli = Cli::try_parse_from([
            "waybill", "create", "--origin", "north-yard", "--destination", "east-branch",
            "--sender", "Li Wei", "--receiver", "Zhang Min", "--goods", "tiles", "--volume",
            "1.5", "--weight", "480", "--fee", "150",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Create(args)) => {
                assert_eq!(args.pieces, 1);
                assert_eq!(args.declared_value, 0);
                assert_eq!(FeeType::from(args.fee_type), FeeType::SignFor);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_group_delete_policy() {
        let cli =
            Cli::try_parse_from(["waybill", "group", "delete", "dock", "--policy", "reparent"])
                .unwrap();
        match cli.command {
            Some(Commands::Group {
                action: GroupAction::Delete { name, policy },
            }) => {
                assert_eq!(name, "dock");
                assert_eq!(DeletePolicy::from(policy), DeletePolicy::ReparentChildren);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
