//! Waybill CLI - Freight waybill lifecycle with permission-tree authorization

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use waybill::cli::commands;
use waybill::cli::{Cli, Commands};
use waybill::domain::TransitionInput;
use waybill::errors::to_exit_code;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // RUST_LOG wins over the verbosity flags
    let default_level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let result = run(cli).await;

    match result {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(to_exit_code(&e));
        }
    }
}

async fn run(cli: Cli) -> waybill::Result<()> {
    let cwd = cli.cwd.as_deref();
    let user = cli.user.as_deref();

    match cli.command {
        Some(Commands::Init { force }) => commands::init::run(cwd, force).await,
        Some(Commands::Tree { json }) => commands::tree::run(cwd, json).await,
        Some(Commands::Authorize { code }) => commands::access::authorize(cwd, user, &code).await,
        Some(Commands::Capabilities { json }) => {
            commands::access::capabilities(cwd, user, json).await
        }
        Some(Commands::Create(args)) => commands::create::run(cwd, user, args).await,
        Some(Commands::Dispatch { id, version }) => {
            commands::transition::run(cwd, user, &id, TransitionInput::Dispatch, version.expected)
                .await
        }
        Some(Commands::Load {
            id,
            vehicle,
            version,
        }) => {
            let input = TransitionInput::Load {
                loading_complete: true,
                vehicle,
            };
            commands::transition::run(cwd, user, &id, input, version.expected).await
        }
        Some(Commands::Receive {
            id,
            branch,
            version,
        }) => {
            let input = TransitionInput::ReceiveAtBranch { branch };
            commands::transition::run(cwd, user, &id, input, version.expected).await
        }
        Some(Commands::Sign {
            id,
            signer,
            credential,
            version,
        }) => {
            let input = TransitionInput::CustomerSign {
                signer_name: signer,
                credential_number: credential,
            };
            commands::transition::run(cwd, user, &id, input, version.expected).await
        }
        Some(Commands::Void {
            id,
            reason,
            version,
        }) => {
            let input = TransitionInput::Void { reason };
            commands::transition::run(cwd, user, &id, input, version.expected).await
        }
        Some(Commands::Dispute { action }) => commands::dispute::run(cwd, user, action).await,
        Some(Commands::Group { action }) => commands::group::run(cwd, user, action).await,
        Some(Commands::Show { id, json }) => commands::show::run(cwd, &id, json).await,
        Some(Commands::List { state, json }) => {
            commands::list::run(cwd, state.as_deref(), json).await
        }
        Some(Commands::History { id, json }) => commands::history::run(cwd, &id, json).await,
        Some(Commands::Ledger { json }) => commands::ledger::run(cwd, user, json).await,
        Some(Commands::Doctor) => commands::doctor::run(cwd).await,
        None => {
            // Default to showing help - clap handles this
            println!("Use --help for usage information");
            Ok(())
        }
    }
}
