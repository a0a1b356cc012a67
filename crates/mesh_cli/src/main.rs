//! Boardmesh CLI - workspace setup and local mesh simulation
//!
//! Usage: boardmesh <command> [options]

mod commands;

use clap::{Parser, Subcommand};
use mesh_common::{EXIT_ERROR, EXIT_SUCCESS, EXIT_USAGE};
use mesh_config::{Config, LoggingConfig, MembershipPolicy};

#[derive(Parser)]
#[command(
    name = "boardmesh",
    version = "0.1.0",
    about = "Boardmesh peer-to-peer whiteboard sync"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose/debug logging
    #[arg(long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new Boardmesh workspace
    Init,

    /// Print this workspace's peer identity, creating it if needed
    Identity,

    /// Run an in-memory mesh and check that it converges
    Simulate {
        /// Number of nodes, connected in a chain
        #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u16).range(1..=64))]
        peers: u16,

        /// Edits performed by every node
        #[arg(long, default_value_t = 3)]
        edits: u16,

        /// Membership policy: stamped or eager
        #[arg(long, default_value = "stamped")]
        policy: MembershipPolicy,

        /// Output the report as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help and --version arrive here as well and go to stdout
            let code = if e.use_stderr() { EXIT_USAGE } else { EXIT_SUCCESS };
            let _ = e.print();
            std::process::exit(code);
        }
    };

    let logging = commands::workspace_root()
        .ok()
        .and_then(|root| Config::load(&root).ok())
        .map(|config| config.logging)
        .unwrap_or_else(LoggingConfig::default);
    mesh_common::telemetry::init_tracing(cli.verbose || logging.verbose, logging.json);
    tracing::debug!("Boardmesh CLI started");

    let result = match cli.command {
        Commands::Init => commands::init::cmd_init().await,
        Commands::Identity => commands::identity::cmd_identity().await,
        Commands::Simulate {
            peers,
            edits,
            policy,
            json,
        } => commands::simulate::cmd_simulate(peers.into(), edits.into(), policy, json).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(EXIT_ERROR);
    }
}
