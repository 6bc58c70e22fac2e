//! # friendstake CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use friendstake_cli::account::{run_airdrop, run_balance, AirdropArgs, BalanceArgs};
use friendstake_cli::address::{run_address, AddressArgs};
use friendstake_cli::bet::{
    run_action, run_list, run_make, run_settle, run_show, ActionArgs, ListArgs, MakeArgs,
    SettleArgs, ShowArgs,
};
use friendstake_cli::config::CliConfig;
use friendstake_cli::keys::{run_keygen, KeygenArgs};
use friendstake_escrow::Command;

/// Friendstake: peer-to-peer wagers held in escrow and settled by a judge.
#[derive(Parser, Debug)]
#[command(name = "friendstake", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate a named Ed25519 keypair.
    Keygen(KeygenArgs),

    /// Derive the bet record and vault addresses of a wager.
    Address(AddressArgs),

    /// Credit native units to a participant.
    Airdrop(AirdropArgs),

    /// Print the balance of a participant.
    Balance(BalanceArgs),

    /// Open a wager and deposit the maker's stake.
    Make(MakeArgs),

    /// Withdraw an open wager (maker).
    Cancel(ActionArgs),

    /// Accept an open wager and deposit the matching stake (opponent).
    Take(ActionArgs),

    /// Refuse an open wager (opponent).
    Decline(ActionArgs),

    /// Settle or refund a wager (judge).
    Settle(SettleArgs),

    /// Show one bet record.
    Show(ShowArgs),

    /// List live bet records, optionally filtered by role.
    List(ListArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    tracing::debug!("friendstake CLI starting");

    let config = match CliConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{e:#}");
            return ExitCode::from(1);
        }
    };
    tracing::debug!(state_dir = %config.state_dir.display(), "resolved state directory");

    let result = match cli.command {
        Commands::Keygen(args) => run_keygen(&args, &config),
        Commands::Address(args) => run_address(&args, &config),
        Commands::Airdrop(args) => run_airdrop(&args, &config),
        Commands::Balance(args) => run_balance(&args, &config),
        Commands::Make(args) => run_make(&args, &config),
        Commands::Cancel(args) => run_action(&args, &config, Command::Cancel),
        Commands::Take(args) => run_action(&args, &config, Command::Take),
        Commands::Decline(args) => run_action(&args, &config, Command::Decline),
        Commands::Settle(args) => run_settle(&args, &config),
        Commands::Show(args) => run_show(&args, &config),
        Commands::List(args) => run_list(&args, &config),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}
