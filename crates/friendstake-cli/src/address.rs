//! # Address Subcommand
//!
//! Prints the bet record and vault addresses a wager between three parties
//! would live at, with their bumps. Uses the namespace of the local ledger
//! so the output matches what `make` will check.

use anyhow::{Context, Result};
use clap::Args;

use friendstake_core::{
    bet_address, validate_description, vault_address, DerivedAddress, Identity, Namespace,
};

use crate::config::CliConfig;
use crate::keys::resolve_identity;
use crate::store::load_ledger;

/// Arguments for `friendstake address`.
#[derive(Args, Debug)]
pub struct AddressArgs {
    /// Maker (hex identity or key name).
    #[arg(long)]
    pub maker: String,
    /// Opponent (hex identity or key name).
    #[arg(long)]
    pub opponent: String,
    /// Judge (hex identity or key name).
    #[arg(long)]
    pub judge: String,
    /// Wager description, at most 32 bytes.
    #[arg(long)]
    pub description: String,
}

/// Derived record and vault addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WagerAddresses {
    /// Record address and bump.
    pub bet: DerivedAddress,
    /// Vault address and bump.
    pub vault: DerivedAddress,
}

/// Execute `address`.
pub fn run_address(args: &AddressArgs, config: &CliConfig) -> Result<u8> {
    let ledger = load_ledger(config)?;
    let keys = config.keys_dir();
    let addrs = derive(
        &ledger.namespace(),
        &resolve_identity(&keys, &args.maker)?,
        &resolve_identity(&keys, &args.opponent)?,
        &resolve_identity(&keys, &args.judge)?,
        &args.description,
    )?;
    println!("Bet:   {} (bump {})", addrs.bet.address, addrs.bet.bump);
    println!("Vault: {} (bump {})", addrs.vault.address, addrs.vault.bump);
    Ok(0)
}

/// Derive both addresses for a wager.
pub fn derive(
    namespace: &Namespace,
    maker: &Identity,
    opponent: &Identity,
    judge: &Identity,
    description: &str,
) -> Result<WagerAddresses> {
    validate_description(description)?;
    let bet = bet_address(namespace, maker, opponent, judge, description)
        .context("failed to derive bet address")?;
    let vault = vault_address(namespace, &bet.address).context("failed to derive vault address")?;
    Ok(WagerAddresses { bet, vault })
}
