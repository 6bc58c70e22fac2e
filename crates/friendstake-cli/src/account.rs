//! # Account Subcommands
//!
//! `airdrop` credits the local faucet balance of a participant; `balance`
//! prints it.

use anyhow::Result;
use clap::Args;

use crate::config::CliConfig;
use crate::keys::resolve_identity;
use crate::store::{load_ledger, update_ledger};

/// Arguments for `friendstake airdrop`.
#[derive(Args, Debug)]
pub struct AirdropArgs {
    /// Recipient (hex identity or key name).
    #[arg(long)]
    pub to: String,
    /// Native units to credit.
    #[arg(long)]
    pub amount: u64,
}

/// Arguments for `friendstake balance`.
#[derive(Args, Debug)]
pub struct BalanceArgs {
    /// Participant (hex identity or key name).
    #[arg(long)]
    pub of: String,
}

/// Execute `airdrop`.
pub fn run_airdrop(args: &AirdropArgs, config: &CliConfig) -> Result<u8> {
    let id = resolve_identity(&config.keys_dir(), &args.to)?;
    let balance = update_ledger(config, |ledger| Ok(ledger.airdrop(&id, args.amount)?))?;
    println!("OK: airdropped {} to {id}", args.amount);
    println!("  Balance: {balance}");
    Ok(0)
}

/// Execute `balance`.
pub fn run_balance(args: &BalanceArgs, config: &CliConfig) -> Result<u8> {
    let id = resolve_identity(&config.keys_dir(), &args.of)?;
    let ledger = load_ledger(config)?;
    println!("{}", ledger.balance(&id));
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn airdrop_persists() {
        let dir = tempfile::tempdir().unwrap();
        let config = CliConfig::with_state_dir(dir.path());
        let kp = crate::keys::cmd_keygen(&config.keys_dir(), "alice").unwrap();

        let args = AirdropArgs {
            to: "alice".into(),
            amount: 500,
        };
        run_airdrop(&args, &config).unwrap();
        run_airdrop(&args, &config).unwrap();

        let ledger = load_ledger(&config).unwrap();
        assert_eq!(ledger.balance(&kp.identity()), 1_000);
        let code = run_balance(
            &BalanceArgs {
                of: kp.identity().to_hex(),
            },
            &config,
        )
        .unwrap();
        assert_eq!(code, 0);
    }

    #[test]
    fn airdrop_overflow_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config = CliConfig::with_state_dir(dir.path());
        let to = "cd".repeat(32);
        run_airdrop(
            &AirdropArgs {
                to: to.clone(),
                amount: u64::MAX,
            },
            &config,
        )
        .unwrap();
        assert!(run_airdrop(&AirdropArgs { to, amount: 1 }, &config).is_err());
    }
}
