//! # Wager Subcommands
//!
//! The five protocol operations plus record inspection. Every operation is
//! signed with a keystore key and submitted to the local ledger under the
//! state lock; the snapshot is saved only if the operation commits.
//!
//! - `make` opens a wager and deposits the maker's stake.
//! - `cancel` / `decline` return the maker's stake before the opponent
//!   takes.
//! - `take` deposits the opponent's stake.
//! - `settle --winner 0|1|2` refunds, or pays the maker or the taker.
//! - `show` / `list` read records.

use anyhow::{bail, Context, Result};
use clap::Args;

use friendstake_core::{vault_address_with_bump, Address, Keypair};
use friendstake_escrow::{
    Accounts, Command, Invocation, Ledger, RecordFilter, RecordSlot, Receipt, SignedInvocation,
};

use crate::address::derive;
use crate::config::CliConfig;
use crate::keys::{load_keypair, resolve_identity};
use crate::store::{load_ledger, update_ledger};

/// Arguments for `friendstake make`.
#[derive(Args, Debug)]
pub struct MakeArgs {
    /// Maker key name; signs the operation.
    #[arg(long)]
    pub key: String,
    /// Opponent (hex identity or key name).
    #[arg(long)]
    pub opponent: String,
    /// Judge (hex identity or key name).
    #[arg(long)]
    pub judge: String,
    /// Wager description, at most 32 bytes.
    #[arg(long)]
    pub description: String,
    /// Per-party stake in native units.
    #[arg(long)]
    pub amount: u64,
}

/// Arguments for `cancel`, `take` and `decline`.
#[derive(Args, Debug)]
pub struct ActionArgs {
    /// Bet record address.
    #[arg(long)]
    pub bet: String,
    /// Key name of the signer.
    #[arg(long)]
    pub key: String,
}

/// Arguments for `friendstake settle`.
#[derive(Args, Debug)]
pub struct SettleArgs {
    /// Bet record address.
    #[arg(long)]
    pub bet: String,
    /// Judge key name.
    #[arg(long)]
    pub key: String,
    /// 0 refunds both parties, 1 pays the maker, 2 pays the taker.
    #[arg(long)]
    pub winner: u8,
}

/// Arguments for `friendstake show`.
#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Bet record address.
    #[arg(long)]
    pub bet: String,
}

/// Arguments for `friendstake list`.
#[derive(Args, Debug, Default)]
pub struct ListArgs {
    /// Only wagers made by this participant.
    #[arg(long)]
    pub maker: Option<String>,
    /// Only wagers offered to this participant.
    #[arg(long)]
    pub opponent: Option<String>,
    /// Only wagers judged by this participant.
    #[arg(long)]
    pub judge: Option<String>,
}

/// Execute `make`.
pub fn run_make(args: &MakeArgs, config: &CliConfig) -> Result<u8> {
    let keys = config.keys_dir();
    let maker = load_keypair(&keys, &args.key)?;
    let opponent = resolve_identity(&keys, &args.opponent)?;
    let judge = resolve_identity(&keys, &args.judge)?;

    let receipt = update_ledger(config, |ledger| {
        let addrs = derive(
            &ledger.namespace(),
            &maker.identity(),
            &opponent,
            &judge,
            &args.description,
        )?;
        let accounts = Accounts {
            maker: maker.identity(),
            opponent,
            judge,
            bet: addrs.bet.address,
            vault: addrs.vault.address,
        };
        let command = Command::Make {
            description: args.description.clone(),
            amount: args.amount,
        };
        submit(ledger, &maker, accounts, command)
    })?;
    report(&receipt);
    Ok(0)
}

/// Execute `cancel`, `take` or `decline`.
pub fn run_action(args: &ActionArgs, config: &CliConfig, command: Command) -> Result<u8> {
    let signer = load_keypair(&config.keys_dir(), &args.key)?;
    let bet = parse_address(&args.bet)?;
    let receipt = update_ledger(config, |ledger| {
        let accounts = accounts_for(ledger, &bet)?;
        submit(ledger, &signer, accounts, command)
    })?;
    report(&receipt);
    Ok(0)
}

/// Execute `settle`. The winner code is checked by the ledger after the
/// signer is confirmed as judge.
pub fn run_settle(args: &SettleArgs, config: &CliConfig) -> Result<u8> {
    let command = Command::Settle {
        winner: args.winner,
    };
    let action = ActionArgs {
        bet: args.bet.clone(),
        key: args.key.clone(),
    };
    run_action(&action, config, command)
}

/// Execute `show`.
pub fn run_show(args: &ShowArgs, config: &CliConfig) -> Result<u8> {
    let ledger = load_ledger(config)?;
    let bet = parse_address(&args.bet)?;
    match ledger.slot(&bet)? {
        RecordSlot::Live(record) => {
            let vault =
                vault_address_with_bump(&ledger.namespace(), &bet, record.vault_bump)?;
            println!("Bet: {bet}");
            println!("  Description: {}", record.description);
            println!("  State: {}", record.state);
            println!("  Maker: {}", record.maker);
            println!("  Opponent: {}", record.opponent);
            println!("  Judge: {}", record.judge);
            println!("  Amount: {}", record.amount);
            println!("  Players deposited: {}", record.players_deposited);
            println!("  Winner: {}", record.winner);
            println!("  Vault: {vault} ({})", ledger.vault_balance(&vault));
        }
        RecordSlot::Closed(state) => println!("Bet: {bet}\n  Closed: {state}"),
        RecordSlot::Vacant => bail!("no bet record at {bet}"),
    }
    Ok(0)
}

/// Execute `list`.
pub fn run_list(args: &ListArgs, config: &CliConfig) -> Result<u8> {
    let keys = config.keys_dir();
    let ledger = load_ledger(config)?;
    let mut filters = Vec::new();
    if let Some(who) = &args.maker {
        filters.push(RecordFilter::maker(&resolve_identity(&keys, who)?));
    }
    if let Some(who) = &args.opponent {
        filters.push(RecordFilter::opponent(&resolve_identity(&keys, who)?));
    }
    if let Some(who) = &args.judge {
        filters.push(RecordFilter::judge(&resolve_identity(&keys, who)?));
    }

    let records = ledger.list(&filters);
    if records.is_empty() {
        println!("No bets found.");
        return Ok(0);
    }
    println!("Bets ({}):", records.len());
    for (address, record) in &records {
        println!(
            "  {address}: {} {} x2 \"{}\"",
            record.state, record.amount, record.description
        );
    }
    Ok(0)
}

fn parse_address(value: &str) -> Result<Address> {
    Address::from_hex(value).with_context(|| format!("invalid bet address {value:?}"))
}

/// Accounts of the live record at `bet`, as stored.
fn accounts_for(ledger: &Ledger, bet: &Address) -> Result<Accounts> {
    match ledger.slot(bet)? {
        RecordSlot::Live(record) => {
            let vault = vault_address_with_bump(&ledger.namespace(), bet, record.vault_bump)?;
            Ok(Accounts {
                maker: record.maker,
                opponent: record.opponent,
                judge: record.judge,
                bet: *bet,
                vault,
            })
        }
        RecordSlot::Closed(state) => bail!("bet {bet} is already closed ({state})"),
        RecordSlot::Vacant => bail!("no bet record at {bet}"),
    }
}

fn submit(
    ledger: &Ledger,
    signer: &Keypair,
    accounts: Accounts,
    command: Command,
) -> Result<Receipt> {
    let op = command.operation();
    let signed = SignedInvocation::sign(signer, Invocation { accounts, command })?;
    ledger
        .submit_signed(&signed)
        .with_context(|| format!("{op} rejected"))
}

fn report(receipt: &Receipt) {
    let out = &receipt.outcome;
    match out.from {
        Some(from) => println!("OK: {} bet {}: {from} -> {}", out.operation, out.bet, out.to),
        None => println!("OK: {} bet {}: {}", out.operation, out.bet, out.to),
    }
    println!("  Vault: {}", out.vault);
    for t in &out.transfers {
        println!("  {} -> {}: {}", t.from, t.to, t.amount);
    }
    println!("  Journal: #{} {}", receipt.entry.seq, receipt.entry.digest);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::{run_airdrop, AirdropArgs};
    use crate::keys::cmd_keygen;
    use friendstake_escrow::BetState;

    fn setup() -> (tempfile::TempDir, CliConfig, Address) {
        let dir = tempfile::tempdir().unwrap();
        let mut config = CliConfig::with_state_dir(dir.path());
        config.record_deposit = Some(0);
        for name in ["maker", "opponent", "judge"] {
            cmd_keygen(&config.keys_dir(), name).unwrap();
        }
        for name in ["maker", "opponent"] {
            run_airdrop(
                &AirdropArgs {
                    to: name.into(),
                    amount: 1_000,
                },
                &config,
            )
            .unwrap();
        }
        let make = MakeArgs {
            key: "maker".into(),
            opponent: "opponent".into(),
            judge: "judge".into(),
            description: "derby".into(),
            amount: 300,
        };
        run_make(&make, &config).unwrap();
        let bet = load_ledger(&config).unwrap().list_all()[0].0;
        (dir, config, bet)
    }

    fn action(bet: &Address, key: &str) -> ActionArgs {
        ActionArgs {
            bet: bet.to_hex(),
            key: key.into(),
        }
    }

    #[test]
    fn make_take_settle() {
        let (_dir, config, bet) = setup();
        run_action(&action(&bet, "opponent"), &config, Command::Take).unwrap();
        let ledger = load_ledger(&config).unwrap();
        assert_eq!(ledger.fetch(&bet).unwrap().unwrap().state, BetState::Accepted);

        let settle = SettleArgs {
            bet: bet.to_hex(),
            key: "judge".into(),
            winner: 2,
        };
        run_settle(&settle, &config).unwrap();
        let ledger = load_ledger(&config).unwrap();
        let opponent = resolve_identity(&config.keys_dir(), "opponent").unwrap();
        assert_eq!(ledger.balance(&opponent), 1_300);
        assert_eq!(ledger.slot(&bet).unwrap(), RecordSlot::Closed(BetState::Settled));
        assert_eq!(run_show(&ShowArgs { bet: bet.to_hex() }, &config).unwrap(), 0);
    }

    #[test]
    fn rejected_operation_does_not_touch_snapshot() {
        let (_dir, config, bet) = setup();
        let before = std::fs::read_to_string(config.ledger_path()).unwrap();
        let err = run_action(&action(&bet, "judge"), &config, Command::Cancel).unwrap_err();
        assert!(format!("{err:#}").contains("cancel rejected"));
        let after = std::fs::read_to_string(config.ledger_path()).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn invalid_winner_code_rejected() {
        let (_dir, config, bet) = setup();
        let settle = SettleArgs {
            bet: bet.to_hex(),
            key: "judge".into(),
            winner: 9,
        };
        let err = run_settle(&settle, &config).unwrap_err();
        assert!(format!("{err:#}").contains("invalid winner code 9"));
    }

    #[test]
    fn unknown_winner_code_from_non_judge_is_unauthorized() {
        let (_dir, config, bet) = setup();
        run_action(&action(&bet, "opponent"), &config, Command::Take).unwrap();
        let before = std::fs::read_to_string(config.ledger_path()).unwrap();
        for key in ["maker", "opponent"] {
            let settle = SettleArgs {
                bet: bet.to_hex(),
                key: key.into(),
                winner: 7,
            };
            let err = format!("{:#}", run_settle(&settle, &config).unwrap_err());
            assert!(err.contains("requires the judge"), "{key}: {err}");
            assert!(!err.contains("winner code"), "{key}: {err}");
        }
        assert_eq!(std::fs::read_to_string(config.ledger_path()).unwrap(), before);
    }

    #[test]
    fn decline_closes_and_blocks_further_actions() {
        let (_dir, config, bet) = setup();
        run_action(&action(&bet, "opponent"), &config, Command::Decline).unwrap();
        let err = run_action(&action(&bet, "opponent"), &config, Command::Take).unwrap_err();
        assert!(err.to_string().contains("already closed"));
    }

    #[test]
    fn list_filters_by_role() {
        let (_dir, config, _bet) = setup();
        assert_eq!(run_list(&ListArgs::default(), &config).unwrap(), 0);
        let args = ListArgs {
            judge: Some("judge".into()),
            ..ListArgs::default()
        };
        assert_eq!(run_list(&args, &config).unwrap(), 0);
        let ledger = load_ledger(&config).unwrap();
        let maker = resolve_identity(&config.keys_dir(), "maker").unwrap();
        assert_eq!(ledger.by_maker(&maker).len(), 1);
    }

    #[test]
    fn show_unknown_bet_fails() {
        let (_dir, config, _bet) = setup();
        let args = ShowArgs {
            bet: "00".repeat(32),
        };
        assert!(run_show(&args, &config).is_err());
    }
}
