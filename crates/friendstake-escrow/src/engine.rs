//! # Transition Engine
//!
//! [`apply`] is the single transition function for every command. It reads
//! the current record slot and the balances it needs, validates the call,
//! and returns an [`Outcome`] describing the new record and the transfers
//! that must be committed with it. It never touches balances itself.
//!
//! ## Check order
//!
//! The first failing check wins, and every check runs before anything is
//! produced:
//!
//! 1. `Make`: description length, address derivation, then the address
//!    must be unused and never closed.
//!    Other commands: the record must be live, then the supplied addresses
//!    must re-derive from the stored description and bumps.
//! 2. Signer and supplied role identities against the stored roles.
//!    `Settle` decodes its winner code only after this step, so a
//!    non-judge is `Unauthorized` whatever code it sends.
//! 3. Deposit flag (`Cancel`, `Decline`, `Take`).
//! 4. Pre-state (and both deposits for `Settle`).
//! 5. Vault balance against the record.
//! 6. Payer funds.

use serde::{Deserialize, Serialize};
use tracing::debug;

use friendstake_core::{
    bet_address, bet_address_with_bump, validate_description, vault_address,
    vault_address_with_bump, Address, DerivationError, Identity, Namespace,
};

use crate::command::{Accounts, Command, Invocation, Operation, Side};
use crate::config::LedgerConfig;
use crate::error::EscrowError;
use crate::record::{BetRecord, BetState, Winner};
use crate::vault::{check_invariant, expected_balance, Account, Transfer};

/// What is stored at a bet record address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordSlot {
    /// Never used.
    Vacant,
    /// A live record.
    Live(BetRecord),
    /// Closed in the given terminal state. Addresses are single-use.
    Closed(BetState),
}

/// The balances the engine reads for one call.
#[derive(Debug, Clone, Copy)]
pub struct AccountView<'a> {
    /// The slot at the supplied bet address.
    pub slot: &'a RecordSlot,
    /// Storage deposit held by the record.
    pub record_balance: u64,
    /// Balance of the supplied vault address.
    pub vault_balance: u64,
    /// Spendable balance of the signer.
    pub signer_balance: u64,
}

/// The validated effect of one command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    /// The operation applied.
    pub operation: Operation,
    /// Bet record address.
    pub bet: Address,
    /// Vault address.
    pub vault: Address,
    /// State before the call, `None` for `Make`.
    pub from: Option<BetState>,
    /// State after the call.
    pub to: BetState,
    /// Transfers to commit, in order.
    pub transfers: Vec<Transfer>,
    /// The record after the call. For a terminal transition this is the
    /// final snapshot of a record that no longer exists.
    pub record: BetRecord,
    /// Whether the record and vault are closed by this call.
    pub closed: bool,
}

/// Validate `invocation` from `signer` against the current view and compute
/// its outcome.
///
/// # Errors
///
/// Returns the first failing precondition as an [`EscrowError`].
pub fn apply(
    namespace: &Namespace,
    config: &LedgerConfig,
    view: &AccountView<'_>,
    signer: &Identity,
    invocation: &Invocation,
) -> Result<Outcome, EscrowError> {
    let accounts = &invocation.accounts;
    let outcome = match &invocation.command {
        Command::Make {
            description,
            amount,
        } => make(namespace, config, view, signer, accounts, description, *amount)?,
        Command::Cancel => {
            let record = load(namespace, view, signer, accounts, Operation::Cancel, Role::Maker)?;
            withdraw(Operation::Cancel, view, accounts, record)?
        }
        Command::Decline => {
            let record = load(namespace, view, signer, accounts, Operation::Decline, Role::Opponent)?;
            withdraw(Operation::Decline, view, accounts, record)?
        }
        Command::Take => {
            let record = load(namespace, view, signer, accounts, Operation::Take, Role::Opponent)?;
            take(view, accounts, record)?
        }
        Command::Settle { winner } => {
            let op = invocation.command.operation();
            let record = load(namespace, view, signer, accounts, op, Role::Judge)?;
            match Side::from_code(*winner)? {
                Some(side) => settle(view, accounts, record, side)?,
                None => refund(view, accounts, record)?,
            }
        }
        Command::Refund => {
            let record = load(namespace, view, signer, accounts, Operation::Refund, Role::Judge)?;
            refund(view, accounts, record)?
        }
    };
    debug!(
        op = %outcome.operation,
        bet = %outcome.bet,
        from = ?outcome.from,
        to = %outcome.to,
        transfers = outcome.transfers.len(),
        closed = outcome.closed,
        "transition validated"
    );
    Ok(outcome)
}

#[derive(Clone, Copy)]
enum Role {
    Maker,
    Opponent,
    Judge,
}

impl Role {
    fn name(self) -> &'static str {
        match self {
            Self::Maker => "maker",
            Self::Opponent => "opponent",
            Self::Judge => "judge",
        }
    }

    fn of(self, record: &BetRecord) -> &Identity {
        match self {
            Self::Maker => &record.maker,
            Self::Opponent => &record.opponent,
            Self::Judge => &record.judge,
        }
    }
}

/// Existence, address and authorization checks shared by every command
/// that acts on a live record.
fn load<'a>(
    namespace: &Namespace,
    view: &AccountView<'a>,
    signer: &Identity,
    accounts: &Accounts,
    op: Operation,
    role: Role,
) -> Result<&'a BetRecord, EscrowError> {
    let record = live_record(op, view.slot, &accounts.bet)?;
    check_addresses(namespace, accounts, record)?;
    authorize(op, role.name(), role.of(record), signer)?;
    check_roles(op, accounts, record)?;
    Ok(record)
}

fn make(
    namespace: &Namespace,
    config: &LedgerConfig,
    view: &AccountView<'_>,
    signer: &Identity,
    accounts: &Accounts,
    description: &str,
    amount: u64,
) -> Result<Outcome, EscrowError> {
    let op = Operation::Make;
    validate_description(description)?;

    let bet = bet_address(
        namespace,
        &accounts.maker,
        &accounts.opponent,
        &accounts.judge,
        description,
    )?;
    ensure_address("bet", bet.address, accounts.bet)?;
    let vault = vault_address(namespace, &bet.address)?;
    ensure_address("vault", vault.address, accounts.vault)?;

    match view.slot {
        RecordSlot::Vacant => {}
        RecordSlot::Live(record) => {
            return Err(EscrowError::InvalidState {
                operation: op,
                address: accounts.bet,
                state: record.state,
            })
        }
        RecordSlot::Closed(state) => {
            return Err(EscrowError::InvalidState {
                operation: op,
                address: accounts.bet,
                state: *state,
            })
        }
    }

    authorize(op, "maker", &accounts.maker, signer)?;

    if view.vault_balance != 0 {
        return Err(EscrowError::VaultBalanceMismatch {
            vault: accounts.vault,
            expected: 0,
            actual: view.vault_balance,
        });
    }

    // Both stakes must fit in the vault, or the wager could never be taken.
    expected_balance(amount, true)?;
    let needed = amount
        .checked_add(config.record_deposit)
        .ok_or(EscrowError::ArithmeticOverflow {
            context: "stake plus record deposit",
        })?;
    ensure_funds(Account::Wallet(*signer), needed, view.signer_balance)?;

    let record = BetRecord::open(
        accounts.maker,
        accounts.opponent,
        accounts.judge,
        amount,
        description.to_string(),
        bet.bump,
        vault.bump,
    );
    let mut transfers = Vec::with_capacity(2);
    push_transfer(
        &mut transfers,
        Account::Wallet(accounts.maker),
        Account::Record(accounts.bet),
        config.record_deposit,
    );
    push_transfer(
        &mut transfers,
        Account::Wallet(accounts.maker),
        Account::Vault(accounts.vault),
        amount,
    );

    Ok(Outcome {
        operation: op,
        bet: accounts.bet,
        vault: accounts.vault,
        from: None,
        to: BetState::Open,
        transfers,
        record,
        closed: false,
    })
}

/// Cancel (maker) and Decline (opponent) share one effect: the maker's
/// stake and record deposit go back to the maker.
fn withdraw(
    op: Operation,
    view: &AccountView<'_>,
    accounts: &Accounts,
    record: &BetRecord,
) -> Result<Outcome, EscrowError> {
    if record.players_deposited {
        return Err(EscrowError::TakerAlreadyDeposited {
            operation: op,
            address: accounts.bet,
        });
    }
    require_state(op, accounts, record, &[BetState::Open])?;
    check_invariant(&accounts.vault, record, view.vault_balance)?;

    let mut transfers = Vec::with_capacity(2);
    push_transfer(
        &mut transfers,
        Account::Vault(accounts.vault),
        Account::Wallet(record.maker),
        view.vault_balance,
    );
    close_record(&mut transfers, view, accounts, record);

    let mut next = record.clone();
    next.state = BetState::Cancelled;
    Ok(finish(op, accounts, record, next, transfers))
}

fn take(
    view: &AccountView<'_>,
    accounts: &Accounts,
    record: &BetRecord,
) -> Result<Outcome, EscrowError> {
    let op = Operation::Take;
    if record.players_deposited {
        return Err(EscrowError::TakerAlreadyDeposited {
            operation: op,
            address: accounts.bet,
        });
    }
    require_state(op, accounts, record, &[BetState::Open])?;
    check_invariant(&accounts.vault, record, view.vault_balance)?;
    expected_balance(record.amount, true)?;
    ensure_funds(
        Account::Wallet(record.opponent),
        record.amount,
        view.signer_balance,
    )?;

    let mut transfers = Vec::with_capacity(1);
    push_transfer(
        &mut transfers,
        Account::Wallet(record.opponent),
        Account::Vault(accounts.vault),
        record.amount,
    );

    let mut next = record.clone();
    next.state = BetState::Accepted;
    next.players_deposited = true;
    Ok(finish(op, accounts, record, next, transfers))
}

fn settle(
    view: &AccountView<'_>,
    accounts: &Accounts,
    record: &BetRecord,
    winner: Side,
) -> Result<Outcome, EscrowError> {
    let op = Operation::Settle;
    if !record.players_deposited {
        return Err(EscrowError::PlayersNotDeposited {
            address: accounts.bet,
        });
    }
    require_state(op, accounts, record, &[BetState::Accepted])?;
    check_invariant(&accounts.vault, record, view.vault_balance)?;

    let payee = match winner {
        Side::Maker => record.maker,
        Side::Taker => record.opponent,
    };
    let mut transfers = Vec::with_capacity(2);
    push_transfer(
        &mut transfers,
        Account::Vault(accounts.vault),
        Account::Wallet(payee),
        view.vault_balance,
    );
    close_record(&mut transfers, view, accounts, record);

    let mut next = record.clone();
    next.state = BetState::Settled;
    next.winner = Winner::from(winner);
    Ok(finish(op, accounts, record, next, transfers))
}

fn refund(
    view: &AccountView<'_>,
    accounts: &Accounts,
    record: &BetRecord,
) -> Result<Outcome, EscrowError> {
    let op = Operation::Refund;
    require_state(op, accounts, record, &[BetState::Open, BetState::Accepted])?;
    check_invariant(&accounts.vault, record, view.vault_balance)?;

    let mut transfers = Vec::with_capacity(3);
    push_transfer(
        &mut transfers,
        Account::Vault(accounts.vault),
        Account::Wallet(record.maker),
        record.amount,
    );
    if record.players_deposited {
        push_transfer(
            &mut transfers,
            Account::Vault(accounts.vault),
            Account::Wallet(record.opponent),
            record.amount,
        );
    }
    close_record(&mut transfers, view, accounts, record);

    let mut next = record.clone();
    next.state = BetState::Settled;
    next.winner = Winner::None;
    Ok(finish(op, accounts, record, next, transfers))
}

// ─── Checks ──────────────────────────────────────────────────────────

fn live_record<'a>(
    op: Operation,
    slot: &'a RecordSlot,
    bet: &Address,
) -> Result<&'a BetRecord, EscrowError> {
    match slot {
        RecordSlot::Live(record) => Ok(record),
        RecordSlot::Vacant => Err(EscrowError::RecordNotFound {
            operation: op,
            address: *bet,
        }),
        RecordSlot::Closed(state) => Err(EscrowError::InvalidState {
            operation: op,
            address: *bet,
            state: *state,
        }),
    }
}

fn check_addresses(
    namespace: &Namespace,
    accounts: &Accounts,
    record: &BetRecord,
) -> Result<(), EscrowError> {
    let bet = match bet_address_with_bump(
        namespace,
        &accounts.maker,
        &accounts.opponent,
        &accounts.judge,
        &record.description,
        record.bump,
    ) {
        Ok(address) => address,
        Err(DerivationError::OnCurve { .. }) => {
            bet_address(
                namespace,
                &accounts.maker,
                &accounts.opponent,
                &accounts.judge,
                &record.description,
            )?
            .address
        }
        Err(e) => return Err(e.into()),
    };
    ensure_address("bet", bet, accounts.bet)?;

    let vault = match vault_address_with_bump(namespace, &bet, record.vault_bump) {
        Ok(address) => address,
        Err(DerivationError::OnCurve { .. }) => vault_address(namespace, &bet)?.address,
        Err(e) => return Err(e.into()),
    };
    ensure_address("vault", vault, accounts.vault)
}

fn ensure_address(
    account: &'static str,
    expected: Address,
    supplied: Address,
) -> Result<(), EscrowError> {
    if expected != supplied {
        return Err(EscrowError::AddressDerivationMismatch {
            account,
            expected,
            supplied,
        });
    }
    Ok(())
}

fn authorize(
    op: Operation,
    role: &'static str,
    expected: &Identity,
    signer: &Identity,
) -> Result<(), EscrowError> {
    if expected != signer {
        return Err(EscrowError::Unauthorized {
            operation: op,
            role,
            expected: *expected,
            actual: *signer,
        });
    }
    Ok(())
}

fn check_roles(op: Operation, accounts: &Accounts, record: &BetRecord) -> Result<(), EscrowError> {
    authorize(op, "maker", &record.maker, &accounts.maker)?;
    authorize(op, "opponent", &record.opponent, &accounts.opponent)?;
    authorize(op, "judge", &record.judge, &accounts.judge)
}

fn require_state(
    op: Operation,
    accounts: &Accounts,
    record: &BetRecord,
    allowed: &[BetState],
) -> Result<(), EscrowError> {
    if !allowed.contains(&record.state) {
        return Err(EscrowError::InvalidState {
            operation: op,
            address: accounts.bet,
            state: record.state,
        });
    }
    Ok(())
}

fn ensure_funds(account: Account, needed: u64, available: u64) -> Result<(), EscrowError> {
    if available < needed {
        return Err(EscrowError::InsufficientFunds {
            account,
            needed,
            available,
        });
    }
    Ok(())
}

// ─── Outcome assembly ────────────────────────────────────────────────

fn push_transfer(transfers: &mut Vec<Transfer>, from: Account, to: Account, amount: u64) {
    if amount > 0 {
        transfers.push(Transfer { from, to, amount });
    }
}

fn close_record(
    transfers: &mut Vec<Transfer>,
    view: &AccountView<'_>,
    accounts: &Accounts,
    record: &BetRecord,
) {
    push_transfer(
        transfers,
        Account::Record(accounts.bet),
        Account::Wallet(record.maker),
        view.record_balance,
    );
}

fn finish(
    op: Operation,
    accounts: &Accounts,
    before: &BetRecord,
    after: BetRecord,
    transfers: Vec<Transfer>,
) -> Outcome {
    Outcome {
        operation: op,
        bet: accounts.bet,
        vault: accounts.vault,
        from: Some(before.state),
        to: after.state,
        closed: after.state.is_terminal(),
        transfers,
        record: after,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const AMOUNT: u64 = 1_000_000_000;
    const DEPOSIT: u64 = 500;

    struct Fixture {
        ns: Namespace,
        config: LedgerConfig,
        maker: Identity,
        opponent: Identity,
        judge: Identity,
        accounts: Accounts,
    }

    fn fixture() -> Fixture {
        let ns = Namespace::default();
        let maker = Identity::from_bytes([1; 32]);
        let opponent = Identity::from_bytes([2; 32]);
        let judge = Identity::from_bytes([3; 32]);
        let bet = bet_address(&ns, &maker, &opponent, &judge, "test").unwrap();
        let vault = vault_address(&ns, &bet.address).unwrap();
        Fixture {
            ns,
            config: LedgerConfig {
                record_deposit: DEPOSIT,
            },
            maker,
            opponent,
            judge,
            accounts: Accounts {
                maker,
                opponent,
                judge,
                bet: bet.address,
                vault: vault.address,
            },
        }
    }

    impl Fixture {
        fn invoke(&self, command: Command) -> Invocation {
            Invocation {
                accounts: self.accounts,
                command,
            }
        }

        fn make(&self) -> Invocation {
            self.invoke(Command::Make {
                description: "test".into(),
                amount: AMOUNT,
            })
        }

        fn run(
            &self,
            slot: &RecordSlot,
            vault_balance: u64,
            signer: &Identity,
            invocation: &Invocation,
        ) -> Result<Outcome, EscrowError> {
            let view = AccountView {
                slot,
                record_balance: DEPOSIT,
                vault_balance,
                signer_balance: u64::MAX / 4,
            };
            apply(&self.ns, &self.config, &view, signer, invocation)
        }

        fn open_record(&self) -> BetRecord {
            self.run(&RecordSlot::Vacant, 0, &self.maker, &self.make())
                .unwrap()
                .record
        }

        fn accepted_record(&self) -> BetRecord {
            let open = RecordSlot::Live(self.open_record());
            self.run(&open, AMOUNT, &self.opponent, &self.invoke(Command::Take))
                .unwrap()
                .record
        }
    }

    #[test]
    fn make_creates_open_record_and_funds_vault() {
        let f = fixture();
        let out = f.run(&RecordSlot::Vacant, 0, &f.maker, &f.make()).unwrap();
        assert_eq!(out.from, None);
        assert_eq!(out.to, BetState::Open);
        assert!(!out.record.players_deposited);
        assert_eq!(out.record.winner, Winner::None);
        assert_eq!(
            out.transfers,
            vec![
                Transfer {
                    from: Account::Wallet(f.maker),
                    to: Account::Record(f.accounts.bet),
                    amount: DEPOSIT,
                },
                Transfer {
                    from: Account::Wallet(f.maker),
                    to: Account::Vault(f.accounts.vault),
                    amount: AMOUNT,
                },
            ]
        );
    }

    #[test]
    fn make_with_wrong_bet_address_is_mismatch() {
        let f = fixture();
        let mut inv = f.make();
        inv.accounts.bet = Address::from_bytes([0xee; 32]);
        assert!(matches!(
            f.run(&RecordSlot::Vacant, 0, &f.maker, &inv),
            Err(EscrowError::AddressDerivationMismatch { account: "bet", .. })
        ));
    }

    #[test]
    fn make_with_wrong_vault_address_is_mismatch() {
        let f = fixture();
        let mut inv = f.make();
        inv.accounts.vault = Address::from_bytes([0xee; 32]);
        assert!(matches!(
            f.run(&RecordSlot::Vacant, 0, &f.maker, &inv),
            Err(EscrowError::AddressDerivationMismatch {
                account: "vault",
                ..
            })
        ));
    }

    #[test]
    fn make_on_used_address_is_invalid_state() {
        let f = fixture();
        let live = RecordSlot::Live(f.open_record());
        assert!(matches!(
            f.run(&live, AMOUNT, &f.maker, &f.make()),
            Err(EscrowError::InvalidState {
                state: BetState::Open,
                ..
            })
        ));
        let closed = RecordSlot::Closed(BetState::Cancelled);
        assert!(matches!(
            f.run(&closed, 0, &f.maker, &f.make()),
            Err(EscrowError::InvalidState {
                state: BetState::Cancelled,
                ..
            })
        ));
    }

    #[test]
    fn make_signed_by_other_party_is_unauthorized() {
        let f = fixture();
        assert!(matches!(
            f.run(&RecordSlot::Vacant, 0, &f.judge, &f.make()),
            Err(EscrowError::Unauthorized { role: "maker", .. })
        ));
    }

    #[test]
    fn make_rejects_long_description_first() {
        let f = fixture();
        let inv = f.invoke(Command::Make {
            description: "x".repeat(33),
            amount: 1,
        });
        assert!(matches!(
            f.run(&RecordSlot::Vacant, 0, &f.judge, &inv),
            Err(EscrowError::DescriptionTooLong { len: 33, max: 32 })
        ));
    }

    #[test]
    fn make_needs_stake_plus_deposit() {
        let f = fixture();
        let view = AccountView {
            slot: &RecordSlot::Vacant,
            record_balance: 0,
            vault_balance: 0,
            signer_balance: AMOUNT + DEPOSIT - 1,
        };
        assert!(matches!(
            apply(&f.ns, &f.config, &view, &f.maker, &f.make()),
            Err(EscrowError::InsufficientFunds { needed, .. }) if needed == AMOUNT + DEPOSIT
        ));
    }

    #[test]
    fn make_into_prefunded_vault_rejected() {
        let f = fixture();
        assert!(matches!(
            f.run(&RecordSlot::Vacant, 3, &f.maker, &f.make()),
            Err(EscrowError::VaultBalanceMismatch { expected: 0, actual: 3, .. })
        ));
    }

    #[test]
    fn operations_on_vacant_address_not_found() {
        let f = fixture();
        for cmd in [Command::Cancel, Command::Take, Command::Decline, Command::Refund] {
            assert!(matches!(
                f.run(&RecordSlot::Vacant, 0, &f.maker, &f.invoke(cmd)),
                Err(EscrowError::RecordNotFound { .. })
            ));
        }
    }

    #[test]
    fn take_moves_stake_and_sets_flag() {
        let f = fixture();
        let live = RecordSlot::Live(f.open_record());
        let out = f
            .run(&live, AMOUNT, &f.opponent, &f.invoke(Command::Take))
            .unwrap();
        assert_eq!(out.to, BetState::Accepted);
        assert!(out.record.players_deposited);
        assert!(!out.closed);
        assert_eq!(out.transfers.len(), 1);
        assert_eq!(out.transfers[0].from, Account::Wallet(f.opponent));
        assert_eq!(out.transfers[0].amount, AMOUNT);
    }

    #[test]
    fn take_requires_exact_vault_balance() {
        let f = fixture();
        let live = RecordSlot::Live(f.open_record());
        assert!(matches!(
            f.run(&live, AMOUNT + 1, &f.opponent, &f.invoke(Command::Take)),
            Err(EscrowError::VaultBalanceMismatch { .. })
        ));
    }

    #[test]
    fn cancel_after_take_reports_taker_deposited() {
        let f = fixture();
        let live = RecordSlot::Live(f.accepted_record());
        for (signer, cmd) in [
            (f.maker, Command::Cancel),
            (f.opponent, Command::Decline),
            (f.opponent, Command::Take),
        ] {
            assert!(matches!(
                f.run(&live, 2 * AMOUNT, &signer, &f.invoke(cmd)),
                Err(EscrowError::TakerAlreadyDeposited { .. })
            ));
        }
    }

    #[test]
    fn decline_refunds_maker_and_closes() {
        let f = fixture();
        let live = RecordSlot::Live(f.open_record());
        let out = f
            .run(&live, AMOUNT, &f.opponent, &f.invoke(Command::Decline))
            .unwrap();
        assert_eq!(out.to, BetState::Cancelled);
        assert!(out.closed);
        assert_eq!(
            out.transfers,
            vec![
                Transfer {
                    from: Account::Vault(f.accounts.vault),
                    to: Account::Wallet(f.maker),
                    amount: AMOUNT,
                },
                Transfer {
                    from: Account::Record(f.accounts.bet),
                    to: Account::Wallet(f.maker),
                    amount: DEPOSIT,
                },
            ]
        );
    }

    #[test]
    fn settle_before_deposits_rejected() {
        let f = fixture();
        let live = RecordSlot::Live(f.open_record());
        let cmd = Command::settle(Side::Maker);
        assert!(matches!(
            f.run(&live, AMOUNT, &f.judge, &f.invoke(cmd)),
            Err(EscrowError::PlayersNotDeposited { .. })
        ));
    }

    #[test]
    fn settle_pays_whole_vault_to_winner() {
        let f = fixture();
        let live = RecordSlot::Live(f.accepted_record());
        let cmd = Command::settle(Side::Taker);
        let out = f.run(&live, 2 * AMOUNT, &f.judge, &f.invoke(cmd)).unwrap();
        assert_eq!(out.record.winner, Winner::Taker);
        assert_eq!(out.to, BetState::Settled);
        assert_eq!(out.transfers[0].to, Account::Wallet(f.opponent));
        assert_eq!(out.transfers[0].amount, 2 * AMOUNT);
        assert_eq!(out.transfers[1].to, Account::Wallet(f.maker));
    }

    #[test]
    fn settle_by_non_judge_unauthorized() {
        let f = fixture();
        let live = RecordSlot::Live(f.accepted_record());
        for signer in [f.maker, f.opponent] {
            for winner in 0..=u8::MAX {
                let cmd = Command::Settle { winner };
                assert!(
                    matches!(
                        f.run(&live, 2 * AMOUNT, &signer, &f.invoke(cmd)),
                        Err(EscrowError::Unauthorized { role: "judge", .. })
                    ),
                    "winner code {winner}"
                );
            }
        }
    }

    #[test]
    fn judge_with_unknown_winner_code_rejected() {
        let f = fixture();
        let live = RecordSlot::Live(f.accepted_record());
        let cmd = Command::Settle { winner: 3 };
        assert!(matches!(
            f.run(&live, 2 * AMOUNT, &f.judge, &f.invoke(cmd)),
            Err(EscrowError::InvalidWinnerArgument { code: 3 })
        ));
    }

    #[test]
    fn settle_code_zero_refunds() {
        let f = fixture();
        let live = RecordSlot::Live(f.open_record());
        let out = f
            .run(&live, AMOUNT, &f.judge, &f.invoke(Command::Settle { winner: 0 }))
            .unwrap();
        assert_eq!(out.operation, Operation::Refund);
        assert_eq!(out.record.winner, Winner::None);
        assert_eq!(out.transfers[0].to, Account::Wallet(f.maker));
    }

    #[test]
    fn refund_returns_each_deposit() {
        let f = fixture();
        let live = RecordSlot::Live(f.accepted_record());
        let out = f
            .run(&live, 2 * AMOUNT, &f.judge, &f.invoke(Command::Refund))
            .unwrap();
        assert_eq!(out.record.winner, Winner::None);
        assert_eq!(out.to, BetState::Settled);
        let to_vault: u64 = out
            .transfers
            .iter()
            .filter(|t| t.from == Account::Vault(f.accounts.vault))
            .map(|t| t.amount)
            .sum();
        assert_eq!(to_vault, 2 * AMOUNT);
        assert_eq!(out.transfers[1].to, Account::Wallet(f.opponent));
    }

    #[test]
    fn refund_of_open_wager_returns_maker_stake() {
        let f = fixture();
        let live = RecordSlot::Live(f.open_record());
        let out = f
            .run(&live, AMOUNT, &f.judge, &f.invoke(Command::Refund))
            .unwrap();
        assert_eq!(out.from, Some(BetState::Open));
        assert_eq!(out.transfers[0].amount, AMOUNT);
        assert_eq!(out.transfers[0].to, Account::Wallet(f.maker));
    }

    #[test]
    fn swapped_role_identities_rejected() {
        let f = fixture();
        let live = RecordSlot::Live(f.accepted_record());
        let mut inv = f.invoke(Command::Refund);
        inv.accounts.judge = f.maker;
        let err = f.run(&live, 2 * AMOUNT, &f.judge, &inv).unwrap_err();
        assert_eq!(err.kind(), "AddressDerivationMismatch");
    }

    #[test]
    fn closed_record_reports_final_state() {
        let f = fixture();
        let closed = RecordSlot::Closed(BetState::Settled);
        assert!(matches!(
            f.run(&closed, 0, &f.opponent, &f.invoke(Command::Take)),
            Err(EscrowError::InvalidState {
                state: BetState::Settled,
                ..
            })
        ));
    }

    #[test]
    fn make_rejects_stake_that_cannot_be_doubled() {
        let f = fixture();
        let view = AccountView {
            slot: &RecordSlot::Vacant,
            record_balance: 0,
            vault_balance: 0,
            signer_balance: u64::MAX,
        };
        let too_large = f.invoke(Command::Make {
            description: "test".into(),
            amount: u64::MAX / 2 + 1,
        });
        assert!(matches!(
            apply(&f.ns, &f.config, &view, &f.maker, &too_large),
            Err(EscrowError::ArithmeticOverflow { .. })
        ));

        let largest = f.invoke(Command::Make {
            description: "test".into(),
            amount: u64::MAX / 2,
        });
        let out = apply(&f.ns, &f.config, &view, &f.maker, &largest).unwrap();
        assert_eq!(out.record.amount, u64::MAX / 2);
    }

    #[test]
    fn zero_amount_wager_has_no_stake_transfer() {
        let f = fixture();
        let inv = f.invoke(Command::Make {
            description: "test".into(),
            amount: 0,
        });
        let out = f.run(&RecordSlot::Vacant, 0, &f.maker, &inv).unwrap();
        assert_eq!(out.transfers.len(), 1);
        assert_eq!(out.transfers[0].to, Account::Record(f.accounts.bet));
    }
}
