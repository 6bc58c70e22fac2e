//! # Reference Ledger
//!
//! An in-memory execution environment for the escrow engine. It holds
//! wallet balances, vaults, serialized bet records and the tombstones of
//! closed records, and applies each invocation atomically under a single
//! write lock:
//!
//! 1. Read the record slot and the balances the engine needs.
//! 2. Run [`engine::apply`].
//! 3. Stage every transfer against a scratch copy of the touched balances.
//! 4. Build the journal entry.
//! 5. Commit balances, the record write or close, and the entry together.
//!
//! Any failure in steps 1-4 returns before step 5, so a rejected call
//! leaves the ledger exactly as it was.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use friendstake_core::identity::hex::serde_bytes;
use friendstake_core::{
    sha256_digest, Address, CanonicalBytes, ContentDigest, Identity, Namespace,
};

use crate::command::{Invocation, Operation, SignedInvocation};
use crate::config::LedgerConfig;
use crate::engine::{self, AccountView, Outcome, RecordSlot};
use crate::error::EscrowError;
use crate::record::{BetRecord, BetState};
use crate::vault::{check_invariant, Account, Transfer, Vault};

/// A serialized record and the storage deposit it holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRecord {
    /// Record bytes in the layout of [`BetRecord::encode`].
    #[serde(with = "serde_bytes")]
    pub data: Vec<u8>,
    /// Native units held by the record account.
    pub balance: u64,
}

/// One applied operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Zero-based position in the journal.
    pub seq: u64,
    /// The operation applied.
    pub operation: Operation,
    /// Bet record address.
    pub bet: Address,
    /// Authenticated caller.
    pub signer: Identity,
    /// State before, `None` for `Make`.
    pub from: Option<BetState>,
    /// State after.
    pub to: BetState,
    /// Transfers committed.
    pub transfers: Vec<Transfer>,
    /// Commit time.
    pub timestamp: DateTime<Utc>,
    /// Digest of the previous entry.
    pub prev: Option<ContentDigest>,
    /// SHA-256 over the canonical form of every field above.
    pub digest: ContentDigest,
}

#[derive(Serialize)]
struct EntryBody<'a> {
    seq: u64,
    operation: Operation,
    bet: &'a Address,
    signer: &'a Identity,
    from: Option<BetState>,
    to: BetState,
    transfers: &'a [Transfer],
    timestamp: &'a DateTime<Utc>,
    prev: Option<&'a ContentDigest>,
}

impl JournalEntry {
    /// Recompute the digest from the entry's contents.
    ///
    /// # Errors
    ///
    /// Returns [`EscrowError::Canonicalization`] if the body cannot be
    /// canonicalized.
    pub fn compute_digest(&self) -> Result<ContentDigest, EscrowError> {
        let body = EntryBody {
            seq: self.seq,
            operation: self.operation,
            bet: &self.bet,
            signer: &self.signer,
            from: self.from,
            to: self.to,
            transfers: &self.transfers,
            timestamp: &self.timestamp,
            prev: self.prev.as_ref(),
        };
        Ok(sha256_digest(&CanonicalBytes::new(&body)?))
    }
}

/// The complete, serializable ledger state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    /// Derivation namespace.
    pub namespace: Namespace,
    /// Ledger configuration.
    pub config: LedgerConfig,
    /// Participant balances.
    pub wallets: BTreeMap<Identity, u64>,
    /// Open vaults.
    pub vaults: BTreeMap<Address, Vault>,
    /// Live records.
    pub records: BTreeMap<Address, StoredRecord>,
    /// Closed record addresses and the state they closed in.
    pub closed: BTreeMap<Address, BetState>,
    /// Applied operations, oldest first.
    pub journal: Vec<JournalEntry>,
}

impl LedgerSnapshot {
    fn slot(&self, address: &Address) -> Result<RecordSlot, EscrowError> {
        if let Some(state) = self.closed.get(address) {
            return Ok(RecordSlot::Closed(*state));
        }
        match self.records.get(address) {
            Some(stored) => Ok(RecordSlot::Live(BetRecord::decode(&stored.data)?)),
            None => Ok(RecordSlot::Vacant),
        }
    }

    fn balance_of(&self, account: &Account) -> u64 {
        match account {
            Account::Wallet(id) => self.wallets.get(id).copied().unwrap_or(0),
            Account::Vault(addr) => self.vaults.get(addr).map_or(0, |v| v.balance),
            Account::Record(addr) => self.records.get(addr).map_or(0, |r| r.balance),
        }
    }

    /// Apply `transfers` to scratch copies of the accounts they touch, or
    /// fail on the first transfer that cannot be funded.
    fn stage(&self, transfers: &[Transfer]) -> Result<Staged, EscrowError> {
        let mut staged = Staged::default();
        for t in transfers {
            staged.debit(self, t.from, t.amount)?;
            staged.credit(self, t.to, t.amount)?;
        }
        Ok(staged)
    }

    fn commit(&mut self, staged: Staged) {
        self.wallets.extend(staged.wallets);
        self.vaults.extend(staged.vaults);
        for (address, balance) in staged.records {
            if let Some(stored) = self.records.get_mut(&address) {
                stored.balance = balance;
            }
        }
    }

    fn next_entry(&self, signer: &Identity, outcome: &Outcome) -> Result<JournalEntry, EscrowError> {
        let mut entry = JournalEntry {
            seq: self.journal.len() as u64,
            operation: outcome.operation,
            bet: outcome.bet,
            signer: *signer,
            from: outcome.from,
            to: outcome.to,
            transfers: outcome.transfers.clone(),
            timestamp: Utc::now(),
            prev: self.journal.last().map(|e| e.digest),
            digest: ContentDigest([0; 32]),
        };
        entry.digest = entry.compute_digest()?;
        Ok(entry)
    }
}

/// Balances touched by one invocation. Vault balances only move through
/// [`Vault::deposit`] and [`Vault::withdraw`].
#[derive(Debug, Default)]
struct Staged {
    wallets: BTreeMap<Identity, u64>,
    vaults: BTreeMap<Address, Vault>,
    records: BTreeMap<Address, u64>,
}

impl Staged {
    fn vault(&mut self, base: &LedgerSnapshot, address: Address) -> &mut Vault {
        self.vaults.entry(address).or_insert_with(|| {
            base.vaults
                .get(&address)
                .copied()
                .unwrap_or_else(|| Vault::new(address))
        })
    }

    fn units(&mut self, base: &LedgerSnapshot, account: Account) -> &mut u64 {
        let current = base.balance_of(&account);
        match account {
            Account::Wallet(id) => self.wallets.entry(id).or_insert(current),
            Account::Record(addr) => self.records.entry(addr).or_insert(current),
            Account::Vault(addr) => &mut self.vault(base, addr).balance,
        }
    }

    fn debit(&mut self, base: &LedgerSnapshot, account: Account, amount: u64) -> Result<(), EscrowError> {
        if let Account::Vault(addr) = account {
            return self.vault(base, addr).withdraw(amount);
        }
        let balance = self.units(base, account);
        let available = *balance;
        *balance = available
            .checked_sub(amount)
            .ok_or(EscrowError::InsufficientFunds {
                account,
                needed: amount,
                available,
            })?;
        Ok(())
    }

    fn credit(&mut self, base: &LedgerSnapshot, account: Account, amount: u64) -> Result<(), EscrowError> {
        if let Account::Vault(addr) = account {
            return self.vault(base, addr).deposit(amount);
        }
        let balance = self.units(base, account);
        *balance = balance
            .checked_add(amount)
            .ok_or(EscrowError::ArithmeticOverflow {
                context: "transfer credit",
            })?;
        Ok(())
    }
}

/// The result of a committed invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    /// What the engine decided.
    pub outcome: Outcome,
    /// The journal entry appended for it.
    pub entry: JournalEntry,
}

/// Thread-safe reference ledger.
#[derive(Debug, Default)]
pub struct Ledger {
    state: RwLock<LedgerSnapshot>,
}

impl Ledger {
    /// An empty ledger.
    pub fn new(namespace: Namespace, config: LedgerConfig) -> Self {
        Self::from_snapshot(LedgerSnapshot {
            namespace,
            config,
            ..LedgerSnapshot::default()
        })
    }

    /// Restore a ledger from a snapshot.
    pub fn from_snapshot(snapshot: LedgerSnapshot) -> Self {
        Self {
            state: RwLock::new(snapshot),
        }
    }

    /// A copy of the entire ledger state.
    pub fn snapshot(&self) -> LedgerSnapshot {
        self.state.read().clone()
    }

    /// The derivation namespace.
    pub fn namespace(&self) -> Namespace {
        self.state.read().namespace
    }

    /// The ledger configuration.
    pub fn config(&self) -> LedgerConfig {
        self.state.read().config
    }

    /// Credit `amount` to `to`, returning the new balance.
    ///
    /// # Errors
    ///
    /// Returns [`EscrowError::ArithmeticOverflow`] if the balance would wrap.
    pub fn airdrop(&self, to: &Identity, amount: u64) -> Result<u64, EscrowError> {
        let mut state = self.state.write();
        let current = state.wallets.get(to).copied().unwrap_or(0);
        let balance = current
            .checked_add(amount)
            .ok_or(EscrowError::ArithmeticOverflow { context: "airdrop" })?;
        state.wallets.insert(*to, balance);
        info!(to = %to, amount, balance, "airdrop");
        Ok(balance)
    }

    /// Spendable balance of a participant.
    pub fn balance(&self, id: &Identity) -> u64 {
        self.state.read().balance_of(&Account::Wallet(*id))
    }

    /// Balance of a vault, zero if it does not exist.
    pub fn vault_balance(&self, vault: &Address) -> u64 {
        self.state.read().balance_of(&Account::Vault(*vault))
    }

    /// Storage deposit held by a record, zero if it does not exist.
    pub fn record_balance(&self, bet: &Address) -> u64 {
        self.state.read().balance_of(&Account::Record(*bet))
    }

    /// What is stored at `bet`.
    ///
    /// # Errors
    ///
    /// Returns [`EscrowError::Layout`] if a stored record cannot be decoded.
    pub fn slot(&self, bet: &Address) -> Result<RecordSlot, EscrowError> {
        self.state.read().slot(bet)
    }

    /// The live record at `bet`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`EscrowError::Layout`] if the stored record cannot be decoded.
    pub fn record(&self, bet: &Address) -> Result<Option<BetRecord>, EscrowError> {
        match self.slot(bet)? {
            RecordSlot::Live(record) => Ok(Some(record)),
            RecordSlot::Vacant | RecordSlot::Closed(_) => Ok(None),
        }
    }

    /// Apply `invocation` on behalf of an already authenticated `signer`.
    ///
    /// # Errors
    ///
    /// Returns the engine's rejection, or a staging failure. In both cases
    /// nothing is modified.
    pub fn submit(
        &self,
        signer: &Identity,
        invocation: &Invocation,
    ) -> Result<Receipt, EscrowError> {
        let op = invocation.command.operation();
        let bet = invocation.accounts.bet;
        let mut state = self.state.write();

        let prepared = Self::prepare(&state, signer, invocation);
        let (outcome, staged, entry) = match prepared {
            Ok(p) => p,
            Err(e) => {
                warn!(op = %op, bet = %bet, signer = %signer, kind = e.kind(), error = %e, "invocation rejected");
                return Err(e);
            }
        };

        if !outcome.closed {
            let balance = state.records.get(&bet).map_or(0, |r| r.balance);
            state.records.insert(
                bet,
                StoredRecord {
                    data: outcome.record.encode(),
                    balance,
                },
            );
        }
        state.commit(staged);
        if outcome.closed {
            state.records.remove(&bet);
            state.vaults.remove(&outcome.vault);
            state.closed.insert(bet, outcome.to);
        }
        state.journal.push(entry.clone());

        info!(
            op = %op,
            bet = %bet,
            seq = entry.seq,
            from = ?outcome.from,
            to = %outcome.to,
            closed = outcome.closed,
            "invocation committed"
        );
        Ok(Receipt { outcome, entry })
    }

    fn prepare(
        state: &LedgerSnapshot,
        signer: &Identity,
        invocation: &Invocation,
    ) -> Result<(Outcome, Staged, JournalEntry), EscrowError> {
        let accounts = &invocation.accounts;
        let slot = state.slot(&accounts.bet)?;
        let view = AccountView {
            slot: &slot,
            record_balance: state.balance_of(&Account::Record(accounts.bet)),
            vault_balance: state.balance_of(&Account::Vault(accounts.vault)),
            signer_balance: state.balance_of(&Account::Wallet(*signer)),
        };
        let outcome = engine::apply(&state.namespace, &state.config, &view, signer, invocation)?;
        let mut staged = state.stage(&outcome.transfers)?;
        if outcome.closed {
            let vault_residue = staged.vault(state, outcome.vault).withdraw_all();
            let record_residue = *staged.units(state, Account::Record(outcome.bet));
            if let Some(residue) = [vault_residue, record_residue].into_iter().find(|r| *r != 0) {
                return Err(EscrowError::VaultBalanceMismatch {
                    vault: outcome.vault,
                    expected: 0,
                    actual: residue,
                });
            }
        }
        let entry = state.next_entry(signer, &outcome)?;
        Ok((outcome, staged, entry))
    }

    /// Verify the signature of `signed`, then apply it with the verified
    /// key as signer.
    ///
    /// # Errors
    ///
    /// Returns [`EscrowError::InvalidSignature`] on a bad signature, or any
    /// error [`Ledger::submit`] returns.
    pub fn submit_signed(&self, signed: &SignedInvocation) -> Result<Receipt, EscrowError> {
        let signer = signed.verify().map_err(|e| {
            warn!(signer = %signed.signer, error = %e, "signature rejected");
            e
        })?;
        self.submit(&signer, &signed.invocation)
    }

    /// The journal, oldest first.
    pub fn journal(&self) -> Vec<JournalEntry> {
        self.state.read().journal.clone()
    }

    /// Check every journal digest and the chain linking them.
    ///
    /// # Errors
    ///
    /// Returns [`EscrowError::JournalTampered`] for the first bad entry.
    pub fn verify_journal(&self) -> Result<(), EscrowError> {
        let state = self.state.read();
        let mut prev: Option<ContentDigest> = None;
        for (i, entry) in state.journal.iter().enumerate() {
            let seq = i as u64;
            if entry.seq != seq || entry.prev != prev || entry.compute_digest()? != entry.digest {
                return Err(EscrowError::JournalTampered { seq });
            }
            prev = Some(entry.digest);
        }
        Ok(())
    }

    /// Sum of every balance on the ledger.
    pub fn total_supply(&self) -> u128 {
        let state = self.state.read();
        let wallets: u128 = state.wallets.values().map(|b| u128::from(*b)).sum();
        let vaults: u128 = state.vaults.values().map(|v| u128::from(v.balance)).sum();
        let records: u128 = state.records.values().map(|r| u128::from(r.balance)).sum();
        wallets + vaults + records
    }

    /// Check the vault invariant for every live record and that no vault
    /// outlives its record.
    ///
    /// # Errors
    ///
    /// Returns the first violation found.
    pub fn check_invariants(&self) -> Result<(), EscrowError> {
        let state = self.state.read();
        let mut bound = Vec::with_capacity(state.records.len());
        for (address, stored) in &state.records {
            let record = BetRecord::decode(&stored.data)?;
            let vault = friendstake_core::vault_address_with_bump(
                &state.namespace,
                address,
                record.vault_bump,
            )?;
            check_invariant(&vault, &record, state.balance_of(&Account::Vault(vault)))?;
            bound.push(vault);
        }
        for (address, vault) in &state.vaults {
            if !bound.contains(address) && vault.balance != 0 {
                return Err(EscrowError::VaultBalanceMismatch {
                    vault: *address,
                    expected: 0,
                    actual: vault.balance,
                });
            }
        }
        Ok(())
    }

    pub(crate) fn raw_records(&self) -> Vec<(Address, Vec<u8>)> {
        self.state
            .read()
            .records
            .iter()
            .map(|(address, stored)| (*address, stored.data.clone()))
            .collect()
    }
}
