//! # Escrow Vault and Fund Movement
//!
//! A vault is bound one-to-one to a bet record and holds only the two
//! stakes. While the record is live its balance is exactly `amount` (maker
//! deposited) or `2 × amount` (both deposited). Every terminal transition
//! drains it to zero and closes it.

use serde::{Deserialize, Serialize};

use friendstake_core::{Address, Identity};

use crate::error::EscrowError;
use crate::record::BetRecord;

/// A balance-holding account touched by a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "key", rename_all = "snake_case")]
pub enum Account {
    /// A participant's spendable balance.
    Wallet(Identity),
    /// A bet's escrow vault.
    Vault(Address),
    /// The storage deposit held by a bet record.
    Record(Address),
}

impl std::fmt::Display for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Wallet(id) => write!(f, "wallet {id}"),
            Self::Vault(addr) => write!(f, "vault {addr}"),
            Self::Record(addr) => write!(f, "record {addr}"),
        }
    }
}

/// One movement of native units between two accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    /// Debited account.
    pub from: Account,
    /// Credited account.
    pub to: Account,
    /// Native units moved.
    pub amount: u64,
}

/// A vault account and its balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vault {
    /// Derived vault address.
    pub address: Address,
    /// Native units held.
    pub balance: u64,
}

impl Vault {
    /// An empty vault.
    pub fn new(address: Address) -> Self {
        Self {
            address,
            balance: 0,
        }
    }

    /// Credit the vault.
    ///
    /// # Errors
    ///
    /// Returns [`EscrowError::ArithmeticOverflow`] if the balance would wrap.
    pub fn deposit(&mut self, amount: u64) -> Result<(), EscrowError> {
        self.balance = self
            .balance
            .checked_add(amount)
            .ok_or(EscrowError::ArithmeticOverflow {
                context: "vault deposit",
            })?;
        Ok(())
    }

    /// Debit the vault.
    ///
    /// # Errors
    ///
    /// Returns [`EscrowError::InsufficientFunds`] if `amount` exceeds the
    /// balance.
    pub fn withdraw(&mut self, amount: u64) -> Result<(), EscrowError> {
        self.balance = self
            .balance
            .checked_sub(amount)
            .ok_or(EscrowError::InsufficientFunds {
                account: Account::Vault(self.address),
                needed: amount,
                available: self.balance,
            })?;
        Ok(())
    }

    /// Drain the vault, returning what it held.
    pub fn withdraw_all(&mut self) -> u64 {
        std::mem::take(&mut self.balance)
    }
}

/// The only legal vault balance for a live record.
///
/// # Errors
///
/// Returns [`EscrowError::ArithmeticOverflow`] if `2 × amount` exceeds
/// `u64::MAX`.
pub fn expected_balance(amount: u64, players_deposited: bool) -> Result<u64, EscrowError> {
    if players_deposited {
        amount.checked_mul(2).ok_or(EscrowError::ArithmeticOverflow {
            context: "both stakes",
        })
    } else {
        Ok(amount)
    }
}

/// Check that `balance` is exactly what `record` implies.
///
/// # Errors
///
/// Returns [`EscrowError::VaultBalanceMismatch`] otherwise.
pub fn check_invariant(
    vault: &Address,
    record: &BetRecord,
    balance: u64,
) -> Result<(), EscrowError> {
    let expected = expected_balance(record.amount, record.players_deposited)?;
    if balance != expected {
        return Err(EscrowError::VaultBalanceMismatch {
            vault: *vault,
            expected,
            actual: balance,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(amount: u64, deposited: bool) -> BetRecord {
        let mut r = BetRecord::open(
            Identity::from_bytes([1; 32]),
            Identity::from_bytes([2; 32]),
            Identity::from_bytes([3; 32]),
            amount,
            "x".into(),
            255,
            255,
        );
        r.players_deposited = deposited;
        r
    }

    #[test]
    fn expected_balance_per_flag() {
        assert_eq!(expected_balance(7, false).unwrap(), 7);
        assert_eq!(expected_balance(7, true).unwrap(), 14);
        assert!(matches!(
            expected_balance(u64::MAX, true),
            Err(EscrowError::ArithmeticOverflow { .. })
        ));
    }

    #[test]
    fn invariant_holds_and_breaks() {
        let addr = Address::from_bytes([9; 32]);
        assert!(check_invariant(&addr, &record(5, false), 5).is_ok());
        assert!(check_invariant(&addr, &record(5, true), 10).is_ok());
        match check_invariant(&addr, &record(5, true), 5) {
            Err(EscrowError::VaultBalanceMismatch {
                expected, actual, ..
            }) => {
                assert_eq!((expected, actual), (10, 5));
            }
            other => panic!("expected VaultBalanceMismatch, got {other:?}"),
        }
    }

    #[test]
    fn deposit_withdraw() {
        let mut vault = Vault::new(Address::from_bytes([9; 32]));
        vault.deposit(10).unwrap();
        vault.withdraw(4).unwrap();
        assert_eq!(vault.balance, 6);
        assert!(vault.withdraw(7).is_err());
        assert_eq!(vault.balance, 6);
        assert_eq!(vault.withdraw_all(), 6);
        assert_eq!(vault.balance, 0);
    }

    #[test]
    fn deposit_overflow_rejected() {
        let mut vault = Vault::new(Address::from_bytes([9; 32]));
        vault.deposit(u64::MAX).unwrap();
        assert!(vault.deposit(1).is_err());
        assert_eq!(vault.balance, u64::MAX);
    }

    #[test]
    fn account_serializes_tagged() {
        let json = serde_json::to_value(Account::Wallet(Identity::from_bytes([1; 32]))).unwrap();
        assert_eq!(json["kind"], "wallet");
        assert_eq!(json["key"], "01".repeat(32));
    }
}
