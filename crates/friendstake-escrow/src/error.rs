//! # Escrow Errors
//!
//! Every rejection the engine or the ledger can produce. A rejected
//! operation never mutates anything, so each variant describes a call that
//! left the ledger exactly as it found it.

use thiserror::Error;

use friendstake_core::{
    Address, CanonicalizationError, CryptoError, DerivationError, Identity, ValidationError,
};

use crate::command::Operation;
use crate::record::BetState;
use crate::vault::Account;

/// Errors produced while validating or applying an escrow operation.
#[derive(Error, Debug)]
pub enum EscrowError {
    /// The signer does not hold the role the operation requires, or a
    /// supplied role identity differs from the one stored in the record.
    #[error("{operation} requires the {role} {expected}, got {actual}")]
    Unauthorized {
        /// The rejected operation.
        operation: Operation,
        /// Role that must sign or be supplied ("maker", "opponent", "judge").
        role: &'static str,
        /// Identity stored for that role.
        expected: Identity,
        /// Identity that was presented.
        actual: Identity,
    },

    /// The record is not in a state that permits the operation.
    #[error("{operation} is not allowed on bet {address} in state {state}")]
    InvalidState {
        /// The rejected operation.
        operation: Operation,
        /// The bet record address.
        address: Address,
        /// The state the record is in (or was closed in).
        state: BetState,
    },

    /// The opponent has already funded the vault.
    #[error("{operation} rejected: the taker has already deposited into bet {address}")]
    TakerAlreadyDeposited {
        /// The rejected operation.
        operation: Operation,
        /// The bet record address.
        address: Address,
    },

    /// Settlement with a winner requires both stakes in the vault.
    #[error("bet {address} cannot be settled before both players have deposited")]
    PlayersNotDeposited {
        /// The bet record address.
        address: Address,
    },

    /// A wire-level winner code outside `0..=2`.
    #[error("invalid winner code {code}: expected 0 (refund), 1 (maker) or 2 (taker)")]
    InvalidWinnerArgument {
        /// The rejected code.
        code: u8,
    },

    /// A supplied address does not match its deterministic derivation.
    #[error("{account} address mismatch: expected {expected}, got {supplied}")]
    AddressDerivationMismatch {
        /// Which account was checked ("bet" or "vault").
        account: &'static str,
        /// The address derived from the seeds.
        expected: Address,
        /// The address supplied by the caller.
        supplied: Address,
    },

    /// No live record exists at the address.
    #[error("{operation} rejected: no bet record at {address}")]
    RecordNotFound {
        /// The rejected operation.
        operation: Operation,
        /// The address looked up.
        address: Address,
    },

    /// The wager description exceeds the seed limit.
    #[error("description is {len} bytes; at most {max} bytes are allowed")]
    DescriptionTooLong {
        /// Length in bytes.
        len: usize,
        /// Maximum allowed.
        max: usize,
    },

    /// A debit exceeds the payer's balance.
    #[error("insufficient funds in {account}: need {needed}, have {available}")]
    InsufficientFunds {
        /// The account being debited.
        account: Account,
        /// Amount required.
        needed: u64,
        /// Amount held.
        available: u64,
    },

    /// The vault does not hold the balance implied by the record.
    #[error("vault {vault} holds {actual}, expected {expected}")]
    VaultBalanceMismatch {
        /// The vault address.
        vault: Address,
        /// Balance implied by the record's amount and deposit flag.
        expected: u64,
        /// Balance actually held.
        actual: u64,
    },

    /// Checked arithmetic overflowed.
    #[error("arithmetic overflow computing {context}")]
    ArithmeticOverflow {
        /// What was being computed.
        context: &'static str,
    },

    /// A signed invocation failed verification.
    #[error("invalid invocation signature: {0}")]
    InvalidSignature(#[from] CryptoError),

    /// A stored record could not be decoded.
    #[error("record layout: {0}")]
    Layout(#[from] LayoutError),

    /// An invocation or journal entry could not be canonicalized.
    #[error("canonicalization failed: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// Address derivation failed outright.
    #[error("address derivation failed: {0}")]
    Derivation(#[from] DerivationError),

    /// A journal entry's digest does not match its contents.
    #[error("journal entry {seq} has been altered: digest mismatch")]
    JournalTampered {
        /// Sequence number of the first bad entry.
        seq: u64,
    },
}

impl From<ValidationError> for EscrowError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::DescriptionTooLong { len, max } => {
                Self::DescriptionTooLong { len, max }
            }
            ValidationError::InvalidHex { .. } => Self::Layout(LayoutError::Malformed {
                reason: err.to_string(),
            }),
        }
    }
}

/// Errors decoding the serialized bet record layout.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    /// The leading eight bytes are not the bet record tag.
    #[error("account data is not a bet record (tag mismatch)")]
    WrongTag,

    /// Input ended before a field could be read.
    #[error("truncated record: need {needed} bytes at offset {offset}, have {available}")]
    Truncated {
        /// Offset of the field being read.
        offset: usize,
        /// Bytes the field needs.
        needed: usize,
        /// Bytes remaining.
        available: usize,
    },

    /// An enum byte outside its known range.
    #[error("invalid {field} discriminant {value}")]
    InvalidDiscriminant {
        /// Field name.
        field: &'static str,
        /// The byte read.
        value: u8,
    },

    /// A boolean byte other than 0 or 1.
    #[error("invalid boolean byte {value} for {field}")]
    InvalidBool {
        /// Field name.
        field: &'static str,
        /// The byte read.
        value: u8,
    },

    /// The stored description length exceeds the limit.
    #[error("stored description is {len} bytes; at most {max} are allowed")]
    DescriptionTooLong {
        /// Declared length.
        len: usize,
        /// Maximum allowed.
        max: usize,
    },

    /// The stored description is not UTF-8.
    #[error("stored description is not valid UTF-8")]
    InvalidUtf8,

    /// Any other malformed input.
    #[error("malformed record: {reason}")]
    Malformed {
        /// Description of the problem.
        reason: String,
    },
}

impl EscrowError {
    /// Short machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unauthorized { .. } => "Unauthorized",
            Self::InvalidState { .. } => "InvalidState",
            Self::TakerAlreadyDeposited { .. } => "TakerAlreadyDeposited",
            Self::PlayersNotDeposited { .. } => "PlayersNotDeposited",
            Self::InvalidWinnerArgument { .. } => "InvalidWinnerArgument",
            Self::AddressDerivationMismatch { .. } => "AddressDerivationMismatch",
            Self::RecordNotFound { .. } => "RecordNotFound",
            Self::DescriptionTooLong { .. } => "DescriptionTooLong",
            Self::InsufficientFunds { .. } => "InsufficientFunds",
            Self::VaultBalanceMismatch { .. } => "VaultBalanceMismatch",
            Self::ArithmeticOverflow { .. } => "ArithmeticOverflow",
            Self::InvalidSignature(_) => "InvalidSignature",
            Self::Layout(_) => "Layout",
            Self::Canonicalization(_) => "Canonicalization",
            Self::Derivation(_) => "Derivation",
            Self::JournalTampered { .. } => "JournalTampered",
        }
    }
}
