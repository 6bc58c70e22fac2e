//! # Commands and Invocations
//!
//! A tagged command type routed through the single transition function in
//! [`crate::engine`]. An [`Invocation`] pairs a command with the accounts
//! it names; a [`SignedInvocation`] adds an Ed25519 signature over the
//! invocation's canonical bytes.

use serde::{Deserialize, Serialize};

use friendstake_core::{verify, Address, CanonicalBytes, Identity, Keypair, Signature};

use crate::error::EscrowError;
use crate::record::Winner;

/// Operation kinds, for logs, errors and the journal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Create the record and vault; maker deposits.
    Make,
    /// Maker withdraws an untaken wager.
    Cancel,
    /// Opponent deposits.
    Take,
    /// Opponent rejects an untaken wager.
    Decline,
    /// Judge pays the whole vault to one side.
    Settle,
    /// Judge returns each party's own deposit.
    Refund,
}

impl Operation {
    /// Lower-case label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Make => "make",
            Self::Cancel => "cancel",
            Self::Take => "take",
            Self::Decline => "decline",
            Self::Settle => "settle",
            Self::Refund => "refund",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The side a judge can award the vault to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    /// The maker.
    Maker,
    /// The opponent.
    Taker,
}

impl Side {
    /// Decode a wire winner code: `0` is a refund (`None`), `1` the maker
    /// and `2` the taker.
    ///
    /// # Errors
    ///
    /// Returns [`EscrowError::InvalidWinnerArgument`] for any other code.
    pub fn from_code(code: u8) -> Result<Option<Self>, EscrowError> {
        match code {
            0 => Ok(None),
            1 => Ok(Some(Self::Maker)),
            2 => Ok(Some(Self::Taker)),
            _ => Err(EscrowError::InvalidWinnerArgument { code }),
        }
    }

    /// The wire code of this side.
    pub fn code(self) -> u8 {
        match self {
            Self::Maker => 1,
            Self::Taker => 2,
        }
    }
}

impl From<Side> for Winner {
    fn from(side: Side) -> Self {
        match side {
            Side::Maker => Winner::Maker,
            Side::Taker => Winner::Taker,
        }
    }
}

/// A protocol command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Command {
    /// Open a wager of `amount` per party.
    Make {
        /// Free text, at most 32 bytes.
        description: String,
        /// Per-party stake in native units.
        amount: u64,
    },
    /// Withdraw an untaken wager (maker).
    Cancel,
    /// Match the maker's stake (opponent).
    Take,
    /// Reject an untaken wager (opponent).
    Decline,
    /// Settle with a wire winner code (judge). Decoded only after the
    /// signer is authorized; see [`Side::from_code`].
    Settle {
        /// `0` refund, `1` maker, `2` taker.
        winner: u8,
    },
    /// Return each party's own deposit (judge).
    Refund,
}

impl Command {
    /// Settle in favour of `side`.
    pub fn settle(side: Side) -> Self {
        Self::Settle {
            winner: side.code(),
        }
    }

    /// The operation kind.
    pub fn operation(&self) -> Operation {
        match self {
            Self::Make { .. } => Operation::Make,
            Self::Cancel => Operation::Cancel,
            Self::Take => Operation::Take,
            Self::Decline => Operation::Decline,
            Self::Settle { winner: 0 } | Self::Refund => Operation::Refund,
            Self::Settle { .. } => Operation::Settle,
        }
    }
}

/// The accounts every operation names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Accounts {
    /// Maker identity.
    pub maker: Identity,
    /// Opponent identity.
    pub opponent: Identity,
    /// Judge identity.
    pub judge: Identity,
    /// Bet record address.
    pub bet: Address,
    /// Vault address.
    pub vault: Address,
}

/// A command together with the accounts it operates on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invocation {
    /// Named accounts.
    pub accounts: Accounts,
    /// The command.
    pub command: Command,
}

impl Invocation {
    /// Canonical bytes signed by the caller.
    ///
    /// # Errors
    ///
    /// Returns [`EscrowError::Canonicalization`] if serialization fails.
    pub fn canonical_bytes(&self) -> Result<CanonicalBytes, EscrowError> {
        Ok(CanonicalBytes::new(self)?)
    }
}

/// An invocation authenticated by its signer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedInvocation {
    /// The signed invocation.
    pub invocation: Invocation,
    /// Public key of the signer.
    pub signer: Identity,
    /// Ed25519 signature over [`Invocation::canonical_bytes`].
    pub signature: Signature,
}

impl SignedInvocation {
    /// Sign `invocation` with `keypair`.
    ///
    /// # Errors
    ///
    /// Returns [`EscrowError::Canonicalization`] if serialization fails.
    pub fn sign(keypair: &Keypair, invocation: Invocation) -> Result<Self, EscrowError> {
        let signature = keypair.sign(&invocation.canonical_bytes()?);
        Ok(Self {
            invocation,
            signer: keypair.identity(),
            signature,
        })
    }

    /// Check the signature, returning the authenticated signer.
    ///
    /// # Errors
    ///
    /// Returns [`EscrowError::InvalidSignature`] if verification fails.
    pub fn verify(&self) -> Result<Identity, EscrowError> {
        verify(
            &self.signer,
            &self.invocation.canonical_bytes()?,
            &self.signature,
        )?;
        Ok(self.signer)
    }
}
