//! # Bet Record
//!
//! One record per wager, stored at the address derived from
//! `(maker, opponent, judge, description)`.
//!
//! ## Lifecycle
//!
//! ```text
//! (none) ──Make──▶ Open ──Take──▶ Accepted ──Settle/Refund──▶ Settled
//!                   │  └──Refund──────────────────────────────▶ Settled
//!                   └──Cancel/Decline──▶ Cancelled
//! ```
//!
//! `Cancelled` and `Settled` are terminal. The record and its vault are
//! closed in the same step that enters them.
//!
//! ## Layout
//!
//! Records are stored as a fixed-size byte buffer so that external indexers
//! can filter on role identities by offset:
//!
//! | Offset | Size | Field |
//! |---|---|---|
//! | 0 | 8 | tag, `SHA-256("account:Bet")[..8]` |
//! | 8 | 32 | maker |
//! | 40 | 32 | opponent |
//! | 72 | 32 | judge |
//! | 104 | 8 | amount, u64 LE |
//! | 112 | 4 + n | description, u32 LE length then bytes |
//! | .. | 1 each | state, winner, players_deposited, bump, vault_bump |
//!
//! The buffer is zero-padded to [`RECORD_SPACE`].

use serde::{Deserialize, Serialize};

use friendstake_core::{Identity, MAX_DESCRIPTION_LEN};

use crate::error::LayoutError;

/// First eight bytes of `SHA-256("account:Bet")`.
pub const RECORD_TAG: [u8; 8] = [147, 23, 35, 59, 15, 75, 155, 32];

/// Offset of the maker identity.
pub const MAKER_OFFSET: usize = 8;
/// Offset of the opponent identity.
pub const OPPONENT_OFFSET: usize = 40;
/// Offset of the judge identity.
pub const JUDGE_OFFSET: usize = 72;
/// Offset of the per-party amount.
pub const AMOUNT_OFFSET: usize = 104;
/// Offset of the description length prefix.
pub const DESCRIPTION_OFFSET: usize = 112;

/// Allocated size of a record buffer.
pub const RECORD_SPACE: usize = 8 + 32 + 32 + 32 + 8 + (4 + MAX_DESCRIPTION_LEN) + 1 + 1 + 1 + 1 + 1;

// ─── State ───────────────────────────────────────────────────────────

/// Lifecycle state of a bet record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BetState {
    /// Made and funded by the maker, awaiting the opponent.
    Open,
    /// Both parties have deposited.
    Accepted,
    /// Cancelled by the maker or declined by the opponent (terminal).
    Cancelled,
    /// Paid out by the judge (terminal).
    Settled,
}

impl BetState {
    /// Whether this state is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Settled)
    }

    /// Upper-case label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::Accepted => "ACCEPTED",
            Self::Cancelled => "CANCELLED",
            Self::Settled => "SETTLED",
        }
    }

    fn to_byte(self) -> u8 {
        match self {
            Self::Open => 0,
            Self::Accepted => 1,
            Self::Cancelled => 2,
            Self::Settled => 3,
        }
    }

    fn from_byte(value: u8) -> Result<Self, LayoutError> {
        match value {
            0 => Ok(Self::Open),
            1 => Ok(Self::Accepted),
            2 => Ok(Self::Cancelled),
            3 => Ok(Self::Settled),
            _ => Err(LayoutError::InvalidDiscriminant {
                field: "state",
                value,
            }),
        }
    }
}

impl std::fmt::Display for BetState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome recorded by the judge. Meaningful once the record is `Settled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Winner {
    /// No winner: unsettled, or refunded.
    #[default]
    None,
    /// The maker took the whole vault.
    Maker,
    /// The opponent took the whole vault.
    Taker,
}

impl Winner {
    fn to_byte(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Maker => 1,
            Self::Taker => 2,
        }
    }

    fn from_byte(value: u8) -> Result<Self, LayoutError> {
        match value {
            0 => Ok(Self::None),
            1 => Ok(Self::Maker),
            2 => Ok(Self::Taker),
            _ => Err(LayoutError::InvalidDiscriminant {
                field: "winner",
                value,
            }),
        }
    }
}

impl std::fmt::Display for Winner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::None => "none",
            Self::Maker => "maker",
            Self::Taker => "taker",
        })
    }
}

// ─── Record ──────────────────────────────────────────────────────────

/// The persistent terms and lifecycle state of one wager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BetRecord {
    /// Wager creator and first depositor.
    pub maker: Identity,
    /// Counterparty who may take or decline.
    pub opponent: Identity,
    /// Arbiter with exclusive authority to settle.
    pub judge: Identity,
    /// Per-party stake in native units.
    pub amount: u64,
    /// Free text, part of the record's address.
    pub description: String,
    /// Lifecycle state.
    pub state: BetState,
    /// Settlement outcome.
    pub winner: Winner,
    /// Whether both parties have funded the vault.
    pub players_deposited: bool,
    /// Bump of the record address.
    pub bump: u8,
    /// Bump of the vault address.
    pub vault_bump: u8,
}

impl BetRecord {
    /// A freshly made record in `Open`.
    pub fn open(
        maker: Identity,
        opponent: Identity,
        judge: Identity,
        amount: u64,
        description: String,
        bump: u8,
        vault_bump: u8,
    ) -> Self {
        Self {
            maker,
            opponent,
            judge,
            amount,
            description,
            state: BetState::Open,
            winner: Winner::None,
            players_deposited: false,
            bump,
            vault_bump,
        }
    }

    /// Serialize into a zero-padded [`RECORD_SPACE`] buffer.
    ///
    /// Descriptions are validated before a record is ever built, so the
    /// buffer never has to grow; a longer one is still written in full.
    pub fn encode(&self) -> Vec<u8> {
        let desc = self.description.as_bytes();
        let mut buf = Vec::with_capacity(RECORD_SPACE);
        buf.extend_from_slice(&RECORD_TAG);
        buf.extend_from_slice(self.maker.as_bytes());
        buf.extend_from_slice(self.opponent.as_bytes());
        buf.extend_from_slice(self.judge.as_bytes());
        buf.extend_from_slice(&self.amount.to_le_bytes());
        buf.extend_from_slice(&(desc.len() as u32).to_le_bytes());
        buf.extend_from_slice(desc);
        buf.push(self.state.to_byte());
        buf.push(self.winner.to_byte());
        buf.push(u8::from(self.players_deposited));
        buf.push(self.bump);
        buf.push(self.vault_bump);
        if buf.len() < RECORD_SPACE {
            buf.resize(RECORD_SPACE, 0);
        }
        buf
    }

    /// Parse a record buffer. Trailing padding is ignored.
    ///
    /// # Errors
    ///
    /// Returns a [`LayoutError`] for a wrong tag, truncated input, unknown
    /// enum bytes, a non-boolean flag, or a bad description.
    pub fn decode(data: &[u8]) -> Result<Self, LayoutError> {
        let mut r = Reader { data, pos: 0 };
        if r.take(8)? != RECORD_TAG {
            return Err(LayoutError::WrongTag);
        }
        let maker = r.identity()?;
        let opponent = r.identity()?;
        let judge = r.identity()?;
        let amount = u64::from_le_bytes(r.array::<8>()?);
        let len = u32::from_le_bytes(r.array::<4>()?) as usize;
        if len > MAX_DESCRIPTION_LEN {
            return Err(LayoutError::DescriptionTooLong {
                len,
                max: MAX_DESCRIPTION_LEN,
            });
        }
        let description = std::str::from_utf8(r.take(len)?)
            .map_err(|_| LayoutError::InvalidUtf8)?
            .to_string();
        let state = BetState::from_byte(r.byte()?)?;
        let winner = Winner::from_byte(r.byte()?)?;
        let players_deposited = match r.byte()? {
            0 => false,
            1 => true,
            value => {
                return Err(LayoutError::InvalidBool {
                    field: "players_deposited",
                    value,
                })
            }
        };
        let bump = r.byte()?;
        let vault_bump = r.byte()?;
        Ok(Self {
            maker,
            opponent,
            judge,
            amount,
            description,
            state,
            winner,
            players_deposited,
            bump,
            vault_bump,
        })
    }
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], LayoutError> {
        let available = self.data.len().saturating_sub(self.pos);
        if available < n {
            return Err(LayoutError::Truncated {
                offset: self.pos,
                needed: n,
                available,
            });
        }
        let out = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], LayoutError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn byte(&mut self) -> Result<u8, LayoutError> {
        Ok(self.take(1)?[0])
    }

    fn identity(&mut self) -> Result<Identity, LayoutError> {
        Ok(Identity::from_bytes(self.array::<32>()?))
    }
}
