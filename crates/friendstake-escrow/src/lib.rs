//! # friendstake-escrow: Wager Escrow Protocol
//!
//! Two parties stake equal amounts on an outcome, a judge they both trust
//! arbitrates, and the stakes are paid out or returned.
//!
//! - [`record`]: the bet record, its lifecycle states and byte layout.
//! - [`vault`]: the escrow vault and its balance invariant.
//! - [`command`]: commands, invocations and signed invocations.
//! - [`engine`]: the pure transition function.
//! - [`ledger`]: an in-memory execution environment that applies
//!   invocations atomically and journals them.
//! - [`query`]: offset filters over serialized records.
//!
//! ## Invariants
//!
//! - A vault holds exactly `amount` or `2 × amount` while its record is
//!   live and is drained and closed in the same step as the record.
//! - Each transition is authorized by exactly one role: maker for
//!   `Make`/`Cancel`, opponent for `Take`/`Decline`, judge for
//!   `Settle`/`Refund`.
//! - A rejected invocation changes nothing.
//! - Record addresses are single-use.

pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod query;
pub mod record;
pub mod vault;

pub use command::{Accounts, Command, Invocation, Operation, Side, SignedInvocation};
pub use config::{ConfigError, LedgerConfig, DEFAULT_RECORD_DEPOSIT};
pub use engine::{apply, AccountView, Outcome, RecordSlot};
pub use error::{EscrowError, LayoutError};
pub use ledger::{JournalEntry, Ledger, LedgerSnapshot, Receipt, StoredRecord};
pub use query::RecordFilter;
pub use record::{BetRecord, BetState, Winner, RECORD_SPACE};
pub use vault::{Account, Transfer, Vault};
