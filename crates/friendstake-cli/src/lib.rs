//! # friendstake-cli: Command-Line Interface for Friendstake
//!
//! Provides the `friendstake` binary. Every command works against a local
//! ledger snapshot and keystore under the configured state directory
//! (`.friendstake/` by default).
//!
//! ## Subcommands
//!
//! - `friendstake keygen`: Ed25519 keypair generation.
//! - `friendstake address`: Bet record and vault address derivation.
//! - `friendstake airdrop` / `balance`: Local faucet and balance lookup.
//! - `friendstake make` / `cancel` / `take` / `decline` / `settle`: Wager
//!   operations, signed with a keystore key.
//! - `friendstake show` / `list`: Record inspection and role-filtered
//!   listing.
//!
//! ```bash
//! friendstake keygen --name alice
//! friendstake airdrop --to alice --amount 5000000
//! friendstake make --key alice --opponent bob --judge carol \
//!     --description "derby" --amount 1000000
//! friendstake settle --bet <address> --key carol --winner 1
//! ```

pub mod account;
pub mod address;
pub mod bet;
pub mod config;
pub mod keys;
pub mod store;
