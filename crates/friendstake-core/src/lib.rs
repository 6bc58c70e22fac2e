//! # friendstake-core: Foundational Types for Friendstake
//!
//! This crate defines the primitives every other crate in the workspace
//! builds on. It depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for keys.** [`Identity`] (a party's public key) and
//!    [`Address`] (a derived account such as a bet record or its vault) are
//!    distinct types over the same 32 bytes. You cannot pass a vault address
//!    where a judge identity is expected.
//!
//! 2. **Deterministic derivation.** Bet and vault addresses are computed by
//!    [`derive`] from a fixed [`Namespace`] and the wager's seeds. Derived
//!    addresses are forced off the Ed25519 curve, so no private key exists
//!    for them and only the escrow engine can move vault funds.
//!
//! 3. **`CanonicalBytes` for anything signed or digested.** Invocation
//!    signatures and journal digests flow through [`CanonicalBytes::new()`].
//!
//! ## Crate Policy
//!
//! - No dependencies on other `friendstake-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod canonical;
pub mod derive;
pub mod digest;
pub mod error;
pub mod identity;
pub mod keys;

// Re-export primary types for ergonomic imports.
pub use canonical::CanonicalBytes;
pub use derive::{
    bet_address, bet_address_with_bump, derive_with_bump, find_address, is_on_curve,
    validate_description, vault_address, vault_address_with_bump, DerivedAddress, Namespace,
    BET_SEED, MAX_DESCRIPTION_LEN, MAX_SEED_LEN, VAULT_SEED,
};
pub use digest::{sha256_digest, ContentDigest};
pub use error::{CanonicalizationError, CryptoError, DerivationError, ValidationError};
pub use identity::{Address, Identity};
pub use keys::{verify, Keypair, Signature};
