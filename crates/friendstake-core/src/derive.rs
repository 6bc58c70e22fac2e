//! # Deterministic Address Derivation
//!
//! Bet record and vault addresses are pure functions of a fixed
//! [`Namespace`] and a list of seeds. Clients derive them off-engine and hand
//! them in with every invocation; the engine re-derives and compares.
//!
//! ## Scheme
//!
//! ```text
//! for bump in 255 ..= 0:
//!     h = SHA-256(seed_1 || ... || seed_n || [bump] || namespace || "ProgramDerivedAddress")
//!     if h is not a valid Ed25519 point: return (h, bump)
//! ```
//!
//! - Record: seeds `["bet", maker, opponent, judge, description]`.
//! - Vault: seeds `["vault", record_address]`.
//!
//! Every seed is at most [`MAX_SEED_LEN`] bytes, which caps a wager
//! description at [`MAX_DESCRIPTION_LEN`] bytes. Two wagers between the same
//! three parties collide unless their descriptions differ.
//!
//! ## Security Invariant
//!
//! A derived address never decompresses to an Ed25519 point, so nobody holds
//! a signing key for it. Funds in a vault move only through the escrow
//! engine.

use ed25519_dalek::VerifyingKey;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{DerivationError, ValidationError};
use crate::identity::{Address, Identity};

/// Maximum length of a single derivation seed.
pub const MAX_SEED_LEN: usize = 32;

/// Maximum number of seeds, counting the bump.
pub const MAX_SEEDS: usize = 16;

/// Maximum wager description length in bytes.
pub const MAX_DESCRIPTION_LEN: usize = MAX_SEED_LEN;

/// Leading seed of every bet record address.
pub const BET_SEED: &[u8] = b"bet";

/// Leading seed of every vault address.
pub const VAULT_SEED: &[u8] = b"vault";

/// Label hashed into the default namespace.
pub const DEFAULT_NAMESPACE_LABEL: &str = "friendstake:peer-to-peer-betting";

const PDA_MARKER: &[u8] = b"ProgramDerivedAddress";

/// The fixed 32-byte tag that scopes every derivation.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Namespace(Address);

impl Namespace {
    /// Namespace whose tag is `SHA-256(label)`.
    pub fn from_label(label: &str) -> Self {
        let hash = Sha256::digest(label.as_bytes());
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&hash);
        Self(Address::from_bytes(bytes))
    }

    /// Namespace from a raw tag.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(Address::from_bytes(bytes))
    }

    /// The raw tag.
    pub fn as_bytes(&self) -> &[u8; 32] {
        self.0.as_bytes()
    }
}

impl Default for Namespace {
    fn default() -> Self {
        Self::from_label(DEFAULT_NAMESPACE_LABEL)
    }
}

impl std::fmt::Debug for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Namespace({})", self.0)
    }
}

/// A derived address together with the bump that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DerivedAddress {
    /// The off-curve address.
    pub address: Address,
    /// The bump appended to the seeds.
    pub bump: u8,
}

/// Reject descriptions that cannot be used as a derivation seed.
///
/// # Errors
///
/// Returns [`ValidationError::DescriptionTooLong`] above
/// [`MAX_DESCRIPTION_LEN`] bytes.
pub fn validate_description(description: &str) -> Result<(), ValidationError> {
    if description.len() > MAX_DESCRIPTION_LEN {
        return Err(ValidationError::DescriptionTooLong {
            len: description.len(),
            max: MAX_DESCRIPTION_LEN,
        });
    }
    Ok(())
}

/// Whether 32 bytes decompress to a point on the Ed25519 curve.
pub fn is_on_curve(bytes: &[u8; 32]) -> bool {
    VerifyingKey::from_bytes(bytes).is_ok()
}

fn check_seeds(seeds: &[&[u8]]) -> Result<(), DerivationError> {
    if seeds.len() + 1 > MAX_SEEDS {
        return Err(DerivationError::TooManySeeds {
            count: seeds.len(),
            max: MAX_SEEDS - 1,
        });
    }
    for (index, seed) in seeds.iter().enumerate() {
        if seed.len() > MAX_SEED_LEN {
            return Err(DerivationError::SeedTooLong {
                index,
                len: seed.len(),
                max: MAX_SEED_LEN,
            });
        }
    }
    Ok(())
}

/// Derive the address for `seeds` with a known bump.
///
/// # Errors
///
/// Returns [`DerivationError::OnCurve`] if this bump lands on the curve, or
/// a seed-shape error.
pub fn derive_with_bump(
    namespace: &Namespace,
    seeds: &[&[u8]],
    bump: u8,
) -> Result<Address, DerivationError> {
    check_seeds(seeds)?;
    let mut hasher = Sha256::new();
    for seed in seeds {
        hasher.update(seed);
    }
    hasher.update([bump]);
    hasher.update(namespace.as_bytes());
    hasher.update(PDA_MARKER);
    let hash = hasher.finalize();
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&hash);
    if is_on_curve(&bytes) {
        return Err(DerivationError::OnCurve { bump });
    }
    Ok(Address::from_bytes(bytes))
}

/// Search bumps from 255 downward for the first off-curve address.
///
/// # Errors
///
/// Returns a seed-shape error, or [`DerivationError::NoViableBump`].
pub fn find_address(
    namespace: &Namespace,
    seeds: &[&[u8]],
) -> Result<DerivedAddress, DerivationError> {
    check_seeds(seeds)?;
    for bump in (0..=u8::MAX).rev() {
        match derive_with_bump(namespace, seeds, bump) {
            Ok(address) => return Ok(DerivedAddress { address, bump }),
            Err(DerivationError::OnCurve { .. }) => continue,
            Err(e) => return Err(e),
        }
    }
    Err(DerivationError::NoViableBump)
}

/// Derive a bet record address.
pub fn bet_address(
    namespace: &Namespace,
    maker: &Identity,
    opponent: &Identity,
    judge: &Identity,
    description: &str,
) -> Result<DerivedAddress, DerivationError> {
    find_address(
        namespace,
        &[
            BET_SEED,
            maker.as_bytes(),
            opponent.as_bytes(),
            judge.as_bytes(),
            description.as_bytes(),
        ],
    )
}

/// Re-derive a bet record address from its stored bump.
pub fn bet_address_with_bump(
    namespace: &Namespace,
    maker: &Identity,
    opponent: &Identity,
    judge: &Identity,
    description: &str,
    bump: u8,
) -> Result<Address, DerivationError> {
    derive_with_bump(
        namespace,
        &[
            BET_SEED,
            maker.as_bytes(),
            opponent.as_bytes(),
            judge.as_bytes(),
            description.as_bytes(),
        ],
        bump,
    )
}

/// Derive the vault address bound to a bet record.
pub fn vault_address(
    namespace: &Namespace,
    bet: &Address,
) -> Result<DerivedAddress, DerivationError> {
    find_address(namespace, &[VAULT_SEED, bet.as_bytes()])
}

/// Re-derive a vault address from its stored bump.
pub fn vault_address_with_bump(
    namespace: &Namespace,
    bet: &Address,
    bump: u8,
) -> Result<Address, DerivationError> {
    derive_with_bump(namespace, &[VAULT_SEED, bet.as_bytes()], bump)
}
