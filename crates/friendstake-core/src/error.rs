//! # Error Hierarchy
//!
//! Structured error types for the foundational layer, built with
//! `thiserror`. Each variant carries the offending input and the expected
//! shape so callers can surface it verbatim.

use thiserror::Error;

/// Validation errors for key newtypes and wager terms.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A hex-encoded key could not be parsed.
    #[error("invalid {kind} hex \"{value}\": {reason}")]
    InvalidHex {
        /// The kind of value being parsed ("identity", "address", ...).
        kind: &'static str,
        /// The rejected input.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Wager description exceeds the derivation seed limit.
    #[error("description is {len} bytes; at most {max} bytes are allowed")]
    DescriptionTooLong {
        /// Length of the rejected description in bytes.
        len: usize,
        /// Maximum allowed length in bytes.
        max: usize,
    },
}

/// Errors from deterministic address derivation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DerivationError {
    /// A single seed is longer than [`MAX_SEED_LEN`](crate::MAX_SEED_LEN).
    #[error("derivation seed {index} is {len} bytes; at most {max} bytes are allowed")]
    SeedTooLong {
        /// Position of the seed in the seed list.
        index: usize,
        /// Length of the seed.
        len: usize,
        /// Maximum allowed length.
        max: usize,
    },

    /// More seeds than the derivation scheme accepts.
    #[error("{count} derivation seeds supplied; at most {max} are allowed")]
    TooManySeeds {
        /// Number of seeds supplied.
        count: usize,
        /// Maximum allowed.
        max: usize,
    },

    /// The seeds with the given bump hash to a point on the Ed25519 curve.
    #[error("seeds with bump {bump} derive an on-curve point")]
    OnCurve {
        /// The rejected bump.
        bump: u8,
    },

    /// Every bump from 255 down to 0 produced an on-curve point.
    #[error("no bump in 0..=255 derives an off-curve address")]
    NoViableBump,
}

/// Errors during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// Float values are not permitted; amounts are integers.
    #[error("float values are not permitted in canonical representations: {0}")]
    FloatRejected(f64),

    /// JSON serialization failed during canonicalization.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// Errors from Ed25519 key handling and signature verification.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// The 32 bytes are not a valid Ed25519 public key.
    #[error("invalid Ed25519 public key: {0}")]
    InvalidPublicKey(String),

    /// Signature verification failed.
    #[error("signature verification failed: {0}")]
    VerificationFailed(String),

    /// A hex-encoded secret or signature could not be parsed.
    #[error("hex decode error: {0}")]
    HexDecode(String),
}
