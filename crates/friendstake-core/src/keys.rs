//! # Ed25519 Keypairs and Signatures
//!
//! A participant's [`Identity`] is the public half of a [`Keypair`]. The
//! reference execution environment authenticates an invocation by verifying
//! a [`Signature`] over its [`CanonicalBytes`].
//!
//! ## Security Invariant
//!
//! - Signing input MUST be `&CanonicalBytes`; raw bytes cannot be signed.
//! - `Keypair` does not implement `Serialize` or `Debug` output of the
//!   secret. The seed is only exposed through [`Keypair::seed_hex`] for the
//!   local keystore.

use ed25519_dalek::{Signer, Verifier};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::canonical::CanonicalBytes;
use crate::error::CryptoError;
use crate::identity::{hex, Identity};

/// An Ed25519 signature (64 bytes), serialized as hex.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature(pub [u8; 64]);

/// An Ed25519 signing keypair.
pub struct Keypair {
    signing_key: ed25519_dalek::SigningKey,
}

impl Keypair {
    /// Generate a new random keypair from the OS CSPRNG.
    pub fn generate() -> Self {
        let mut csprng = rand::rngs::OsRng;
        Self {
            signing_key: ed25519_dalek::SigningKey::generate(&mut csprng),
        }
    }

    /// Rebuild a keypair from its 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: ed25519_dalek::SigningKey::from_bytes(seed),
        }
    }

    /// Rebuild a keypair from a hex-encoded seed.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::HexDecode`] unless the input is 64 hex chars.
    pub fn from_seed_hex(s: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(s).map_err(CryptoError::HexDecode)?;
        let seed: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
            CryptoError::HexDecode(format!("seed must be 32 bytes, got {}", bytes.len()))
        })?;
        Ok(Self::from_seed(&seed))
    }

    /// The seed as hex, for the local keystore only.
    pub fn seed_hex(&self) -> String {
        hex::encode(self.signing_key.as_bytes())
    }

    /// The public identity of this keypair.
    pub fn identity(&self) -> Identity {
        Identity::from_bytes(self.signing_key.verifying_key().to_bytes())
    }

    /// Sign canonical bytes.
    pub fn sign(&self, data: &CanonicalBytes) -> Signature {
        Signature(self.signing_key.sign(data.as_bytes()).to_bytes())
    }
}

impl std::fmt::Debug for Keypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Keypair({:?}, <private>)", self.identity())
    }
}

/// Verify `signature` over `data` against `signer`.
///
/// # Errors
///
/// Returns [`CryptoError::InvalidPublicKey`] if `signer` is not a curve
/// point, or [`CryptoError::VerificationFailed`] if the signature is bad.
pub fn verify(
    signer: &Identity,
    data: &CanonicalBytes,
    signature: &Signature,
) -> Result<(), CryptoError> {
    let key = ed25519_dalek::VerifyingKey::from_bytes(signer.as_bytes())
        .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))?;
    let sig = ed25519_dalek::Signature::from_bytes(&signature.0);
    key.verify(data.as_bytes(), &sig)
        .map_err(|e| CryptoError::VerificationFailed(e.to_string()))
}

impl Signature {
    /// Render as lowercase hex.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Parse from 128 hex characters.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::HexDecode`] on bad input.
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(s).map_err(CryptoError::HexDecode)?;
        let arr: [u8; 64] = bytes.as_slice().try_into().map_err(|_| {
            CryptoError::HexDecode(format!("signature must be 64 bytes, got {}", bytes.len()))
        })?;
        Ok(Self(arr))
    }
}

impl std::fmt::Debug for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Signature({}...)", hex::encode(&self.0[..4]))
    }
}

impl Serialize for Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
