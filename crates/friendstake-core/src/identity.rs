//! # Key Newtypes
//!
//! [`Identity`] names a participant (maker, opponent, judge): it is the
//! 32-byte Ed25519 public key the execution environment authenticates.
//! [`Address`] names a derived account (bet record or vault): 32 bytes that
//! are deliberately *not* a valid public key.
//!
//! Both render as 64-character lowercase hex and serialize as hex strings,
//! which also makes them usable as JSON map keys.
//!
//! ## Security Invariant
//!
//! Keeping the two apart at the type level means a role check can only ever
//! compare an identity against an identity; a vault address can never be
//! mistaken for a signer.

use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ValidationError;

/// A participant's 32-byte public identity.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identity([u8; 32]);

/// A 32-byte derived account address (bet record or vault).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address([u8; 32]);

impl Identity {
    /// Wrap raw public key bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// The raw 32 bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Render as lowercase hex.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Parse from 64 hex characters.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidHex`] on bad length or characters.
    pub fn from_hex(s: &str) -> Result<Self, ValidationError> {
        hex::decode_32(s, "identity").map(Self)
    }
}

impl Address {
    /// Wrap raw address bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// The raw 32 bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Render as lowercase hex.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Parse from 64 hex characters.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidHex`] on bad length or characters.
    pub fn from_hex(s: &str) -> Result<Self, ValidationError> {
        hex::decode_32(s, "address").map(Self)
    }
}

impl AsRef<[u8]> for Identity {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl FromStr for Identity {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl FromStr for Address {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Identity({}...)", hex::prefix(&self.0))
    }
}

impl std::fmt::Debug for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Address({}...)", hex::prefix(&self.0))
    }
}

impl Serialize for Identity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Identity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Hex helpers shared by identities, addresses, keys and stored records.
pub mod hex {
    use crate::error::ValidationError;

    /// Encode bytes as lowercase hex.
    pub fn encode(bytes: &[u8]) -> String {
        ::hex::encode(bytes)
    }

    /// Decode an even-length hex string. Surrounding whitespace is ignored;
    /// anything else that is not an ASCII hex digit is rejected.
    pub fn decode(s: &str) -> Result<Vec<u8>, String> {
        ::hex::decode(s.trim()).map_err(|e| e.to_string())
    }

    pub(crate) fn decode_32(s: &str, kind: &'static str) -> Result<[u8; 32], ValidationError> {
        let invalid = |reason: String| ValidationError::InvalidHex {
            kind,
            value: s.to_string(),
            reason,
        };
        let trimmed = s.trim();
        if trimmed.len() != 64 {
            return Err(invalid(format!(
                "expected 64 hex characters, got {}",
                trimmed.len()
            )));
        }
        let bytes = decode(trimmed).map_err(invalid)?;
        let mut out = [0u8; 32];
        out.copy_from_slice(&bytes);
        Ok(out)
    }

    pub(crate) fn prefix(bytes: &[u8]) -> String {
        encode(&bytes[..bytes.len().min(4)])
    }

    /// Serde adapter storing `Vec<u8>` as a hex string.
    pub mod serde_bytes {
        use serde::{Deserialize, Deserializer, Serializer};

        /// Serialize bytes as hex.
        pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
            serializer.serialize_str(&super::encode(bytes))
        }

        /// Deserialize bytes from hex.
        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
            let s = String::deserialize(deserializer)?;
            super::decode(&s).map_err(serde::de::Error::custom)
        }
    }
}
