//! Ledger configuration.
//!
//! Defaults reproduce the storage economics of a rent-exempt account of
//! [`RECORD_SPACE`] bytes. Override via environment variables or explicit
//! construction for tests.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::record::RECORD_SPACE;

/// Per-byte-year storage price used for the default record deposit.
pub const DEPOSIT_UNITS_PER_BYTE: u64 = 6960;

/// Fixed per-account storage overhead in bytes.
pub const ACCOUNT_STORAGE_OVERHEAD: u64 = 128;

/// Default deposit the maker pays for a record's storage.
pub const DEFAULT_RECORD_DEPOSIT: u64 =
    (ACCOUNT_STORAGE_OVERHEAD + RECORD_SPACE as u64) * DEPOSIT_UNITS_PER_BYTE;

/// Environment variable overriding [`LedgerConfig::record_deposit`].
pub const RECORD_DEPOSIT_ENV: &str = "FRIENDSTAKE_RECORD_DEPOSIT";

/// Configuration of the reference ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Native units the maker pays into a new record and gets back when it
    /// closes.
    pub record_deposit: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            record_deposit: DEFAULT_RECORD_DEPOSIT,
        }
    }
}

impl LedgerConfig {
    /// Load configuration from the environment.
    ///
    /// Variables:
    /// - `FRIENDSTAKE_RECORD_DEPOSIT` (default: [`DEFAULT_RECORD_DEPOSIT`])
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if a variable is set but does
    /// not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Ok(raw) = std::env::var(RECORD_DEPOSIT_ENV) {
            config.record_deposit = parse_u64(RECORD_DEPOSIT_ENV, &raw)?;
        }
        Ok(config)
    }

    /// A configuration with no storage deposit, convenient in tests.
    pub fn without_deposit() -> Self {
        Self { record_deposit: 0 }
    }
}

/// Parse an unsigned integer setting.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidValue`] naming the setting.
pub fn parse_u64(name: &str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim().parse().map_err(|e: std::num::ParseIntError| ConfigError::InvalidValue {
        name: name.to_string(),
        value: raw.to_string(),
        reason: e.to_string(),
    })
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A setting could not be parsed.
    #[error("invalid value {value:?} for {name}: {reason}")]
    InvalidValue {
        /// Setting name.
        name: String,
        /// Raw value.
        value: String,
        /// Parse failure.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_deposit_formula() {
        assert_eq!(DEFAULT_RECORD_DEPOSIT, (128 + 153) * 6960);
        assert_eq!(LedgerConfig::default().record_deposit, 1_955_760);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert_eq!(parse_u64("X", " 42 ").unwrap(), 42);
        let err = parse_u64("FRIENDSTAKE_RECORD_DEPOSIT", "-1").unwrap_err();
        assert!(err.to_string().contains("FRIENDSTAKE_RECORD_DEPOSIT"));
    }

    #[test]
    fn serde_shape() {
        let json = serde_json::to_value(LedgerConfig::without_deposit()).unwrap();
        assert_eq!(json, serde_json::json!({"record_deposit": 0}));
    }
}
