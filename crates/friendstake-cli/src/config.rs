//! # CLI Configuration
//!
//! Resolution order, later sources overriding earlier ones:
//!
//! 1. Built-in defaults (`.friendstake/` state directory).
//! 2. The YAML file given with `--config`, or `friendstake.yaml` in the
//!    current directory if it exists.
//! 3. Environment variables `FRIENDSTAKE_STATE_DIR` and
//!    `FRIENDSTAKE_RECORD_DEPOSIT`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use friendstake_core::Namespace;
use friendstake_escrow::config::{parse_u64, RECORD_DEPOSIT_ENV};
use friendstake_escrow::LedgerConfig;

/// Config file looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "friendstake.yaml";

/// Environment variable overriding [`CliConfig::state_dir`].
pub const STATE_DIR_ENV: &str = "FRIENDSTAKE_STATE_DIR";

/// Settings for one CLI invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CliConfig {
    /// Directory holding the ledger snapshot and the keystore.
    pub state_dir: PathBuf,
    /// Storage deposit for new ledgers. Existing snapshots keep their own.
    pub record_deposit: Option<u64>,
    /// Label hashed into the derivation namespace of new ledgers.
    pub namespace_label: Option<String>,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            state_dir: PathBuf::from(".friendstake"),
            record_deposit: None,
            namespace_label: None,
        }
    }
}

impl CliConfig {
    /// Load from file and environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_FILE);
                if fallback.is_file() {
                    Self::from_file(fallback)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_overrides(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Parse a YAML config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        serde_yaml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Apply environment-style overrides from `lookup`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(dir) = lookup(STATE_DIR_ENV) {
            self.state_dir = PathBuf::from(dir);
        }
        if let Some(raw) = lookup(RECORD_DEPOSIT_ENV) {
            self.record_deposit = Some(parse_u64(RECORD_DEPOSIT_ENV, &raw)?);
        }
        Ok(())
    }

    /// Path of the ledger snapshot.
    pub fn ledger_path(&self) -> PathBuf {
        self.state_dir.join("ledger.json")
    }

    /// Directory of the keystore.
    pub fn keys_dir(&self) -> PathBuf {
        self.state_dir.join("keys")
    }

    /// Ledger configuration for a fresh ledger.
    pub fn ledger_config(&self) -> LedgerConfig {
        match self.record_deposit {
            Some(record_deposit) => LedgerConfig { record_deposit },
            None => LedgerConfig::default(),
        }
    }

    /// Derivation namespace for a fresh ledger.
    pub fn namespace(&self) -> Namespace {
        match &self.namespace_label {
            Some(label) => Namespace::from_label(label),
            None => Namespace::default(),
        }
    }

    /// A config rooted at `state_dir`, for tests and embedding.
    pub fn with_state_dir(state_dir: impl Into<PathBuf>) -> Self {
        Self {
            state_dir: state_dir.into(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yaml_file_parsed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("friendstake.yaml");
        std::fs::write(
            &path,
            "state_dir: /tmp/fs-state\nrecord_deposit: 0\nnamespace_label: devnet\n",
        )
        .unwrap();
        let config = CliConfig::from_file(&path).unwrap();
        assert_eq!(config.state_dir, PathBuf::from("/tmp/fs-state"));
        assert_eq!(config.ledger_config().record_deposit, 0);
        assert_eq!(config.namespace(), Namespace::from_label("devnet"));
    }

    #[test]
    fn unknown_keys_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.yaml");
        std::fs::write(&path, "stat_dir: typo\n").unwrap();
        assert!(CliConfig::from_file(&path).is_err());
    }

    #[test]
    fn overrides_win_over_file_values() {
        let mut config = CliConfig::with_state_dir("from-file");
        config
            .apply_overrides(|name| match name {
                STATE_DIR_ENV => Some("from-env".into()),
                RECORD_DEPOSIT_ENV => Some("42".into()),
                _ => None,
            })
            .unwrap();
        assert_eq!(config.state_dir, PathBuf::from("from-env"));
        assert_eq!(config.record_deposit, Some(42));
    }

    #[test]
    fn bad_override_rejected() {
        let mut config = CliConfig::default();
        let result = config.apply_overrides(|name| {
            (name == RECORD_DEPOSIT_ENV).then(|| "lots".to_string())
        });
        assert!(result.is_err());
    }

    #[test]
    fn defaults() {
        let config = CliConfig::default();
        assert_eq!(config.ledger_path(), PathBuf::from(".friendstake/ledger.json"));
        assert_eq!(config.keys_dir(), PathBuf::from(".friendstake/keys"));
        assert_eq!(config.ledger_config(), LedgerConfig::default());
    }
}
