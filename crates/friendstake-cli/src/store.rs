//! Ledger snapshot persistence.
//!
//! The ledger lives in `<state_dir>/ledger.json`. Mutating commands hold an
//! exclusive lock on `<state_dir>/ledger.lock` from load to save, so two
//! processes never apply operations to the same snapshot. Snapshots are
//! written to a uniquely named temporary file and renamed into place.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fs2::FileExt;
use tempfile::NamedTempFile;

use friendstake_escrow::{Ledger, LedgerSnapshot};

use crate::config::CliConfig;

const LOCK_FILE: &str = "ledger.lock";

/// Exclusive hold on the state directory; released on drop.
#[derive(Debug)]
pub struct StateLock {
    file: File,
    path: PathBuf,
}

impl Drop for StateLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to release state lock");
        }
    }
}

/// Block until this process holds the state directory lock.
pub fn lock_state(config: &CliConfig) -> Result<StateLock> {
    ensure_state_dir(config)?;
    let path = config.state_dir.join(LOCK_FILE);
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(&path)
        .with_context(|| format!("failed to open lock file: {}", path.display()))?;
    file.lock_exclusive()
        .with_context(|| format!("failed to lock state directory: {}", path.display()))?;
    tracing::debug!(path = %path.display(), "state lock acquired");
    Ok(StateLock { file, path })
}

/// Load the ledger, or start an empty one from `config`.
pub fn load_ledger(config: &CliConfig) -> Result<Ledger> {
    let path = config.ledger_path();
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no ledger snapshot; starting empty");
        return Ok(Ledger::new(config.namespace(), config.ledger_config()));
    }
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read ledger: {}", path.display()))?;
    let snapshot: LedgerSnapshot = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse ledger: {}", path.display()))?;
    let ledger = Ledger::from_snapshot(snapshot);
    ledger
        .verify_journal()
        .with_context(|| format!("ledger journal failed verification: {}", path.display()))?;
    Ok(ledger)
}

/// Persist the ledger. Callers that loaded it for a mutation must still
/// hold the [`StateLock`] taken before the load.
pub fn save_ledger(config: &CliConfig, ledger: &Ledger) -> Result<()> {
    ensure_state_dir(config)?;
    let json = serde_json::to_string_pretty(&ledger.snapshot())?;
    write_atomic(&config.state_dir, &config.ledger_path(), json.as_bytes())
}

/// Load, apply and save under the state lock. Nothing is written when
/// `apply` fails.
pub fn update_ledger<T>(
    config: &CliConfig,
    apply: impl FnOnce(&Ledger) -> Result<T>,
) -> Result<T> {
    let _lock = lock_state(config)?;
    let ledger = load_ledger(config)?;
    let value = apply(&ledger)?;
    save_ledger(config, &ledger)?;
    Ok(value)
}

fn ensure_state_dir(config: &CliConfig) -> Result<()> {
    std::fs::create_dir_all(&config.state_dir).with_context(|| {
        format!(
            "failed to create state directory: {}",
            config.state_dir.display()
        )
    })
}

fn write_atomic(dir: &Path, path: &Path, bytes: &[u8]) -> Result<()> {
    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("failed to create temporary file in {}", dir.display()))?;
    tmp.write_all(bytes)
        .and_then(|()| tmp.as_file().sync_all())
        .with_context(|| format!("failed to write {}", tmp.path().display()))?;
    tmp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("failed to replace {}", path.display()))?;
    Ok(())
}
