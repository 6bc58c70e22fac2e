//! # Keystore
//!
//! Named Ed25519 keypairs stored as `<name>.key` (hex seed) and `<name>.pub`
//! (hex public key) in the keystore directory. Any command that takes a
//! participant accepts either a 64-character hex identity or a key name.

use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::Args;

use friendstake_core::{Identity, Keypair};

use crate::config::CliConfig;

/// Arguments for `friendstake keygen`.
#[derive(Args, Debug)]
pub struct KeygenArgs {
    /// Name to store the keypair under.
    #[arg(long)]
    pub name: String,
}

/// Execute `keygen`.
pub fn run_keygen(args: &KeygenArgs, config: &CliConfig) -> Result<u8> {
    let kp = cmd_keygen(&config.keys_dir(), &args.name)?;
    println!("OK: generated keypair {}", args.name);
    println!("  Identity: {}", kp.identity());
    Ok(0)
}

/// Generate and store a keypair, refusing to overwrite an existing name.
pub fn cmd_keygen(keys_dir: &Path, name: &str) -> Result<Keypair> {
    check_name(name)?;
    std::fs::create_dir_all(keys_dir)
        .with_context(|| format!("failed to create keystore: {}", keys_dir.display()))?;

    let key_path = keys_dir.join(format!("{name}.key"));
    if key_path.exists() {
        bail!("key already exists: {name}");
    }
    let kp = Keypair::generate();
    std::fs::write(&key_path, kp.seed_hex())
        .with_context(|| format!("failed to write private key: {}", key_path.display()))?;
    let pub_path = keys_dir.join(format!("{name}.pub"));
    std::fs::write(&pub_path, kp.identity().to_hex())
        .with_context(|| format!("failed to write public key: {}", pub_path.display()))?;

    tracing::info!(name, identity = %kp.identity(), "keypair generated");
    Ok(kp)
}

/// Load the keypair stored under `name`.
pub fn load_keypair(keys_dir: &Path, name: &str) -> Result<Keypair> {
    check_name(name)?;
    let key_path = keys_dir.join(format!("{name}.key"));
    let hex = std::fs::read_to_string(&key_path)
        .with_context(|| format!("unknown key {name:?} (no {})", key_path.display()))?;
    Keypair::from_seed_hex(hex.trim()).with_context(|| format!("corrupt key file for {name}"))
}

/// Resolve a participant given as hex identity or key name.
pub fn resolve_identity(keys_dir: &Path, value: &str) -> Result<Identity> {
    if value.len() == 64 {
        if let Ok(id) = Identity::from_hex(value) {
            return Ok(id);
        }
    }
    check_name(value)?;
    let pub_path = keys_dir.join(format!("{value}.pub"));
    let hex = std::fs::read_to_string(&pub_path).with_context(|| {
        format!("{value:?} is neither a hex identity nor a known key name")
    })?;
    Identity::from_hex(hex.trim()).with_context(|| format!("corrupt public key file for {value}"))
}

fn check_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !valid {
        bail!("invalid key name {name:?}: use letters, digits, '-' and '_'");
    }
    Ok(())
}
