//! Service identity and keypair management
//!
//! The service key is loaded once at startup and passed explicitly into
//! every composer and responder; nothing reads it from ambient state.

use crate::config::WalletConfig;
use anyhow::{Context, Result};
use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signer},
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use zeroize::Zeroizing;

/// The long-lived signer the service acts as
#[derive(Clone)]
pub struct ServiceIdentity {
    keypair: Arc<Keypair>,
}

impl std::fmt::Debug for ServiceIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceIdentity")
            .field("pubkey", &self.pubkey())
            .finish()
    }
}

impl ServiceIdentity {
    /// Load from a keypair file (raw 64 bytes or a JSON byte array)
    pub fn from_file(path: &str) -> Result<Self> {
        let path = expand_home(path);
        let keypair = read_keypair(&path)?;
        Ok(Self::from_keypair(keypair))
    }

    /// Load from a JSON byte array such as `SOLANA_PRIVATE_KEY`
    pub fn from_json(secret: &str) -> Result<Self> {
        Ok(Self::from_keypair(keypair_from_json(secret.as_bytes())?))
    }

    /// Env private key first, then the keypair file
    pub fn from_config(config: &WalletConfig) -> Result<Self> {
        match config.private_key.as_deref() {
            Some(secret) => {
                debug!("Loading service key from environment");
                Self::from_json(secret).context("Invalid SOLANA_PRIVATE_KEY")
            }
            None => {
                debug!(path = %config.keypair_path, "Loading service key from file");
                Self::from_file(&config.keypair_path)
            }
        }
    }

    pub fn from_keypair(keypair: Keypair) -> Self {
        Self {
            keypair: Arc::new(keypair),
        }
    }

    /// Get the public key
    pub fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    /// Get a reference to the keypair
    pub fn keypair(&self) -> &Keypair {
        &self.keypair
    }
}

fn validate_secret(bytes: &[u8]) -> Result<Keypair> {
    if bytes.len() != 64 {
        anyhow::bail!(
            "Invalid keypair length: expected 64 bytes, got {}",
            bytes.len()
        );
    }
    if bytes.iter().all(|&b| b == 0) {
        anyhow::bail!("Invalid keypair: all-zero key rejected");
    }
    Keypair::try_from(bytes).context("Invalid keypair bytes")
}

fn keypair_from_json(raw: &[u8]) -> Result<Keypair> {
    let bytes: Zeroizing<Vec<u8>> = Zeroizing::new(
        serde_json::from_slice(raw).context("Failed to parse keypair JSON")?,
    );
    validate_secret(&bytes)
}

/// Read a keypair file in either supported format
pub fn read_keypair(path: &Path) -> Result<Keypair> {
    let raw = Zeroizing::new(
        std::fs::read(path)
            .with_context(|| format!("Failed to read keypair file: {}", path.display()))?,
    );
    if raw.len() == 64 {
        validate_secret(&raw)
    } else {
        keypair_from_json(&raw)
    }
}

/// JSON byte-array form accepted by `solana-keygen` and `SOLANA_PRIVATE_KEY`
pub fn keypair_to_json(keypair: &Keypair) -> String {
    let bytes = Zeroizing::new(keypair.to_bytes());
    let parts: Vec<String> = bytes.iter().map(|b| b.to_string()).collect();
    format!("[{}]", parts.join(","))
}

/// Load `{dir}/{name}.json`, generating and saving a fresh keypair if absent
pub fn load_or_generate_keypair(dir: &Path, name: &str) -> Result<Keypair> {
    let path = dir.join(format!("{}.json", name));
    if path.exists() {
        let keypair = read_keypair(&path)?;
        debug!(name, pubkey = %keypair.pubkey(), "Loaded local keypair");
        return Ok(keypair);
    }

    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create key directory: {}", dir.display()))?;
    let keypair = Keypair::new();
    let json = Zeroizing::new(keypair_to_json(&keypair));
    std::fs::write(&path, json.as_bytes())
        .with_context(|| format!("Failed to write keypair file: {}", path.display()))?;
    info!(name, pubkey = %keypair.pubkey(), path = %path.display(), "Generated new keypair");
    Ok(keypair)
}

/// Search for a keypair whose address starts with `prefix`
///
/// Returns `None` once `max_attempts` keys have been tried.
pub fn grind_keypair(prefix: &str, max_attempts: u64) -> Result<Option<Keypair>> {
    const BASE58: &str = "123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";
    if let Some(bad) = prefix.chars().find(|c| !BASE58.contains(*c)) {
        anyhow::bail!("'{}' can never appear in an address", bad);
    }

    for attempt in 0..max_attempts {
        let keypair = Keypair::new();
        if keypair.pubkey().to_string().starts_with(prefix) {
            debug!(attempt, pubkey = %keypair.pubkey(), "Prefix match");
            return Ok(Some(keypair));
        }
    }
    Ok(None)
}

fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), std::env::var_os("HOME")) {
        (Some(rest), Some(home)) => PathBuf::from(home).join(rest),
        _ => PathBuf::from(path),
    }
}
