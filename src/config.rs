//! Configuration module for the minting service
//!
//! Configuration is read from a TOML file, then overridden by environment
//! variables (a `.env` file is honoured). Addresses are kept as strings
//! here and parsed where they are needed, so a missing collection or tree
//! only fails the flows that use them.

use crate::catalog::{CatalogItem, MetadataDefaults};
use crate::tx_builder::{Creator, MinterError};
use serde::{Deserialize, Serialize};
use solana_sdk::{commitment_config::CommitmentConfig, pubkey::Pubkey};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, warn};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub rpc: RpcConfig,

    #[serde(default)]
    pub wallet: WalletConfig,

    #[serde(default)]
    pub collection: CollectionConfig,

    #[serde(default)]
    pub site: SiteConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    /// Mintable items
    #[serde(default = "default_catalog")]
    pub catalog: Vec<CatalogItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    #[serde(default = "default_rpc_url")]
    pub url: String,

    /// Cluster name used in explorer links
    #[serde(default = "default_moniker")]
    pub moniker: String,

    /// Request timeout in seconds
    #[serde(default = "default_rpc_timeout")]
    pub timeout_secs: u64,

    /// processed | confirmed | finalized
    #[serde(default = "default_commitment")]
    pub commitment: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletConfig {
    /// Path to the service keypair (used when no private key is in the env)
    #[serde(default = "default_keypair_path")]
    pub keypair_path: String,

    /// Directory for generated collection/tree keypairs
    #[serde(default = "default_key_dir")]
    pub key_dir: String,

    /// JSON byte array from `SOLANA_PRIVATE_KEY`; never written back out
    #[serde(skip)]
    pub private_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionConfig {
    /// Collection mint the service mints into
    #[serde(default)]
    pub collection_address: Option<String>,

    /// Membership tree the service appends to
    #[serde(default)]
    pub tree_address: Option<String>,

    /// Sole creator (100% share); no creators when unset
    #[serde(default)]
    pub treasury_address: Option<String>,

    #[serde(default = "default_symbol")]
    pub symbol: String,

    #[serde(default = "default_seller_fee")]
    pub seller_fee_basis_points: u16,

    #[serde(default = "default_true")]
    pub is_mutable: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    #[serde(default = "default_site_name")]
    pub name: String,

    #[serde(default = "default_site_description")]
    pub description: String,

    #[serde(default = "default_site_url")]
    pub url: String,

    #[serde(default = "default_icon_path")]
    pub icon_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Allows `?full` to attach item data to responses
    #[serde(default)]
    pub debug: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_api")]
    pub api_url: String,

    #[serde(default)]
    pub api_key: Option<String>,

    /// Host suffix of the HTTP gateway (`https://{cid}.{gateway_host}/{file}`)
    #[serde(default = "default_gateway_host")]
    pub gateway_host: String,
}

/// Addresses the mint flow cannot run without
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MintTargets {
    pub collection: Pubkey,
    pub tree: Pubkey,
}

// Default value functions
fn default_rpc_url() -> String { "https://api.devnet.solana.com".to_string() }
fn default_moniker() -> String { "devnet".to_string() }
fn default_rpc_timeout() -> u64 { 30 }
fn default_commitment() -> String { "confirmed".to_string() }
fn default_keypair_path() -> String { "~/.config/solana/id.json".to_string() }
fn default_key_dir() -> String { ".local_keys".to_string() }
fn default_symbol() -> String { "DevRel".to_string() }
fn default_seller_fee() -> u16 { 500 }
fn default_true() -> bool { true }
fn default_site_name() -> String { "cNFT Minter Demo".to_string() }
fn default_site_description() -> String {
    "Demo application to mint compressed NFTs using Solana Pay QR codes. By the Solana Foundation's developer relations team.".to_string()
}
fn default_site_url() -> String { "http://localhost:3000".to_string() }
fn default_icon_path() -> String { "/_static/solana_devs.jpeg".to_string() }
fn default_bind() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 3000 }
fn default_storage_api() -> String { "https://api.nft.storage".to_string() }
fn default_gateway_host() -> String { "ipfs.dweb.link".to_string() }
fn default_catalog() -> Vec<CatalogItem> { vec![CatalogItem::demo()] }

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            url: default_rpc_url(),
            moniker: default_moniker(),
            timeout_secs: default_rpc_timeout(),
            commitment: default_commitment(),
        }
    }
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            keypair_path: default_keypair_path(),
            key_dir: default_key_dir(),
            private_key: None,
        }
    }
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            collection_address: None,
            tree_address: None,
            treasury_address: None,
            symbol: default_symbol(),
            seller_fee_basis_points: default_seller_fee(),
            is_mutable: default_true(),
        }
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            name: default_site_name(),
            description: default_site_description(),
            url: default_site_url(),
            icon_path: default_icon_path(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            debug: false,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            api_url: default_storage_api(),
            api_key: None,
            gateway_host: default_gateway_host(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rpc: RpcConfig::default(),
            wallet: WalletConfig::default(),
            collection: CollectionConfig::default(),
            site: SiteConfig::default(),
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            catalog: default_catalog(),
        }
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides
    ///
    /// A missing file falls back to defaults; a malformed one is an error.
    pub fn from_file_with_env(path: &str) -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            warn!("Config file {} not found, using defaults", path);
            Self::default()
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply overrides from a key lookup (the process environment in production)
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = non_empty("SOLANA_PRIVATE_KEY") {
            self.wallet.private_key = Some(v);
        }
        if let Some(v) = non_empty("SOLANA_KEYPAIR_PATH") {
            self.wallet.keypair_path = v;
        }
        if let Some(v) = non_empty("SOLANA_RPC_URL") {
            self.rpc.url = v;
        }
        if let Some(v) = non_empty("SOLANA_RPC_MONIKER") {
            self.rpc.moniker = v;
        }
        if let Some(v) = non_empty("SOLANA_COLLECTION_ADDRESS") {
            self.collection.collection_address = Some(v);
        }
        if let Some(v) = non_empty("SOLANA_TREE_ADDRESS") {
            self.collection.tree_address = Some(v);
        }
        if let Some(v) = non_empty("NFT_STORAGE_API_KEY") {
            self.storage.api_key = Some(v);
        }
        if let Some(v) = non_empty("MINTER_DEBUG") {
            self.server.debug = matches!(v.to_lowercase().as_str(), "1" | "true" | "yes");
        }
        debug!(rpc = %self.rpc.url, moniker = %self.rpc.moniker, "Configuration resolved");
    }

    /// Collection and tree the mint flow writes to
    ///
    /// # Errors
    ///
    /// `Configuration` when either address is absent or unparsable.
    pub fn mint_targets(&self) -> Result<MintTargets, MinterError> {
        Ok(MintTargets {
            collection: parse_required(
                "collection address",
                self.collection.collection_address.as_deref(),
            )?,
            tree: parse_required("tree address", self.collection.tree_address.as_deref())?,
        })
    }

    /// Defaults applied to every minted item
    pub fn metadata_defaults(&self) -> Result<MetadataDefaults, MinterError> {
        let creators = match self.collection.treasury_address.as_deref() {
            Some(addr) if !addr.trim().is_empty() => vec![Creator {
                address: parse_required("treasury address", Some(addr))?,
                verified: false,
                share: 100,
            }],
            _ => Vec::new(),
        };
        Ok(MetadataDefaults {
            symbol: self.collection.symbol.clone(),
            seller_fee_basis_points: self.collection.seller_fee_basis_points,
            is_mutable: self.collection.is_mutable,
            creators,
        })
    }

    /// Absolute icon URL shown by wallets
    pub fn icon_url(&self) -> String {
        format!(
            "{}{}",
            self.site.url.trim_end_matches('/'),
            self.site.icon_path
        )
    }

    pub fn commitment(&self) -> CommitmentConfig {
        match self.rpc.commitment.as_str() {
            "processed" => CommitmentConfig::processed(),
            "finalized" => CommitmentConfig::finalized(),
            _ => CommitmentConfig::confirmed(),
        }
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc.timeout_secs)
    }
}

fn parse_required(what: &str, value: Option<&str>) -> Result<Pubkey, MinterError> {
    let value = value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| MinterError::configuration(format!("{} is not set", what)))?;
    Pubkey::from_str(value)
        .map_err(|e| MinterError::configuration(format!("invalid {} '{}': {}", what, value, e)))
}
