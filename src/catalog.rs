//! Mintable item catalog
//!
//! The catalog sits behind [`CatalogRepository`] so a persistent store can
//! replace the static list; which item a request receives is decided by a
//! [`SelectionStrategy`].

use crate::tx_builder::{Creator, MetadataArgs, TokenProgramVersion, TokenStandard};
use chrono::{DateTime, Utc};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemAttribute {
    pub trait_type: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemFile {
    pub uri: String,
    #[serde(rename = "type")]
    pub mime_type: String,
}

/// Off-chain metadata summary of an item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemMetadata {
    pub name: String,
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seller_fee_basis_points: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_mutable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_url: Option<String>,
    #[serde(default)]
    pub files: Vec<ItemFile>,
    #[serde(default)]
    pub attributes: Vec<ItemAttribute>,
}

/// One mintable item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    /// Unique, matched case-insensitively
    pub key: String,
    /// Pointer to the off-chain JSON
    pub metadata_uri: String,
    pub metadata: ItemMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
}

/// Collection-wide values used when an item leaves them unset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataDefaults {
    pub symbol: String,
    pub seller_fee_basis_points: u16,
    pub is_mutable: bool,
    pub creators: Vec<Creator>,
}

impl CatalogItem {
    /// Whether the item's window contains `now` (open-ended bounds allowed)
    pub fn is_available_at(&self, now: DateTime<Utc>) -> bool {
        self.start_date.map_or(true, |start| start <= now)
            && self.end_date.map_or(true, |end| now <= end)
    }

    /// Mint payload for this item; the collection is attached at compose time
    pub fn to_metadata_args(&self, defaults: &MetadataDefaults) -> MetadataArgs {
        MetadataArgs {
            name: self.metadata.name.clone(),
            symbol: self
                .metadata
                .symbol
                .clone()
                .unwrap_or_else(|| defaults.symbol.clone()),
            uri: self.metadata_uri.clone(),
            seller_fee_basis_points: self
                .metadata
                .seller_fee_basis_points
                .unwrap_or(defaults.seller_fee_basis_points),
            primary_sale_happened: true,
            is_mutable: self.metadata.is_mutable.unwrap_or(defaults.is_mutable),
            edition_nonce: None,
            token_standard: Some(TokenStandard::NonFungible),
            collection: None,
            token_program_version: TokenProgramVersion::Original,
            creators: defaults.creators.clone(),
        }
    }

    /// The demo item shipped with the service
    pub fn demo() -> Self {
        let image =
            "https://bafkreiesqzrm26vf5d4d6meuzqtdjmtg63u27so22rp57xdtcpq5nleulm.ipfs.nftstorage.link/";
        Self {
            key: "solana_devs".into(),
            metadata_uri:
                "https://bafybeiduoxcb7kymhmb5r5eemtfwa2pgich2dxlg5okaqvbaijcrk3kgji.ipfs.dweb.link/asset.json"
                    .into(),
            metadata: ItemMetadata {
                name: "Demo #1 - solana_devs".into(),
                image: image.into(),
                description: None,
                symbol: None,
                seller_fee_basis_points: None,
                is_mutable: None,
                external_url: Some("https://twitter.com/solana_devs".into()),
                files: vec![ItemFile {
                    uri: image.into(),
                    mime_type: "image/png".into(),
                }],
                attributes: vec![ItemAttribute {
                    trait_type: "item".into(),
                    value: "solana_devs".into(),
                }],
            },
            start_date: None,
            end_date: None,
        }
    }
}

/// Read-only source of catalog items
pub trait CatalogRepository: Send + Sync {
    fn list(&self) -> Vec<CatalogItem>;

    fn get(&self, key: &str) -> Option<CatalogItem>;
}

/// Catalog fixed at startup
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    items: Vec<CatalogItem>,
}

impl StaticCatalog {
    pub fn new(items: Vec<CatalogItem>) -> Self {
        Self { items }
    }
}

impl CatalogRepository for StaticCatalog {
    fn list(&self) -> Vec<CatalogItem> {
        self.items.clone()
    }

    fn get(&self, key: &str) -> Option<CatalogItem> {
        self.items
            .iter()
            .find(|item| item.key.eq_ignore_ascii_case(key))
            .cloned()
    }
}

/// Chooses the item a request receives
pub trait SelectionStrategy: Send + Sync {
    fn pick<'a>(&self, items: &'a [CatalogItem]) -> Option<&'a CatalogItem>;
}

/// Uniform random choice
#[derive(Debug)]
pub struct UniformRandom {
    rng: Mutex<StdRng>,
}

impl UniformRandom {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Reproducible sequence for tests and demos
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Default for UniformRandom {
    fn default() -> Self {
        Self::new()
    }
}

impl SelectionStrategy for UniformRandom {
    fn pick<'a>(&self, items: &'a [CatalogItem]) -> Option<&'a CatalogItem> {
        if items.is_empty() {
            return None;
        }
        let index = {
            let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
            rng.gen_range(0..items.len())
        };
        items.get(index)
    }
}

/// Always the item at a fixed position (wrapping)
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedChoice(pub usize);

impl SelectionStrategy for FixedChoice {
    fn pick<'a>(&self, items: &'a [CatalogItem]) -> Option<&'a CatalogItem> {
        if items.is_empty() {
            return None;
        }
        items.get(self.0 % items.len())
    }
}
