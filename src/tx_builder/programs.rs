//! Program identifiers and instruction payload encodings
//!
//! Token Metadata uses single-byte instruction tags followed by borsh
//! arguments; Bubblegum is an Anchor program and prefixes its arguments with
//! `sha256("global:<ix_name>")[..8]`. Pubkeys are carried as raw 32-byte
//! arrays so the borsh layout does not depend on the SDK's serde features.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use crate::tx_builder::errors::MinterError;
use solana_sdk::pubkey::Pubkey;

/// Metaplex Token Metadata program
pub mod token_metadata {
    use solana_sdk::pubkey::Pubkey;

    pub const ID: Pubkey = solana_sdk::pubkey!("metaqbxxUerdq28cj1RbAWkYQm3ybzjb6a8bt518x1s");

    /// `CreateMetadataAccountV3` instruction tag
    pub const CREATE_METADATA_ACCOUNT_V3: u8 = 33;
    /// `CreateMasterEditionV3` instruction tag
    pub const CREATE_MASTER_EDITION_V3: u8 = 17;

    pub const MAX_NAME_LENGTH: usize = 32;
    pub const MAX_SYMBOL_LENGTH: usize = 10;
    pub const MAX_URI_LENGTH: usize = 200;
    pub const MAX_CREATOR_LIMIT: usize = 5;

    pub fn id() -> Pubkey {
        ID
    }
}

/// Metaplex Bubblegum program
pub mod bubblegum {
    use solana_sdk::pubkey::Pubkey;

    pub const ID: Pubkey = solana_sdk::pubkey!("BGUMAp9Gq7iTEuizy4pqaxsTyUCBK68MDfK752saRPUY");

    pub fn id() -> Pubkey {
        ID
    }
}

/// SPL Account Compression program
pub mod account_compression {
    use solana_sdk::pubkey::Pubkey;

    pub const ID: Pubkey = solana_sdk::pubkey!("cmtDvXumGCrqC1Age74AVPhSRVXJMd8PJS91L8KbNCK");

    pub fn id() -> Pubkey {
        ID
    }
}

/// SPL Noop program (change-log wrapper)
pub mod noop {
    use solana_sdk::pubkey::Pubkey;

    pub const ID: Pubkey = solana_sdk::pubkey!("noopb9bkMVfRPU8AsbpTUg8AQkHtKwMYZiFUjNRtMmV");

    pub fn id() -> Pubkey {
        ID
    }
}

/// Anchor instruction discriminator for `ix_name`
pub fn anchor_discriminator(ix_name: &str) -> [u8; 8] {
    let digest = Sha256::digest(format!("global:{}", ix_name).as_bytes());
    let mut out = [0u8; 8];
    out.copy_from_slice(&digest[..8]);
    out
}

/// Creator entry; shares across a list must sum to 100
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Creator {
    pub address: Pubkey,
    #[serde(default)]
    pub verified: bool,
    pub share: u8,
}

/// Collection reference attached to a metadata record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    pub key: Pubkey,
    pub verified: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenStandard {
    NonFungible,
    FungibleAsset,
    Fungible,
    NonFungibleEdition,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenProgramVersion {
    Original,
    Token2022,
}

/// Metadata attached to a collection root (Token Metadata `DataV2` + flags)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionMetadata {
    pub name: String,
    pub symbol: String,
    pub uri: String,
    pub seller_fee_basis_points: u16,
    pub creators: Vec<Creator>,
    pub is_mutable: bool,
}

/// Metadata carried by a compressed mint (Bubblegum `MetadataArgs`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataArgs {
    pub name: String,
    pub symbol: String,
    pub uri: String,
    pub seller_fee_basis_points: u16,
    pub primary_sale_happened: bool,
    pub is_mutable: bool,
    pub edition_nonce: Option<u8>,
    pub token_standard: Option<TokenStandard>,
    pub collection: Option<Collection>,
    pub token_program_version: TokenProgramVersion,
    pub creators: Vec<Creator>,
}

// Wire layouts. Field order is the on-chain order and must not change.

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq)]
pub(crate) struct WireCreator {
    address: [u8; 32],
    verified: bool,
    share: u8,
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq)]
pub(crate) struct WireCollection {
    verified: bool,
    key: [u8; 32],
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq)]
pub(crate) struct WireUses {
    use_method: u8,
    remaining: u64,
    total: u64,
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq)]
pub(crate) enum WireCollectionDetails {
    V1 { size: u64 },
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq)]
pub(crate) struct WireDataV2 {
    name: String,
    symbol: String,
    uri: String,
    seller_fee_basis_points: u16,
    creators: Option<Vec<WireCreator>>,
    collection: Option<WireCollection>,
    uses: Option<WireUses>,
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq)]
pub(crate) struct CreateMetadataAccountArgsV3 {
    data: WireDataV2,
    is_mutable: bool,
    collection_details: Option<WireCollectionDetails>,
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq)]
pub(crate) struct CreateMasterEditionArgs {
    max_supply: Option<u64>,
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq)]
pub(crate) struct CreateTreeArgs {
    max_depth: u32,
    max_buffer_size: u32,
    public: Option<bool>,
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq)]
pub(crate) struct WireMetadataArgs {
    name: String,
    symbol: String,
    uri: String,
    seller_fee_basis_points: u16,
    primary_sale_happened: bool,
    is_mutable: bool,
    edition_nonce: Option<u8>,
    token_standard: Option<u8>,
    collection: Option<WireCollection>,
    uses: Option<WireUses>,
    token_program_version: u8,
    creators: Vec<WireCreator>,
}

impl From<&Creator> for WireCreator {
    fn from(c: &Creator) -> Self {
        Self {
            address: c.address.to_bytes(),
            verified: c.verified,
            share: c.share,
        }
    }
}

impl From<&Collection> for WireCollection {
    fn from(c: &Collection) -> Self {
        Self {
            verified: c.verified,
            key: c.key.to_bytes(),
        }
    }
}

fn encode<T: BorshSerialize>(
    program: &str,
    prefix: &[u8],
    args: &T,
) -> Result<Vec<u8>, MinterError> {
    let mut data = Vec::with_capacity(256);
    data.extend_from_slice(prefix);
    args.serialize(&mut data)
        .map_err(|e| MinterError::instruction_failed(program, e.to_string()))?;
    Ok(data)
}

/// `CreateMetadataAccountV3` payload marking the mint as a sized collection root
pub(crate) fn create_metadata_account_v3_data(
    metadata: &CollectionMetadata,
) -> Result<Vec<u8>, MinterError> {
    let creators = if metadata.creators.is_empty() {
        None
    } else {
        Some(metadata.creators.iter().map(WireCreator::from).collect())
    };
    let args = CreateMetadataAccountArgsV3 {
        data: WireDataV2 {
            name: metadata.name.clone(),
            symbol: metadata.symbol.clone(),
            uri: metadata.uri.clone(),
            seller_fee_basis_points: metadata.seller_fee_basis_points,
            creators,
            collection: None,
            uses: None,
        },
        is_mutable: metadata.is_mutable,
        collection_details: Some(WireCollectionDetails::V1 { size: 0 }),
    };
    encode(
        "token_metadata",
        &[token_metadata::CREATE_METADATA_ACCOUNT_V3],
        &args,
    )
}

/// `CreateMasterEditionV3` payload
pub(crate) fn create_master_edition_v3_data(
    max_supply: Option<u64>,
) -> Result<Vec<u8>, MinterError> {
    encode(
        "token_metadata",
        &[token_metadata::CREATE_MASTER_EDITION_V3],
        &CreateMasterEditionArgs { max_supply },
    )
}

/// Bubblegum `create_tree` payload
pub(crate) fn create_tree_data(
    max_depth: u32,
    max_buffer_size: u32,
    public: bool,
) -> Result<Vec<u8>, MinterError> {
    encode(
        "bubblegum",
        &anchor_discriminator("create_tree"),
        &CreateTreeArgs {
            max_depth,
            max_buffer_size,
            public: Some(public),
        },
    )
}

/// Bubblegum `set_tree_delegate` payload (no arguments)
pub(crate) fn set_tree_delegate_data() -> Vec<u8> {
    anchor_discriminator("set_tree_delegate").to_vec()
}

/// Bubblegum `mint_to_collection_v1` payload
pub(crate) fn mint_to_collection_v1_data(args: &MetadataArgs) -> Result<Vec<u8>, MinterError> {
    let wire = WireMetadataArgs {
        name: args.name.clone(),
        symbol: args.symbol.clone(),
        uri: args.uri.clone(),
        seller_fee_basis_points: args.seller_fee_basis_points,
        primary_sale_happened: args.primary_sale_happened,
        is_mutable: args.is_mutable,
        edition_nonce: args.edition_nonce,
        token_standard: args.token_standard.map(|t| t as u8),
        collection: args.collection.as_ref().map(WireCollection::from),
        uses: None,
        token_program_version: args.token_program_version as u8,
        creators: args.creators.iter().map(WireCreator::from).collect(),
    };
    encode("bubblegum", &anchor_discriminator("mint_to_collection_v1"), &wire)
}
