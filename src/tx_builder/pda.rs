//! Program-derived address helpers
//!
//! Pure functions mapping `(program id, seeds)` to an off-curve address and
//! its bump. Nothing here touches the network.

use super::errors::MinterError;
use super::programs::{bubblegum, token_metadata};
use solana_sdk::pubkey::Pubkey;

/// Seed prefix shared by metadata and edition records
pub const METADATA_PREFIX: &[u8] = b"metadata";
/// Suffix appended to the metadata seeds for edition records
pub const EDITION_SUFFIX: &[u8] = b"edition";
/// Constant seed of the Bubblegum collection CPI signer
pub const COLLECTION_CPI_PREFIX: &[u8] = b"collection_cpi";
/// Seed prefix of compressed asset ids
pub const ASSET_PREFIX: &[u8] = b"asset";

/// Derive a program address with the canonical bump search
///
/// # Errors
///
/// Returns `MinterError::Derivation` if no bump in `0..=255` yields an
/// off-curve point, or if the seeds violate the seed length limits.
pub fn derive(program_id: &Pubkey, seeds: &[&[u8]]) -> Result<(Pubkey, u8), MinterError> {
    Pubkey::try_find_program_address(seeds, program_id).ok_or(MinterError::Derivation {
        program: *program_id,
        seed_count: seeds.len(),
    })
}

/// Associated token account of `owner` for `mint`
pub fn token_account(
    owner: &Pubkey,
    mint: &Pubkey,
    token_program: &Pubkey,
) -> Result<Pubkey, MinterError> {
    let (address, _) = derive(
        &spl_associated_token_account::id(),
        &[owner.as_ref(), token_program.as_ref(), mint.as_ref()],
    )?;
    Ok(address)
}

/// Token Metadata record of `mint`
pub fn metadata_account(mint: &Pubkey) -> Result<Pubkey, MinterError> {
    let program = token_metadata::id();
    let (address, _) = derive(&program, &[METADATA_PREFIX, program.as_ref(), mint.as_ref()])?;
    Ok(address)
}

/// Master edition record of `mint`
pub fn edition_account(mint: &Pubkey) -> Result<Pubkey, MinterError> {
    let program = token_metadata::id();
    let (address, _) = derive(
        &program,
        &[
            METADATA_PREFIX,
            program.as_ref(),
            mint.as_ref(),
            EDITION_SUFFIX,
        ],
    )?;
    Ok(address)
}

/// Bubblegum tree config (authority) of `tree`
pub fn tree_authority(tree: &Pubkey) -> Result<Pubkey, MinterError> {
    let (address, _) = derive(&bubblegum::id(), &[tree.as_ref()])?;
    Ok(address)
}

/// Bubblegum signer used for collection verification CPIs
pub fn collection_cpi_signer() -> Result<Pubkey, MinterError> {
    let (address, _) = derive(&bubblegum::id(), &[COLLECTION_CPI_PREFIX])?;
    Ok(address)
}

/// Compressed asset id for leaf `leaf_index` of `tree`
pub fn asset_id(tree: &Pubkey, leaf_index: u64) -> Result<Pubkey, MinterError> {
    let index = leaf_index.to_le_bytes();
    let (address, _) = derive(&bubblegum::id(), &[ASSET_PREFIX, tree.as_ref(), &index])?;
    Ok(address)
}
