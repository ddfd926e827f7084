//! Transaction-assembly core
//!
//! ## Architecture
//!
//! - **pda**: program-derived addresses (pure)
//! - **programs**: program ids and instruction payload encodings
//! - **tree**: membership tree sizing and validation
//! - **instructions**: ordered instruction plans for the collection, tree
//!   and mint flows
//! - **builder**: envelope assembly (freshness token + signatures)
//! - **output**: partially or fully signed envelope
//! - **errors**: error taxonomy
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use cnft_minter::tx_builder::{
//!     compose_mint_to_collection, CollectionTarget, MintActors, TxAssembler,
//! };
//! # use cnft_minter::tx_builder::{MetadataArgs, MinterError};
//! # use solana_sdk::{pubkey::Pubkey, signature::Keypair, signer::Signer};
//! # async fn example(
//! #     assembler: TxAssembler,
//! #     service: Keypair,
//! #     tree: Pubkey,
//! #     collection_mint: Pubkey,
//! #     payer: Pubkey,
//! #     metadata: MetadataArgs,
//! # ) -> Result<(), MinterError> {
//! let plan = compose_mint_to_collection(
//!     &service.pubkey(),
//!     &tree,
//!     &MintActors::for_payer(service.pubkey(), payer),
//!     &metadata,
//!     &CollectionTarget::new(collection_mint, service.pubkey()),
//! )?;
//! let envelope = assembler.assemble_plan(&plan, None, &[&service]).await?;
//! assert_eq!(envelope.missing_signers(), vec![payer]);
//! # Ok(())
//! # }
//! ```

// Public API - Error types
pub mod errors;
pub use errors::MinterError;

pub mod builder;
pub mod instructions;
pub mod output;
pub mod pda;
pub mod programs;
pub mod tree;

// Re-export key types for convenience
pub use builder::{assemble_with_blockhash, TxAssembler};
pub use instructions::{
    compose_create_collection, compose_create_tree, compose_mint_to_collection,
    plan_create_collection, plan_create_tree, validate_creators, CollectionActors,
    CollectionOptions, CollectionTarget, InstructionPlan, MintActors, TreeActors,
};
pub use output::SignedEnvelope;
pub use programs::{
    Collection, CollectionMetadata, Creator, MetadataArgs, TokenProgramVersion, TokenStandard,
};
pub use tree::{DepthSizePair, TreeShape};
