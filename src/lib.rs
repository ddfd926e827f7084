//! cNFT Minter - compressed NFT minting over Solana Pay
//!
//! The library builds everything the service and its operational commands
//! need: address derivation, instruction composition for collections, trees
//! and compressed mints, envelope assembly and partial signing, and the
//! two-phase Solana Pay responder.

pub mod catalog;
pub mod compat;
pub mod config;
pub mod endpoints;
pub mod events;
pub mod metrics;
pub mod observability;
pub mod solana_pay;
pub mod storage;
pub mod structured_logging;
pub mod test_utils;
pub mod tx_builder;
pub mod wallet;

// Component modules with non-standard paths (directories with spaces)
#[path = "rpc manager/mod.rs"]
pub mod rpc_manager;

// Re-export commonly used types
pub use solana_sdk::{message::VersionedMessage, pubkey::Pubkey, signature::Signature};
pub use tx_builder::{MinterError, SignedEnvelope};
