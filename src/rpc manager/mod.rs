//! RPC Manager Module
//!
//! The ledger is consumed through the [`LedgerRpc`] trait so the composers,
//! the assembler and the operational commands can run against a real node or
//! a scripted mock. Every call is a suspension point and every failure is
//! surfaced as an [`RpcManagerError`].

use async_trait::async_trait;
use solana_sdk::{
    hash::Hash, pubkey::Pubkey, signature::Signature, transaction::VersionedTransaction,
};

// Submodules
pub mod ledger;
pub mod rpc_errors;
pub mod submission;

// Re-exports for convenience
pub use ledger::SolanaLedger;
pub use rpc_errors::{RetryPolicy, RpcManagerError};
pub use submission::{
    explorer_url, extract_signature, submit_with_resolution, ExplorerTarget, SubmissionFailure,
};

/// Instruction executed by a program during another instruction (a CPI)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InnerInstruction {
    pub program_id: Pubkey,
    pub data: Vec<u8>,
}

/// The parts of a finalized transaction this service inspects
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FinalizedTransaction {
    pub slot: u64,
    pub log_messages: Vec<String>,
    pub inner_instructions: Vec<InnerInstruction>,
}

/// Ledger RPC contract
#[async_trait]
pub trait LedgerRpc: Send + Sync {
    /// Balance in lamports
    async fn get_balance(&self, address: &Pubkey) -> Result<u64, RpcManagerError>;

    /// Recent blockhash used as the freshness token of new envelopes
    async fn get_latest_blockhash(&self) -> Result<Hash, RpcManagerError>;

    /// Lamports required for an account of `size` bytes to be rent exempt
    async fn get_minimum_rent_exempt_balance(&self, size: usize)
        -> Result<u64, RpcManagerError>;

    /// Submit a fully signed envelope
    async fn submit_transaction(
        &self,
        transaction: &VersionedTransaction,
    ) -> Result<Signature, RpcManagerError>;

    /// Fetch a finalized transaction; `NotFound` until it finalizes
    async fn get_finalized_transaction(
        &self,
        signature: &Signature,
    ) -> Result<FinalizedTransaction, RpcManagerError>;
}
