//! Test Utilities Module
//!
//! A scripted in-memory ledger so composers, the assembler and the responder
//! can be exercised without a network.
//!
//! These utilities are only compiled when running tests or when the
//! `test_utils` feature is enabled.

#![cfg(any(test, feature = "test_utils"))]

use crate::catalog::{CatalogItem, StaticCatalog};
use crate::config::Config;
use crate::rpc_manager::{FinalizedTransaction, LedgerRpc, RpcManagerError};
use async_trait::async_trait;
use solana_sdk::{
    hash::Hash, pubkey::Pubkey, signature::Signature, transaction::VersionedTransaction,
};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Blockhash every [`MockLedger`] hands out
pub const MOCK_BLOCKHASH: Hash = Hash::new_from_array([7u8; 32]);

/// Lamports per byte-year times the exemption threshold, as on mainnet
const RENT_LAMPORTS_PER_BYTE: u64 = 3_480 * 2;

/// Fixed per-account storage overhead counted by rent
const ACCOUNT_STORAGE_OVERHEAD: u64 = 128;

/// Mock ledger for testing
///
/// Rent is a linear function of size, the blockhash never changes, and
/// submission failures can be scripted ahead of time.
#[derive(Default)]
pub struct MockLedger {
    balances: Mutex<HashMap<Pubkey, u64>>,
    submit_failures: Mutex<VecDeque<String>>,
    lookup_failures: Mutex<VecDeque<String>>,
    submitted: Mutex<Vec<VersionedTransaction>>,
    finalized: Mutex<HashMap<Signature, FinalizedTransaction>>,
    unavailable: Mutex<bool>,
    blockhash_calls: AtomicUsize,
    lookup_calls: AtomicUsize,
}

impl MockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rent the mock charges for `size` bytes
    pub fn rent_for(size: usize) -> u64 {
        (ACCOUNT_STORAGE_OVERHEAD + size as u64) * RENT_LAMPORTS_PER_BYTE
    }

    pub async fn set_balance(&self, address: Pubkey, lamports: u64) {
        self.balances.lock().await.insert(address, lamports);
    }

    /// Make every call fail as if the node were down
    pub async fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.lock().await = unavailable;
    }

    /// Reject the next submission with `error_text`
    pub async fn fail_next_submit(&self, error_text: impl Into<String>) {
        self.submit_failures.lock().await.push_back(error_text.into());
    }

    /// Fail the next transaction lookup with `error_text`
    pub async fn fail_next_lookup(&self, error_text: impl Into<String>) {
        self.lookup_failures.lock().await.push_back(error_text.into());
    }

    /// Record a finalized transaction for lookups
    pub async fn insert_finalized(&self, signature: Signature, transaction: FinalizedTransaction) {
        self.finalized.lock().await.insert(signature, transaction);
    }

    pub async fn submitted(&self) -> Vec<VersionedTransaction> {
        self.submitted.lock().await.clone()
    }

    pub fn blockhash_calls(&self) -> usize {
        self.blockhash_calls.load(Ordering::SeqCst)
    }

    pub fn lookup_calls(&self) -> usize {
        self.lookup_calls.load(Ordering::SeqCst)
    }

    async fn check_available(&self, operation: &'static str) -> Result<(), RpcManagerError> {
        if *self.unavailable.lock().await {
            return Err(RpcManagerError::Transport {
                endpoint: "mock".to_string(),
                operation,
                message: "connection refused".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerRpc for MockLedger {
    async fn get_balance(&self, address: &Pubkey) -> Result<u64, RpcManagerError> {
        self.check_available("get_balance").await?;
        Ok(self.balances.lock().await.get(address).copied().unwrap_or(0))
    }

    async fn get_latest_blockhash(&self) -> Result<Hash, RpcManagerError> {
        self.check_available("get_latest_blockhash").await?;
        self.blockhash_calls.fetch_add(1, Ordering::SeqCst);
        Ok(MOCK_BLOCKHASH)
    }

    async fn get_minimum_rent_exempt_balance(
        &self,
        size: usize,
    ) -> Result<u64, RpcManagerError> {
        self.check_available("get_minimum_balance_for_rent_exemption")
            .await?;
        Ok(Self::rent_for(size))
    }

    async fn submit_transaction(
        &self,
        transaction: &VersionedTransaction,
    ) -> Result<Signature, RpcManagerError> {
        self.check_available("send_transaction").await?;
        if let Some(text) = self.submit_failures.lock().await.pop_front() {
            return Err(RpcManagerError::classify(&text, "mock", "send_transaction"));
        }
        self.submitted.lock().await.push(transaction.clone());
        Ok(transaction.signatures.first().copied().unwrap_or_default())
    }

    async fn get_finalized_transaction(
        &self,
        signature: &Signature,
    ) -> Result<FinalizedTransaction, RpcManagerError> {
        self.check_available("get_transaction").await?;
        self.lookup_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(text) = self.lookup_failures.lock().await.pop_front() {
            return Err(RpcManagerError::classify(&text, "mock", "get_transaction"));
        }
        self.finalized
            .lock()
            .await
            .get(signature)
            .cloned()
            .ok_or_else(|| RpcManagerError::NotFound {
                operation: "get_transaction",
                what: signature.to_string(),
            })
    }
}

/// Configuration with every mint address filled in
pub fn mint_ready_config(collection: Pubkey, tree: Pubkey) -> Config {
    let mut config = Config::default();
    config.collection.collection_address = Some(collection.to_string());
    config.collection.tree_address = Some(tree.to_string());
    config
}

/// Catalog of `count` demo-derived items keyed `item-0`, `item-1`, ...
pub fn demo_catalog(count: usize) -> Arc<StaticCatalog> {
    let items = (0..count)
        .map(|i| {
            let mut item = CatalogItem::demo();
            item.key = format!("item-{}", i);
            item.metadata.name = format!("Demo #{}", i + 1);
            item
        })
        .collect();
    Arc::new(StaticCatalog::new(items))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_submit_failure() {
        let ledger = MockLedger::new();
        ledger
            .fail_next_submit("Transaction simulation failed: Blockhash not found")
            .await;
        let tx = VersionedTransaction::default();

        let err = ledger.submit_transaction(&tx).await.unwrap_err();
        assert!(matches!(err, RpcManagerError::BlockhashNotFound { .. }));
        assert!(ledger.submit_transaction(&tx).await.is_ok());
        assert_eq!(ledger.submitted().await.len(), 1);
    }

    #[tokio::test]
    async fn test_rent_is_linear() {
        let ledger = MockLedger::new();
        let small = ledger.get_minimum_rent_exempt_balance(10).await.unwrap();
        let large = ledger.get_minimum_rent_exempt_balance(20).await.unwrap();
        assert_eq!(large - small, 10 * RENT_LAMPORTS_PER_BYTE);
    }
}
