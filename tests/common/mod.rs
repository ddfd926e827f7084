//! Shared fixtures for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use cnft_minter::catalog::{CatalogItem, FixedChoice, StaticCatalog};
use cnft_minter::config::Config;
use cnft_minter::rpc_manager::{FinalizedTransaction, LedgerRpc, RpcManagerError};
use cnft_minter::solana_pay::Responder;
use cnft_minter::wallet::ServiceIdentity;
use solana_sdk::{
    hash::Hash, pubkey::Pubkey, signature::Keypair, signature::Signature,
    transaction::VersionedTransaction,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// In-memory ledger with a fixed blockhash and scripted rejections
#[derive(Default)]
pub struct StubLedger {
    pub reject_with: Mutex<Option<String>>,
    pub finalized: Mutex<HashMap<Signature, FinalizedTransaction>>,
}

impl StubLedger {
    pub fn blockhash() -> Hash {
        Hash::new_from_array([3u8; 32])
    }
}

#[async_trait]
impl LedgerRpc for StubLedger {
    async fn get_balance(&self, _address: &Pubkey) -> Result<u64, RpcManagerError> {
        Ok(1_000_000_000)
    }

    async fn get_latest_blockhash(&self) -> Result<Hash, RpcManagerError> {
        Ok(Self::blockhash())
    }

    async fn get_minimum_rent_exempt_balance(
        &self,
        size: usize,
    ) -> Result<u64, RpcManagerError> {
        Ok((128 + size as u64) * 6_960)
    }

    async fn submit_transaction(
        &self,
        transaction: &VersionedTransaction,
    ) -> Result<Signature, RpcManagerError> {
        let rejection = self.reject_with.lock().unwrap().take();
        match rejection {
            Some(text) => Err(RpcManagerError::classify(&text, "stub", "send_transaction")),
            None => Ok(transaction.signatures[0]),
        }
    }

    async fn get_finalized_transaction(
        &self,
        signature: &Signature,
    ) -> Result<FinalizedTransaction, RpcManagerError> {
        self.finalized
            .lock()
            .unwrap()
            .get(signature)
            .cloned()
            .ok_or_else(|| RpcManagerError::NotFound {
                operation: "get_transaction",
                what: signature.to_string(),
            })
    }
}

pub fn configured(items: Vec<CatalogItem>) -> Config {
    let mut config = Config::default();
    config.collection.collection_address = Some(Pubkey::new_unique().to_string());
    config.collection.tree_address = Some(Pubkey::new_unique().to_string());
    config.catalog = items;
    config
}

pub fn responder(config: &Config) -> Arc<Responder> {
    Arc::new(
        Responder::new(
            config,
            Arc::new(StubLedger::default()),
            Arc::new(StaticCatalog::new(config.catalog.clone())),
            Arc::new(FixedChoice(0)),
            ServiceIdentity::from_keypair(Keypair::new()),
        )
        .expect("configured responder"),
    )
}
