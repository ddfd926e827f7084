//! [`LedgerRpc`] over the nonblocking Solana RPC client

use super::{FinalizedTransaction, InnerInstruction, LedgerRpc, RpcManagerError};
use crate::metrics::Timer;
use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_rpc_client_api::config::RpcTransactionConfig;
use solana_sdk::{
    commitment_config::CommitmentConfig, hash::Hash, pubkey::Pubkey, signature::Signature,
    transaction::VersionedTransaction,
};
use solana_transaction_status::{
    EncodedConfirmedTransactionWithStatusMeta, UiInnerInstructions, UiInstruction,
    UiLoadedAddresses, UiTransactionEncoding,
};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Ledger access through a single RPC endpoint
#[derive(Clone)]
pub struct SolanaLedger {
    client: Arc<RpcClient>,
    endpoint: String,
}

impl std::fmt::Debug for SolanaLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SolanaLedger")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl SolanaLedger {
    pub fn new(url: &str, timeout: Duration, commitment: CommitmentConfig) -> Self {
        Self {
            client: Arc::new(RpcClient::new_with_timeout_and_commitment(
                url.to_string(),
                timeout,
                commitment,
            )),
            endpoint: url.to_string(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn map_err(&self, operation: &'static str) -> impl Fn(solana_client::client_error::ClientError) -> RpcManagerError + '_ {
        move |err| {
            let err = RpcManagerError::from_client_error(err, &self.endpoint, operation);
            warn!(endpoint = %self.endpoint, operation, error = %err, "Ledger call failed");
            err
        }
    }
}

#[async_trait]
impl LedgerRpc for SolanaLedger {
    async fn get_balance(&self, address: &Pubkey) -> Result<u64, RpcManagerError> {
        let timer = Timer::new();
        let result = self
            .client
            .get_balance(address)
            .await
            .map_err(self.map_err("get_balance"));
        timer.observe_rpc("get_balance");
        result
    }

    async fn get_latest_blockhash(&self) -> Result<Hash, RpcManagerError> {
        let timer = Timer::new();
        let result = self
            .client
            .get_latest_blockhash()
            .await
            .map_err(self.map_err("get_latest_blockhash"));
        timer.observe_rpc("get_latest_blockhash");
        result
    }

    async fn get_minimum_rent_exempt_balance(
        &self,
        size: usize,
    ) -> Result<u64, RpcManagerError> {
        let timer = Timer::new();
        let result = self
            .client
            .get_minimum_balance_for_rent_exemption(size)
            .await
            .map_err(self.map_err("get_minimum_rent_exempt_balance"));
        timer.observe_rpc("get_minimum_rent_exempt_balance");
        result
    }

    async fn submit_transaction(
        &self,
        transaction: &VersionedTransaction,
    ) -> Result<Signature, RpcManagerError> {
        let timer = Timer::new();
        let result = self
            .client
            .send_transaction(transaction)
            .await
            .map_err(self.map_err("submit_transaction"));
        timer.observe_rpc("submit_transaction");
        result
    }

    async fn get_finalized_transaction(
        &self,
        signature: &Signature,
    ) -> Result<FinalizedTransaction, RpcManagerError> {
        let timer = Timer::new();
        let config = RpcTransactionConfig {
            encoding: Some(UiTransactionEncoding::Base64),
            commitment: Some(CommitmentConfig::finalized()),
            max_supported_transaction_version: Some(0),
        };
        let result = self
            .client
            .get_transaction_with_config(signature, config)
            .await;
        timer.observe_rpc("get_finalized_transaction");

        match result {
            Ok(encoded) => decode_finalized(encoded),
            Err(err) => {
                let text = err.to_string();
                // The node answers `null` (surfaced as an invalid type) until finalized
                if text.contains("invalid type: null") || text.contains("not found") {
                    debug!(signature = %signature, "Transaction not finalized yet");
                    Err(RpcManagerError::NotFound {
                        operation: "get_finalized_transaction",
                        what: signature.to_string(),
                    })
                } else {
                    Err(self.map_err("get_finalized_transaction")(err))
                }
            }
        }
    }
}

/// Flatten inner instructions and resolve their program ids
fn decode_finalized(
    encoded: EncodedConfirmedTransactionWithStatusMeta,
) -> Result<FinalizedTransaction, RpcManagerError> {
    let slot = encoded.slot;
    let transaction = encoded
        .transaction
        .transaction
        .decode()
        .ok_or_else(|| RpcManagerError::Internal("undecodable transaction".into()))?;
    let meta = encoded
        .transaction
        .meta
        .ok_or_else(|| RpcManagerError::Internal("transaction has no status meta".into()))?;

    let mut account_keys: Vec<Pubkey> =
        crate::compat::get_static_account_keys(&transaction.message).to_vec();
    if let Some(loaded) = Option::<UiLoadedAddresses>::from(meta.loaded_addresses) {
        for key in loaded.writable.iter().chain(loaded.readonly.iter()) {
            let key = Pubkey::from_str(key)
                .map_err(|e| RpcManagerError::Internal(format!("loaded address: {}", e)))?;
            account_keys.push(key);
        }
    }

    let mut inner_instructions = Vec::new();
    let groups = Option::<Vec<UiInnerInstructions>>::from(meta.inner_instructions);
    for group in groups.unwrap_or_default() {
        for instruction in group.instructions {
            let UiInstruction::Compiled(compiled) = instruction else {
                continue;
            };
            let Some(program_id) = account_keys.get(compiled.program_id_index as usize) else {
                continue;
            };
            let Ok(data) = bs58::decode(&compiled.data).into_vec() else {
                continue;
            };
            inner_instructions.push(InnerInstruction {
                program_id: *program_id,
                data,
            });
        }
    }

    Ok(FinalizedTransaction {
        slot,
        log_messages: Option::<Vec<String>>::from(meta.log_messages).unwrap_or_default(),
        inner_instructions,
    })
}
