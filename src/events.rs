//! Change-log events and compressed asset identity
//!
//! Every append to a membership tree makes the compression program log a
//! change-log event through the Noop program. The event carries the tree id
//! and the index of the new leaf; together they determine the asset id.

use crate::rpc_manager::{FinalizedTransaction, LedgerRpc, RetryPolicy};
use crate::tx_builder::programs::noop;
use crate::tx_builder::{pda, MinterError};
use borsh::{BorshDeserialize, BorshSerialize};
use solana_sdk::{pubkey::Pubkey, signature::Signature};
use tokio_retry::RetryIf;
use tracing::{debug, info};

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq)]
pub(crate) struct PathNode {
    pub node: [u8; 32],
    pub index: u32,
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq)]
pub(crate) struct ChangeLogEventV1 {
    pub id: [u8; 32],
    pub path: Vec<PathNode>,
    pub seq: u64,
    pub index: u32,
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq)]
pub(crate) enum ChangeLogEvent {
    V1(ChangeLogEventV1),
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq)]
pub(crate) enum ApplicationDataEvent {
    V1 { application_data: Vec<u8> },
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq)]
pub(crate) enum AccountCompressionEvent {
    ChangeLog(ChangeLogEvent),
    ApplicationData(ApplicationDataEvent),
}

/// A decoded tree append
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeLog {
    pub tree: Pubkey,
    pub seq: u64,
    pub leaf_index: u32,
}

/// A compressed asset located in its tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssetIdentity {
    pub asset_id: Pubkey,
    pub tree: Pubkey,
    pub leaf_index: u32,
    pub seq: u64,
}

/// Change logs carried by `transaction`, in emission order
///
/// Noop payloads that are not change-log events are skipped.
pub fn decode_change_logs(transaction: &FinalizedTransaction) -> Vec<ChangeLog> {
    transaction
        .inner_instructions
        .iter()
        .filter(|ix| ix.program_id == noop::id())
        .filter_map(|ix| AccountCompressionEvent::try_from_slice(&ix.data).ok())
        .filter_map(|event| match event {
            AccountCompressionEvent::ChangeLog(ChangeLogEvent::V1(log)) => Some(ChangeLog {
                tree: Pubkey::new_from_array(log.id),
                seq: log.seq,
                leaf_index: log.index,
            }),
            AccountCompressionEvent::ApplicationData(_) => None,
        })
        .collect()
}

/// Asset minted into `tree` by `transaction`
pub fn asset_from_transaction(
    tree: &Pubkey,
    transaction: &FinalizedTransaction,
) -> Result<AssetIdentity, MinterError> {
    let logs = decode_change_logs(transaction);
    let log = logs
        .iter()
        .find(|log| log.tree == *tree)
        .ok_or_else(|| MinterError::internal("no change-log events"))?;

    let asset_id = pda::asset_id(tree, u64::from(log.leaf_index))?;
    Ok(AssetIdentity {
        asset_id,
        tree: *tree,
        leaf_index: log.leaf_index,
        seq: log.seq,
    })
}

/// Look up a finalized mint transaction and derive its asset id
pub async fn resolve_asset_id<L>(
    ledger: &L,
    tree: &Pubkey,
    signature: &Signature,
) -> Result<AssetIdentity, MinterError>
where
    L: LedgerRpc + ?Sized,
{
    let transaction = ledger.get_finalized_transaction(signature).await?;
    let identity = asset_from_transaction(tree, &transaction)?;
    debug!(
        signature = %signature,
        asset_id = %identity.asset_id,
        leaf_index = identity.leaf_index,
        "Resolved compressed asset"
    );
    Ok(identity)
}

/// [`resolve_asset_id`], retrying transient failures while the
/// transaction finalizes
pub async fn resolve_asset_id_with_retry<L>(
    ledger: &L,
    tree: &Pubkey,
    signature: &Signature,
    policy: &RetryPolicy,
) -> Result<AssetIdentity, MinterError>
where
    L: LedgerRpc + ?Sized,
{
    RetryIf::spawn(
        policy.strategy(),
        move || async move {
            let result = resolve_asset_id(ledger, tree, signature).await;
            if let Err(err) = &result {
                info!(signature = %signature, error = %err, "Asset lookup not ready");
            }
            result
        },
        |err: &MinterError| err.is_retryable(),
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc_manager::InnerInstruction;
    use crate::test_utils::MockLedger;

    fn quick_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 4,
            base_delay_ms: 1,
            max_delay_ms: 5,
        }
    }

    fn change_log_bytes(tree: &Pubkey, index: u32, seq: u64) -> Vec<u8> {
        borsh::to_vec(&AccountCompressionEvent::ChangeLog(ChangeLogEvent::V1(
            ChangeLogEventV1 {
                id: tree.to_bytes(),
                path: vec![PathNode {
                    node: [1; 32],
                    index: 1 << 14,
                }],
                seq,
                index,
            },
        )))
        .unwrap()
    }

    fn transaction_with(instructions: Vec<InnerInstruction>) -> FinalizedTransaction {
        FinalizedTransaction {
            slot: 1,
            log_messages: vec![],
            inner_instructions: instructions,
        }
    }

    #[test]
    fn test_decode_skips_foreign_payloads() {
        let tree = Pubkey::new_unique();
        let tx = transaction_with(vec![
            InnerInstruction {
                program_id: noop::id(),
                data: vec![9, 9, 9],
            },
            InnerInstruction {
                program_id: Pubkey::new_unique(),
                data: change_log_bytes(&Pubkey::new_unique(), 3, 3),
            },
            InnerInstruction {
                program_id: noop::id(),
                data: change_log_bytes(&tree, 7, 8),
            },
        ]);

        let logs = decode_change_logs(&tx);
        assert_eq!(
            logs,
            vec![ChangeLog {
                tree,
                seq: 8,
                leaf_index: 7
            }]
        );
    }

    #[test]
    fn test_asset_id_from_matching_tree() {
        let tree = Pubkey::new_unique();
        let other = Pubkey::new_unique();
        let tx = transaction_with(vec![
            InnerInstruction {
                program_id: noop::id(),
                data: change_log_bytes(&other, 1, 1),
            },
            InnerInstruction {
                program_id: noop::id(),
                data: change_log_bytes(&tree, 42, 43),
            },
        ]);

        let identity = asset_from_transaction(&tree, &tx).unwrap();
        assert_eq!(identity.leaf_index, 42);
        assert_eq!(identity.asset_id, pda::asset_id(&tree, 42).unwrap());
    }

    #[test]
    fn test_no_events_is_internal_error() {
        let err = asset_from_transaction(&Pubkey::new_unique(), &transaction_with(vec![]))
            .unwrap_err();
        assert!(matches!(err, MinterError::Internal(_)));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_permanent_lookup_failure_is_not_retried() {
        let ledger = MockLedger::new();
        ledger.fail_next_lookup("insufficient funds for rent").await;
        ledger.fail_next_lookup("insufficient funds for rent").await;

        let err = resolve_asset_id_with_retry(
            &ledger,
            &Pubkey::new_unique(),
            &Signature::from([3u8; 64]),
            &quick_policy(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, MinterError::Rpc { retryable: false, .. }));
        assert_eq!(ledger.lookup_calls(), 1);
    }

    #[tokio::test]
    async fn test_transient_lookup_failure_is_retried() {
        let ledger = MockLedger::new();
        let tree = Pubkey::new_unique();
        let signature = Signature::from([6u8; 64]);
        ledger.fail_next_lookup("request timed out").await;
        ledger
            .insert_finalized(
                signature,
                transaction_with(vec![InnerInstruction {
                    program_id: noop::id(),
                    data: change_log_bytes(&tree, 5, 6),
                }]),
            )
            .await;

        let identity = resolve_asset_id_with_retry(&ledger, &tree, &signature, &quick_policy())
            .await
            .unwrap();

        assert_eq!(identity.leaf_index, 5);
        assert_eq!(ledger.lookup_calls(), 2);
    }
}
