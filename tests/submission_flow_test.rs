//! Integration tests for submission and asset lookup
//!
//! This test validates:
//! - Successful submission returns the envelope signature
//! - Rejections resolve the failed signature and its program logs
//! - Asset lookups give up once the retry budget is spent

mod common;

use cnft_minter::events::resolve_asset_id_with_retry;
use cnft_minter::rpc_manager::{submit_with_resolution, FinalizedTransaction, RetryPolicy};
use cnft_minter::tx_builder::assemble_with_blockhash;
use common::StubLedger;
use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signature},
    signer::Signer,
    system_instruction,
    transaction::VersionedTransaction,
};

fn signed_transfer() -> (Keypair, VersionedTransaction) {
    let payer = Keypair::new();
    let ix = system_instruction::transfer(&payer.pubkey(), &Pubkey::new_unique(), 1_000);
    let signers: [&(dyn Signer + Sync); 1] = [&payer];
    let envelope =
        assemble_with_blockhash(&payer.pubkey(), &[ix], StubLedger::blockhash(), &signers)
            .expect("assemble");
    (payer, envelope.tx)
}

#[tokio::test]
async fn test_submission_returns_signature() {
    let ledger = StubLedger::default();
    let (_payer, tx) = signed_transfer();

    let signature = submit_with_resolution(&ledger, &tx, "devnet", true)
        .await
        .expect("accepted");

    assert_eq!(signature, tx.signatures[0]);
}

#[tokio::test]
async fn test_rejection_resolves_logs() {
    let ledger = StubLedger::default();
    let (_payer, tx) = signed_transfer();
    let failed = Signature::from([9u8; 64]);

    *ledger.reject_with.lock().unwrap() = Some(format!(
        "SendTransactionError: Transaction {} resulted in an error.",
        failed
    ));
    ledger.finalized.lock().unwrap().insert(
        failed,
        FinalizedTransaction {
            slot: 42,
            log_messages: vec!["Program log: custom program error: 0x1".to_string()],
            inner_instructions: vec![],
        },
    );

    let failure = submit_with_resolution(&ledger, &tx, "devnet", true)
        .await
        .unwrap_err();

    assert_eq!(failure.signature, Some(failed));
    assert_eq!(
        failure.logs,
        Some(vec!["Program log: custom program error: 0x1".to_string()])
    );
    assert!(failure.to_string().contains(&failed.to_string()));
}

#[tokio::test]
async fn test_rejection_without_signature_has_no_logs() {
    let ledger = StubLedger::default();
    let (_payer, tx) = signed_transfer();
    *ledger.reject_with.lock().unwrap() = Some("Blockhash not found".to_string());

    let failure = submit_with_resolution(&ledger, &tx, "devnet", true)
        .await
        .unwrap_err();

    assert!(failure.signature.is_none());
    assert!(failure.logs.is_none());
}

#[tokio::test]
async fn test_asset_lookup_gives_up_after_retries() {
    let ledger = StubLedger::default();
    let policy = RetryPolicy {
        max_attempts: 2,
        base_delay_ms: 1,
        max_delay_ms: 5,
    };

    let err = resolve_asset_id_with_retry(
        &ledger,
        &Pubkey::new_unique(),
        &Signature::from([4u8; 64]),
        &policy,
    )
    .await
    .unwrap_err();

    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_asset_lookup_without_change_log_fails_fast() {
    let ledger = StubLedger::default();
    let signature = Signature::from([5u8; 64]);
    ledger
        .finalized
        .lock()
        .unwrap()
        .insert(signature, FinalizedTransaction::default());

    let err = resolve_asset_id_with_retry(
        &ledger,
        &Pubkey::new_unique(),
        &signature,
        &RetryPolicy::finalization(),
    )
    .await
    .unwrap_err();

    assert!(!err.is_retryable());
}
