//! Transaction assembly
//!
//! Wraps an ordered instruction list, a fee payer and a freshness token
//! (recent blockhash) into one v0 envelope and applies the supplied
//! signatures. Instruction order is kept exactly as given.

use super::errors::MinterError;
use super::instructions::InstructionPlan;
use super::output::SignedEnvelope;
use crate::metrics::{metrics, Timer};
use crate::rpc_manager::LedgerRpc;
use solana_sdk::{
    hash::Hash,
    instruction::Instruction,
    message::{v0, VersionedMessage},
    pubkey::Pubkey,
    signature::Signature,
    signer::Signer,
    transaction::VersionedTransaction,
};
use std::sync::Arc;
use tracing::debug;

/// Compile and sign with a known blockhash (no ledger access)
pub fn assemble_with_blockhash(
    fee_payer: &Pubkey,
    instructions: &[Instruction],
    blockhash: Hash,
    signers: &[&(dyn Signer + Sync)],
) -> Result<SignedEnvelope, MinterError> {
    if instructions.is_empty() {
        return Err(MinterError::internal("cannot assemble an empty instruction list"));
    }

    let message = v0::Message::try_compile(fee_payer, instructions, &[], blockhash)
        .map_err(|e| MinterError::Assembly(format!("message compile: {}", e)))?;
    let num_signatures = usize::from(message.header.num_required_signatures);

    let mut envelope = SignedEnvelope::new(VersionedTransaction {
        signatures: vec![Signature::default(); num_signatures],
        message: VersionedMessage::V0(message),
    });
    for signer in signers {
        envelope.sign(*signer)?;
    }

    debug!(
        fee_payer = %fee_payer,
        instructions = instructions.len(),
        required = envelope.required_signers.len(),
        missing = envelope.missing_signers().len(),
        "Assembled envelope"
    );
    Ok(envelope)
}

/// Assembler bound to a ledger for freshness tokens
#[derive(Clone)]
pub struct TxAssembler {
    ledger: Arc<dyn LedgerRpc>,
}

impl std::fmt::Debug for TxAssembler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TxAssembler").finish_non_exhaustive()
    }
}

impl TxAssembler {
    pub fn new(ledger: Arc<dyn LedgerRpc>) -> Self {
        Self { ledger }
    }

    /// Build and sign an envelope
    ///
    /// When `freshness` is `None` the latest blockhash is fetched, which may
    /// fail with an RPC error.
    pub async fn assemble(
        &self,
        fee_payer: &Pubkey,
        instructions: &[Instruction],
        freshness: Option<Hash>,
        signers: &[&(dyn Signer + Sync)],
    ) -> Result<SignedEnvelope, MinterError> {
        let timer = Timer::new();
        let blockhash = match freshness {
            Some(hash) => hash,
            None => self.ledger.get_latest_blockhash().await?,
        };
        let envelope = assemble_with_blockhash(fee_payer, instructions, blockhash, signers)?;
        timer.observe_duration(&metrics().build_latency);
        Ok(envelope)
    }

    /// Assemble a composer plan with its own fee payer
    pub async fn assemble_plan(
        &self,
        plan: &InstructionPlan,
        freshness: Option<Hash>,
        signers: &[&(dyn Signer + Sync)],
    ) -> Result<SignedEnvelope, MinterError> {
        self.assemble(&plan.fee_payer, &plan.instructions, freshness, signers)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::{instruction::AccountMeta, signature::Keypair};

    #[test]
    fn test_keeps_instruction_order() {
        let payer = Keypair::new();
        let programs: Vec<Pubkey> = (0..4).map(|_| Pubkey::new_unique()).collect();
        let shared = Pubkey::new_unique();
        let instructions: Vec<Instruction> = programs
            .iter()
            .map(|p| Instruction::new_with_bytes(*p, &[0], vec![AccountMeta::new(shared, false)]))
            .collect();
        // Same instruction twice must survive as two entries
        let mut doubled = instructions.clone();
        doubled.push(instructions[0].clone());

        let envelope =
            assemble_with_blockhash(&payer.pubkey(), &doubled, Hash::new_unique(), &[&payer])
                .unwrap();

        let keys = crate::compat::get_static_account_keys(&envelope.tx.message);
        let executed: Vec<Pubkey> = envelope
            .tx
            .message
            .instructions()
            .iter()
            .map(|ix| keys[ix.program_id_index as usize])
            .collect();
        let mut expected = programs.clone();
        expected.push(programs[0]);
        assert_eq!(executed, expected);
        assert!(envelope.is_fully_signed());
    }

    #[test]
    fn test_empty_list_rejected() {
        let payer = Keypair::new();
        assert!(assemble_with_blockhash(&payer.pubkey(), &[], Hash::default(), &[]).is_err());
    }

    #[test]
    fn test_unsigned_slots_are_default() {
        let payer = Keypair::new();
        let ix = Instruction::new_with_bytes(
            Pubkey::new_unique(),
            &[0],
            vec![AccountMeta::new(Pubkey::new_unique(), false)],
        );
        let envelope =
            assemble_with_blockhash(&payer.pubkey(), &[ix], Hash::new_unique(), &[]).unwrap();
        assert_eq!(envelope.tx.signatures, vec![Signature::default()]);
        assert_eq!(envelope.missing_signers(), vec![payer.pubkey()]);
    }

    #[test]
    fn test_compile_failure_is_an_assembly_error() {
        let payer = Keypair::new();
        // More distinct accounts than a message can index
        let accounts = (0..300)
            .map(|_| AccountMeta::new_readonly(Pubkey::new_unique(), false))
            .collect();
        let ix = Instruction::new_with_bytes(Pubkey::new_unique(), &[0], accounts);

        let err = assemble_with_blockhash(&payer.pubkey(), &[ix], Hash::new_unique(), &[&payer])
            .unwrap_err();
        assert!(matches!(err, MinterError::Assembly(_)));
        assert!(!err.is_retryable());
    }
}
