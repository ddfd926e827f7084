//! Signed envelope
//!
//! Holds a versioned transaction whose signature slots may be partially
//! filled. Partial envelopes are a valid intermediate state: the service
//! signs its slots, serializes, and the wallet fills the remaining ones.

use crate::tx_builder::errors::MinterError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use solana_sdk::{
    pubkey::Pubkey,
    signature::Signature,
    signer::Signer,
    transaction::VersionedTransaction,
};
use tracing::debug;

/// Transaction envelope with its required signer list
#[derive(Debug, Clone, PartialEq)]
pub struct SignedEnvelope {
    /// The built transaction
    pub tx: VersionedTransaction,

    /// Addresses that must sign, in signature-slot order
    pub required_signers: Vec<Pubkey>,
}

impl SignedEnvelope {
    /// Wrap a transaction, extracting the required signers from its header
    pub fn new(tx: VersionedTransaction) -> Self {
        let required_signers = crate::compat::get_required_signers(&tx.message).to_vec();
        Self {
            tx,
            required_signers,
        }
    }

    /// Fee payer (first signature slot)
    pub fn fee_payer(&self) -> Option<&Pubkey> {
        self.required_signers.first()
    }

    /// Put `signer`'s signature into its slot
    ///
    /// Re-signing with the same key rewrites the same (deterministic)
    /// signature, so the call is idempotent.
    ///
    /// # Errors
    ///
    /// `Signing` when the key is not a required signer of the message.
    pub fn sign(&mut self, signer: &dyn Signer) -> Result<(), MinterError> {
        let pubkey = signer
            .try_pubkey()
            .map_err(|e| MinterError::Signing(e.to_string()))?;
        let slot = crate::compat::signer_slot(&self.tx.message, &pubkey)
            .ok_or_else(|| {
                MinterError::Signing(format!("{} is not a required signer", pubkey))
            })?;

        if self.tx.signatures.len() < self.required_signers.len() {
            self.tx
                .signatures
                .resize(self.required_signers.len(), Signature::default());
        }

        let signature = signer
            .try_sign_message(&self.tx.message.serialize())
            .map_err(|e| MinterError::Signing(e.to_string()))?;
        self.tx.signatures[slot] = signature;
        debug!(signer = %pubkey, slot, "Applied signature");
        Ok(())
    }

    /// Signature currently held for `pubkey`, if it has signed
    pub fn signature_of(&self, pubkey: &Pubkey) -> Option<Signature> {
        let slot = self.required_signers.iter().position(|k| k == pubkey)?;
        self.tx
            .signatures
            .get(slot)
            .filter(|sig| **sig != Signature::default())
            .copied()
    }

    /// Required signers whose slot is still empty
    pub fn missing_signers(&self) -> Vec<Pubkey> {
        self.required_signers
            .iter()
            .filter(|key| self.signature_of(key).is_none())
            .copied()
            .collect()
    }

    /// Every required slot carries a signature that verifies
    pub fn is_fully_signed(&self) -> bool {
        self.missing_signers().is_empty() && self.verify()
    }

    /// Whether every present signature verifies (empty slots fail)
    pub fn verify(&self) -> bool {
        self.tx.verify_with_results().iter().all(|ok| *ok)
    }

    /// Wire form returned to wallets
    pub fn to_base64(&self) -> Result<String, MinterError> {
        let bytes = bincode::serialize(&self.tx)
            .map_err(|e| MinterError::internal(format!("envelope serialization: {}", e)))?;
        Ok(STANDARD.encode(bytes))
    }

    /// Parse the wire form
    pub fn from_base64(encoded: &str) -> Result<Self, MinterError> {
        let bytes = STANDARD
            .decode(encoded)
            .map_err(|e| MinterError::internal(format!("envelope base64: {}", e)))?;
        let tx: VersionedTransaction = bincode::deserialize(&bytes)
            .map_err(|e| MinterError::internal(format!("envelope decode: {}", e)))?;
        Ok(Self::new(tx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::{
        hash::Hash,
        instruction::{AccountMeta, Instruction},
        message::{v0, VersionedMessage},
        signature::Keypair,
    };

    fn two_signer_envelope(payer: &Keypair, other: &Keypair) -> SignedEnvelope {
        let ix = Instruction::new_with_bytes(
            Pubkey::new_unique(),
            &[1],
            vec![AccountMeta::new_readonly(other.pubkey(), true)],
        );
        let message =
            v0::Message::try_compile(&payer.pubkey(), &[ix], &[], Hash::new_unique()).unwrap();
        let tx = VersionedTransaction {
            signatures: vec![Signature::default(); 2],
            message: VersionedMessage::V0(message),
        };
        SignedEnvelope::new(tx)
    }

    #[test]
    fn test_partial_then_complete() {
        let payer = Keypair::new();
        let other = Keypair::new();
        let mut envelope = two_signer_envelope(&payer, &other);
        assert_eq!(envelope.missing_signers().len(), 2);

        envelope.sign(&other).unwrap();
        assert_eq!(envelope.missing_signers(), vec![payer.pubkey()]);
        assert!(!envelope.is_fully_signed());

        envelope.sign(&payer).unwrap();
        assert!(envelope.is_fully_signed());
    }

    #[test]
    fn test_sign_is_idempotent() {
        let payer = Keypair::new();
        let other = Keypair::new();
        let mut envelope = two_signer_envelope(&payer, &other);

        envelope.sign(&payer).unwrap();
        let first = envelope.clone();
        envelope.sign(&payer).unwrap();
        assert_eq!(first, envelope);
    }

    #[test]
    fn test_foreign_signer_rejected() {
        let payer = Keypair::new();
        let other = Keypair::new();
        let mut envelope = two_signer_envelope(&payer, &other);

        let err = envelope.sign(&Keypair::new()).unwrap_err();
        assert!(matches!(err, MinterError::Signing(_)));
    }

    #[test]
    fn test_base64_preserves_partial_signatures() {
        let payer = Keypair::new();
        let other = Keypair::new();
        let mut envelope = two_signer_envelope(&payer, &other);
        envelope.sign(&other).unwrap();

        let decoded = SignedEnvelope::from_base64(&envelope.to_base64().unwrap()).unwrap();
        assert_eq!(decoded, envelope);
        assert_eq!(decoded.missing_signers(), vec![payer.pubkey()]);
    }
}
