//! Uniform access to `VersionedMessage` headers and signer slots
//!
//! Envelopes are built as v0 messages, but wallets and tooling may hand back
//! legacy ones. Signature slots map one-to-one onto the first
//! `num_required_signatures` static account keys in both formats.

use solana_sdk::{
    message::{MessageHeader, VersionedMessage},
    pubkey::Pubkey,
};

/// Message header for either message version
#[inline]
#[must_use]
pub fn get_message_header(message: &VersionedMessage) -> &MessageHeader {
    match message {
        VersionedMessage::Legacy(legacy_msg) => &legacy_msg.header,
        VersionedMessage::V0(v0_msg) => &v0_msg.header,
    }
}

/// Static account keys (lookup-table addresses excluded)
#[inline]
#[must_use]
pub fn get_static_account_keys(message: &VersionedMessage) -> &[Pubkey] {
    match message {
        VersionedMessage::Legacy(legacy_msg) => &legacy_msg.account_keys,
        VersionedMessage::V0(v0_msg) => &v0_msg.account_keys,
    }
}

/// Keys that must sign, in signature-slot order
#[inline]
#[must_use]
pub fn get_required_signers(message: &VersionedMessage) -> &[Pubkey] {
    let num_signers = usize::from(get_message_header(message).num_required_signatures);
    let account_keys = get_static_account_keys(message);
    &account_keys[..num_signers.min(account_keys.len())]
}

/// Signature slot index of `signer`, if it is required
#[inline]
#[must_use]
pub fn signer_slot(message: &VersionedMessage, signer: &Pubkey) -> Option<usize> {
    get_required_signers(message)
        .iter()
        .position(|key| key == signer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::{
        hash::Hash,
        instruction::{AccountMeta, Instruction},
        message::{v0::Message as MessageV0, Message},
        signature::Keypair,
        signer::Signer,
    };

    fn cosigned_instruction(cosigner: &Pubkey) -> Instruction {
        Instruction::new_with_bytes(
            Pubkey::new_unique(),
            &[0],
            vec![
                AccountMeta::new_readonly(*cosigner, true),
                AccountMeta::new(Pubkey::new_unique(), false),
            ],
        )
    }

    #[test]
    fn test_v0_required_signers() {
        let payer = Keypair::new();
        let cosigner = Pubkey::new_unique();
        let message = MessageV0::try_compile(
            &payer.pubkey(),
            &[cosigned_instruction(&cosigner)],
            &[],
            Hash::default(),
        )
        .unwrap();
        let message = VersionedMessage::V0(message);

        assert_eq!(get_message_header(&message).num_required_signatures, 2);
        assert_eq!(get_required_signers(&message), &[payer.pubkey(), cosigner]);
        assert_eq!(signer_slot(&message, &cosigner), Some(1));
        assert!(get_static_account_keys(&message).len() >= 4);
    }

    #[test]
    fn test_legacy_required_signers() {
        let payer = Keypair::new();
        let cosigner = Pubkey::new_unique();
        let message = Message::new(&[cosigned_instruction(&cosigner)], Some(&payer.pubkey()));
        let message = VersionedMessage::Legacy(message);

        assert_eq!(get_required_signers(&message)[0], payer.pubkey());
        assert_eq!(signer_slot(&message, &Pubkey::new_unique()), None);
    }
}
