#![allow(unused_imports)]
//! Instruction Ordering Tests
//!
//! The assembled envelope must execute instructions exactly in composer
//! order for all three flows:
//! - collection: create account, init mint, ATA, metadata, mint, edition
//! - tree: allocate, create_tree (+ set_tree_delegate)
//! - mint: a single mint_to_collection_v1

#[cfg(test)]
mod instruction_ordering_tests {
    use crate::test_utils::MOCK_BLOCKHASH;
    use crate::tx_builder::programs::{anchor_discriminator, bubblegum, token_metadata};
    use crate::tx_builder::{
        assemble_with_blockhash, plan_create_collection, plan_create_tree, CollectionActors,
        CollectionMetadata, CollectionOptions, DepthSizePair, InstructionPlan, SignedEnvelope,
        TreeActors, TreeShape,
    };
    use solana_sdk::{pubkey::Pubkey, signature::Keypair, signer::Signer, system_program};

    /// Program ids in the order the compiled message executes them
    fn executed_programs(envelope: &SignedEnvelope) -> Vec<Pubkey> {
        let keys = crate::compat::get_static_account_keys(&envelope.tx.message);
        envelope
            .tx
            .message
            .instructions()
            .iter()
            .map(|ix| keys[usize::from(ix.program_id_index)])
            .collect()
    }

    fn executed_data(envelope: &SignedEnvelope) -> Vec<Vec<u8>> {
        envelope
            .tx
            .message
            .instructions()
            .iter()
            .map(|ix| ix.data.clone())
            .collect()
    }

    fn assemble(plan: &InstructionPlan, signers: &[&(dyn Signer + Sync)]) -> SignedEnvelope {
        assemble_with_blockhash(&plan.fee_payer, &plan.instructions, MOCK_BLOCKHASH, signers)
            .unwrap()
    }

    fn metadata() -> CollectionMetadata {
        CollectionMetadata {
            name: "DevRel Demos".into(),
            symbol: "DEV".into(),
            uri: "https://example.com/collection.json".into(),
            seller_fee_basis_points: 0,
            creators: vec![],
            is_mutable: true,
        }
    }

    #[test]
    fn test_collection_order_survives_assembly() {
        let service = Keypair::new();
        let mint = Keypair::new();
        let plan = plan_create_collection(
            &service.pubkey(),
            &CollectionActors::custodial(service.pubkey()),
            &mint.pubkey(),
            &metadata(),
            1_461_600,
            CollectionOptions::default(),
        )
        .unwrap();

        let envelope = assemble(&plan, &[&service, &mint]);
        assert_eq!(executed_programs(&envelope), plan.program_ids());
        assert_eq!(
            plan.program_ids(),
            vec![
                system_program::id(),
                spl_token::id(),
                spl_associated_token_account::id(),
                token_metadata::id(),
                spl_token::id(),
                token_metadata::id(),
            ]
        );

        let data = executed_data(&envelope);
        assert_eq!(data[3][0], token_metadata::CREATE_METADATA_ACCOUNT_V3);
        assert_eq!(data[5][0], token_metadata::CREATE_MASTER_EDITION_V3);
    }

    #[test]
    fn test_freeze_precedes_master_edition() {
        let service = Keypair::new();
        let mint = Keypair::new();
        let plan = plan_create_collection(
            &service.pubkey(),
            &CollectionActors::custodial(service.pubkey()),
            &mint.pubkey(),
            &metadata(),
            1_461_600,
            CollectionOptions { freeze: true },
        )
        .unwrap();

        let envelope = assemble(&plan, &[&service, &mint]);
        let programs = executed_programs(&envelope);
        assert_eq!(programs.len(), 7);
        assert_eq!(programs[5], spl_token::id());
        assert_eq!(programs[6], token_metadata::id());
    }

    #[test]
    fn test_tree_order_with_delegate_handoff() {
        let service = Keypair::new();
        let tree = Keypair::new();
        let delegate = Pubkey::new_unique();
        let shape = TreeShape::new(DepthSizePair::new(14, 64), 0).unwrap();
        let actors = TreeActors {
            authority: delegate,
            ..TreeActors::custodial(service.pubkey())
        };

        let plan = plan_create_tree(&service.pubkey(), &actors, &tree.pubkey(), &shape, 1)
            .unwrap();
        let envelope = assemble(&plan, &[&service, &tree]);

        assert_eq!(
            executed_programs(&envelope),
            vec![system_program::id(), bubblegum::id(), bubblegum::id()]
        );
        let data = executed_data(&envelope);
        assert_eq!(data[1][..8], anchor_discriminator("create_tree"));
        assert_eq!(data[2][..8], anchor_discriminator("set_tree_delegate"));
        assert!(envelope.is_fully_signed());
    }

    #[test]
    fn test_custodial_tree_has_two_instructions() {
        let service = Keypair::new();
        let tree = Keypair::new();
        let shape = TreeShape::new(DepthSizePair::new(3, 8), 0).unwrap();

        let plan = plan_create_tree(
            &service.pubkey(),
            &TreeActors::custodial(service.pubkey()),
            &tree.pubkey(),
            &shape,
            1,
        )
        .unwrap();
        let envelope = assemble(&plan, &[&service, &tree]);
        assert_eq!(executed_programs(&envelope), plan.program_ids());
        assert_eq!(plan.instructions.len(), 2);
    }
}
