#![allow(unused_imports)]
//! Creator Share Tests
//!
//! The mint composer accepts any creator list (up to five entries) whose
//! shares sum to exactly 100 and rejects every other non-empty list.

#[cfg(test)]
mod creator_share_tests {
    use crate::tx_builder::{
        compose_mint_to_collection, CollectionTarget, Creator, MetadataArgs, MinterError,
        MintActors, TokenProgramVersion, TokenStandard,
    };
    use proptest::prelude::*;
    use solana_sdk::pubkey::Pubkey;

    fn compose_with(shares: &[u8]) -> Result<(), MinterError> {
        let service = Pubkey::new_unique();
        let metadata = MetadataArgs {
            name: "Demo".into(),
            symbol: "DEV".into(),
            uri: "https://example.com/a.json".into(),
            seller_fee_basis_points: 0,
            primary_sale_happened: true,
            is_mutable: true,
            edition_nonce: None,
            token_standard: Some(TokenStandard::NonFungible),
            collection: None,
            token_program_version: TokenProgramVersion::Original,
            creators: shares
                .iter()
                .map(|share| Creator {
                    address: Pubkey::new_unique(),
                    verified: false,
                    share: *share,
                })
                .collect(),
        };
        compose_mint_to_collection(
            &service,
            &Pubkey::new_unique(),
            &MintActors::custodial(service),
            &metadata,
            &CollectionTarget::new(Pubkey::new_unique(), service),
        )
        .map(|_| ())
    }

    /// Split 100 at the given cut points
    fn split_hundred(cuts: &[u8]) -> Vec<u8> {
        let mut points: Vec<u8> = cuts.iter().map(|c| c % 101).collect();
        points.sort_unstable();
        let mut shares = Vec::with_capacity(points.len() + 1);
        let mut last = 0u8;
        for point in points {
            shares.push(point - last);
            last = point;
        }
        shares.push(100 - last);
        shares
    }

    #[test]
    fn test_single_full_share() {
        assert!(compose_with(&[100]).is_ok());
    }

    #[test]
    fn test_off_by_one_rejected() {
        assert!(matches!(
            compose_with(&[50, 49]),
            Err(MinterError::InvalidCreatorShares { total: 99 })
        ));
        assert!(matches!(
            compose_with(&[50, 51]),
            Err(MinterError::InvalidCreatorShares { total: 101 })
        ));
    }

    proptest! {
        #[test]
        fn prop_exact_hundred_accepted(cuts in proptest::collection::vec(any::<u8>(), 0..4)) {
            let shares = split_hundred(&cuts);
            prop_assert_eq!(shares.iter().map(|s| u32::from(*s)).sum::<u32>(), 100);
            prop_assert!(compose_with(&shares).is_ok());
        }

        #[test]
        fn prop_other_totals_rejected(shares in proptest::collection::vec(0u8..=100, 1..=5)) {
            let total: u32 = shares.iter().map(|s| u32::from(*s)).sum();
            prop_assume!(total != 100);
            let rejected = matches!(
                compose_with(&shares),
                Err(MinterError::InvalidCreatorShares { .. })
            );
            prop_assert!(rejected);
        }
    }
}
