//! Instruction composition for the collection, tree and mint flows
//!
//! Each composer returns an [`InstructionPlan`]: the ordered instruction list
//! plus the addresses that must sign besides the fee payer. Order is part of
//! the contract; assemblers must not reorder or deduplicate it.
//!
//! Actor roles are explicit structs. The `custodial` constructors give every
//! role to the service key, which is convenient for a demo deployment but
//! means the service can act for (and pay for) every flow. Non-custodial
//! deployments must override the roles before composing.

use super::errors::MinterError;
use super::pda;
use super::programs::{
    self, account_compression, bubblegum, noop, token_metadata, Collection, CollectionMetadata,
    Creator, MetadataArgs,
};
use super::tree::TreeShape;
use crate::rpc_manager::LedgerRpc;
use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
    system_program,
};
use spl_token::solana_program::program_pack::Pack;
use tracing::debug;

// TODO(migrate-system-instruction): move to solana-system-interface with the 3.x line
#[allow(deprecated)]
use solana_sdk::system_instruction;

/// Royalty ceiling in basis points
pub const MAX_SELLER_FEE_BASIS_POINTS: u16 = 10_000;

/// Ordered instructions and the non-fee-payer signers they require
#[derive(Debug, Clone)]
pub struct InstructionPlan {
    /// The ordered list of instructions for the transaction
    pub instructions: Vec<Instruction>,

    /// Address expected to pay fees
    pub fee_payer: Pubkey,

    /// Addresses (other than the fee payer unless it is the service key)
    /// that must sign for the plan to land
    pub extra_signers: Vec<Pubkey>,

    /// Lamports moved into accounts the plan allocates
    pub rent_lamports: u64,
}

impl InstructionPlan {
    fn new(instructions: Vec<Instruction>, fee_payer: Pubkey) -> Self {
        Self {
            instructions,
            fee_payer,
            extra_signers: Vec::new(),
            rent_lamports: 0,
        }
    }

    fn with_rent(mut self, lamports: u64) -> Self {
        self.rent_lamports = lamports;
        self
    }

    fn with_signer(mut self, signer: Pubkey) -> Self {
        if !self.extra_signers.contains(&signer) {
            self.extra_signers.push(signer);
        }
        self
    }

    /// Add the service key when it pays or holds a signing role
    fn with_service_if_required(self, service: &Pubkey) -> Self {
        if self.requires_signature(service) {
            self.with_signer(*service)
        } else {
            self
        }
    }

    /// Whether `key` is the fee payer or marked signer by any instruction
    pub fn requires_signature(&self, key: &Pubkey) -> bool {
        self.fee_payer == *key
            || self
                .instructions
                .iter()
                .flat_map(|ix| ix.accounts.iter())
                .any(|meta| meta.is_signer && meta.pubkey == *key)
    }

    /// Program ids in execution order
    pub fn program_ids(&self) -> Vec<Pubkey> {
        self.instructions.iter().map(|ix| ix.program_id).collect()
    }
}

/// Roles for the collection flow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionActors {
    /// Receives the single collection token
    pub owner: Pubkey,
    /// Mint, freeze and update authority
    pub authority: Pubkey,
    pub fee_payer: Pubkey,
}

impl CollectionActors {
    /// Every role held by the service key
    pub fn custodial(service: Pubkey) -> Self {
        Self {
            owner: service,
            authority: service,
            fee_payer: service,
        }
    }
}

/// Roles for the tree flow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeActors {
    /// Tree creator recorded in the tree config
    pub owner: Pubkey,
    /// Tree delegate allowed to mint; handed over from the owner when different
    pub authority: Pubkey,
    pub fee_payer: Pubkey,
}

impl TreeActors {
    /// Every role held by the service key
    pub fn custodial(service: Pubkey) -> Self {
        Self {
            owner: service,
            authority: service,
            fee_payer: service,
        }
    }
}

/// Roles for a compressed mint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MintActors {
    pub leaf_owner: Pubkey,
    pub leaf_delegate: Pubkey,
    pub fee_payer: Pubkey,
    pub tree_delegate: Pubkey,
}

impl MintActors {
    /// Every role held by the service key
    pub fn custodial(service: Pubkey) -> Self {
        Self {
            leaf_owner: service,
            leaf_delegate: service,
            fee_payer: service,
            tree_delegate: service,
        }
    }

    /// The payer receives and pays for the asset; the service stays tree delegate
    pub fn for_payer(service: Pubkey, payer: Pubkey) -> Self {
        Self {
            leaf_owner: payer,
            leaf_delegate: payer,
            fee_payer: payer,
            tree_delegate: service,
        }
    }
}

/// Collection the compressed asset joins
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionTarget {
    pub mint: Pubkey,
    pub authority: Pubkey,
    /// Derived from `mint` when omitted
    pub metadata: Option<Pubkey>,
    /// Derived from `mint` when omitted
    pub edition: Option<Pubkey>,
}

impl CollectionTarget {
    pub fn new(mint: Pubkey, authority: Pubkey) -> Self {
        Self {
            mint,
            authority,
            metadata: None,
            edition: None,
        }
    }
}

/// Optional steps of the collection flow
#[derive(Debug, Clone, Copy, Default)]
pub struct CollectionOptions {
    /// Freeze the owner's token account after minting
    pub freeze: bool,
}

/// Validate a creator list
///
/// An empty list is accepted. Otherwise there may be at most five entries and
/// their shares must sum to exactly 100.
pub fn validate_creators(creators: &[Creator]) -> Result<(), MinterError> {
    if creators.is_empty() {
        return Ok(());
    }
    if creators.len() > token_metadata::MAX_CREATOR_LIMIT {
        return Err(MinterError::InvalidMetadata(format!(
            "at most {} creators allowed, got {}",
            token_metadata::MAX_CREATOR_LIMIT,
            creators.len()
        )));
    }
    let total: u32 = creators.iter().map(|c| u32::from(c.share)).sum();
    if total != 100 {
        return Err(MinterError::InvalidCreatorShares { total });
    }
    Ok(())
}

fn validate_fields(
    name: &str,
    symbol: &str,
    uri: &str,
    seller_fee_basis_points: u16,
) -> Result<(), MinterError> {
    let limits = [
        ("name", name.len(), token_metadata::MAX_NAME_LENGTH),
        ("symbol", symbol.len(), token_metadata::MAX_SYMBOL_LENGTH),
        ("uri", uri.len(), token_metadata::MAX_URI_LENGTH),
    ];
    for (field, len, max) in limits {
        if len > max {
            return Err(MinterError::InvalidMetadata(format!(
                "{} is {} bytes, limit is {}",
                field, len, max
            )));
        }
    }
    if seller_fee_basis_points > MAX_SELLER_FEE_BASIS_POINTS {
        return Err(MinterError::InvalidMetadata(format!(
            "seller fee {} bps exceeds {}",
            seller_fee_basis_points, MAX_SELLER_FEE_BASIS_POINTS
        )));
    }
    Ok(())
}

/// Compose the collection flow with a known rent-exempt balance for the mint
///
/// Order: create mint account, initialize mint, create token account, create
/// metadata, mint one unit, (optional freeze), create master edition.
pub fn plan_create_collection(
    service: &Pubkey,
    actors: &CollectionActors,
    mint: &Pubkey,
    metadata: &CollectionMetadata,
    mint_rent_lamports: u64,
    options: CollectionOptions,
) -> Result<InstructionPlan, MinterError> {
    validate_fields(
        &metadata.name,
        &metadata.symbol,
        &metadata.uri,
        metadata.seller_fee_basis_points,
    )?;
    validate_creators(&metadata.creators)?;

    let token_program = spl_token::id();
    let token_account = pda::token_account(&actors.owner, mint, &token_program)?;
    let metadata_account = pda::metadata_account(mint)?;
    let edition_account = pda::edition_account(mint)?;

    let mut instructions = Vec::with_capacity(7);

    instructions.push(system_instruction::create_account(
        &actors.fee_payer,
        mint,
        mint_rent_lamports,
        spl_token::state::Mint::LEN as u64,
        &token_program,
    ));

    instructions.push(
        spl_token::instruction::initialize_mint2(
            &token_program,
            mint,
            &actors.authority,
            Some(&actors.authority),
            0,
        )
        .map_err(|e| MinterError::instruction_failed("spl_token", e.to_string()))?,
    );

    instructions.push(
        spl_associated_token_account::instruction::create_associated_token_account(
            &actors.fee_payer,
            &actors.owner,
            mint,
            &token_program,
        ),
    );

    instructions.push(Instruction {
        program_id: token_metadata::id(),
        accounts: vec![
            AccountMeta::new(metadata_account, false),
            AccountMeta::new_readonly(*mint, false),
            AccountMeta::new_readonly(actors.authority, true),
            AccountMeta::new(actors.fee_payer, true),
            AccountMeta::new_readonly(actors.authority, true),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
        data: programs::create_metadata_account_v3_data(metadata)?,
    });

    instructions.push(
        spl_token::instruction::mint_to(
            &token_program,
            mint,
            &token_account,
            &actors.authority,
            &[],
            1,
        )
        .map_err(|e| MinterError::instruction_failed("spl_token", e.to_string()))?,
    );

    // The edition takes over the freeze authority, so freezing must precede it
    if options.freeze {
        instructions.push(
            spl_token::instruction::freeze_account(
                &token_program,
                &token_account,
                mint,
                &actors.authority,
                &[],
            )
            .map_err(|e| MinterError::instruction_failed("spl_token", e.to_string()))?,
        );
    }

    instructions.push(Instruction {
        program_id: token_metadata::id(),
        accounts: vec![
            AccountMeta::new(edition_account, false),
            AccountMeta::new(*mint, false),
            AccountMeta::new_readonly(actors.authority, true),
            AccountMeta::new_readonly(actors.authority, true),
            AccountMeta::new(actors.fee_payer, true),
            AccountMeta::new(metadata_account, false),
            AccountMeta::new_readonly(token_program, false),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
        data: programs::create_master_edition_v3_data(Some(0))?,
    });

    debug!(
        mint = %mint,
        metadata = %metadata_account,
        edition = %edition_account,
        token_account = %token_account,
        "Composed collection instructions"
    );

    Ok(InstructionPlan::new(instructions, actors.fee_payer)
        .with_rent(mint_rent_lamports)
        .with_signer(*mint)
        .with_service_if_required(service))
}

/// Compose the collection flow, querying the mint's rent-exempt balance
pub async fn compose_create_collection<L>(
    ledger: &L,
    service: &Pubkey,
    actors: &CollectionActors,
    mint: &Pubkey,
    metadata: &CollectionMetadata,
    options: CollectionOptions,
) -> Result<InstructionPlan, MinterError>
where
    L: LedgerRpc + ?Sized,
{
    let rent = ledger
        .get_minimum_rent_exempt_balance(spl_token::state::Mint::LEN)
        .await?;
    plan_create_collection(service, actors, mint, metadata, rent, options)
}

/// Compose the tree flow with a known rent-exempt balance for the tree account
///
/// Order: allocate tree account, initialize tree (non-public), and hand the
/// delegate role to `authority` when it differs from the owner.
pub fn plan_create_tree(
    service: &Pubkey,
    actors: &TreeActors,
    tree: &Pubkey,
    shape: &TreeShape,
    rent_lamports: u64,
) -> Result<InstructionPlan, MinterError> {
    let tree_config = pda::tree_authority(tree)?;

    let mut instructions = Vec::with_capacity(3);

    instructions.push(system_instruction::create_account(
        &actors.fee_payer,
        tree,
        rent_lamports,
        shape.account_size(),
        &account_compression::id(),
    ));

    instructions.push(Instruction {
        program_id: bubblegum::id(),
        accounts: vec![
            AccountMeta::new(tree_config, false),
            AccountMeta::new(*tree, false),
            AccountMeta::new(actors.fee_payer, true),
            AccountMeta::new_readonly(actors.owner, true),
            AccountMeta::new_readonly(noop::id(), false),
            AccountMeta::new_readonly(account_compression::id(), false),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
        data: programs::create_tree_data(
            shape.pair.max_depth,
            shape.pair.max_buffer_size,
            false,
        )?,
    });

    if actors.authority != actors.owner {
        instructions.push(Instruction {
            program_id: bubblegum::id(),
            accounts: vec![
                AccountMeta::new(tree_config, false),
                AccountMeta::new_readonly(actors.owner, true),
                AccountMeta::new_readonly(actors.authority, false),
                AccountMeta::new_readonly(*tree, false),
                AccountMeta::new_readonly(system_program::id(), false),
            ],
            data: programs::set_tree_delegate_data(),
        });
    }

    debug!(
        tree = %tree,
        tree_config = %tree_config,
        size = shape.account_size(),
        capacity = shape.capacity(),
        "Composed tree instructions"
    );

    Ok(InstructionPlan::new(instructions, actors.fee_payer)
        .with_rent(rent_lamports)
        .with_signer(*tree)
        .with_service_if_required(service))
}

/// Compose the tree flow, querying the tree account's rent-exempt balance
pub async fn compose_create_tree<L>(
    ledger: &L,
    service: &Pubkey,
    actors: &TreeActors,
    tree: &Pubkey,
    shape: &TreeShape,
) -> Result<InstructionPlan, MinterError>
where
    L: LedgerRpc + ?Sized,
{
    let size = usize::try_from(shape.account_size())
        .map_err(|_| MinterError::InvalidTreeParameters("tree size overflows usize".into()))?;
    let rent = ledger.get_minimum_rent_exempt_balance(size).await?;
    plan_create_tree(service, actors, tree, shape, rent)
}

/// Compose a single mint into `collection` on `tree`
///
/// The metadata's `collection` field is overwritten with the unverified
/// collection reference; verification happens on-chain once the collection
/// authority signs.
pub fn compose_mint_to_collection(
    service: &Pubkey,
    tree: &Pubkey,
    actors: &MintActors,
    metadata: &MetadataArgs,
    collection: &CollectionTarget,
) -> Result<InstructionPlan, MinterError> {
    validate_fields(
        &metadata.name,
        &metadata.symbol,
        &metadata.uri,
        metadata.seller_fee_basis_points,
    )?;
    validate_creators(&metadata.creators)?;

    let collection_metadata = match collection.metadata {
        Some(address) => address,
        None => pda::metadata_account(&collection.mint)?,
    };
    let collection_edition = match collection.edition {
        Some(address) => address,
        None => pda::edition_account(&collection.mint)?,
    };
    let tree_config = pda::tree_authority(tree)?;
    let bubblegum_signer = pda::collection_cpi_signer()?;

    let mut args = metadata.clone();
    args.collection = Some(Collection {
        key: collection.mint,
        verified: false,
    });

    let instruction = Instruction {
        program_id: bubblegum::id(),
        accounts: vec![
            AccountMeta::new(tree_config, false),
            AccountMeta::new_readonly(actors.leaf_owner, false),
            AccountMeta::new_readonly(actors.leaf_delegate, false),
            AccountMeta::new(*tree, false),
            AccountMeta::new_readonly(actors.fee_payer, true),
            AccountMeta::new_readonly(actors.tree_delegate, true),
            AccountMeta::new_readonly(collection.authority, true),
            // No delegated collection authority record
            AccountMeta::new_readonly(bubblegum::id(), false),
            AccountMeta::new_readonly(collection.mint, false),
            AccountMeta::new(collection_metadata, false),
            AccountMeta::new_readonly(collection_edition, false),
            AccountMeta::new_readonly(bubblegum_signer, false),
            AccountMeta::new_readonly(noop::id(), false),
            AccountMeta::new_readonly(account_compression::id(), false),
            AccountMeta::new_readonly(token_metadata::id(), false),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
        data: programs::mint_to_collection_v1_data(&args)?,
    };

    debug!(
        tree = %tree,
        leaf_owner = %actors.leaf_owner,
        collection = %collection.mint,
        name = %metadata.name,
        "Composed mint instruction"
    );

    Ok(InstructionPlan::new(vec![instruction], actors.fee_payer)
        .with_service_if_required(service))
}
