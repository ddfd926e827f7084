//! cNFT Minter
//!
//! Entry point for the Solana Pay minting service and its one-shot
//! administrative commands.
//!
//! ## Commands
//!
//! - **serve**: run the payment-request endpoint
//! - **create-collection**: upload collection metadata and create the collection mint
//! - **create-tree**: allocate and initialize a membership tree
//! - **upload**: push files to content-addressed storage
//! - **asset-id**: resolve the compressed asset minted by a transaction
//! - **grind-keys**: search for vanity keypairs

// Compiler warning configuration
#![deny(unused_imports)]
#![deny(unused_mut)]
#![deny(unused_variables)]
#![warn(dead_code)]
#![warn(unused_must_use)]

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cnft_minter::catalog::{StaticCatalog, UniformRandom};
use cnft_minter::config::Config;
use cnft_minter::events::resolve_asset_id_with_retry;
use cnft_minter::rpc_manager::{
    explorer_url, submit_with_resolution, ExplorerTarget, LedgerRpc, RetryPolicy, SolanaLedger,
};
use cnft_minter::solana_pay::Responder;
use cnft_minter::storage::{cid_to_uri, file_list_to_uris, ContentStore, NftStorageClient, UploadFile};
use cnft_minter::tx_builder::{
    compose_create_collection, compose_create_tree, CollectionActors, CollectionMetadata,
    CollectionOptions, Creator, DepthSizePair, SignedEnvelope, TreeActors, TreeShape, TxAssembler,
};
use cnft_minter::wallet::{
    grind_keypair, keypair_to_json, load_or_generate_keypair, ServiceIdentity,
};
use solana_sdk::{
    native_token::LAMPORTS_PER_SOL,
    signature::{Keypair, Signature},
    signer::Signer,
};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Balance required before attempting to create a collection
const MIN_COLLECTION_BALANCE: u64 = LAMPORTS_PER_SOL * 3 / 100;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, env = "MINTER_CONFIG", default_value = "cnft-minter.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the Solana Pay endpoint
    Serve {
        /// Override the configured port
        #[arg(long)]
        port: Option<u16>,
    },

    /// Create the collection every minted asset joins
    CreateCollection {
        /// Off-chain collection metadata (JSON with at least name and symbol)
        #[arg(long, default_value = "assets/collection.json")]
        metadata: PathBuf,

        /// Freeze the collection token account after minting
        #[arg(long)]
        freeze: bool,

        /// Fetch program logs when the submission fails
        #[arg(long)]
        logs: bool,
    },

    /// Allocate and initialize a membership tree
    CreateTree {
        #[arg(long, default_value_t = 14)]
        depth: u32,

        #[arg(long, default_value_t = 64)]
        buffer: u32,

        #[arg(long, default_value_t = 0)]
        canopy: u32,

        /// Fetch program logs when the submission fails
        #[arg(long)]
        logs: bool,
    },

    /// Upload files to content-addressed storage
    Upload {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Resolve the compressed asset minted by a transaction
    AssetId {
        #[arg(long)]
        signature: String,

        /// Tree the asset was minted into (defaults to the configured tree)
        #[arg(long)]
        tree: Option<String>,
    },

    /// Search for keypairs whose address starts with a prefix
    GrindKeys {
        #[arg(long, default_value = "dev")]
        prefix: String,

        #[arg(long, default_value_t = 3)]
        count: usize,

        #[arg(long, default_value_t = 10_000_000)]
        max_attempts: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.json_logs)?;
    info!(version = env!("CARGO_PKG_VERSION"), "Starting cnft-minter");

    let config = Config::from_file_with_env(&cli.config)
        .with_context(|| format!("Failed to load config from {}", cli.config))?;

    match cli.command {
        Command::Serve { port } => serve(config, port).await,
        Command::CreateCollection {
            metadata,
            freeze,
            logs,
        } => create_collection(config, &metadata, freeze, logs).await,
        Command::CreateTree {
            depth,
            buffer,
            canopy,
            logs,
        } => create_tree(config, depth, buffer, canopy, logs).await,
        Command::Upload { files } => upload(config, &files).await,
        Command::AssetId { signature, tree } => asset_id(config, &signature, tree).await,
        Command::GrindKeys {
            prefix,
            count,
            max_attempts,
        } => grind_keys(&prefix, count, max_attempts),
    }
}

/// Initialize logging subsystem
fn init_logging(verbose: bool, json: bool) -> Result<()> {
    let default_filter = if verbose {
        "cnft_minter=debug,info"
    } else {
        "cnft_minter=info,warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .try_init()
    }
    .context("Failed to initialize logging")
}

fn ledger_from(config: &Config) -> Arc<SolanaLedger> {
    Arc::new(SolanaLedger::new(
        &config.rpc.url,
        config.rpc_timeout(),
        config.commitment(),
    ))
}

fn load_service(config: &Config) -> Result<ServiceIdentity> {
    let service = ServiceIdentity::from_config(&config.wallet).context("Failed to load service key")?;
    info!(address = %service.pubkey(), "Service key loaded");
    Ok(service)
}

fn sol(lamports: u64) -> f64 {
    lamports as f64 / LAMPORTS_PER_SOL as f64
}

async fn serve(config: Config, port: Option<u16>) -> Result<()> {
    let service = load_service(&config)?;
    let ledger = ledger_from(&config);
    let catalog = Arc::new(StaticCatalog::new(config.catalog.clone()));
    let responder = Responder::new(
        &config,
        ledger,
        catalog,
        Arc::new(UniformRandom::new()),
        service,
    )
    .context("Mint flow is not configured")?;

    let port = port.unwrap_or(config.server.port);
    let addr: SocketAddr = format!("{}:{}", config.server.bind, port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", config.server.bind, port))?;
    if config.server.debug {
        warn!("Debug mode enabled: `full` requests expose catalog item data");
    }
    info!(
        collection = %responder.targets().collection,
        tree = %responder.targets().tree,
        items = config.catalog.len(),
        "Responder ready"
    );

    cnft_minter::endpoints::serve(Arc::new(responder), addr, async {
        let _ = tokio::signal::ctrl_c().await;
        info!("Received shutdown signal");
    })
    .await
}

async fn ensure_balance(ledger: &dyn LedgerRpc, service: &ServiceIdentity, needed: u64) -> Result<()> {
    let balance = ledger
        .get_balance(&service.pubkey())
        .await
        .context("Failed to fetch balance")?;
    info!(balance_sol = sol(balance), "Starting account balance");
    if balance < needed {
        anyhow::bail!(
            "Balance too low: {} SOL available, {} SOL needed",
            sol(balance),
            sol(needed)
        );
    }
    Ok(())
}

async fn submit(
    ledger: &dyn LedgerRpc,
    envelope: &SignedEnvelope,
    cluster: &str,
    fetch_logs: bool,
) -> Result<Signature> {
    if !envelope.is_fully_signed() {
        anyhow::bail!("Envelope is missing signatures from {:?}", envelope.missing_signers());
    }
    match submit_with_resolution(ledger, &envelope.tx, cluster, fetch_logs).await {
        Ok(signature) => Ok(signature),
        Err(failure) => {
            error!(error = %failure, "Transaction failed");
            if let Some(logs) = &failure.logs {
                for line in logs {
                    error!("{}", line);
                }
            }
            Err(failure.into())
        }
    }
}

async fn create_collection(config: Config, metadata_path: &Path, freeze: bool, logs: bool) -> Result<()> {
    let service = load_service(&config)?;
    let ledger = ledger_from(&config);
    ensure_balance(ledger.as_ref(), &service, MIN_COLLECTION_BALANCE).await?;

    let raw = std::fs::read_to_string(metadata_path)
        .with_context(|| format!("Failed to read {}", metadata_path.display()))?;
    let json: serde_json::Value = serde_json::from_str(&raw).context("Invalid metadata JSON")?;
    let (name, symbol) = match (json["name"].as_str(), json["symbol"].as_str()) {
        (Some(name), Some(symbol)) if !name.is_empty() && !symbol.is_empty() => {
            (name.to_string(), symbol.to_string())
        }
        _ => anyhow::bail!("invalid metadata name or symbol"),
    };
    let seller_fee_basis_points = json["seller_fee_basis_points"]
        .as_u64()
        .map(u16::try_from)
        .transpose()
        .context("seller_fee_basis_points out of range")?
        .unwrap_or(0);

    let store = NftStorageClient::from_config(&config.storage)?;
    let file = UploadFile::json("metadata.json", &json)?;
    let cid = store.upload(std::slice::from_ref(&file)).await?;
    let uri = cid_to_uri(&cid, &file.name, &config.storage.gateway_host);
    info!(ipfs = %uri.ipfs, http = %uri.http, "Metadata file uploaded");

    let mint = load_or_generate_keypair(Path::new(&config.wallet.key_dir), &symbol)?;
    info!(
        cluster = %config.rpc.moniker,
        address = %mint.pubkey(),
        "Creating collection"
    );

    let service_key = service.pubkey();
    let metadata = CollectionMetadata {
        name,
        symbol,
        uri: uri.http,
        seller_fee_basis_points,
        creators: vec![Creator {
            address: service_key,
            verified: true,
            share: 100,
        }],
        is_mutable: true,
    };

    let plan = compose_create_collection(
        ledger.as_ref(),
        &service_key,
        &CollectionActors::custodial(service_key),
        &mint.pubkey(),
        &metadata,
        CollectionOptions { freeze },
    )
    .await?;
    let assembler = TxAssembler::new(ledger.clone());
    let envelope = assembler
        .assemble_plan(&plan, None, &[service.keypair(), &mint])
        .await?;

    let signature = submit(ledger.as_ref(), &envelope, &config.rpc.moniker, logs).await?;
    println!(
        "{}",
        explorer_url(ExplorerTarget::Transaction(&signature.to_string()), &config.rpc.moniker)
    );
    println!("Collection mint: {}", mint.pubkey());
    Ok(())
}

async fn create_tree(
    config: Config,
    depth: u32,
    buffer: u32,
    canopy: u32,
    logs: bool,
) -> Result<()> {
    let service = load_service(&config)?;
    let ledger = ledger_from(&config);
    let shape = TreeShape::new(DepthSizePair::new(depth, buffer), canopy)?;

    let tree = load_or_generate_keypair(Path::new(&config.wallet.key_dir), "tree")?;
    info!(
        cluster = %config.rpc.moniker,
        address = %tree.pubkey(),
        "Creating membership tree"
    );

    let service_key = service.pubkey();
    let plan = compose_create_tree(
        ledger.as_ref(),
        &service_key,
        &TreeActors::custodial(service_key),
        &tree.pubkey(),
        &shape,
    )
    .await?;
    println!("Space to allocate: {} bytes", shape.account_size());
    println!("Estimated cost to allocate space: {} SOL", sol(plan.rent_lamports));
    println!("Max compressed NFTs for tree: {}", shape.capacity());

    ensure_balance(ledger.as_ref(), &service, plan.rent_lamports)
        .await
        .context("Not enough SOL to allocate the tree")?;

    let assembler = TxAssembler::new(ledger.clone());
    let envelope = assembler
        .assemble_plan(&plan, None, &[service.keypair(), &tree])
        .await?;

    let signature = submit(ledger.as_ref(), &envelope, &config.rpc.moniker, logs).await?;
    println!(
        "{}",
        explorer_url(ExplorerTarget::Transaction(&signature.to_string()), &config.rpc.moniker)
    );
    println!("Tree address: {}", tree.pubkey());
    Ok(())
}

async fn upload(config: Config, paths: &[PathBuf]) -> Result<()> {
    let store = NftStorageClient::from_config(&config.storage)?;
    let files = paths
        .iter()
        .map(|path| {
            UploadFile::from_path(path).with_context(|| format!("Failed to read {}", path.display()))
        })
        .collect::<Result<Vec<_>>>()?;

    let cid = store.upload(&files).await?;
    let uris = file_list_to_uris(&cid, &files, &config.storage.gateway_host);
    println!("{}", serde_json::to_string_pretty(&uris)?);
    Ok(())
}

async fn asset_id(config: Config, signature: &str, tree: Option<String>) -> Result<()> {
    let signature = Signature::from_str(signature).context("Invalid signature")?;
    let tree = match tree {
        Some(tree) => tree.parse().context("Invalid tree address")?,
        None => config.mint_targets()?.tree,
    };
    let ledger = ledger_from(&config);

    let identity =
        resolve_asset_id_with_retry(ledger.as_ref(), &tree, &signature, &RetryPolicy::finalization())
            .await?;
    println!("Asset id: {}", identity.asset_id);
    println!("Leaf index: {}", identity.leaf_index);
    println!(
        "{}",
        explorer_url(ExplorerTarget::Address(&identity.asset_id.to_string()), &config.rpc.moniker)
    );
    Ok(())
}

fn grind_keys(prefix: &str, count: usize, max_attempts: u64) -> Result<()> {
    let mut found: Vec<Keypair> = Vec::with_capacity(count);
    while found.len() < count {
        match grind_keypair(prefix, max_attempts)? {
            Some(keypair) => {
                info!(address = %keypair.pubkey(), "Found matching keypair");
                found.push(keypair);
            }
            None => break,
        }
    }

    if found.is_empty() {
        println!("No matching keys found");
        return Ok(());
    }

    for (i, keypair) in found.iter().enumerate() {
        let json = keypair_to_json(keypair);
        let round_trip = ServiceIdentity::from_json(&json)
            .map(|identity| identity.pubkey() == keypair.pubkey())
            .unwrap_or(false);
        println!("[{}] {}", i, keypair.pubkey());
        println!("{}", json);
        println!("parses correctly: {}\n", round_trip);
    }
    Ok(())
}
