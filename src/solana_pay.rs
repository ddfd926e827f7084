//! Solana Pay transaction-request responder
//!
//! Two stateless transitions:
//! - **display** (GET): label, icon and message for the wallet prompt
//! - **transaction** (POST): a mint envelope for the payer, partially signed
//!   by the service as collection authority and tree delegate
//!
//! The responder holds only immutable state (catalog, service key, targets),
//! so concurrent requests are independent.

use crate::catalog::{CatalogItem, CatalogRepository, MetadataDefaults, SelectionStrategy};
use crate::config::{Config, MintTargets};
use crate::metrics::{metrics, Timer};
use crate::observability::RequestPhase;
use crate::rpc_manager::LedgerRpc;
use crate::structured_logging::StructuredLogger;
use crate::tx_builder::{
    compose_mint_to_collection, CollectionTarget, MintActors, MinterError, TxAssembler,
};
use crate::wallet::ServiceIdentity;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use solana_sdk::{pubkey::Pubkey, signer::Signer};
use std::str::FromStr;
use std::sync::Arc;

/// Label shown when a request cannot be served
pub const FAILURE_LABEL: &str = "Unknown mint. Expect a failure.";

/// Message shown when a request cannot be served
pub const FAILURE_MESSAGE: &str = "An error ocurred while locating the NFT to mint.";

/// GET response body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayResponse {
    pub label: String,
    pub icon: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Selected item, attached only for `full` requests in debug mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item: Option<CatalogItem>,
}

/// POST request body
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionRequest {
    #[serde(default)]
    pub account: Option<String>,
}

/// POST response body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// base64 of the partially signed envelope
    pub transaction: String,
}

/// Failure body, shaped like a display response so wallets can render it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub label: String,
    pub icon: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(icon: impl Into<String>) -> Self {
        Self {
            success: false,
            label: FAILURE_LABEL.to_string(),
            icon: icon.into(),
            message: FAILURE_MESSAGE.to_string(),
        }
    }
}

/// Text shown in the wallet prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteInfo {
    pub label: String,
    pub description: String,
    pub icon: String,
}

impl SiteInfo {
    pub fn from_config(config: &Config) -> Self {
        Self {
            label: config.site.name.clone(),
            description: config.site.description.clone(),
            icon: config.icon_url(),
        }
    }
}

/// Parse the payer address, requiring the canonical base58 form
pub fn parse_account(account: Option<&str>) -> Result<Pubkey, MinterError> {
    let account = match account.map(str::trim) {
        Some(value) if !value.is_empty() => value,
        _ => return Err(MinterError::MissingAccount),
    };
    let pubkey = Pubkey::from_str(account)
        .map_err(|_| MinterError::MalformedAccount(account.to_string()))?;
    if pubkey.to_string() != account {
        return Err(MinterError::MalformedAccount(account.to_string()));
    }
    Ok(pubkey)
}

/// Payment-request responder
pub struct Responder {
    catalog: Arc<dyn CatalogRepository>,
    strategy: Arc<dyn SelectionStrategy>,
    assembler: TxAssembler,
    service: ServiceIdentity,
    targets: MintTargets,
    defaults: MetadataDefaults,
    site: SiteInfo,
    debug: bool,
}

impl std::fmt::Debug for Responder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Responder")
            .field("service", &self.service.pubkey())
            .field("targets", &self.targets)
            .field("debug", &self.debug)
            .finish_non_exhaustive()
    }
}

impl Responder {
    /// Build a responder from configuration
    ///
    /// # Errors
    ///
    /// `Configuration` when the collection or tree address is missing, so a
    /// misconfigured service fails at startup instead of per request.
    pub fn new(
        config: &Config,
        ledger: Arc<dyn LedgerRpc>,
        catalog: Arc<dyn CatalogRepository>,
        strategy: Arc<dyn SelectionStrategy>,
        service: ServiceIdentity,
    ) -> Result<Self, MinterError> {
        let targets = config.mint_targets()?;
        let defaults = config.metadata_defaults()?;
        Ok(Self {
            catalog,
            strategy,
            assembler: TxAssembler::new(ledger),
            service,
            targets,
            defaults,
            site: SiteInfo::from_config(config),
            debug: config.server.debug,
        })
    }

    pub fn icon(&self) -> &str {
        &self.site.icon
    }

    pub fn targets(&self) -> &MintTargets {
        &self.targets
    }

    /// Failure payload for this site
    pub fn error_response(&self) -> ErrorResponse {
        ErrorResponse::new(self.site.icon.clone())
    }

    /// Pick the item a request mints
    ///
    /// With a key, only that item (if currently available); otherwise the
    /// strategy chooses among every available item.
    pub fn select_item(&self, key: Option<&str>) -> Result<CatalogItem, MinterError> {
        let now = Utc::now();
        match key {
            Some(key) => self
                .catalog
                .get(key)
                .filter(|item| item.is_available_at(now))
                .ok_or_else(|| MinterError::NoItemAvailable(Some(key.to_string()))),
            None => {
                let available: Vec<CatalogItem> = self
                    .catalog
                    .list()
                    .into_iter()
                    .filter(|item| item.is_available_at(now))
                    .collect();
                self.strategy
                    .pick(&available)
                    .cloned()
                    .ok_or(MinterError::NoItemAvailable(None))
            }
        }
    }

    /// Display phase
    pub fn display(&self, key: Option<&str>, full: bool) -> Result<DisplayResponse, MinterError> {
        let logger = StructuredLogger::new(RequestPhase::Display);
        metrics().display_requests.inc();

        let item = self
            .select_item(key)
            .inspect_err(|err| self.record_failure(&logger, None, err))?;
        logger.display_served(&item.key);

        Ok(DisplayResponse {
            label: self.site.label.clone(),
            icon: self.site.icon.clone(),
            message: Some(self.site.description.clone()),
            item: (full && self.debug).then_some(item),
        })
    }

    /// Transaction phase
    ///
    /// The payer pays fees and owns the new asset. The returned envelope
    /// still needs the payer's signature.
    pub async fn transaction(
        &self,
        key: Option<&str>,
        account: Option<&str>,
    ) -> Result<TransactionResponse, MinterError> {
        let logger = StructuredLogger::new(RequestPhase::Transaction);
        metrics().transaction_requests.inc();

        let result = self.build_transaction(&logger, key, account).await;
        if let Err(err) = &result {
            self.record_failure(&logger, account, err);
        }
        result
    }

    async fn build_transaction(
        &self,
        logger: &StructuredLogger,
        key: Option<&str>,
        account: Option<&str>,
    ) -> Result<TransactionResponse, MinterError> {
        let timer = Timer::new();
        let payer = parse_account(account)?;
        let item = self.select_item(key)?;

        let service = self.service.pubkey();
        let actors = MintActors::for_payer(service, payer);
        let collection = CollectionTarget::new(self.targets.collection, service);
        let metadata = item.to_metadata_args(&self.defaults);

        let plan = compose_mint_to_collection(
            &service,
            &self.targets.tree,
            &actors,
            &metadata,
            &collection,
        )?;
        let signers: [&(dyn Signer + Sync); 1] = [self.service.keypair()];
        let envelope = self.assembler.assemble_plan(&plan, None, &signers).await?;

        logger.transaction_built(&payer, &item.key, (timer.elapsed_secs() * 1000.0) as u64);
        Ok(TransactionResponse {
            message: Some(self.site.description.clone()),
            transaction: envelope.to_base64()?,
        })
    }

    fn record_failure(&self, logger: &StructuredLogger, payer: Option<&str>, err: &MinterError) {
        metrics().record_failure(err.category());
        logger.request_failed(payer, err.category(), &err.to_string());
    }
}
