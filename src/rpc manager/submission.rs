//! Submission of fully signed envelopes and post-failure lookup
//!
//! Ledger errors are free text. When a submission is rejected the text often
//! names the offending transaction, which is enough to pull its logs. This
//! parsing is best effort: no match simply yields `None`.

use super::{LedgerRpc, RpcManagerError};
use crate::metrics::metrics;
use once_cell::sync::Lazy;
use regex::Regex;
use solana_sdk::{signature::Signature, transaction::VersionedTransaction};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, error, info};

static FAILED_SIGNATURE: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r"(?im)^((.*)?Error: )?(Transaction|Signature) ([A-Z0-9]{32,}) ").ok()
});

/// Pull a transaction signature out of a ledger error message
pub fn extract_signature(error_text: &str) -> Option<Signature> {
    let pattern = FAILED_SIGNATURE.as_ref()?;
    let captures = pattern.captures(error_text)?;
    Signature::from_str(captures.get(4)?.as_str()).ok()
}

/// What an explorer link points at
#[derive(Debug, Clone, Copy)]
pub enum ExplorerTarget<'a> {
    Address(&'a str),
    Transaction(&'a str),
}

/// Block explorer link for an address or transaction on `cluster`
pub fn explorer_url(target: ExplorerTarget<'_>, cluster: &str) -> String {
    let (kind, id) = match target {
        ExplorerTarget::Address(id) => ("address", id),
        ExplorerTarget::Transaction(id) => ("tx", id),
    };
    format!(
        "https://explorer.solana.com/{}/{}?cluster={}",
        kind, id, cluster
    )
}

/// A rejected submission and whatever could be learned about it
#[derive(Debug)]
pub struct SubmissionFailure {
    pub error: RpcManagerError,
    /// Signature named by the error text, if any
    pub signature: Option<Signature>,
    /// Program logs of that transaction, when they could be fetched
    pub logs: Option<Vec<String>>,
}

impl fmt::Display for SubmissionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.signature {
            Some(sig) => write!(f, "{} (transaction {})", self.error, sig),
            None => write!(f, "{}", self.error),
        }
    }
}

impl std::error::Error for SubmissionFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Submit `transaction`; on rejection resolve the failed signature and,
/// when `fetch_logs` is set, its program logs
pub async fn submit_with_resolution<L>(
    ledger: &L,
    transaction: &VersionedTransaction,
    cluster: &str,
    fetch_logs: bool,
) -> Result<Signature, SubmissionFailure>
where
    L: LedgerRpc + ?Sized,
{
    match ledger.submit_transaction(transaction).await {
        Ok(signature) => {
            metrics().transactions_submitted.inc();
            info!(
                signature = %signature,
                explorer = %explorer_url(ExplorerTarget::Transaction(&signature.to_string()), cluster),
                "Transaction submitted"
            );
            Ok(signature)
        }
        Err(err) => {
            metrics().transactions_failed.inc();
            let signature = extract_signature(&err.to_string());
            error!(
                error = %err,
                signature = ?signature,
                "Transaction rejected"
            );

            let mut logs = None;
            if let Some(sig) = signature {
                if fetch_logs {
                    match ledger.get_finalized_transaction(&sig).await {
                        Ok(tx) => {
                            debug!(signature = %sig, "==== Transaction logs ====");
                            for line in &tx.log_messages {
                                debug!(signature = %sig, "{}", line);
                            }
                            logs = Some(tx.log_messages);
                        }
                        Err(lookup) => {
                            debug!(signature = %sig, error = %lookup, "No logs available");
                        }
                    }
                } else {
                    info!(
                        explorer = %explorer_url(ExplorerTarget::Transaction(&sig.to_string()), cluster),
                        "Failed transaction"
                    );
                }
            }

            Err(SubmissionFailure {
                error: err,
                signature,
                logs,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Signature {
        Signature::from([7u8; 64])
    }

    #[test]
    fn test_extracts_signature_after_error_prefix() {
        let text = format!(
            "SendTransactionError: Transaction {} resulted in an error.",
            sample()
        );
        assert_eq!(extract_signature(&text), Some(sample()));
    }

    #[test]
    fn test_extracts_signature_on_later_line() {
        let text = format!("preflight failed\nSignature {} has expired", sample());
        assert_eq!(extract_signature(&text), Some(sample()));
    }

    #[test]
    fn test_no_signature_is_none() {
        assert!(extract_signature("Blockhash not found").is_none());
        assert!(extract_signature("").is_none());
        // Matches the pattern but is not a valid signature
        let text = format!("Transaction {} failed", "A".repeat(40));
        assert!(extract_signature(&text).is_none());
    }

    #[test]
    fn test_explorer_url() {
        assert_eq!(
            explorer_url(ExplorerTarget::Address("abc"), "devnet"),
            "https://explorer.solana.com/address/abc?cluster=devnet"
        );
        assert_eq!(
            explorer_url(ExplorerTarget::Transaction("xyz"), "mainnet-beta"),
            "https://explorer.solana.com/tx/xyz?cluster=mainnet-beta"
        );
    }
}
