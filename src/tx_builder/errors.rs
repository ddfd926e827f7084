//! Error types for the minting core
//!
//! Every failure raised while deriving addresses, composing instructions,
//! assembling envelopes or answering payment requests is classified into
//! one of a small number of categories so callers can decide between
//! retrying and aborting:
//! - **configuration**: missing or unparsable addresses/keys (fatal, not retried)
//! - **validation**: client-caused input problems (surfaced as 400, not retried)
//! - **rpc**: ledger or storage failure (retryable only when the cause is transient)
//! - **derivation**: bump search exhausted (programming invariant violation)
//! - **assembly** / **signing** / **internal**: envelope or state inconsistencies

use solana_sdk::pubkey::Pubkey;
use thiserror::Error;

/// Error type for all minting-core operations
#[derive(Error, Debug)]
pub enum MinterError {
    /// Required configuration value is absent or unparsable
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The payment request carried no `account` field
    #[error("'account' is required")]
    MissingAccount,

    /// The supplied account does not round-trip through address parsing
    #[error("unable to parse 'account': {0}")]
    MalformedAccount(String),

    /// Creator shares must add up to exactly 100
    #[error("Creator shares must equal 100 (got {total})")]
    InvalidCreatorShares {
        /// Sum of the supplied shares
        total: u32,
    },

    /// Metadata field outside the limits enforced on-chain
    #[error("Invalid metadata: {0}")]
    InvalidMetadata(String),

    /// Tree depth / buffer / canopy combination rejected
    #[error("Invalid tree parameters: {0}")]
    InvalidTreeParameters(String),

    /// No catalog item matched the request
    #[error("No mintable item available{}", .0.as_deref().map(|k| format!(" for key '{}'", k)).unwrap_or_default())]
    NoItemAvailable(Option<String>),

    /// Program address derivation exhausted the bump space
    #[error("Address derivation failed (program={program}, seeds={seed_count})")]
    Derivation {
        /// Owning program of the derived address
        program: Pubkey,
        /// Number of seeds supplied (bump excluded)
        seed_count: usize,
    },

    /// Failed to build an instruction for a specific program
    #[error("Instruction build error (program={program}): {reason}")]
    InstructionBuild {
        /// Program the instruction targets
        program: String,
        /// Detailed reason for the failure
        reason: String,
    },

    /// Ledger or storage call failed
    #[error("RPC error during {operation}: {message}")]
    Rpc {
        /// Which external call failed (e.g. `get_latest_blockhash`)
        operation: String,
        /// Underlying error text
        message: String,
        /// Whether a second attempt can succeed
        retryable: bool,
    },

    /// Instructions could not be compiled into a message
    #[error("Assembly failed: {0}")]
    Assembly(String),

    /// Failed to sign the envelope
    #[error("Signing failed: {0}")]
    Signing(String),

    /// Internal invariant violation or unexpected state
    #[error("Internal error: {0}")]
    Internal(String),
}

impl MinterError {
    /// Check if this error is potentially retryable
    ///
    /// Only transient ledger/storage failures qualify. Everything else will
    /// fail the same way on a second attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Rpc { retryable: true, .. })
    }

    /// Whether the caller (not the service) caused this error
    pub fn is_client_error(&self) -> bool {
        self.category() == "validation"
    }

    /// Get the error category for metrics and observability
    pub fn category(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::MissingAccount
            | Self::MalformedAccount(_)
            | Self::InvalidCreatorShares { .. }
            | Self::InvalidMetadata(_)
            | Self::InvalidTreeParameters(_)
            | Self::NoItemAvailable(_) => "validation",
            Self::Derivation { .. } => "derivation",
            Self::Rpc { .. } => "rpc",
            Self::Signing(_) => "signing",
            Self::InstructionBuild { .. } | Self::Assembly(_) | Self::Internal(_) => "internal",
        }
    }
}

// Convenience constructors for common error scenarios
impl MinterError {
    /// Create an instruction build error for a specific program
    pub fn instruction_failed(program: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InstructionBuild {
            program: program.into(),
            reason: reason.into(),
        }
    }

    /// Create a transient RPC error for a named operation
    pub fn rpc(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Rpc {
            operation: operation.into(),
            message: message.into(),
            retryable: true,
        }
    }

    /// Create an RPC error that retrying will not fix
    pub fn rpc_permanent(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Rpc {
            operation: operation.into(),
            message: message.into(),
            retryable: false,
        }
    }

    /// Create a configuration error
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration(reason.into())
    }

    /// Create an internal error
    pub fn internal(reason: impl Into<String>) -> Self {
        Self::Internal(reason.into())
    }
}

impl From<crate::rpc_manager::RpcManagerError> for MinterError {
    fn from(err: crate::rpc_manager::RpcManagerError) -> Self {
        Self::Rpc {
            operation: err.operation().unwrap_or("rpc").to_string(),
            retryable: err.is_retryable(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MinterError::InvalidCreatorShares { total: 90 };
        assert_eq!(err.to_string(), "Creator shares must equal 100 (got 90)");

        let err = MinterError::InstructionBuild {
            program: "spl_token".to_string(),
            reason: "invalid mint".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Instruction build error (program=spl_token): invalid mint"
        );

        assert_eq!(
            MinterError::NoItemAvailable(None).to_string(),
            "No mintable item available"
        );
        assert_eq!(
            MinterError::NoItemAvailable(Some("demo".into())).to_string(),
            "No mintable item available for key 'demo'"
        );
    }

    #[test]
    fn test_error_retryability() {
        assert!(MinterError::rpc("get_latest_blockhash", "timeout").is_retryable());

        assert!(!MinterError::MissingAccount.is_retryable());
        assert!(!MinterError::configuration("no tree").is_retryable());
        assert!(!MinterError::Signing("test".to_string()).is_retryable());
        assert!(!MinterError::internal("test").is_retryable());
        assert!(!MinterError::rpc_permanent("upload", "status 401").is_retryable());
    }

    #[test]
    fn test_ledger_errors_keep_their_retryability() {
        use crate::rpc_manager::RpcManagerError;

        let transient: MinterError = RpcManagerError::Timeout {
            endpoint: "local".into(),
            operation: "get_transaction",
            timeout_ms: 1_000,
        }
        .into();
        assert!(transient.is_retryable());

        let permanent: MinterError = RpcManagerError::InsufficientFunds {
            endpoint: "local".into(),
        }
        .into();
        assert!(!permanent.is_retryable());
        assert_eq!(permanent.category(), "rpc");

        let expired: MinterError = RpcManagerError::TransactionExpired {
            endpoint: "local".into(),
        }
        .into();
        assert!(!expired.is_retryable());
    }

    #[test]
    fn test_error_categories() {
        assert_eq!(MinterError::MissingAccount.category(), "validation");
        assert_eq!(
            MinterError::MalformedAccount("x".into()).category(),
            "validation"
        );
        assert_eq!(
            MinterError::Derivation {
                program: Pubkey::new_unique(),
                seed_count: 2
            }
            .category(),
            "derivation"
        );
        assert_eq!(MinterError::rpc("op", "down").category(), "rpc");
        assert_eq!(MinterError::Assembly("x".into()).category(), "internal");
        assert_eq!(MinterError::configuration("x").category(), "configuration");
        assert!(MinterError::InvalidCreatorShares { total: 0 }.is_client_error());
        assert!(!MinterError::internal("x").is_client_error());
    }
}
