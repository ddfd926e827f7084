use solana_client::client_error::ClientError;
use std::time::Duration;
use thiserror::Error;
use tokio_retry::strategy::{jitter, ExponentialBackoff};

/// Ledger RPC error types
#[derive(Debug, Clone, Error)]
pub enum RpcManagerError {
    /// Transport-level errors (network, connection)
    #[error("Transport error during {operation}: {message} (endpoint: {endpoint})")]
    Transport {
        endpoint: String,
        operation: &'static str,
        message: String,
    },

    /// Timeout errors
    #[error("Timeout during {operation} after {timeout_ms}ms (endpoint: {endpoint})")]
    Timeout {
        endpoint: String,
        operation: &'static str,
        timeout_ms: u64,
    },

    /// RPC response errors (from the RPC server)
    #[error("RPC response error during {operation}: {message} (endpoint: {endpoint}, code: {code:?})")]
    RpcResponse {
        endpoint: String,
        operation: &'static str,
        message: String,
        code: Option<i64>,
    },

    /// Rate limit exceeded
    #[error("Rate limit exceeded during {operation} (endpoint: {endpoint})")]
    RateLimitExceeded {
        endpoint: String,
        operation: &'static str,
    },

    #[error("Blockhash not found (endpoint: {endpoint})")]
    BlockhashNotFound { endpoint: String },

    #[error("Transaction expired (endpoint: {endpoint})")]
    TransactionExpired { endpoint: String },

    #[error("Insufficient funds (endpoint: {endpoint})")]
    InsufficientFunds { endpoint: String },

    /// The ledger has no (finalized) record of the requested item yet
    #[error("Not found during {operation}: {what}")]
    NotFound {
        operation: &'static str,
        what: String,
    },

    /// Internal errors (undecodable responses and the like)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RpcManagerError {
    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            RpcManagerError::Transport { .. } => true,
            RpcManagerError::Timeout { .. } => true,
            RpcManagerError::RateLimitExceeded { .. } => true,
            RpcManagerError::BlockhashNotFound { .. } => true,
            // Lookups fail until the transaction finalizes
            RpcManagerError::NotFound { .. } => true,

            RpcManagerError::TransactionExpired { .. } => false,
            RpcManagerError::InsufficientFunds { .. } => false,
            RpcManagerError::Internal(_) => false,

            // Retry on server errors (5xx)
            RpcManagerError::RpcResponse { code, .. } => {
                matches!(code, Some(c) if (500..600).contains(c))
            }
        }
    }

    /// Get the endpoint associated with this error, if any
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            RpcManagerError::Transport { endpoint, .. } => Some(endpoint),
            RpcManagerError::Timeout { endpoint, .. } => Some(endpoint),
            RpcManagerError::RpcResponse { endpoint, .. } => Some(endpoint),
            RpcManagerError::RateLimitExceeded { endpoint, .. } => Some(endpoint),
            RpcManagerError::BlockhashNotFound { endpoint } => Some(endpoint),
            RpcManagerError::TransactionExpired { endpoint } => Some(endpoint),
            RpcManagerError::InsufficientFunds { endpoint } => Some(endpoint),
            _ => None,
        }
    }

    /// Get the ledger operation that failed, if known
    pub fn operation(&self) -> Option<&str> {
        match self {
            RpcManagerError::Transport { operation, .. }
            | RpcManagerError::Timeout { operation, .. }
            | RpcManagerError::RpcResponse { operation, .. }
            | RpcManagerError::RateLimitExceeded { operation, .. }
            | RpcManagerError::NotFound { operation, .. } => Some(operation),
            RpcManagerError::BlockhashNotFound { .. } => Some("get_latest_blockhash"),
            RpcManagerError::TransactionExpired { .. }
            | RpcManagerError::InsufficientFunds { .. } => Some("submit_transaction"),
            _ => None,
        }
    }

    /// Create from ClientError with context
    pub fn from_client_error(err: ClientError, endpoint: &str, operation: &'static str) -> Self {
        Self::classify(&err.to_string(), endpoint, operation)
    }

    /// Classify an error message returned by the ledger client
    pub fn classify(message: &str, endpoint: &str, operation: &'static str) -> Self {
        let err_str = message.to_lowercase();
        let endpoint = endpoint.to_string();

        if err_str.contains("blockhash not found") {
            RpcManagerError::BlockhashNotFound { endpoint }
        } else if err_str.contains("transaction expired")
            || err_str.contains("block height exceeded")
        {
            RpcManagerError::TransactionExpired { endpoint }
        } else if err_str.contains("insufficient funds")
            || err_str.contains("insufficient lamports")
        {
            RpcManagerError::InsufficientFunds { endpoint }
        } else if err_str.contains("rate limit")
            || err_str.contains("too many requests")
            || err_str.contains("429")
        {
            RpcManagerError::RateLimitExceeded {
                endpoint,
                operation,
            }
        } else if err_str.contains("timeout") || err_str.contains("timed out") {
            RpcManagerError::Timeout {
                endpoint,
                operation,
                timeout_ms: 30_000,
            }
        } else if err_str.contains("error sending request")
            || err_str.contains("connection refused")
        {
            RpcManagerError::Transport {
                endpoint,
                operation,
                message: message.to_string(),
            }
        } else {
            // Extract error code if available
            let code = err_str
                .split("code:")
                .nth(1)
                .and_then(|s| s.split_whitespace().next())
                .and_then(|s| s.trim_end_matches(',').parse::<i64>().ok());

            RpcManagerError::RpcResponse {
                endpoint,
                operation,
                message: message.to_string(),
                code,
            }
        }
    }
}

/// Retry policy for RPC operations
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts
    pub max_attempts: u32,

    /// Base delay in milliseconds
    pub base_delay_ms: u64,

    /// Maximum delay in milliseconds
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 100,
            max_delay_ms: 5000,
        }
    }
}

impl RetryPolicy {
    /// Backoff delays for `tokio_retry`, jittered, at most `max_attempts` long
    pub fn strategy(&self) -> impl Iterator<Item = Duration> {
        // ExponentialBackoff multiplies `base` by itself; factor scales it to ms
        ExponentialBackoff::from_millis(2)
            .factor(self.base_delay_ms / 2 + 1)
            .max_delay(Duration::from_millis(self.max_delay_ms))
            .map(jitter)
            .take(self.max_attempts as usize)
    }

    /// Policy for waiting on finalization (slots take ~400ms, finality ~13s)
    pub fn finalization() -> Self {
        Self {
            max_attempts: 10,
            base_delay_ms: 1000,
            max_delay_ms: 8000,
        }
    }
}
