//! Structured request logging

use crate::observability::{CorrelationId, RequestPhase};
use solana_sdk::pubkey::Pubkey;

/// Structured logger bound to one request
#[derive(Debug, Clone)]
pub struct StructuredLogger {
    correlation_id: CorrelationId,
    phase: RequestPhase,
}

impl StructuredLogger {
    pub fn new(phase: RequestPhase) -> Self {
        Self {
            correlation_id: CorrelationId::new(),
            phase,
        }
    }

    pub fn with_correlation_id(phase: RequestPhase, correlation_id: CorrelationId) -> Self {
        Self {
            correlation_id,
            phase,
        }
    }

    pub fn correlation_id(&self) -> &CorrelationId {
        &self.correlation_id
    }

    pub fn phase(&self) -> RequestPhase {
        self.phase
    }

    pub fn display_served(&self, item: &str) {
        tracing::info!(
            correlation_id = %self.correlation_id,
            phase = %self.phase,
            item = %item,
            "Display served"
        );
    }

    pub fn transaction_built(&self, payer: &Pubkey, item: &str, latency_ms: u64) {
        tracing::info!(
            correlation_id = %self.correlation_id,
            phase = %self.phase,
            payer = %payer,
            item = %item,
            latency_ms = %latency_ms,
            "Transaction built"
        );
    }

    pub fn request_failed(&self, payer: Option<&str>, category: &str, error: &str) {
        tracing::warn!(
            correlation_id = %self.correlation_id,
            phase = %self.phase,
            payer = ?payer,
            category = %category,
            error = %error,
            "Request failed"
        );
    }

    pub fn warn(&self, message: &str) {
        tracing::warn!(
            correlation_id = %self.correlation_id,
            phase = %self.phase,
            message = %message,
            "Warning"
        );
    }
}
