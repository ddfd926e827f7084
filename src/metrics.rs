//! Metrics collection and export module

use prometheus::{
    Encoder, Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry,
    TextEncoder,
};
use std::time::Instant;

/// Global metrics registry
pub struct Metrics {
    registry: Registry,

    // Counters
    pub display_requests: IntCounter,
    pub transaction_requests: IntCounter,
    pub request_failures: IntCounterVec,
    pub transactions_submitted: IntCounter,
    pub transactions_failed: IntCounter,

    // Histograms
    pub build_latency: Histogram,
    pub rpc_latency: HistogramVec,
}

impl Metrics {
    /// Create new metrics instance
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let display_requests = IntCounter::with_opts(Opts::new(
            "minter_display_requests_total",
            "Payment-request display (GET) calls served",
        ))?;
        let transaction_requests = IntCounter::with_opts(Opts::new(
            "minter_transaction_requests_total",
            "Payment-request transaction (POST) calls received",
        ))?;
        let request_failures = IntCounterVec::new(
            Opts::new(
                "minter_request_failures_total",
                "Payment-request calls answered with an error payload",
            ),
            &["category"],
        )?;
        let transactions_submitted = IntCounter::with_opts(Opts::new(
            "minter_transactions_submitted_total",
            "Envelopes accepted by the ledger",
        ))?;
        let transactions_failed = IntCounter::with_opts(Opts::new(
            "minter_transactions_failed_total",
            "Envelopes rejected by the ledger",
        ))?;

        let build_latency = Histogram::with_opts(
            HistogramOpts::new(
                "minter_build_latency_seconds",
                "Compose + assemble latency",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 2.0]),
        )?;
        let rpc_latency = HistogramVec::new(
            HistogramOpts::new("minter_rpc_latency_seconds", "Ledger RPC call latency")
                .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
            &["operation"],
        )?;

        // Register all metrics
        registry.register(Box::new(display_requests.clone()))?;
        registry.register(Box::new(transaction_requests.clone()))?;
        registry.register(Box::new(request_failures.clone()))?;
        registry.register(Box::new(transactions_submitted.clone()))?;
        registry.register(Box::new(transactions_failed.clone()))?;
        registry.register(Box::new(build_latency.clone()))?;
        registry.register(Box::new(rpc_latency.clone()))?;

        Ok(Self {
            registry,
            display_requests,
            transaction_requests,
            request_failures,
            transactions_submitted,
            transactions_failed,
            build_latency,
            rpc_latency,
        })
    }

    /// Count a failed request by error category
    pub fn record_failure(&self, category: &str) {
        self.request_failures.with_label_values(&[category]).inc();
    }

    /// Render the registry in the Prometheus text format
    pub fn render(&self) -> anyhow::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

/// Global metrics instance
pub fn metrics() -> &'static Metrics {
    // Metric names are static; construction only fails on a programming error
    static METRICS: once_cell::sync::Lazy<Metrics> =
        once_cell::sync::Lazy::new(|| Metrics::new().expect("Failed to initialize metrics"));
    &METRICS
}

/// Timer helper for measuring operation duration
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn observe_duration(&self, histogram: &Histogram) {
        histogram.observe(self.elapsed_secs());
    }

    /// Record into the RPC latency histogram under `operation`
    pub fn observe_rpc(&self, operation: &str) {
        metrics()
            .rpc_latency
            .with_label_values(&[operation])
            .observe(self.elapsed_secs());
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().unwrap();
        assert_eq!(metrics.display_requests.get(), 0);
    }

    #[test]
    fn test_failures_are_labelled() {
        let metrics = Metrics::new().unwrap();
        metrics.record_failure("validation");
        metrics.record_failure("validation");
        metrics.record_failure("rpc");

        assert_eq!(
            metrics
                .request_failures
                .with_label_values(&["validation"])
                .get(),
            2
        );
        let text = metrics.render().unwrap();
        assert!(text.contains("minter_request_failures_total"));
    }

    #[test]
    fn test_timer() {
        let timer = Timer::new();
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert!(timer.elapsed_secs() >= 0.005);
    }
}
