//! Observability infrastructure for the dashboard service
//!
//! Provides:
//! - Prometheus metrics (payload latency, data gaps, upstream errors, profile fallbacks)
//! - Structured JSON logging with tracing

use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, HistogramVec,
    IntCounter, IntCounterVec,
};
use std::sync::OnceLock;
use tracing::{debug, info, warn};

/// Histogram buckets for payload build latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<DashboardMetricsInner> = OnceLock::new();

/// Inner metrics structure that holds the actual Prometheus metrics
struct DashboardMetricsInner {
    payload_latency_seconds: HistogramVec,
    payload_requests: IntCounterVec,
    data_gaps: IntCounterVec,
    upstream_errors: IntCounterVec,
    profile_fallbacks: IntCounter,
}

impl DashboardMetricsInner {
    fn new() -> Self {
        Self {
            payload_latency_seconds: register_histogram_vec!(
                "infra_dashboard_payload_latency_seconds",
                "Time spent building a dashboard payload",
                &["payload"],
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register payload_latency_seconds"),

            payload_requests: register_int_counter_vec!(
                "infra_dashboard_payload_requests_total",
                "Dashboard payload requests by outcome",
                &["payload", "outcome"]
            )
            .expect("Failed to register payload_requests"),

            data_gaps: register_int_counter_vec!(
                "infra_dashboard_data_gaps_total",
                "Metric records skipped because their resource no longer exists",
                &["payload"]
            )
            .expect("Failed to register data_gaps"),

            upstream_errors: register_int_counter_vec!(
                "infra_dashboard_upstream_errors_total",
                "Failed reads from upstream stores",
                &["store"]
            )
            .expect("Failed to register upstream_errors"),

            profile_fallbacks: register_int_counter!(
                "infra_dashboard_profile_fallbacks_total",
                "Requests served with the default time profile"
            )
            .expect("Failed to register profile_fallbacks"),
        }
    }
}

/// Dashboard metrics for Prometheus exposition
///
/// Lightweight handle to the global metrics instance; clones share the
/// same underlying metrics.
#[derive(Clone)]
pub struct DashboardMetrics {
    _private: (),
}

impl Default for DashboardMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl DashboardMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(DashboardMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &DashboardMetricsInner {
        GLOBAL_METRICS.get_or_init(DashboardMetricsInner::new)
    }

    /// Record how long a payload took to build
    pub fn observe_payload_latency(&self, payload: &str, duration_secs: f64) {
        self.inner()
            .payload_latency_seconds
            .with_label_values(&[payload])
            .observe(duration_secs);
    }

    /// Count a payload request; `outcome` is "ok" or an error class
    pub fn inc_payload_requests(&self, payload: &str, outcome: &str) {
        self.inner()
            .payload_requests
            .with_label_values(&[payload, outcome])
            .inc();
    }

    pub fn add_data_gaps(&self, payload: &str, skipped: usize) {
        if skipped > 0 {
            self.inner()
                .data_gaps
                .with_label_values(&[payload])
                .inc_by(skipped as u64);
        }
    }

    pub fn inc_upstream_errors(&self, store: &str) {
        self.inner()
            .upstream_errors
            .with_label_values(&[store])
            .inc();
    }

    pub fn inc_profile_fallbacks(&self) {
        self.inner().profile_fallbacks.inc();
    }

    pub fn profile_fallbacks(&self) -> u64 {
        self.inner().profile_fallbacks.get()
    }

    pub fn data_gaps(&self, payload: &str) -> u64 {
        self.inner().data_gaps.with_label_values(&[payload]).get()
    }
}

/// Structured logger for dashboard events
///
/// Tags each record with an `event` field so log pipelines can filter on it.
#[derive(Clone)]
pub struct StructuredLogger {
    instance: String,
}

impl StructuredLogger {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    pub fn log_startup(&self, version: &str, listen_addr: &str) {
        info!(
            event = "startup",
            instance = %self.instance,
            version = %version,
            listen_addr = %listen_addr,
            "Infrastructure dashboard starting"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "shutdown",
            instance = %self.instance,
            reason = %reason,
            "Infrastructure dashboard shutting down"
        );
    }

    /// Log a finished payload
    pub fn log_payload(&self, payload: &str, ems_id: Option<u64>, elapsed_ms: u128) {
        debug!(
            event = "payload_built",
            instance = %self.instance,
            payload = %payload,
            ems_id = ?ems_id,
            elapsed_ms = elapsed_ms,
            "Dashboard payload built"
        );
    }

    /// Log records dropped because their resource is gone
    pub fn log_data_gap(&self, payload: &str, skipped: usize) {
        debug!(
            event = "data_gap",
            instance = %self.instance,
            payload = %payload,
            skipped = skipped,
            "Skipped metric records for purged resources"
        );
    }

    pub fn log_upstream_failure(&self, store: &str, error: &str) {
        warn!(
            event = "upstream_failure",
            instance = %self.instance,
            store = %store,
            error = %error,
            "Upstream store read failed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dashboard_metrics_creation() {
        // Metrics live in the process-wide Prometheus registry, so only
        // relative changes are asserted here.
        let metrics = DashboardMetrics::new();

        metrics.observe_payload_latency("cluster_heatmap_data", 0.002);
        metrics.inc_payload_requests("cluster_heatmap_data", "ok");
        metrics.inc_upstream_errors("rollup_store");

        let before = metrics.data_gaps("test_payload");
        metrics.add_data_gaps("test_payload", 3);
        metrics.add_data_gaps("test_payload", 0);
        assert_eq!(metrics.data_gaps("test_payload"), before + 3);
    }

    #[test]
    fn test_metrics_handles_share_state() {
        let a = DashboardMetrics::new();
        let b = a.clone();

        let before = a.profile_fallbacks();
        b.inc_profile_fallbacks();
        assert!(a.profile_fallbacks() > before);
    }

    #[test]
    fn test_structured_logger_creation() {
        let logger = StructuredLogger::new("dashboard-0");
        assert_eq!(logger.instance, "dashboard-0");
        logger.log_data_gap("cluster_heatmap_data", 2);
    }
}
