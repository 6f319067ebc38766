// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus metrics for extension lifecycle operations.
//!
//! All metrics use the namespace prefix `extension_lifecycle` and live in
//! [`METRICS_REGISTRY`], which the embedding operator exposes on its `/metrics` endpoint
//! (see [`gather_metrics`]).
//!
//! # Metrics Categories
//!
//! - **Operation Metrics** - Outcome of every deploy, wait, destroy, migrate and restore
//! - **Wait Metrics** - How long waits for extension controllers take
//! - **Fan-out Metrics** - Errors collected across many extension resources
//!
//! # Example
//!
//! ```rust,no_run
//! use extension_lifecycle::metrics::record_operation_success;
//!
//! record_operation_success("DNSRecord", "deploy");
//! ```

use prometheus::{CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};
use std::sync::LazyLock;
use std::time::Duration;

// ============================================================================
// Metric Name Constants
// ============================================================================

/// Namespace prefix for all extension lifecycle metrics
const METRICS_NAMESPACE: &str = "extension_lifecycle";

// ============================================================================
// Global Metrics Registry
// ============================================================================

/// Global Prometheus metrics registry
pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// ============================================================================
// Operation Metrics
// ============================================================================

/// Total number of lifecycle operations by kind, operation and outcome
///
/// Labels:
/// - `kind`: Kind of extension resource (e.g., `DNSRecord`, `Extension`)
/// - `operation`: `deploy`, `wait`, `destroy`, `wait_cleanup`, `migrate`, `wait_migrate`, `restore`
/// - `status`: Outcome (`success`, `error`, `timeout`, `cancelled`)
pub static OPERATIONS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_operations_total"),
        "Total number of extension lifecycle operations by kind, operation and status",
    );
    let counter = CounterVec::new(opts, &["kind", "operation", "status"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Wait Metrics
// ============================================================================

/// Duration of waits for extension controllers in seconds
///
/// Labels:
/// - `kind`: Kind of extension resource
/// - `operation`: Which wait (`wait`, `wait_cleanup`, `wait_migrate`)
pub static WAIT_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        format!("{METRICS_NAMESPACE}_wait_duration_seconds"),
        "Duration of waits for extension resources in seconds by kind and operation",
    )
    .buckets(vec![1.0, 5.0, 10.0, 30.0, 60.0, 120.0, 180.0, 300.0, 600.0]);
    let histogram = HistogramVec::new(opts, &["kind", "operation"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(histogram.clone()))
        .unwrap();
    histogram
});

// ============================================================================
// Fan-out Metrics
// ============================================================================

/// Total number of per-resource errors collected by fan-out operations
///
/// Labels:
/// - `kind`: Kind of extension resource
/// - `operation`: Fan-out operation that collected the error
pub static FANOUT_ERRORS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_fanout_errors_total"),
        "Total number of errors collected by fan-out operations by kind and operation",
    );
    let counter = CounterVec::new(opts, &["kind", "operation"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Helper Functions
// ============================================================================

/// Record a successful operation
pub fn record_operation_success(kind: &str, operation: &str) {
    OPERATIONS_TOTAL
        .with_label_values(&[kind, operation, "success"])
        .inc();
}

/// Record a failed operation
///
/// # Arguments
/// * `kind` - The kind of extension resource
/// * `operation` - The lifecycle operation that failed
/// * `status` - Outcome label (`error`, `timeout`, `cancelled`)
pub fn record_operation_failure(kind: &str, operation: &str, status: &str) {
    OPERATIONS_TOTAL
        .with_label_values(&[kind, operation, status])
        .inc();
}

/// Record how long a wait took, whatever its outcome
pub fn record_wait_duration(kind: &str, operation: &str, duration: Duration) {
    WAIT_DURATION_SECONDS
        .with_label_values(&[kind, operation])
        .observe(duration.as_secs_f64());
}

/// Record the errors collected by one fan-out
pub fn record_fanout_errors(kind: &str, operation: &str, count: usize) {
    #[allow(clippy::cast_precision_loss)]
    FANOUT_ERRORS_TOTAL
        .with_label_values(&[kind, operation])
        .inc_by(count as f64);
}

/// Gather and encode all metrics in Prometheus text format
///
/// # Errors
/// Returns error if encoding fails
pub fn gather_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = METRICS_REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(format!("UTF-8 error: {e}")))
}
