// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Metrics instrumentation for view-sync.
//!
//! Uses the `metrics` crate for backend-agnostic metrics collection.
//! The host application is responsible for choosing the exporter (Prometheus, OTEL, etc.)
//!
//! # Metric Naming Convention
//! - `view_sync_` prefix for all metrics
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Labels
//! - `design`: design document name
//! - `operation`: sync, query, page, begin
//! - `outcome` / `status`: written, unchanged, success, error

use metrics::{counter, gauge, histogram};
use std::time::{Duration, Instant};

// ═══════════════════════════════════════════════════════════════════════════
// SYNC - Design document convergence
// ═══════════════════════════════════════════════════════════════════════════

/// Record the outcome for one design document (written, unchanged, converged)
pub fn record_design_doc(design: &str, outcome: &str) {
    counter!(
        "view_sync_design_docs_total",
        "design" => design.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Record a full sync pass
pub fn record_sync(success: bool, duration: Duration) {
    let status = if success { "success" } else { "error" };
    counter!(
        "view_sync_syncs_total",
        "status" => status
    )
    .increment(1);
    histogram!("view_sync_sync_seconds").record(duration.as_secs_f64());
}

/// Record a post-sync callback that returned an error
pub fn record_callback_failure(callback: &str) {
    counter!(
        "view_sync_callback_failures_total",
        "callback" => callback.to_string()
    )
    .increment(1);
}

// ═══════════════════════════════════════════════════════════════════════════
// QUERIES - View reads and pagination
// ═══════════════════════════════════════════════════════════════════════════

/// Record a view query execution
pub fn record_view_query(design: &str, view: &str, status: &str) {
    counter!(
        "view_sync_view_queries_total",
        "design" => design.to_string(),
        "view" => view.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record rows returned by a view query
pub fn record_view_rows(count: usize) {
    histogram!("view_sync_view_rows").record(count as f64);
}

/// Record a served page and which neighbours it links to
pub fn record_page(has_next: bool, has_prev: bool) {
    counter!(
        "view_sync_pages_total",
        "has_next" => if has_next { "true" } else { "false" },
        "has_prev" => if has_prev { "true" } else { "false" }
    )
    .increment(1);
}

/// Record a rejected cursor token
pub fn record_malformed_cursor() {
    counter!("view_sync_malformed_cursors_total").increment(1);
}

// ═══════════════════════════════════════════════════════════════════════════
// SCOPES - Per-request store handles
// ═══════════════════════════════════════════════════════════════════════════

/// Record a handle being opened
pub fn record_scope_begin(synced: bool) {
    counter!(
        "view_sync_scopes_opened_total",
        "synced" => if synced { "true" } else { "false" }
    )
    .increment(1);
    gauge!("view_sync_open_handles").increment(1.0);
}

/// Record a handle being released
pub fn record_scope_end(held: Duration) {
    counter!("view_sync_scopes_closed_total").increment(1);
    gauge!("view_sync_open_handles").decrement(1.0);
    histogram!("view_sync_scope_seconds").record(held.as_secs_f64());
}

// ═══════════════════════════════════════════════════════════════════════════
// ERROR TRACKING - Categorized error counters for alerting
// ═══════════════════════════════════════════════════════════════════════════

/// Record a store error by operation and kind
pub fn record_store_error(operation: &str, error_type: &str) {
    counter!(
        "view_sync_store_errors_total",
        "operation" => operation.to_string(),
        "error_type" => error_type.to_string()
    )
    .increment(1);
}

/// Record a timeout
pub fn record_timeout(operation: &str) {
    counter!(
        "view_sync_timeouts_total",
        "operation" => operation.to_string()
    )
    .increment(1);
}

/// Record operation latency
pub fn record_latency(operation: &str, duration: Duration) {
    histogram!(
        "view_sync_operation_seconds",
        "operation" => operation.to_string()
    )
    .record(duration.as_secs_f64());
}

/// Whole milliseconds for log fields, saturating at `u64::MAX`
pub fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// A timing guard that records latency on drop
pub struct LatencyTimer {
    operation: &'static str,
    start: Instant,
}

impl LatencyTimer {
    /// Start a new latency timer
    pub fn new(operation: &'static str) -> Self {
        Self {
            operation,
            start: Instant::now(),
        }
    }
}

impl Drop for LatencyTimer {
    fn drop(&mut self) {
        record_latency(self.operation, self.start.elapsed());
    }
}
