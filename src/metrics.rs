// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Metrics instrumentation for querysets.
//!
//! Uses the `metrics` crate for backend-agnostic metrics collection.
//! The embedding application is responsible for choosing the exporter.
//!
//! # Metric Naming Convention
//! - `es_queryset_` prefix for all metrics
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Labels
//! - `kind`: search, count, get, complete
//! - `status`: success, error, not_found

use metrics::{counter, histogram};
use std::time::{Duration, Instant};

/// Record a backend round trip
pub fn record_request(kind: &str, status: &str) {
    counter!(
        "es_queryset_requests_total",
        "kind" => kind.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record round-trip latency
pub fn record_latency(kind: &str, duration: Duration) {
    histogram!(
        "es_queryset_request_seconds",
        "kind" => kind.to_string()
    )
    .record(duration.as_secs_f64());
}

/// Record the number of rows a search returned
pub fn record_rows(count: usize) {
    histogram!("es_queryset_rows").record(count as f64);
}

/// Record a result-cache hit/miss on a cursor
pub fn record_cache(hit: bool) {
    let outcome = if hit { "hit" } else { "miss" };
    counter!(
        "es_queryset_cache_total",
        "outcome" => outcome
    )
    .increment(1);
}

/// Record a compile failure (bad lookup/operand)
pub fn record_compile_error(kind: &str) {
    counter!(
        "es_queryset_compile_errors_total",
        "kind" => kind.to_string()
    )
    .increment(1);
}

/// A timing guard that records latency on drop
pub struct LatencyTimer {
    kind: &'static str,
    start: Instant,
}

impl LatencyTimer {
    /// Start a new latency timer
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            start: Instant::now(),
        }
    }
}

impl Drop for LatencyTimer {
    fn drop(&mut self) {
        record_latency(self.kind, self.start.elapsed());
    }
}
