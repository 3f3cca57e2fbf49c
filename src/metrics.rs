//! Metrics instrumentation for nomad-dns.
//!
//! All metrics are prefixed with `nomad_dns.`

use metrics::{counter, gauge, histogram};
use std::time::Instant;

/// Outcome of a service lookup, for metrics.
#[derive(Debug, Clone, Copy)]
pub enum RequestResult {
    /// Query answered with records (or a well-formed negative answer).
    Success,
    /// Query failed (no endpoint, registry error, bad data, unsupported type).
    Failure,
}

/// Record a handled service lookup, labeled by server identity and namespace.
pub fn record_request(server: &str, namespace: &str, result: RequestResult) {
    let name = match result {
        RequestResult::Success => "nomad_dns.request.success.count",
        RequestResult::Failure => "nomad_dns.request.failed.count",
    };
    counter!(name, "server" => server.to_string(), "namespace" => namespace.to_string())
        .increment(1);
}

/// Record the duration of a handled service lookup.
pub fn record_request_duration(record_type: &str, duration: std::time::Duration) {
    histogram!("nomad_dns.request.duration.seconds", "type" => record_type.to_string())
        .record(duration.as_secs_f64());
}

/// Record a liveness probe against a registry endpoint.
pub fn record_probe(endpoint: &str, ok: bool) {
    let result = if ok { "success" } else { "failure" };
    counter!("nomad_dns.endpoint.probe.count", "endpoint" => endpoint.to_string(), "result" => result)
        .increment(1);
}

/// Record pool state (call periodically or on change).
pub fn record_pool_state(endpoints: usize, current: usize) {
    gauge!("nomad_dns.endpoints.count").set(endpoints as f64);
    gauge!("nomad_dns.endpoints.current").set(current as f64);
}

/// Helper for timing operations.
pub struct Timer {
    start: Instant,
}

impl Timer {
    /// Start a new timer.
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get elapsed duration since timer start.
    pub fn elapsed(&self) -> std::time::Duration {
        self.start.elapsed()
    }
}
