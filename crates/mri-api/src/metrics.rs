//! Client request metrics
//!
//! Recorded through the `metrics` facade; without an installed recorder the
//! calls are no-ops. Embedders that want them install an exporter.
//!
//! - `api_requests_total` (counter): labels `method`, `status`
//! - `api_request_duration_seconds` (histogram): label `status`
//! - `api_token_refresh_total` (counter): label `outcome`

/// Record one request attempt. `status` is the HTTP status code, or
/// `"timeout"` / `"network"` when no response arrived.
pub fn record_request(method: &str, status: &str, duration_secs: f64) {
    metrics::counter!("api_requests_total", "method" => method.to_string(), "status" => status.to_string())
        .increment(1);
    metrics::histogram!("api_request_duration_seconds", "status" => status.to_string())
        .record(duration_secs);
}

/// Record a refresh outcome: `"success"` or `"failure"`.
pub fn record_refresh(outcome: &'static str) {
    metrics::counter!("api_token_refresh_total", "outcome" => outcome).increment(1);
}
