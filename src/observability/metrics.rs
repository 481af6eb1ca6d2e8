//! Metrics collection and exposition.
//!
//! # Metrics
//! - `session_body_reads_total` (counter): body reads by outcome
//! - `session_body_bytes_total` (counter): bytes collected from request bodies
//! - `session_cookies_cleared_total` (counter): responses that expired the user cookies

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape endpoint.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_body_read(outcome: &'static str, bytes: usize) {
    ::metrics::counter!("session_body_reads_total", "outcome" => outcome).increment(1);
    if bytes > 0 {
        ::metrics::counter!("session_body_bytes_total").increment(bytes as u64);
    }
}

pub fn record_cookies_cleared() {
    ::metrics::counter!("session_cookies_cleared_total").increment(1);
}
