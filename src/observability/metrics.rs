//! Metrics collection and exposition.
//!
//! # Metrics
//! - `routez_admin_requests_total` (counter): admin requests by op, status
//! - `routez_active_routes` (gauge): current registry size
//! - `routez_route_closed_total` (counter): closed routes by solicited flag
//! - `routez_reconnect_attempts_total` (counter): redials of lost routes
//!
//! Recording is a no-op until a recorder is installed, so library users and
//! tests pay nothing when the exporter is disabled.

use std::net::SocketAddr;
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_admin_request(op: &'static str, status: u16) {
    metrics::counter!("routez_admin_requests_total", "op" => op, "status" => status.to_string())
        .increment(1);
}

pub fn set_active_routes(count: usize) {
    metrics::gauge!("routez_active_routes").set(count as f64);
}

pub fn record_route_closed(solicited: bool) {
    let solicited = if solicited { "true" } else { "false" };
    metrics::counter!("routez_route_closed_total", "solicited" => solicited).increment(1);
}

pub fn record_reconnect_attempt() {
    metrics::counter!("routez_reconnect_attempts_total").increment(1);
}
