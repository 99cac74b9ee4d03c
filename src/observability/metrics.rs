//! Metrics collection and exposition.
//!
//! # Metrics
//! - `relay_requests_total` (counter): forwarded requests by rule and outcome
//! - `relay_request_duration_seconds` (histogram): issue-to-stream-end latency
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade and is a no-op until a
//!   recorder is installed
//! - Outcome label is `ok` or the error kind's wire name

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::error::ErrorKind;

/// Install the Prometheus recorder with its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_success(rule: &str, elapsed: Duration) {
    counter!("relay_requests_total", "rule" => rule.to_string(), "outcome" => "ok").increment(1);
    histogram!("relay_request_duration_seconds", "rule" => rule.to_string())
        .record(elapsed.as_secs_f64());
}

pub fn record_failure(rule: &str, kind: ErrorKind) {
    counter!(
        "relay_requests_total",
        "rule" => rule.to_string(),
        "outcome" => kind.as_str()
    )
    .increment(1);
}
