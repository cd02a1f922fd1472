//! Metrics collection for `rdomock`.
//!
//! Prometheus-compatible counters for match outcomes, session phase
//! transitions and transport errors. Every recording function is a silent
//! no-op until [`init_metrics`] installs a recorder, so library users and
//! tests pay nothing for them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::error::RdoMockError;
use crate::matching::MatchStrategy;
use crate::session::SessionPhase;

/// Guard to prevent double-initialization of the metrics recorder.
static METRICS_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Protocol families accepted as label values.
const KNOWN_PROTOCOLS: [&str; 3] = ["rdo", "ws", "http"];

/// Buckets anything outside [`KNOWN_PROTOCOLS`] as `"__unknown__"`.
#[must_use]
pub fn sanitize_protocol_label(protocol: &str) -> &str {
    if KNOWN_PROTOCOLS.contains(&protocol) {
        protocol
    } else {
        "__unknown__"
    }
}

/// Initializes the global metrics recorder.
///
/// When `port` is `Some`, a Prometheus HTTP listener is started on
/// `127.0.0.1:<port>`. When `None`, the recorder is installed without an
/// HTTP endpoint.
///
/// # Errors
///
/// Returns `RdoMockError::Io` if the recorder or HTTP listener cannot be
/// installed (e.g. port already in use).
pub fn init_metrics(port: Option<u16>) -> Result<(), RdoMockError> {
    if METRICS_INITIALIZED.swap(true, Ordering::SeqCst) {
        tracing::debug!("metrics already initialized, skipping");
        return Ok(());
    }
    port.map_or_else(
        || PrometheusBuilder::new().install_recorder().map(|_| ()),
        |p| {
            PrometheusBuilder::new()
                .with_http_listener(([127, 0, 0, 1], p))
                .install()
        },
    )
    .map_err(|e| RdoMockError::Io(std::io::Error::other(e.to_string())))?;

    describe_metrics();
    Ok(())
}

fn describe_metrics() {
    describe_counter!(
        "rdomock_requests_total",
        "Total number of requests received, by protocol"
    );
    describe_counter!(
        "rdomock_matches_total",
        "RDO commands answered, by matching strategy"
    );
    describe_counter!(
        "rdomock_misses_total",
        "Requests no captured exchange answered, by protocol"
    );
    describe_histogram!(
        "rdomock_request_duration_ms",
        "Request processing duration in milliseconds"
    );
    describe_counter!(
        "rdomock_phase_transitions_total",
        "Total number of session phase transitions"
    );
    describe_gauge!(
        "rdomock_current_phase",
        "Currently active session phase (1 = active)"
    );
    describe_counter!(
        "rdomock_errors_total",
        "Total number of errors by category"
    );
}

/// Records an incoming request.
pub fn record_request(protocol: &str) {
    let label = sanitize_protocol_label(protocol);
    counter!("rdomock_requests_total", "protocol" => label.to_owned()).increment(1);
}

/// Records an RDO command answered by `strategy`.
pub fn record_match(strategy: MatchStrategy) {
    counter!("rdomock_matches_total", "strategy" => strategy.label()).increment(1);
}

/// Records a request no exchange answered.
pub fn record_miss(protocol: &str) {
    let label = sanitize_protocol_label(protocol);
    counter!("rdomock_misses_total", "protocol" => label.to_owned()).increment(1);
}

/// Records request processing duration.
pub fn record_request_duration(protocol: &str, duration: Duration) {
    let label = sanitize_protocol_label(protocol);
    histogram!("rdomock_request_duration_ms", "protocol" => label.to_owned())
        .record(duration.as_secs_f64() * 1000.0);
}

/// Records a session phase transition and moves the current-phase gauge.
pub fn record_phase_transition(from: SessionPhase, to: SessionPhase) {
    counter!(
        "rdomock_phase_transitions_total",
        "from" => from.as_str(),
        "to" => to.as_str()
    )
    .increment(1);
    gauge!("rdomock_current_phase", "phase" => from.as_str()).set(0.0);
    gauge!("rdomock_current_phase", "phase" => to.as_str()).set(1.0);
}

/// Records an error by category.
pub fn record_error(category: &'static str) {
    counter!("rdomock_errors_total", "category" => category).increment(1);
}
