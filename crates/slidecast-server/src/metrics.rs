//! Prometheus metrics recorder and metric names.

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing::info;

/// Install the global Prometheus recorder.
///
/// Returns the handle that renders `/metrics`. Fails if another recorder is
/// already installed.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    info!("prometheus metrics recorder installed");
    Ok(handle)
}

/// WebSocket connections opened total (counter, labels: role).
pub const WS_CONNECTIONS_TOTAL: &str = "ws_connections_total";
/// WebSocket disconnections total (counter).
pub const WS_DISCONNECTIONS_TOTAL: &str = "ws_disconnections_total";
/// Open WebSocket connections (gauge).
pub const WS_CONNECTIONS_ACTIVE: &str = "ws_connections_active";
/// WebSocket connection duration seconds (histogram).
pub const WS_CONNECTION_DURATION_SECONDS: &str = "ws_connection_duration_seconds";
/// Frames dropped because a connection's queue was full or closed (counter).
pub const WS_BROADCAST_DROPS_TOTAL: &str = "ws_broadcast_drops_total";
/// Inbound messages handled (counter, labels: action).
pub const MESSAGES_HANDLED_TOTAL: &str = "messages_handled_total";
/// Inbound messages dropped (counter, labels: reason).
pub const MESSAGES_DROPPED_TOTAL: &str = "messages_dropped_total";
/// Connections refused at admission (counter, labels: reason).
pub const ADMISSIONS_REJECTED_TOTAL: &str = "admissions_rejected_total";
/// Slide uploads (counter, labels: outcome).
pub const SLIDE_UPLOADS_TOTAL: &str = "slide_uploads_total";
