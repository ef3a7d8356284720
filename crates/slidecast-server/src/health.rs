//! `/health` endpoint.

use serde::Serialize;
use std::time::Instant;

/// Health check response body.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Always `"ok"` when the server is running.
    pub status: String,
    /// Seconds since the server started.
    pub uptime_secs: u64,
    /// Open WebSocket connections, attached to a session or not.
    pub connections: usize,
    /// Sessions with at least one attached connection.
    pub active_sessions: usize,
}

/// Build a health response from live counters.
pub fn health_check(start_time: Instant, connections: usize, sessions: usize) -> HealthResponse {
    HealthResponse {
        status: "ok".into(),
        uptime_secs: start_time.elapsed().as_secs(),
        connections,
        active_sessions: sessions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_counters() {
        let resp = health_check(Instant::now(), 4, 2);
        assert_eq!(resp.status, "ok");
        assert_eq!(resp.connections, 4);
        assert_eq!(resp.active_sessions, 2);
    }

    #[test]
    fn serializes_snake_case_fields() {
        let json = serde_json::to_value(health_check(Instant::now(), 0, 0)).unwrap();
        assert_eq!(json["status"], "ok");
        assert!(json["uptime_secs"].is_number());
        assert!(json.get("active_sessions").is_some());
    }
}
