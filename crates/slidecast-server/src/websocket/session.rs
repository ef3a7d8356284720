//! WebSocket session lifecycle: handles a single connected client from
//! upgrade through disconnect.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::ws::{CloseFrame, Message, WebSocket, close_code};
use futures::{SinkExt, StreamExt};
use metrics::{counter, gauge, histogram};
use serde::Deserialize;
use slidecast_core::protocol::ServerMessage;
use slidecast_core::{ClientId, ConnectionId, Role, SessionId, SyncError};
use tokio::sync::mpsc;
use tokio::time::Interval;
use tracing::{debug, info, instrument, warn};

use super::connection::ClientConnection;
use crate::lifecycle::Admission;
use crate::metrics::{
    ADMISSIONS_REJECTED_TOTAL, WS_CONNECTION_DURATION_SECONDS, WS_CONNECTIONS_ACTIVE, WS_CONNECTIONS_TOTAL,
    WS_DISCONNECTIONS_TOTAL,
};
use crate::reconcile::reconcile;
use crate::server::AppState;

/// How long the outbound task gets to flush a going-away frame on shutdown.
const CLOSE_FLUSH: Duration = Duration::from_secs(1);

/// Query string of the `/ws` upgrade request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectParams {
    /// `teacher`, `student` or `getSessions` (or an alias).
    pub role: Option<String>,
    /// Session to join.
    pub session_id: Option<String>,
    /// Client-chosen id for echo suppression.
    pub client_id: Option<String>,
}

impl ConnectParams {
    /// The requested role. Empty means none; an unknown name is an error.
    pub fn role(&self) -> Result<Option<Role>, SyncError> {
        match self.role.as_deref().filter(|r| !r.is_empty()) {
            None => Ok(None),
            Some(name) => Role::parse(name)
                .map(Some)
                .ok_or_else(|| SyncError::PolicyViolation(format!("unknown role {name:?}"))),
        }
    }

    /// The requested session, if a non-empty one was given.
    pub fn session_id(&self) -> Option<SessionId> {
        non_empty(self.session_id.as_deref()).map(SessionId::from)
    }

    /// The client id, if a non-empty one was given.
    pub fn client_id(&self) -> Option<ClientId> {
        non_empty(self.client_id.as_deref()).map(ClientId::from)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Run a WebSocket session for a connected client.
///
/// 1. Admits the connection or closes it with the rejection's close code
/// 2. Answers directory queries with the session list and closes
/// 3. Registers the connection and sends the session snapshot
/// 4. Dispatches incoming text frames through the message router
/// 5. Forwards queued frames and periodic pings to the socket
/// 6. Cleans up on disconnect or shutdown
#[instrument(skip_all, fields(conn_id = %conn_id))]
pub async fn run_ws_session(ws: WebSocket, conn_id: ConnectionId, params: ConnectParams, state: AppState) {
    let role = match params.role() {
        Ok(role) => role,
        Err(e) => return reject(ws, &e).await,
    };
    let requested = params.session_id();
    let admission = match state.lifecycle.admit(role, requested.as_ref()).await {
        Ok(admission) => admission,
        Err(e) => return reject(ws, &e).await,
    };

    let session_id = match admission {
        Admission::Directory(records) => return answer_directory(ws, records).await,
        Admission::Unassigned => None,
        Admission::Session(id) => Some(id),
    };

    let (send_tx, send_rx) = mpsc::channel::<Arc<String>>(state.config.send_queue_capacity);
    let conn = Arc::new(ClientConnection::new(conn_id, role, params.client_id(), send_tx));
    let role_label = role.map_or("unassigned", Role::as_str);

    let connection_start = Instant::now();
    info!(role = role_label, session_id = ?session_id, client_id = ?conn.client_id, "client connected");
    counter!(WS_CONNECTIONS_TOTAL, "role" => role_label).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).increment(1.0);
    state.hub.connection_opened();

    if let Some(id) = &session_id {
        let _ = state.hub.registry.register(id, &conn);
        if let Err(e) = reconcile(&state.lifecycle, &state.hub, &conn, id).await {
            debug!(session_id = %id, error = %e, "no snapshot on join");
        }
    }

    let token = state.shutdown.token();
    let (ws_tx, mut ws_rx) = ws.split();
    let mut outbound = tokio::spawn(forward_outbound(ws_tx, send_rx, state.config.ping_interval(), token.clone()));

    loop {
        let frame = tokio::select! {
            frame = ws_rx.next() => frame,
            () = token.cancelled() => break,
        };
        let text = match frame {
            Some(Ok(Message::Text(t))) => t.to_string(),
            Some(Ok(Message::Binary(data))) => match String::from_utf8(data.to_vec()) {
                Ok(s) => s,
                Err(_) => {
                    debug!(len = data.len(), "ignoring non-UTF8 binary frame");
                    continue;
                }
            },
            Some(Ok(Message::Close(_))) => {
                debug!("client sent close frame");
                break;
            }
            Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
            Some(Err(e)) => {
                debug!(error = %e, "socket read failed");
                break;
            }
            None => break,
        };
        state.router.dispatch(&conn, &text).await;
    }

    // Clean up
    let _ = state.hub.registry.unregister(&conn);
    state.hub.connection_closed();
    let dropped = conn.drop_count();
    info!(role = role_label, dropped, "client disconnected");
    counter!(WS_DISCONNECTIONS_TOTAL).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).decrement(1.0);
    histogram!(WS_CONNECTION_DURATION_SECONDS).record(connection_start.elapsed().as_secs_f64());
    if token.is_cancelled() {
        let _ = tokio::time::timeout(CLOSE_FLUSH, &mut outbound).await;
    }
    outbound.abort();
}

/// Drain the send queue into the socket, interleaving keepalive pings.
async fn forward_outbound(
    mut ws_tx: futures::stream::SplitSink<WebSocket, Message>,
    mut send_rx: mpsc::Receiver<Arc<String>>,
    ping_every: Option<Duration>,
    token: tokio_util::sync::CancellationToken,
) {
    let mut ping = ping_every.map(|every| tokio::time::interval_at(tokio::time::Instant::now() + every, every));
    loop {
        tokio::select! {
            msg = send_rx.recv() => {
                let Some(text) = msg else { break };
                if ws_tx.send(Message::Text(text.as_str().into())).await.is_err() {
                    break;
                }
            }
            () = next_ping(ping.as_mut()) => {
                if ws_tx.send(Message::Ping(Vec::new().into())).await.is_err() {
                    break;
                }
            }
            () = token.cancelled() => {
                let _ = ws_tx.send(close_message(close_code::AWAY, "server shutting down")).await;
                break;
            }
        }
    }
}

/// Tick `ping` if pinging is enabled; otherwise never resolve.
async fn next_ping(ping: Option<&mut Interval>) {
    match ping {
        Some(interval) => {
            let _ = interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

fn close_message(code: u16, reason: &str) -> Message {
    Message::Close(Some(CloseFrame {
        code,
        reason: reason.into(),
    }))
}

/// Refuse a connection with the close code its error maps to.
async fn reject(mut ws: WebSocket, err: &SyncError) {
    counter!(ADMISSIONS_REJECTED_TOTAL, "reason" => err.kind()).increment(1);
    warn!(error = %err, code = err.close_code(), "connection rejected");
    let reason = err.close_reason();
    if let Err(e) = ws.send(close_message(err.close_code(), &reason)).await {
        debug!(error = %e, "failed to send close frame");
    }
}

/// Send the joinable sessions and close normally.
async fn answer_directory(mut ws: WebSocket, records: Vec<slidecast_core::SessionRecord>) {
    let count = records.len();
    match ServerMessage::session_list(records).to_json() {
        Ok(json) => {
            if ws.send(Message::Text(json.into())).await.is_err() {
                return;
            }
            debug!(count, "sent session list");
            let _ = ws.send(close_message(close_code::NORMAL, "")).await;
        }
        Err(e) => {
            warn!(error = %e, "failed to serialize session list");
            let _ = ws.send(close_message(close_code::ERROR, "internal error")).await;
        }
    }
}
