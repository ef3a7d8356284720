//! Per-connection state.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use slidecast_core::protocol::ServerMessage;
use slidecast_core::{ClientId, ConnectionId, Role, SessionId};
use tokio::sync::mpsc;
use tracing::warn;

/// A live transport handle.
///
/// Owned by the socket task; the registry only holds `Arc` clones. The
/// session back-reference is written by the registry alone so that bucket
/// membership and `session_id()` never disagree.
pub struct ClientConnection {
    /// Server-assigned id.
    pub id: ConnectionId,
    /// Client-chosen id used for echo suppression.
    pub client_id: Option<ClientId>,
    /// When this connection was established.
    pub connected_at: Instant,
    /// Frames dropped because the queue was full or closed.
    pub dropped_messages: AtomicU64,
    role: Mutex<Option<Role>>,
    session_id: Mutex<Option<SessionId>>,
    tx: mpsc::Sender<Arc<String>>,
}

impl ClientConnection {
    /// Create a connection that writes into `tx`.
    pub fn new(
        id: ConnectionId,
        role: Option<Role>,
        client_id: Option<ClientId>,
        tx: mpsc::Sender<Arc<String>>,
    ) -> Self {
        Self {
            id,
            client_id,
            connected_at: Instant::now(),
            dropped_messages: AtomicU64::new(0),
            role: Mutex::new(role),
            session_id: Mutex::new(None),
            tx,
        }
    }

    /// Role, if one has been assigned.
    pub fn role(&self) -> Option<Role> {
        *self.role.lock()
    }

    /// The connection's role, adopting `hint` if none was assigned at
    /// connect time. Once set, the role never changes.
    pub fn resolve_role(&self, hint: Option<Role>) -> Option<Role> {
        let mut role = self.role.lock();
        if role.is_none() {
            *role = hint;
        }
        *role
    }

    /// Session this connection is registered under.
    pub fn session_id(&self) -> Option<SessionId> {
        self.session_id.lock().clone()
    }

    pub(crate) fn set_session(&self, session_id: Option<SessionId>) -> Option<SessionId> {
        std::mem::replace(&mut *self.session_id.lock(), session_id)
    }

    /// Queue a text frame without waiting.
    ///
    /// Returns `false` if the queue is full or the socket task has exited;
    /// the drop is counted.
    pub fn send(&self, message: Arc<String>) -> bool {
        if self.tx.try_send(message).is_ok() {
            true
        } else {
            let _ = self.dropped_messages.fetch_add(1, Ordering::Relaxed);
            false
        }
    }

    /// Serialize and queue one message.
    pub fn send_message(&self, message: &ServerMessage) -> bool {
        match message.to_json() {
            Ok(json) => self.send(Arc::new(json)),
            Err(e) => {
                warn!(conn_id = %self.id, action = message.action(), error = %e, "failed to serialize message");
                false
            }
        }
    }

    /// Total frames dropped for this connection.
    pub fn drop_count(&self) -> u64 {
        self.dropped_messages.load(Ordering::Relaxed)
    }

    /// Connection age.
    pub fn age(&self) -> Duration {
        self.connected_at.elapsed()
    }
}
