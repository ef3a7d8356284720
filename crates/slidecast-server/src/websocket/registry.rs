//! Connections grouped by session, and fan-out to them.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use metrics::counter;
use parking_lot::RwLock;
use slidecast_core::protocol::ServerMessage;
use slidecast_core::{ConnectionId, SessionId};
use tracing::{debug, warn};

use super::connection::ClientConnection;
use crate::metrics::WS_BROADCAST_DROPS_TOTAL;

type Bucket = HashMap<ConnectionId, Arc<ClientConnection>>;

/// Live connections keyed by session id.
///
/// A connection sits in at most one bucket. Every operation is synchronous,
/// so a handler that has not yet awaited sees a consistent view. Emptying a
/// bucket prunes it; session records and whiteboard state live elsewhere and
/// are not touched.
#[derive(Default)]
pub struct ConnectionRegistry {
    sessions: RwLock<HashMap<SessionId, Bucket>>,
    registered: AtomicUsize,
}

impl ConnectionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `conn` to `session_id`, moving it out of any previous bucket.
    ///
    /// Returns `false` if it was already attached to that session.
    pub fn register(&self, session_id: &SessionId, conn: &Arc<ClientConnection>) -> bool {
        let mut sessions = self.sessions.write();
        let previous = conn.set_session(Some(session_id.clone()));
        if previous.as_ref() == Some(session_id) {
            return false;
        }
        match previous {
            Some(prev) => {
                remove_from(&mut sessions, &prev, &conn.id);
                debug!(conn_id = %conn.id, from = %prev, to = %session_id, "connection moved");
            }
            None => {
                let _ = self.registered.fetch_add(1, Ordering::Relaxed);
            }
        }
        let _ = sessions
            .entry(session_id.clone())
            .or_default()
            .insert(conn.id.clone(), Arc::clone(conn));
        true
    }

    /// Detach `conn`. Idempotent.
    pub fn unregister(&self, conn: &ClientConnection) -> bool {
        let mut sessions = self.sessions.write();
        let Some(prev) = conn.set_session(None) else {
            return false;
        };
        remove_from(&mut sessions, &prev, &conn.id);
        let _ = self.registered.fetch_sub(1, Ordering::Relaxed);
        true
    }

    /// Send `message` to every connection of `session_id` except `exclude`.
    ///
    /// The message is serialized once. A full or closed queue drops that one
    /// frame and delivery continues. Returns how many connections accepted
    /// the frame.
    pub fn broadcast(
        &self,
        session_id: &SessionId,
        message: &ServerMessage,
        exclude: Option<&ConnectionId>,
    ) -> usize {
        let json = match message.to_json() {
            Ok(j) => Arc::new(j),
            Err(e) => {
                warn!(action = message.action(), error = %e, "failed to serialize broadcast");
                return 0;
            }
        };

        let sessions = self.sessions.read();
        let Some(bucket) = sessions.get(session_id) else {
            return 0;
        };
        let mut delivered = 0;
        for conn in bucket.values() {
            if exclude == Some(&conn.id) {
                continue;
            }
            if conn.send(Arc::clone(&json)) {
                delivered += 1;
            } else {
                counter!(WS_BROADCAST_DROPS_TOTAL).increment(1);
                warn!(
                    conn_id = %conn.id,
                    %session_id,
                    total_drops = conn.drop_count(),
                    "failed to queue frame (channel full or closed)"
                );
            }
        }
        debug!(action = message.action(), %session_id, delivered, "broadcast");
        delivered
    }

    /// Snapshot of the connections attached to `session_id`.
    pub fn connections_of(&self, session_id: &SessionId) -> Vec<Arc<ClientConnection>> {
        self.sessions
            .read()
            .get(session_id)
            .map(|bucket| bucket.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Connections attached to any session.
    pub fn connection_count(&self) -> usize {
        self.registered.load(Ordering::Relaxed)
    }

    /// Sessions with at least one attached connection.
    pub fn session_count(&self) -> usize {
        self.sessions.read().len()
    }
}

fn remove_from(sessions: &mut HashMap<SessionId, Bucket>, session_id: &SessionId, id: &ConnectionId) {
    if let Some(bucket) = sessions.get_mut(session_id) {
        let _ = bucket.remove(id);
        if bucket.is_empty() {
            let _ = sessions.remove(session_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn make_connection(capacity: usize) -> (Arc<ClientConnection>, mpsc::Receiver<Arc<String>>) {
        let (tx, rx) = mpsc::channel(capacity);
        let conn = Arc::new(ClientConnection::new(ConnectionId::new(), None, None, tx));
        (conn, rx)
    }

    fn clear(session: &str) -> ServerMessage {
        ServerMessage::WhiteboardClear {
            session_id: SessionId::from(session),
            client_id: None,
        }
    }

    #[test]
    fn register_binds_session() {
        let reg = ConnectionRegistry::new();
        let (conn, _rx) = make_connection(8);
        let s = SessionId::from("S");
        assert!(reg.register(&s, &conn));
        assert!(!reg.register(&s, &conn));
        assert_eq!(conn.session_id(), Some(s.clone()));
        assert_eq!(reg.connections_of(&s).len(), 1);
        assert_eq!(reg.connection_count(), 1);
    }

    #[test]
    fn reregister_moves_between_buckets() {
        let reg = ConnectionRegistry::new();
        let (conn, _rx) = make_connection(8);
        let a = SessionId::from("A");
        let b = SessionId::from("B");
        let _ = reg.register(&a, &conn);
        let _ = reg.register(&b, &conn);
        assert!(reg.connections_of(&a).is_empty());
        assert_eq!(reg.connections_of(&b).len(), 1);
        assert_eq!(reg.connection_count(), 1);
        assert_eq!(reg.session_count(), 1);
    }

    #[test]
    fn unregister_is_idempotent_and_prunes() {
        let reg = ConnectionRegistry::new();
        let (conn, _rx) = make_connection(8);
        let s = SessionId::from("S");
        let _ = reg.register(&s, &conn);
        assert!(reg.unregister(&conn));
        assert!(!reg.unregister(&conn));
        assert_eq!(reg.session_count(), 0);
        assert_eq!(reg.connection_count(), 0);
        assert!(conn.session_id().is_none());
    }

    #[test]
    fn broadcast_excludes_one() {
        let reg = ConnectionRegistry::new();
        let s = SessionId::from("S");
        let mut receivers = Vec::new();
        let mut conns = Vec::new();
        for _ in 0..4 {
            let (conn, rx) = make_connection(8);
            let _ = reg.register(&s, &conn);
            conns.push(conn);
            receivers.push(rx);
        }
        let delivered = reg.broadcast(&s, &clear("S"), Some(&conns[0].id));
        assert_eq!(delivered, 3);
        assert!(receivers[0].try_recv().is_err());
        for rx in &mut receivers[1..] {
            assert!(rx.try_recv().is_ok());
        }
    }

    #[test]
    fn broken_connection_does_not_block_others() {
        let reg = ConnectionRegistry::new();
        let s = SessionId::from("S");
        let (dead, dead_rx) = make_connection(8);
        let (full, _full_rx) = make_connection(1);
        let (ok, mut ok_rx) = make_connection(8);
        for c in [&dead, &full, &ok] {
            let _ = reg.register(&s, c);
        }
        drop(dead_rx);
        assert!(full.send(Arc::new("filler".into())));

        let delivered = reg.broadcast(&s, &clear("S"), None);
        assert_eq!(delivered, 1);
        assert!(ok_rx.try_recv().is_ok());
        assert_eq!(dead.drop_count(), 1);
        assert_eq!(full.drop_count(), 1);
    }

    #[test]
    fn broadcast_is_scoped_to_session() {
        let reg = ConnectionRegistry::new();
        let (a, mut a_rx) = make_connection(8);
        let (b, mut b_rx) = make_connection(8);
        let _ = reg.register(&SessionId::from("A"), &a);
        let _ = reg.register(&SessionId::from("B"), &b);
        assert_eq!(reg.broadcast(&SessionId::from("A"), &clear("A"), None), 1);
        assert!(a_rx.try_recv().is_ok());
        assert!(b_rx.try_recv().is_err());
        assert_eq!(reg.broadcast(&SessionId::from("none"), &clear("none"), None), 0);
    }
}
