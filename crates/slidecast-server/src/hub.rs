//! The process-wide realtime state.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::state::SessionStateCache;
use crate::websocket::registry::ConnectionRegistry;

/// Connection registry and whiteboard state, keyed by the same session ids
/// and always consulted together. Built once at startup and shared by handle.
#[derive(Default)]
pub struct SessionHub {
    /// Live connections by session.
    pub registry: ConnectionRegistry,
    /// Whiteboard state by session.
    pub states: SessionStateCache,
    open: AtomicUsize,
}

impl SessionHub {
    /// Empty hub.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open sockets, including ones not attached to a session.
    pub fn open_connections(&self) -> usize {
        self.open.load(Ordering::Relaxed)
    }

    pub(crate) fn connection_opened(&self) {
        let _ = self.open.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn connection_closed(&self) {
        let _ = self.open.fetch_sub(1, Ordering::Relaxed);
    }
}
