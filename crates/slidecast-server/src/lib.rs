//! # slidecast-server
//!
//! The realtime half of slidecast: an axum server that admits presenter,
//! viewer and directory connections over WebSocket and keeps every session's
//! slide position and whiteboard in sync.
//!
//! - [`websocket`]: per-connection state, the session-keyed registry and the
//!   socket run loop
//! - [`state`]: per-session whiteboard state
//! - [`lifecycle`]: session status transitions and join admission
//! - [`router`]: inbound message dispatch and fan-out
//! - [`reconcile`]: late-join snapshots
//! - [`http`]: slide upload and static slide routes
//! - [`server`]: router assembly and listener

#![deny(unsafe_code)]

pub mod config;
pub mod health;
pub mod http;
pub mod hub;
pub mod lifecycle;
pub mod metrics;
pub mod reconcile;
pub mod router;
pub mod server;
pub mod shutdown;
pub mod state;
pub mod websocket;

pub use config::ServerConfig;
pub use hub::SessionHub;
pub use lifecycle::{Admission, LifecycleController};
pub use router::MessageRouter;
pub use server::{AppState, SlidecastServer};
