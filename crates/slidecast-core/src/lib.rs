//! # slidecast-core
//!
//! Foundation types shared by every slidecast crate:
//!
//! - [`ids`]: branded string ids for sessions, connections and clients
//! - [`session`]: the durable session record and its status machine
//! - [`role`]: connection roles and their wire names
//! - [`whiteboard`]: strokes and the per-session whiteboard snapshot
//! - [`protocol`]: the validating inbound decoder and outbound message union
//! - [`errors`]: the engine error taxonomy
//! - [`logging`]: tracing subscriber setup

#![deny(unsafe_code)]

pub mod errors;
pub mod ids;
pub mod logging;
pub mod protocol;
pub mod role;
pub mod session;
pub mod whiteboard;

pub use errors::SyncError;
pub use ids::{ClientId, ConnectionId, SessionId};
pub use role::Role;
pub use session::{NewSession, SessionPatch, SessionRecord, SessionStatus};
pub use whiteboard::{Point, Stroke, WhiteboardSnapshot};
