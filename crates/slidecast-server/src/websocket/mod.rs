//! WebSocket transport: connections, the session registry and the socket
//! run loop.

pub mod connection;
pub mod registry;
pub mod session;
