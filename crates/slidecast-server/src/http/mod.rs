//! Plain HTTP routes beside the WebSocket endpoint.

pub mod slides;
