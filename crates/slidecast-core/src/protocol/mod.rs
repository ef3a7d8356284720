//! JSON wire protocol.
//!
//! Every frame is a JSON object with an `action` field. Inbound frames are
//! turned into a typed [`Message`] by a two-step decoder: [`RawMessage::parse`]
//! extracts the envelope, then [`Message::decode`] checks the action against
//! the sender's role and validates its fields. Outbound frames are the
//! [`ServerMessage`] union.

pub mod inbound;
pub mod outbound;

pub use inbound::{Command, DecodeError, Message, RawMessage};
pub use outbound::ServerMessage;
