//! Server-to-client messages.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::ids::{ClientId, SessionId};
use crate::role::Role;
use crate::session::SessionRecord;
use crate::whiteboard::Stroke;

/// Every frame the server sends.
///
/// `client_id` carries the originating client's identifier so receivers can
/// drop their own echoes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    /// Deck position.
    SlideChange {
        /// Session.
        session_id: SessionId,
        /// 1-based slide.
        slide: u32,
        /// Deck size.
        slide_count: u32,
        /// Originator, absent on snapshots.
        #[serde(skip_serializing_if = "Option::is_none")]
        client_id: Option<ClientId>,
    },
    /// Whiteboard opened or closed.
    WhiteboardToggle {
        /// Session.
        session_id: SessionId,
        /// New state.
        enabled: bool,
        /// Slide under the board, when known.
        #[serde(skip_serializing_if = "Option::is_none")]
        slide: Option<u32>,
        /// Deck size, when known.
        #[serde(skip_serializing_if = "Option::is_none")]
        slide_count: Option<u32>,
        /// Originator.
        #[serde(skip_serializing_if = "Option::is_none")]
        client_id: Option<ClientId>,
    },
    /// Wipe the canvas.
    WhiteboardClear {
        /// Session.
        session_id: SessionId,
        /// Originator.
        #[serde(skip_serializing_if = "Option::is_none")]
        client_id: Option<ClientId>,
    },
    /// One newly drawn stroke.
    WhiteboardStroke {
        /// Session.
        session_id: SessionId,
        /// The stroke.
        stroke: Stroke,
        /// Originator.
        #[serde(skip_serializing_if = "Option::is_none")]
        client_id: Option<ClientId>,
    },
    /// Full stroke log, sent only during reconciliation.
    WhiteboardState {
        /// Session.
        session_id: SessionId,
        /// Strokes in draw order.
        strokes: Vec<Stroke>,
    },
    /// Chat line.
    ChatMessage {
        /// Session.
        session_id: SessionId,
        /// Text.
        text: String,
        /// Role of the sender.
        sender_role: Role,
        /// Server receive time, unix milliseconds.
        timestamp: i64,
        /// Originator.
        #[serde(skip_serializing_if = "Option::is_none")]
        client_id: Option<ClientId>,
    },
    /// Directory listing keyed by session id.
    SessionList {
        /// Joinable sessions.
        sessions: BTreeMap<SessionId, SessionRecord>,
    },
    /// The presenter ended the session.
    SessionEnded {
        /// Session.
        session_id: SessionId,
        /// Originator.
        #[serde(skip_serializing_if = "Option::is_none")]
        client_id: Option<ClientId>,
    },
}

impl ServerMessage {
    /// Wire name of the action.
    pub fn action(&self) -> &'static str {
        match self {
            Self::SlideChange { .. } => "slideChange",
            Self::WhiteboardToggle { .. } => "whiteboardToggle",
            Self::WhiteboardClear { .. } => "whiteboardClear",
            Self::WhiteboardStroke { .. } => "whiteboardStroke",
            Self::WhiteboardState { .. } => "whiteboardState",
            Self::ChatMessage { .. } => "chatMessage",
            Self::SessionList { .. } => "sessionList",
            Self::SessionEnded { .. } => "sessionEnded",
        }
    }

    /// Build a directory listing from store records.
    pub fn session_list(records: impl IntoIterator<Item = SessionRecord>) -> Self {
        Self::SessionList {
            sessions: records
                .into_iter()
                .map(|r| (r.session_id.clone(), r))
                .collect(),
        }
    }

    /// Serialize to a JSON text frame.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
