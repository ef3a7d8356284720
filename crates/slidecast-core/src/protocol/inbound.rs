//! Inbound message decoding.

use serde::Deserialize;
use serde_json::Value;

use crate::errors::SyncError;
use crate::ids::{ClientId, SessionId};
use crate::role::Role;
use crate::session::NewSession;
use crate::whiteboard::{Stroke, WireStroke};

/// Upper bound on chat text, in characters.
pub const MAX_CHAT_CHARS: usize = 2000;

/// Why an inbound frame could not become a [`Message`].
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The frame is not valid JSON.
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The frame is JSON but not an object.
    #[error("message is not a JSON object")]
    NotAnObject,

    /// The frame has no string `action` field.
    #[error("message has no action")]
    MissingAction,

    /// The action is unknown, or not available to the sender's role.
    #[error("action {action:?} is not available to role {role}")]
    Unrecognized {
        /// Sender role.
        role: Role,
        /// Action as sent.
        action: String,
    },

    /// The action is known but its fields are unusable.
    #[error("invalid {action}: {reason}")]
    Invalid {
        /// Action as sent.
        action: String,
        /// What was wrong.
        reason: String,
    },
}

impl DecodeError {
    /// Unknown shapes are ignored quietly; everything else is worth a warning.
    pub fn is_unrecognized(&self) -> bool {
        matches!(self, Self::Unrecognized { .. })
    }

    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Json(_) | Self::NotAnObject => "malformed",
            Self::MissingAction => "missing_action",
            Self::Unrecognized { .. } => "unrecognized",
            Self::Invalid { .. } => "invalid",
        }
    }
}

impl From<DecodeError> for SyncError {
    fn from(err: DecodeError) -> Self {
        Self::Validation(err.to_string())
    }
}

/// Envelope of an inbound frame: the action plus the routing fields every
/// message may carry. The full object is kept for field decoding.
#[derive(Debug, Clone)]
pub struct RawMessage {
    value: Value,
    action: String,
    role_hint: Option<Role>,
    session_id: Option<SessionId>,
    client_id: Option<ClientId>,
}

impl RawMessage {
    /// Parse a text frame.
    pub fn parse(text: &str) -> Result<Self, DecodeError> {
        let value: Value = serde_json::from_str(text)?;
        let obj = value.as_object().ok_or(DecodeError::NotAnObject)?;

        let action = obj
            .get("action")
            .and_then(Value::as_str)
            .filter(|a| !a.is_empty())
            .ok_or(DecodeError::MissingAction)?
            .to_owned();
        let role_hint = obj.get("role").and_then(Value::as_str).and_then(Role::parse);
        let session_id = non_empty_str(obj.get("sessionId")).map(SessionId::from);
        let client_id = non_empty_str(obj.get("clientId")).map(ClientId::from);

        Ok(Self {
            value,
            action,
            role_hint,
            session_id,
            client_id,
        })
    }

    /// The `action` field.
    pub fn action(&self) -> &str {
        &self.action
    }

    /// Role named in the message body, used only by connections that
    /// opened without one.
    pub fn role_hint(&self) -> Option<Role> {
        self.role_hint
    }

    /// The `sessionId` field, if present and non-empty.
    pub fn session_id(&self) -> Option<&SessionId> {
        self.session_id.as_ref()
    }

    /// The `clientId` field, if present and non-empty.
    pub fn client_id(&self) -> Option<&ClientId> {
        self.client_id.as_ref()
    }

    fn fields<'a, T: Deserialize<'a>>(&'a self) -> Result<T, DecodeError> {
        T::deserialize(&self.value).map_err(|e| self.invalid(e.to_string()))
    }

    fn invalid(&self, reason: impl Into<String>) -> DecodeError {
        DecodeError::Invalid {
            action: self.action.clone(),
            reason: reason.into(),
        }
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty())
}

/// What a message asks the server to do.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Upsert a session record.
    CreateSession(NewSession),
    /// Move a session to live and attach the sender to it.
    StartSession,
    /// Move a session to ended.
    EndSession,
    /// Move the deck to a 1-based slide.
    SlideChange {
        /// Target slide.
        slide: u32,
    },
    /// Open or close the whiteboard.
    WhiteboardToggle {
        /// New state.
        enabled: bool,
    },
    /// Append one stroke.
    WhiteboardStroke(Stroke),
    /// Wipe the stroke log.
    WhiteboardClear,
    /// Forward a chat line.
    ChatMessage {
        /// Message text.
        text: String,
    },
    /// Ask for the current slide and whiteboard snapshot.
    GetInitialState,
}

impl Command {
    /// Wire name of the action.
    pub fn action(&self) -> &'static str {
        match self {
            Self::CreateSession(_) => "createSession",
            Self::StartSession => "startSession",
            Self::EndSession => "endSession",
            Self::SlideChange { .. } => "slideChange",
            Self::WhiteboardToggle { .. } => "whiteboardToggle",
            Self::WhiteboardStroke(_) => "whiteboardStroke",
            Self::WhiteboardClear => "whiteboardClear",
            Self::ChatMessage { .. } => "chatMessage",
            Self::GetInitialState => "getInitialState",
        }
    }

    /// Lifecycle commands address the session named in the message rather
    /// than the one the connection is attached to.
    fn names_its_session(&self) -> bool {
        matches!(
            self,
            Self::CreateSession(_) | Self::StartSession | Self::EndSession
        )
    }
}

#[derive(Deserialize)]
struct SlideFields {
    slide: u32,
}

#[derive(Deserialize)]
struct ToggleFields {
    enabled: bool,
}

#[derive(Deserialize)]
struct StrokeFields {
    stroke: WireStroke,
}

#[derive(Deserialize)]
struct ChatFields {
    text: String,
}

/// A validated inbound message.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// Role the message was decoded under.
    pub role: Role,
    /// Requested operation.
    pub command: Command,
    /// `sessionId` carried by the message.
    pub session_id: Option<SessionId>,
    /// `clientId` carried by the message.
    pub client_id: Option<ClientId>,
}

impl Message {
    /// Decode `raw` for a sender holding `role`.
    ///
    /// The (role, action) pair selects the variant; pairs outside the
    /// dispatch table yield [`DecodeError::Unrecognized`].
    pub fn decode(role: Role, raw: RawMessage) -> Result<Self, DecodeError> {
        let command = match (role, raw.action()) {
            (Role::Presenter, "createSession") => {
                let new: NewSession = raw.fields()?;
                if new.session_id.as_str().is_empty() {
                    return Err(raw.invalid("sessionId is empty"));
                }
                Command::CreateSession(new)
            }
            (Role::Presenter, "startSession") => Command::StartSession,
            (Role::Presenter, "endSession") => Command::EndSession,
            (Role::Presenter, "slideChange") => {
                let SlideFields { slide } = raw.fields()?;
                if slide == 0 {
                    return Err(raw.invalid("slides are numbered from 1"));
                }
                Command::SlideChange { slide }
            }
            (Role::Presenter, "whiteboardToggle") => {
                let ToggleFields { enabled } = raw.fields()?;
                Command::WhiteboardToggle { enabled }
            }
            (Role::Presenter, "whiteboardStroke") => {
                let StrokeFields { stroke } = raw.fields()?;
                let stroke = Stroke::from_wire(stroke).map_err(|e| raw.invalid(e.to_string()))?;
                Command::WhiteboardStroke(stroke)
            }
            (Role::Presenter, "whiteboardClear") => Command::WhiteboardClear,
            (Role::Presenter | Role::Viewer, "chatMessage") => {
                let ChatFields { text } = raw.fields()?;
                if text.trim().is_empty() {
                    return Err(raw.invalid("chat text is empty"));
                }
                if text.chars().count() > MAX_CHAT_CHARS {
                    return Err(raw.invalid("chat text is too long"));
                }
                Command::ChatMessage { text }
            }
            (Role::Viewer, "getInitialState") => Command::GetInitialState,
            (role, action) => {
                return Err(DecodeError::Unrecognized {
                    role,
                    action: action.to_owned(),
                });
            }
        };

        let RawMessage {
            session_id,
            client_id,
            ..
        } = raw;
        Ok(Self {
            role,
            command,
            session_id,
            client_id,
        })
    }

    /// Session this message acts upon.
    ///
    /// `bound` is the session the sending connection is registered under.
    /// Lifecycle commands prefer the session named in the message; all other
    /// commands prefer the bound session and fall back to the message.
    pub fn target_session(&self, bound: Option<&SessionId>) -> Option<SessionId> {
        let named = match &self.command {
            Command::CreateSession(new) => Some(&new.session_id),
            _ => self.session_id.as_ref(),
        };
        if self.command.names_its_session() {
            named.or(bound).cloned()
        } else {
            bound.or(named).cloned()
        }
    }
}
