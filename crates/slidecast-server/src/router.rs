//! Inbound message dispatch and fan-out.
//!
//! Dispatch is keyed by (role, action). The role always comes from the
//! connection, never from the message, so a viewer cannot issue presenter
//! commands by claiming the role in a payload.
//!
//! Failures never escape [`MessageRouter::dispatch`]: the offending message
//! is dropped and logged, and the connection stays open.

use std::sync::Arc;

use chrono::Utc;
use metrics::counter;
use slidecast_core::protocol::{Command, DecodeError, Message, RawMessage, ServerMessage};
use slidecast_core::{ClientId, Role, SessionId, Stroke, SyncError};
use tracing::{debug, info, instrument, warn};

use crate::hub::SessionHub;
use crate::lifecycle::LifecycleController;
use crate::metrics::{MESSAGES_DROPPED_TOTAL, MESSAGES_HANDLED_TOTAL};
use crate::reconcile::reconcile;
use crate::websocket::connection::ClientConnection;

/// Who sent a message. Broadcasts go to the whole session, sender included;
/// clients drop echoes carrying their own `clientId`.
struct Origin {
    role: Role,
    client_id: Option<ClientId>,
}

/// Routes decoded messages to the lifecycle controller, the whiteboard
/// state and the registry.
pub struct MessageRouter {
    hub: Arc<SessionHub>,
    lifecycle: Arc<LifecycleController>,
}

impl MessageRouter {
    /// Router over the shared hub and controller.
    pub fn new(hub: Arc<SessionHub>, lifecycle: Arc<LifecycleController>) -> Self {
        Self { hub, lifecycle }
    }

    /// Handle one text frame from `conn`, logging and swallowing any failure.
    #[instrument(skip_all, fields(conn_id = %conn.id))]
    pub async fn dispatch(&self, conn: &Arc<ClientConnection>, text: &str) {
        match self.handle(conn, text).await {
            Ok(action) => {
                counter!(MESSAGES_HANDLED_TOTAL, "action" => action).increment(1);
            }
            Err(Rejected::Unrecognized(e)) => {
                counter!(MESSAGES_DROPPED_TOTAL, "reason" => "unrecognized").increment(1);
                debug!(error = %e, "ignoring unrecognized message");
            }
            Err(Rejected::Failed(e)) => {
                counter!(MESSAGES_DROPPED_TOTAL, "reason" => e.kind()).increment(1);
                match e {
                    SyncError::NotFound(_) => debug!(error = %e, "message for unknown session dropped"),
                    SyncError::TransientIo(_) => warn!(error = %e, "store unavailable, message dropped"),
                    SyncError::Validation(_) | SyncError::PolicyViolation(_) => {
                        warn!(error = %e, "invalid message dropped");
                    }
                }
            }
        }
    }

    /// Handle one text frame. Returns the action name on success.
    pub async fn handle(&self, conn: &Arc<ClientConnection>, text: &str) -> Result<&'static str, Rejected> {
        let raw = RawMessage::parse(text)?;
        let Some(role) = conn.resolve_role(raw.role_hint()) else {
            return Err(SyncError::Validation("connection has no role".into()).into());
        };
        let message = Message::decode(role, raw)?;
        let action = message.command.action();

        let bound = conn.session_id();
        let session_id = message
            .target_session(bound.as_ref())
            .ok_or_else(|| SyncError::Validation(format!("{action} without a session")))?;

        let origin = Origin {
            role,
            client_id: message.client_id.clone().or_else(|| conn.client_id.clone()),
        };

        debug!(action, %session_id, role = %role, "dispatching");
        match message.command {
            Command::CreateSession(new) => {
                let _ = self.lifecycle.create_session(&new).await?;
            }
            Command::StartSession => self.start_session(conn, &session_id).await?,
            Command::EndSession => self.end_session(&session_id, &origin).await?,
            Command::SlideChange { slide } => self.change_slide(&session_id, slide, &origin).await?,
            Command::WhiteboardToggle { enabled } => {
                self.toggle_whiteboard(&session_id, enabled, &origin).await?;
            }
            Command::WhiteboardStroke(stroke) => self.append_stroke(&session_id, stroke, &origin)?,
            Command::WhiteboardClear => self.clear_whiteboard(&session_id, &origin)?,
            Command::ChatMessage { text } => self.chat(&session_id, text, &origin),
            Command::GetInitialState => {
                let _ = reconcile(&self.lifecycle, &self.hub, conn, &session_id).await?;
            }
        }
        Ok(action)
    }

    async fn start_session(&self, conn: &Arc<ClientConnection>, session_id: &SessionId) -> Result<(), SyncError> {
        let _ = self.lifecycle.start_session(session_id).await?;
        if self.hub.registry.register(session_id, conn) {
            info!(conn_id = %conn.id, %session_id, "presenter attached to session");
        }
        let _ = reconcile(&self.lifecycle, &self.hub, conn, session_id).await?;
        Ok(())
    }

    async fn end_session(&self, session_id: &SessionId, origin: &Origin) -> Result<(), SyncError> {
        let _ = self.lifecycle.end_session(session_id).await?;
        let _ = self.hub.states.remove(session_id);
        let _ = self.hub.registry.broadcast(
            session_id,
            &ServerMessage::SessionEnded {
                session_id: session_id.clone(),
                client_id: origin.client_id.clone(),
            },
            None,
        );
        Ok(())
    }

    async fn change_slide(&self, session_id: &SessionId, slide: u32, origin: &Origin) -> Result<(), SyncError> {
        let record = self
            .lifecycle
            .session(session_id)
            .await?
            .ok_or_else(|| SyncError::NotFound(session_id.to_string()))?;
        if !record.slide_in_range(slide) {
            return Err(SyncError::Validation(format!(
                "slide {slide} outside 1..={}",
                record.slide_count.max(1)
            )));
        }
        // concurrent changes may complete out of order; the last write wins
        let Some(updated) = self.lifecycle.change_slide(session_id, slide).await? else {
            return Err(SyncError::NotFound(session_id.to_string()));
        };
        let _ = self.hub.registry.broadcast(
            session_id,
            &ServerMessage::SlideChange {
                session_id: session_id.clone(),
                slide: updated.current_slide,
                slide_count: updated.slide_count,
                client_id: origin.client_id.clone(),
            },
            None,
        );
        Ok(())
    }

    async fn toggle_whiteboard(&self, session_id: &SessionId, enabled: bool, origin: &Origin) -> Result<(), SyncError> {
        let record = self.lifecycle.session(session_id).await?;

        // from here on nothing awaits: the state change and both broadcasts
        // land before any other handler runs
        if !self.hub.states.set_enabled(session_id, enabled) {
            return Err(SyncError::NotFound(session_id.to_string()));
        }
        let registry = &self.hub.registry;
        let _ = registry.broadcast(
            session_id,
            &ServerMessage::WhiteboardToggle {
                session_id: session_id.clone(),
                enabled,
                slide: record.as_ref().map(|r| r.current_slide),
                slide_count: record.as_ref().map(|r| r.slide_count),
                client_id: origin.client_id.clone(),
            },
            None,
        );
        if enabled {
            let _ = registry.broadcast(
                session_id,
                &ServerMessage::WhiteboardClear {
                    session_id: session_id.clone(),
                    client_id: origin.client_id.clone(),
                },
                None,
            );
        }
        Ok(())
    }

    fn append_stroke(&self, session_id: &SessionId, stroke: Stroke, origin: &Origin) -> Result<(), SyncError> {
        if !stroke.is_drawable() {
            debug!(%session_id, points = stroke.points.len(), "stroke too short, dropped");
            return Ok(());
        }
        if !self.hub.states.append_stroke(session_id, stroke.clone()) {
            return Err(SyncError::NotFound(session_id.to_string()));
        }
        let _ = self.hub.registry.broadcast(
            session_id,
            &ServerMessage::WhiteboardStroke {
                session_id: session_id.clone(),
                stroke,
                client_id: origin.client_id.clone(),
            },
            None,
        );
        Ok(())
    }

    fn clear_whiteboard(&self, session_id: &SessionId, origin: &Origin) -> Result<(), SyncError> {
        if !self.hub.states.clear(session_id) {
            return Err(SyncError::NotFound(session_id.to_string()));
        }
        let _ = self.hub.registry.broadcast(
            session_id,
            &ServerMessage::WhiteboardClear {
                session_id: session_id.clone(),
                client_id: origin.client_id.clone(),
            },
            None,
        );
        Ok(())
    }

    fn chat(&self, session_id: &SessionId, text: String, origin: &Origin) {
        let _ = self.hub.registry.broadcast(
            session_id,
            &ServerMessage::ChatMessage {
                session_id: session_id.clone(),
                text,
                sender_role: origin.role,
                timestamp: Utc::now().timestamp_millis(),
                client_id: origin.client_id.clone(),
            },
            None,
        );
    }
}

/// Why a message was not handled.
#[derive(Debug)]
pub enum Rejected {
    /// The (role, action) pair is outside the dispatch table.
    Unrecognized(DecodeError),
    /// Handling failed.
    Failed(SyncError),
}

impl From<SyncError> for Rejected {
    fn from(e: SyncError) -> Self {
        Self::Failed(e)
    }
}

impl From<DecodeError> for Rejected {
    fn from(e: DecodeError) -> Self {
        if e.is_unrecognized() {
            Self::Unrecognized(e)
        } else {
            Self::Failed(e.into())
        }
    }
}
