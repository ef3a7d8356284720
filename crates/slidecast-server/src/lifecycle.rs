//! Session status transitions and join admission.

use std::sync::Arc;

use slidecast_core::{NewSession, Role, SessionId, SessionPatch, SessionRecord, SessionStatus, SyncError};
use slidecast_store::SessionStore;
use tracing::{debug, info};

/// Where an admitted connection goes.
#[derive(Debug, Clone, PartialEq)]
pub enum Admission {
    /// Directory query: send this list, then close.
    Directory(Vec<SessionRecord>),
    /// Admitted without a session; it may attach later via `startSession`.
    Unassigned,
    /// Admitted into a session.
    Session(SessionId),
}

/// The only writer of session records.
pub struct LifecycleController {
    store: Arc<dyn SessionStore>,
}

impl LifecycleController {
    /// Controller over `store`.
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    /// Upsert a record as scheduled on slide 1. Repeating the call with new
    /// metadata overwrites the old, which also revives an ended session.
    pub async fn create_session(&self, new: &NewSession) -> Result<SessionRecord, SyncError> {
        let record = self
            .store
            .find_one_and_update(&new.session_id, new.to_patch(), true)
            .await?
            .ok_or_else(|| SyncError::TransientIo("upsert returned no record".into()))?;
        info!(session_id = %record.session_id, slide_count = record.slide_count, "session created");
        Ok(record)
    }

    /// Move an existing session to live.
    pub async fn start_session(&self, id: &SessionId) -> Result<SessionRecord, SyncError> {
        self.transition(id, SessionStatus::Live).await
    }

    /// Move a session to ended.
    pub async fn end_session(&self, id: &SessionId) -> Result<SessionRecord, SyncError> {
        self.transition(id, SessionStatus::Ended).await
    }

    async fn transition(&self, id: &SessionId, next: SessionStatus) -> Result<SessionRecord, SyncError> {
        let current = self
            .store
            .find_one(id)
            .await?
            .ok_or_else(|| SyncError::NotFound(id.to_string()))?;
        if !current.status.can_transition_to(next) {
            return Err(SyncError::Validation(format!(
                "session {id} cannot move from {} to {next}",
                current.status
            )));
        }
        let record = self
            .store
            .find_one_and_update(id, SessionPatch::status(next), false)
            .await?
            .ok_or_else(|| SyncError::NotFound(id.to_string()))?;
        info!(session_id = %id, status = %next, "session status changed");
        Ok(record)
    }

    /// Sessions a viewer could pick from.
    pub async fn list_joinable(&self) -> Result<Vec<SessionRecord>, SyncError> {
        Ok(self.store.find(&SessionStatus::JOINABLE).await?)
    }

    /// Persist a new slide position. Bounds are the caller's job. An absent
    /// record yields `Ok(None)`.
    pub async fn change_slide(&self, id: &SessionId, slide: u32) -> Result<Option<SessionRecord>, SyncError> {
        let record = self
            .store
            .find_one_and_update(id, SessionPatch::current_slide(slide), false)
            .await?;
        if record.is_none() {
            debug!(session_id = %id, slide, "slide change for unknown session ignored");
        }
        Ok(record)
    }

    /// Current record.
    pub async fn session(&self, id: &SessionId) -> Result<Option<SessionRecord>, SyncError> {
        Ok(self.store.find_one(id).await?)
    }

    /// Decide whether a new connection may join.
    ///
    /// Presenters may attach to a session in any status, since they connect
    /// to scheduled sessions in order to start them. Viewers, and role-less
    /// connections naming a session, need an existing live record.
    pub async fn admit(&self, role: Option<Role>, session: Option<&SessionId>) -> Result<Admission, SyncError> {
        match (role, session) {
            (Some(Role::Directory), _) => Ok(Admission::Directory(self.list_joinable().await?)),
            (Some(Role::Presenter), Some(id)) => Ok(Admission::Session(id.clone())),
            (Some(Role::Presenter) | None, None) => Ok(Admission::Unassigned),
            (Some(Role::Viewer), None) => Err(SyncError::PolicyViolation("sessionId is required".into())),
            (Some(Role::Viewer) | None, Some(id)) => match self.store.find_one(id).await? {
                None => Err(SyncError::PolicyViolation(format!("session {id} does not exist"))),
                Some(record) if !record.is_live() => {
                    Err(SyncError::PolicyViolation(format!("session {id} is not live")))
                }
                Some(_) => Ok(Admission::Session(id.clone())),
            },
        }
    }
}
