//! The session store contract.

use async_trait::async_trait;
use slidecast_core::{SessionId, SessionPatch, SessionRecord, SessionStatus};

use crate::errors::Result;

/// Durable session metadata.
///
/// Every call may suspend. Callers must not assume that two concurrent
/// updates complete in the order they were issued.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Fetch one record.
    async fn find_one(&self, id: &SessionId) -> Result<Option<SessionRecord>>;

    /// Apply `patch` and return the record as it is after the update.
    ///
    /// With `upsert`, an absent record is created from defaults and then
    /// patched; without it, an absent record yields `Ok(None)`.
    async fn find_one_and_update(
        &self,
        id: &SessionId,
        patch: SessionPatch,
        upsert: bool,
    ) -> Result<Option<SessionRecord>>;

    /// Records whose status is in `status_in`, oldest first.
    async fn find(&self, status_in: &[SessionStatus]) -> Result<Vec<SessionRecord>>;
}
