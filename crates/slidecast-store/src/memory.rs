//! In-memory session store.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use slidecast_core::{SessionId, SessionPatch, SessionRecord, SessionStatus};

use crate::errors::Result;
use crate::store::SessionStore;

/// [`SessionStore`] kept in process memory. Never fails.
#[derive(Default)]
pub struct MemorySessionStore {
    records: RwLock<HashMap<SessionId, SessionRecord>>,
}

impl MemorySessionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn find_one(&self, id: &SessionId) -> Result<Option<SessionRecord>> {
        Ok(self.records.read().get(id).cloned())
    }

    async fn find_one_and_update(
        &self,
        id: &SessionId,
        patch: SessionPatch,
        upsert: bool,
    ) -> Result<Option<SessionRecord>> {
        let now = Utc::now();
        let mut records = self.records.write();
        if !upsert && !records.contains_key(id) {
            return Ok(None);
        }
        let record = records
            .entry(id.clone())
            .or_insert_with(|| SessionRecord::new(id.clone(), now));
        record.apply(&patch, now);
        Ok(Some(record.clone()))
    }

    async fn find(&self, status_in: &[SessionStatus]) -> Result<Vec<SessionRecord>> {
        let mut found: Vec<SessionRecord> = self
            .records
            .read()
            .values()
            .filter(|r| status_in.contains(&r.status))
            .cloned()
            .collect();
        found.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.session_id.cmp(&b.session_id))
        });
        Ok(found)
    }
}
