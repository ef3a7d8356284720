//! [`SessionStore`] over an r2d2 `SQLite` pool.
//!
//! rusqlite is synchronous, so every call hops onto the blocking pool with
//! [`tokio::task::spawn_blocking`] and checks out a connection there.

use async_trait::async_trait;
use chrono::Utc;
use slidecast_core::{SessionId, SessionPatch, SessionRecord, SessionStatus};
use tracing::{debug, info};

use super::connection::{self, ConnectionConfig, ConnectionPool};
use super::migrations::run_migrations;
use super::repository::SessionRepo;
use crate::errors::{Result, StoreError};
use crate::store::SessionStore;

/// `SQLite`-backed session store.
#[derive(Clone)]
pub struct SqliteSessionStore {
    pool: ConnectionPool,
}

impl SqliteSessionStore {
    /// Open (or create) a database file and apply pending migrations.
    pub fn open(path: &str, config: &ConnectionConfig) -> Result<Self> {
        let pool = connection::new_file(path, config)?;
        let applied = run_migrations(&*pool.get()?)?;
        info!(path, applied, "session store opened");
        Ok(Self { pool })
    }

    /// Private in-memory database, migrated.
    pub fn in_memory() -> Result<Self> {
        let pool = connection::new_in_memory(&ConnectionConfig::default())?;
        let _ = run_migrations(&*pool.get()?)?;
        Ok(Self { pool })
    }

    /// Wrap an existing, already-migrated pool.
    pub fn from_pool(pool: ConnectionPool) -> Self {
        Self { pool }
    }

    async fn with_conn<T, F>(&self, op: &'static str, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&rusqlite::Connection) -> Result<T> + Send + 'static,
    {
        let pool = self.pool.clone();
        let out = tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            f(&conn)
        })
        .await
        .map_err(|e| StoreError::Join(format!("{op}: {e}")))?;
        if let Err(ref e) = out {
            debug!(op, error = %e, "store call failed");
        }
        out
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn find_one(&self, id: &SessionId) -> Result<Option<SessionRecord>> {
        let id = id.clone();
        self.with_conn("find_one", move |conn| SessionRepo::get(conn, &id))
            .await
    }

    async fn find_one_and_update(
        &self,
        id: &SessionId,
        patch: SessionPatch,
        upsert: bool,
    ) -> Result<Option<SessionRecord>> {
        let id = id.clone();
        self.with_conn("find_one_and_update", move |conn| {
            SessionRepo::update(conn, &id, &patch, upsert, Utc::now())
        })
        .await
    }

    async fn find(&self, status_in: &[SessionStatus]) -> Result<Vec<SessionRecord>> {
        let statuses = status_in.to_vec();
        self.with_conn("find", move |conn| SessionRepo::list_by_status(conn, &statuses))
            .await
    }
}
