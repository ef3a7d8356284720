//! Session repository. Stateless: every function takes a `&Connection`.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};
use slidecast_core::{SessionId, SessionPatch, SessionRecord, SessionStatus};

use crate::errors::{Result, StoreError};

const COLUMNS: &str = "session_id, session_name, session_date, session_time, file_names, \
                       status, current_slide, slide_count, created_at, updated_at";

/// Raw `sessions` row before conversion.
struct SessionRow {
    session_id: String,
    session_name: String,
    session_date: String,
    session_time: String,
    file_names: String,
    status: String,
    current_slide: i64,
    slide_count: i64,
    created_at: String,
    updated_at: String,
}

impl SessionRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            session_id: row.get(0)?,
            session_name: row.get(1)?,
            session_date: row.get(2)?,
            session_time: row.get(3)?,
            file_names: row.get(4)?,
            status: row.get(5)?,
            current_slide: row.get(6)?,
            slide_count: row.get(7)?,
            created_at: row.get(8)?,
            updated_at: row.get(9)?,
        })
    }

    fn into_record(self) -> Result<SessionRecord> {
        Ok(SessionRecord {
            session_id: SessionId::from_string(self.session_id),
            session_name: self.session_name,
            session_date: self.session_date,
            session_time: self.session_time,
            file_names: serde_json::from_str(&self.file_names)?,
            status: self.status.parse().map_err(StoreError::InvalidRecord)?,
            current_slide: to_u32(self.current_slide, "current_slide")?,
            slide_count: to_u32(self.slide_count, "slide_count")?,
            created_at: parse_time(&self.created_at)?,
            updated_at: parse_time(&self.updated_at)?,
        })
    }
}

fn to_u32(value: i64, column: &str) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| StoreError::InvalidRecord(format!("{column} out of range: {value}")))
}

fn parse_time(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StoreError::InvalidRecord(format!("bad timestamp {value:?}: {e}")))
}

/// Session repository.
pub struct SessionRepo;

impl SessionRepo {
    /// Fetch one record.
    pub fn get(conn: &Connection, id: &SessionId) -> Result<Option<SessionRecord>> {
        let row = conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM sessions WHERE session_id = ?1"),
                params![id.as_str()],
                SessionRow::from_row,
            )
            .optional()?;
        row.map(SessionRow::into_record).transpose()
    }

    /// Insert or fully overwrite a record.
    pub fn save(conn: &Connection, record: &SessionRecord) -> Result<()> {
        let file_names = serde_json::to_string(&record.file_names)?;
        let _ = conn.execute(
            "INSERT INTO sessions (session_id, session_name, session_date, session_time, file_names,
                                   status, current_slide, slide_count, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             ON CONFLICT(session_id) DO UPDATE SET
                session_name  = excluded.session_name,
                session_date  = excluded.session_date,
                session_time  = excluded.session_time,
                file_names    = excluded.file_names,
                status        = excluded.status,
                current_slide = excluded.current_slide,
                slide_count   = excluded.slide_count,
                updated_at    = excluded.updated_at",
            params![
                record.session_id.as_str(),
                record.session_name,
                record.session_date,
                record.session_time,
                file_names,
                record.status.as_str(),
                record.current_slide,
                record.slide_count,
                record.created_at.to_rfc3339(),
                record.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Read-modify-write inside one transaction.
    pub fn update(
        conn: &Connection,
        id: &SessionId,
        patch: &SessionPatch,
        upsert: bool,
        now: DateTime<Utc>,
    ) -> Result<Option<SessionRecord>> {
        let tx = conn.unchecked_transaction()?;
        let mut record = match Self::get(&tx, id)? {
            Some(existing) => existing,
            None if upsert => SessionRecord::new(id.clone(), now),
            None => return Ok(None),
        };
        record.apply(patch, now);
        Self::save(&tx, &record)?;
        tx.commit()?;
        Ok(Some(record))
    }

    /// Records with a status in `statuses`, oldest first.
    pub fn list_by_status(conn: &Connection, statuses: &[SessionStatus]) -> Result<Vec<SessionRecord>> {
        if statuses.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; statuses.len()].join(", ");
        let sql = format!(
            "SELECT {COLUMNS} FROM sessions WHERE status IN ({placeholders})
             ORDER BY created_at ASC, session_id ASC"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(statuses.iter().map(|s| s.as_str())), SessionRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(SessionRow::into_record).collect()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
