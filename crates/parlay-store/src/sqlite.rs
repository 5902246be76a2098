//! SQLite adapter implementing both sinks
//!
//! `interactions` is keyed by record id and indexed by `session_id` (the
//! document-store partitioning); `audit_events` is an append-only rowid
//! table, so insertion order is the key.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{Connection, params};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::records::{AuditEvent, InteractionRecord};
use crate::sink::{AuditLog, InteractionStore};

/// SQLite-backed store (thread-safe via Arc<Mutex>)
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (or create) the database and ensure the schema exists.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path.as_ref()).context("Failed to open SQLite database")?;

        info!("Initializing interaction store at {:?}", path.as_ref());
        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// In-memory database for tests and throwaway tooling.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS interactions (
                id TEXT PRIMARY KEY,
                session_id TEXT NOT NULL,
                user_id TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                provider TEXT NOT NULL,
                prompt TEXT NOT NULL,
                response TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_interactions_session
             ON interactions(session_id)",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS audit_events (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                event_type TEXT NOT NULL,
                message TEXT NOT NULL
            )",
            [],
        )?;

        Ok(())
    }
}

#[async_trait]
impl InteractionStore for SqliteStore {
    async fn append(&self, record: InteractionRecord) -> Result<()> {
        let conn = Arc::clone(&self.conn);

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap_or_else(|poisoned| {
                warn!("Store mutex was poisoned, recovering");
                poisoned.into_inner()
            });

            // INSERT OR REPLACE keeps a retried append of the same record
            // idempotent while distinct records always land as new rows.
            conn.execute(
                "INSERT OR REPLACE INTO interactions
                     (id, session_id, user_id, timestamp, provider, prompt, response)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    record.id.to_string(),
                    record.session_id.to_string(),
                    &record.user_id,
                    record.timestamp.to_rfc3339(),
                    &record.provider,
                    &record.prompt,
                    &record.response,
                ],
            )?;

            debug!("Persisted interaction {} (session {})", record.id, record.session_id);
            Ok(())
        })
        .await
        .context("spawn_blocking task panicked")?
    }

    async fn interactions_for_session(&self, session_id: Uuid) -> Result<Vec<InteractionRecord>> {
        let conn = Arc::clone(&self.conn);

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap_or_else(|poisoned| {
                warn!("Store mutex was poisoned, recovering");
                poisoned.into_inner()
            });

            let mut stmt = conn.prepare(
                "SELECT id, session_id, user_id, timestamp, provider, prompt, response
                 FROM interactions
                 WHERE session_id = ?1
                 ORDER BY timestamp ASC",
            )?;

            let rows = stmt
                .query_map(params![session_id.to_string()], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                        row.get::<_, String>(6)?,
                    ))
                })?
                .collect::<Result<Vec<_>, _>>()?;

            rows.into_iter()
                .map(|(id, session, user_id, ts, provider, prompt, response)| {
                    Ok(InteractionRecord {
                        id: Uuid::parse_str(&id).context("malformed record id")?,
                        session_id: Uuid::parse_str(&session).context("malformed session id")?,
                        user_id,
                        timestamp: ts.parse().unwrap_or_else(|_| Utc::now()),
                        provider,
                        prompt,
                        response,
                    })
                })
                .collect()
        })
        .await
        .context("spawn_blocking task panicked")?
    }
}

#[async_trait]
impl AuditLog for SqliteStore {
    async fn append(&self, event: AuditEvent) -> Result<()> {
        let conn = Arc::clone(&self.conn);

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap_or_else(|poisoned| {
                warn!("Store mutex was poisoned, recovering");
                poisoned.into_inner()
            });

            conn.execute(
                "INSERT INTO audit_events (timestamp, event_type, message)
                 VALUES (?1, ?2, ?3)",
                params![
                    event.timestamp.to_rfc3339(),
                    event.event_type.to_string(),
                    &event.message,
                ],
            )?;

            debug!("Recorded {} audit event", event.event_type);
            Ok(())
        })
        .await
        .context("spawn_blocking task panicked")?
    }

    async fn recent_events(&self, limit: usize) -> Result<Vec<AuditEvent>> {
        let conn = Arc::clone(&self.conn);

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap_or_else(|poisoned| {
                warn!("Store mutex was poisoned, recovering");
                poisoned.into_inner()
            });

            let mut stmt = conn.prepare(
                "SELECT timestamp, event_type, message
                 FROM audit_events
                 ORDER BY seq DESC
                 LIMIT ?1",
            )?;

            let rows = stmt
                .query_map(params![limit as i64], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                })?
                .collect::<Result<Vec<_>, _>>()?;

            rows.into_iter()
                .map(|(ts, event_type, message)| {
                    Ok(AuditEvent {
                        timestamp: ts.parse().unwrap_or_else(|_| Utc::now()),
                        event_type: event_type.parse()?,
                        message,
                    })
                })
                .collect()
        })
        .await
        .context("spawn_blocking task panicked")?
    }
}
