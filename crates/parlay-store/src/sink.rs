//! Append-only sink interfaces consumed by the orchestrator
//!
//! Both sinks take ownership of a record and must not raise back into the
//! caller's critical path. The orchestrator invokes them from detached
//! background tasks and demotes any error to a local diagnostic. Duplicate
//! delivery is tolerated: records carry their own generated identity, so
//! duplicates are detectable downstream.

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use crate::records::{AuditEvent, InteractionRecord};

/// Durable home for prompt/response exchanges, grouped by session.
#[async_trait]
pub trait InteractionStore: Send + Sync {
    /// Append one record. Idempotent on retry of the same record.
    async fn append(&self, record: InteractionRecord) -> Result<()>;

    /// All records persisted for one session, oldest first.
    async fn interactions_for_session(&self, session_id: Uuid) -> Result<Vec<InteractionRecord>>;
}

/// Append-only log of operational events, keyed by insertion order.
#[async_trait]
pub trait AuditLog: Send + Sync {
    /// Append one event. Idempotent on retry of the same event.
    async fn append(&self, event: AuditEvent) -> Result<()>;

    /// The most recent events, newest first.
    async fn recent_events(&self, limit: usize) -> Result<Vec<AuditEvent>>;
}
