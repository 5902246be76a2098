//! Durable record types shared by the sinks

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Audit messages are capped at this many characters before storage.
pub const MAX_AUDIT_MESSAGE_CHARS: usize = 1000;

/// One persisted prompt/response exchange.
///
/// `id` is the record's own identity; `session_id` is the correlation key
/// shared with the HTTP response that produced it. Records are append-only
/// and never mutated after the sink accepts them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub id: Uuid,
    pub session_id: Uuid,
    pub user_id: String,
    pub timestamp: DateTime<Utc>,
    pub provider: String,
    pub prompt: String,
    pub response: String,
}

impl InteractionRecord {
    /// Stamp a fresh record for a completed exchange.
    pub fn new(
        session_id: Uuid,
        user_id: impl Into<String>,
        provider: impl Into<String>,
        prompt: impl Into<String>,
        response: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_id,
            user_id: user_id.into(),
            timestamp: Utc::now(),
            provider: provider.into(),
            prompt: prompt.into(),
            response: response.into(),
        }
    }
}

/// Kind of operational event recorded in the audit log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditEventType {
    ApiSuccess,
    ApiError,
    System,
}

impl std::fmt::Display for AuditEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ApiSuccess => write!(f, "API_SUCCESS"),
            Self::ApiError => write!(f, "API_ERROR"),
            Self::System => write!(f, "SYSTEM"),
        }
    }
}

impl std::str::FromStr for AuditEventType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "API_SUCCESS" => Ok(Self::ApiSuccess),
            "API_ERROR" => Ok(Self::ApiError),
            "SYSTEM" => Ok(Self::System),
            other => Err(anyhow::anyhow!("unknown audit event type '{other}'")),
        }
    }
}

/// One operational event. Lifecycle is independent of [`InteractionRecord`]:
/// an error event exists with no interaction, but never the reverse.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub timestamp: DateTime<Utc>,
    pub event_type: AuditEventType,
    pub message: String,
}

impl AuditEvent {
    /// Stamp a new event, truncating the message to
    /// [`MAX_AUDIT_MESSAGE_CHARS`]. Truncation counts characters so a
    /// multi-byte sequence is never split.
    pub fn new(event_type: AuditEventType, message: impl Into<String>) -> Self {
        let message: String = message.into();
        let message = if message.chars().count() > MAX_AUDIT_MESSAGE_CHARS {
            message.chars().take(MAX_AUDIT_MESSAGE_CHARS).collect()
        } else {
            message
        };
        Self {
            timestamp: Utc::now(),
            event_type,
            message,
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(AuditEventType::ApiSuccess, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(AuditEventType::ApiError, message)
    }

    pub fn system(message: impl Into<String>) -> Self {
        Self::new(AuditEventType::System, message)
    }
}
