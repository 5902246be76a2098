//! Request/response contract for the chat endpoint

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

fn default_user_id() -> String {
    "default_user".to_string()
}

fn default_provider() -> String {
    "google".to_string()
}

/// Inbound chat request. Immutable once received; owned by the handling
/// call for its duration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The prompt to route to a provider
    pub prompt: String,
    /// Caller identity, defaulted when omitted
    #[serde(default = "default_user_id")]
    pub user_id: String,
    /// Provider tag ("google", "azure")
    #[serde(default = "default_provider")]
    pub provider: String,
}

impl ChatRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            user_id: default_user_id(),
            provider: default_provider(),
        }
    }

    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = provider.into();
        self
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = user_id.into();
        self
    }
}

/// The reply returned to the caller. `session_id` is minted fresh per
/// request and is the join key to the background records; it is never
/// supplied by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    pub session_id: Uuid,
    pub provider: String,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults_applied() {
        let req: ChatRequest = serde_json::from_str(r#"{"prompt":"hi"}"#).unwrap();
        assert_eq!(req.prompt, "hi");
        assert_eq!(req.user_id, "default_user");
        assert_eq!(req.provider, "google");
    }

    #[test]
    fn test_request_explicit_fields_kept() {
        let req: ChatRequest =
            serde_json::from_str(r#"{"prompt":"hi","user_id":"u1","provider":"azure"}"#).unwrap();
        assert_eq!(req.user_id, "u1");
        assert_eq!(req.provider, "azure");
    }

    #[test]
    fn test_request_missing_prompt_rejected() {
        assert!(serde_json::from_str::<ChatRequest>(r#"{"user_id":"u1"}"#).is_err());
    }

    #[test]
    fn test_response_serializes_expected_shape() {
        let resp = ChatResponse {
            response: "4".to_string(),
            session_id: Uuid::new_v4(),
            provider: "google".to_string(),
            timestamp: Utc::now(),
        };
        let json: serde_json::Value = serde_json::to_value(&resp).unwrap();
        assert!(json.get("response").is_some());
        assert!(json.get("session_id").is_some());
        assert!(json.get("provider").is_some());
        assert!(json.get("timestamp").is_some());
        // session_id must round-trip as a UUID string
        let s = json["session_id"].as_str().unwrap();
        assert!(Uuid::parse_str(s).is_ok());
    }
}
