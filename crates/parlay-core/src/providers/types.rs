//! Provider-agnostic capability types

use anyhow::Result;
use async_trait::async_trait;

/// Generated reply from a provider.
///
/// `degraded` marks a reply produced by a stub standing in for an unwired
/// backend; the orchestrator surfaces the flag in the audit trail so a
/// degraded reply is never mistaken for a true success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub degraded: bool,
}

impl Reply {
    /// A normal reply from a live backend.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            degraded: false,
        }
    }

    /// A clearly labeled stand-in reply from an unwired backend.
    pub fn degraded(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            degraded: true,
        }
    }
}

/// The single-operation capability every registered provider implements.
///
/// One attempt per call; no retry lives at this seam. Errors carry the
/// underlying cause (timeout, quota, auth, malformed response) and map to
/// a server error upstream.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Human-readable provider name (e.g. "google", "azure")
    fn name(&self) -> &str;

    /// Turn a prompt into generated text.
    async fn generate(&self, prompt: &str) -> Result<Reply>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_constructors() {
        let ok = Reply::text("hello");
        assert!(!ok.degraded);
        let stub = Reply::degraded("not wired");
        assert!(stub.degraded);
        assert_eq!(stub.text, "not wired");
    }
}
