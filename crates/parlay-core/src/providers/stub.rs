//! Stand-in provider for backends that are configured but not wired
//!
//! A tag with no working credentials still has to be routable. The stub
//! replies with an explicit notice and marks the reply degraded so the
//! audit trail can tell it apart from a true success.

use anyhow::Result;
use async_trait::async_trait;

use super::types::{Provider, Reply};

/// Provider that answers every prompt with an "integration not wired"
/// notice, flagged as degraded.
pub struct StubProvider {
    name: String,
}

impl StubProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl Provider for StubProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, _prompt: &str) -> Result<Reply> {
        Ok(Reply::degraded(format!(
            "The '{}' provider is configured but its backend integration is not wired up yet. \
             No model was called.",
            self.name
        )))
    }
}
