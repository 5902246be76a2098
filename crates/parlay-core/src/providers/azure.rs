//! Azure OpenAI provider
//!
//! Talks to deployment-based chat-completion endpoints:
//! `{endpoint}/openai/deployments/{deployment}/chat/completions?api-version=...`

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::types::{Provider, Reply};

/// Azure OpenAI provider
pub struct AzureProvider {
    client: Client,
    api_key: String,
    endpoint: String,
    deployment: String,
    api_version: String,
    max_tokens: u32,
}

impl std::fmt::Debug for AzureProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureProvider")
            .field("endpoint", &self.endpoint)
            .field("deployment", &self.deployment)
            .field("api_version", &self.api_version)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl AzureProvider {
    pub fn new(
        api_key: String,
        endpoint: String,
        deployment: String,
        api_version: String,
        max_tokens: u32,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            api_key,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            deployment,
            api_version,
            max_tokens,
        })
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.endpoint, self.deployment, self.api_version
        )
    }

    fn extract_text(resp: AzureApiResponse) -> Result<String> {
        let choice = resp
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("Azure OpenAI response had no choices"))?;

        match choice.message.content {
            Some(text) if !text.is_empty() => Ok(text),
            _ => Err(anyhow!("Azure OpenAI response contained no usable text")),
        }
    }
}

#[async_trait]
impl Provider for AzureProvider {
    fn name(&self) -> &str {
        "azure"
    }

    async fn generate(&self, prompt: &str) -> Result<Reply> {
        let body = serde_json::json!({
            "messages": [AzureMessage {
                role: "user".to_string(),
                content: Some(prompt.to_string()),
            }],
            "max_tokens": self.max_tokens,
        });

        debug!("Azure OpenAI request: deployment={}", self.deployment);

        let response = self
            .client
            .post(self.completions_url())
            .header("api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .context("Failed to send request to Azure OpenAI")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(anyhow!(
                "Azure OpenAI request failed with status {}: {}",
                status,
                error_text
            ));
        }

        let api_response: AzureApiResponse = response
            .json()
            .await
            .context("Failed to parse Azure OpenAI response")?;

        Self::extract_text(api_response).map(Reply::text)
    }
}

// ── Azure OpenAI wire types ──

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AzureMessage {
    role: String,
    content: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct AzureApiResponse {
    #[serde(default)]
    choices: Vec<AzureChoice>,
}

#[derive(Debug, Clone, Deserialize)]
struct AzureChoice {
    message: AzureMessage,
}
