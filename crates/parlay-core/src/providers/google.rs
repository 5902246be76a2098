//! Google Gemini provider

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::types::{Provider, Reply};

/// Google Gemini provider
pub struct GoogleProvider {
    client: Client,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl std::fmt::Debug for GoogleProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleProvider")
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl GoogleProvider {
    pub fn new(api_key: String, model: String, max_tokens: u32) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            api_key,
            model,
            max_tokens,
        })
    }

    /// Collect the candidate's text parts into one reply string.
    fn extract_text(resp: GeminiApiResponse) -> Result<String> {
        let candidate = resp
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("Gemini response had no candidates"))?;

        let text: String = candidate
            .content
            .parts
            .into_iter()
            .map(|p| p.text)
            .collect::<Vec<_>>()
            .join("");

        if text.is_empty() {
            return Err(anyhow!("Gemini response contained no usable text"));
        }
        Ok(text)
    }
}

#[async_trait]
impl Provider for GoogleProvider {
    fn name(&self) -> &str {
        "google"
    }

    async fn generate(&self, prompt: &str) -> Result<Reply> {
        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent?key={}",
            self.model, self.api_key
        );

        let body = serde_json::json!({
            "contents": [GeminiContent {
                role: "user".to_string(),
                parts: vec![GeminiPart { text: prompt.to_string() }],
            }],
            "generationConfig": {
                "maxOutputTokens": self.max_tokens,
            },
        });

        debug!("Gemini request: model={}", self.model);

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .context("Failed to send request to Gemini API")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(anyhow!(
                "Gemini API request failed with status {}: {}",
                status,
                error_text
            ));
        }

        let api_response: GeminiApiResponse = response
            .json()
            .await
            .context("Failed to parse Gemini API response")?;

        debug!("Gemini response: candidates={}", api_response.candidates.len());

        Self::extract_text(api_response).map(Reply::text)
    }
}

// ── Gemini wire types ──

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiContent {
    role: String,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Clone, Deserialize)]
struct GeminiApiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Clone, Deserialize)]
struct GeminiCandidate {
    content: GeminiContent,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response_with_parts(parts: Vec<&str>) -> GeminiApiResponse {
        GeminiApiResponse {
            candidates: vec![GeminiCandidate {
                content: GeminiContent {
                    role: "model".to_string(),
                    parts: parts
                        .into_iter()
                        .map(|t| GeminiPart { text: t.to_string() })
                        .collect(),
                },
            }],
        }
    }

    #[test]
    fn test_extract_text_joins_parts() {
        let resp = response_with_parts(vec!["Hello, ", "world"]);
        assert_eq!(GoogleProvider::extract_text(resp).unwrap(), "Hello, world");
    }

    #[test]
    fn test_extract_text_no_candidates() {
        let resp = GeminiApiResponse { candidates: vec![] };
        assert!(GoogleProvider::extract_text(resp).is_err());
    }

    #[test]
    fn test_extract_text_empty_parts() {
        let resp = response_with_parts(vec![]);
        assert!(GoogleProvider::extract_text(resp).is_err());
    }

    #[test]
    fn test_debug_hides_key() {
        let provider =
            GoogleProvider::new("AIza-secret".to_string(), "gemini-2.0-flash".to_string(), 2048)
                .unwrap();
        let debug = format!("{:?}", provider);
        assert!(!debug.contains("AIza-secret"));
    }

    #[test]
    fn test_response_parses_without_candidates_field() {
        let resp: GeminiApiResponse = serde_json::from_str("{}").unwrap();
        assert!(resp.candidates.is_empty());
    }
}
