use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use parlay_core::OrchestratorConfig;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ParlayConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorCliConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_system_name")]
    pub system_name: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            system_name: default_system_name(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_system_name() -> String {
    "parlay".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub google: Option<GoogleProviderConfig>,
    #[serde(default)]
    pub azure: Option<AzureProviderConfig>,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct GoogleProviderConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_google_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl std::fmt::Debug for GoogleProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleProviderConfig")
            .field("api_key", &mask_secret(&self.api_key))
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

fn default_google_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_max_tokens() -> u32 {
    2048
}

#[derive(Clone, Serialize, Deserialize)]
pub struct AzureProviderConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub endpoint: String,
    #[serde(default = "default_azure_deployment")]
    pub deployment: String,
    #[serde(default = "default_azure_api_version")]
    pub api_version: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl std::fmt::Debug for AzureProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureProviderConfig")
            .field("api_key", &mask_secret(&self.api_key))
            .field("endpoint", &self.endpoint)
            .field("deployment", &self.deployment)
            .field("api_version", &self.api_version)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

fn default_azure_deployment() -> String {
    "gpt-4o".to_string()
}

fn default_azure_api_version() -> String {
    "2024-02-01".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StoreConfig {
    /// SQLite file; defaults to `<config dir>/parlay.db` when unset.
    #[serde(default)]
    pub db_path: Option<PathBuf>,
}

impl StoreConfig {
    pub fn resolved_db_path(&self) -> PathBuf {
        self.db_path
            .clone()
            .unwrap_or_else(|| config_dir().join("parlay.db"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorCliConfig {
    #[serde(default = "default_provider_timeout_secs")]
    pub provider_timeout_secs: u64,
    #[serde(default = "default_sink_timeout_secs")]
    pub sink_timeout_secs: u64,
    #[serde(default = "default_max_inflight_jobs")]
    pub max_inflight_jobs: usize,
}

impl Default for OrchestratorCliConfig {
    fn default() -> Self {
        Self {
            provider_timeout_secs: default_provider_timeout_secs(),
            sink_timeout_secs: default_sink_timeout_secs(),
            max_inflight_jobs: default_max_inflight_jobs(),
        }
    }
}

fn default_provider_timeout_secs() -> u64 {
    60
}

fn default_sink_timeout_secs() -> u64 {
    10
}

fn default_max_inflight_jobs() -> usize {
    64
}

impl From<&OrchestratorCliConfig> for OrchestratorConfig {
    fn from(cfg: &OrchestratorCliConfig) -> Self {
        Self {
            provider_timeout: Duration::from_secs(cfg.provider_timeout_secs),
            sink_timeout: Duration::from_secs(cfg.sink_timeout_secs),
            max_inflight_jobs: cfg.max_inflight_jobs,
        }
    }
}

/// Directory holding config.toml and the default database.
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("parlay")
}

impl ParlayConfig {
    /// Load from an explicit path, or from `<config dir>/config.toml`,
    /// falling back to built-in defaults when neither exists. Empty API
    /// keys are backfilled from the environment afterwards.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path
            .map(PathBuf::from)
            .unwrap_or_else(|| config_dir().join("config.toml"));

        let mut config: ParlayConfig = if path.exists() {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config at {}", path.display()))?;
            toml::from_str(&raw)
                .with_context(|| format!("Failed to parse config at {}", path.display()))?
        } else {
            ParlayConfig::default()
        };

        config.apply_env_fallbacks();
        Ok(config)
    }

    /// Backfill empty secrets from the environment so keys never have to
    /// live in the config file.
    fn apply_env_fallbacks(&mut self) {
        if let Some(google) = &mut self.providers.google {
            if google.api_key.is_empty() {
                if let Ok(key) = std::env::var("GEMINI_API_KEY") {
                    google.api_key = key;
                }
            }
        }
        if let Some(azure) = &mut self.providers.azure {
            if azure.api_key.is_empty() {
                if let Ok(key) = std::env::var("AZURE_OPENAI_API_KEY") {
                    azure.api_key = key;
                }
            }
            if azure.endpoint.is_empty() {
                if let Ok(endpoint) = std::env::var("AZURE_OPENAI_ENDPOINT") {
                    azure.endpoint = endpoint;
                }
            }
        }
    }
}

fn mask_secret(secret: &str) -> String {
    if secret.is_empty() {
        "<unset>".to_string()
    } else if secret.len() <= 8 {
        "****".to_string()
    } else {
        format!("{}****", &secret[..4])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ParlayConfig::default();
        assert_eq!(config.server.bind, "127.0.0.1:8080");
        assert_eq!(config.server.system_name, "parlay");
        assert!(config.providers.google.is_none());
        assert_eq!(config.orchestrator.provider_timeout_secs, 60);
    }

    #[test]
    fn test_parse_minimal_config() {
        let config: ParlayConfig = toml::from_str(
            r#"
            [server]
            bind = "0.0.0.0:9000"

            [providers.google]
            api_key = "AIza-test"
            "#,
        )
        .unwrap();
        assert_eq!(config.server.bind, "0.0.0.0:9000");
        let google = config.providers.google.unwrap();
        assert_eq!(google.api_key, "AIza-test");
        assert_eq!(google.model, "gemini-2.0-flash");
        assert_eq!(google.max_tokens, 2048);
    }

    #[test]
    fn test_default_config_file_parses() {
        let config: ParlayConfig =
            toml::from_str(include_str!("../../../config/default.toml")).unwrap();
        assert!(config.providers.google.is_some());
        assert!(config.providers.azure.is_some());
        assert_eq!(config.orchestrator.max_inflight_jobs, 64);
    }

    #[test]
    fn test_orchestrator_config_conversion() {
        let cli = OrchestratorCliConfig {
            provider_timeout_secs: 5,
            sink_timeout_secs: 2,
            max_inflight_jobs: 3,
        };
        let core: OrchestratorConfig = (&cli).into();
        assert_eq!(core.provider_timeout, Duration::from_secs(5));
        assert_eq!(core.sink_timeout, Duration::from_secs(2));
        assert_eq!(core.max_inflight_jobs, 3);
    }

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret(""), "<unset>");
        assert_eq!(mask_secret("short"), "****");
        assert_eq!(mask_secret("AIza-1234567890"), "AIza****");
    }

    #[test]
    fn test_debug_masks_keys() {
        let google = GoogleProviderConfig {
            api_key: "AIza-super-secret".to_string(),
            model: default_google_model(),
            max_tokens: default_max_tokens(),
        };
        let debug = format!("{:?}", google);
        assert!(!debug.contains("super-secret"));

        let azure = AzureProviderConfig {
            api_key: "azure-super-secret".to_string(),
            endpoint: "https://example.openai.azure.com".to_string(),
            deployment: default_azure_deployment(),
            api_version: default_azure_api_version(),
            max_tokens: default_max_tokens(),
        };
        let debug = format!("{:?}", azure);
        assert!(!debug.contains("super-secret"));
    }

    #[test]
    fn test_resolved_db_path_defaults_under_config_dir() {
        let store = StoreConfig { db_path: None };
        assert!(store.resolved_db_path().ends_with("parlay.db"));

        let explicit = StoreConfig {
            db_path: Some(PathBuf::from("/tmp/x.db")),
        };
        assert_eq!(explicit.resolved_db_path(), PathBuf::from("/tmp/x.db"));
    }
}
