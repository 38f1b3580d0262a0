use anyhow::{Context, Result};
use directories::ProjectDirs;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub site: SiteConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_max_concurrent_downloads")]
    pub max_concurrent_downloads: usize,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

// Default value functions
fn default_max_concurrent_downloads() -> usize {
    3
}
fn default_request_timeout_secs() -> u64 {
    30
}
fn default_user_agent() -> String {
    "vizdl/0.1.0".to_string()
}
fn default_base_url() -> String {
    "https://vizertv.in".to_string()
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            max_concurrent_downloads: default_max_concurrent_downloads(),
            request_timeout_secs: default_request_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

impl Config {
    /// Loads the config file when present, otherwise falls back to defaults.
    pub fn load() -> Result<Self> {
        let Some(path) = Self::config_path() else {
            return Ok(Self::default());
        };
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read config at '{}'", path.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("invalid config file at '{}'", path.display()))
    }

    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "vizdl", "vizdl")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// HTTP client shared by the scraper, the resolver and the transfers.
    ///
    /// No overall request timeout: a streamed transfer legitimately outlives
    /// any fixed deadline, so only connection establishment is bounded.
    pub fn http_client(&self) -> Result<Client> {
        Client::builder()
            .connect_timeout(Duration::from_secs(self.general.request_timeout_secs))
            .user_agent(self.general.user_agent.clone())
            .build()
            .context("failed to create HTTP client")
    }
}
