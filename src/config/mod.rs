use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::pipeline::FetchPolicy;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// External provider endpoints and credentials
    pub providers: ProviderConfig,

    /// Application settings
    pub app: AppConfig,

    /// HTTP server settings
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Base URL of the Invidious-compatible instance used for channel
    /// listings and caption tracks
    pub instance_url: String,

    /// Gemini API key; `GEMINI_API_KEY` in the environment takes precedence
    pub gemini_api_key: Option<String>,

    /// Gemini model used for analysis
    pub gemini_model: String,

    /// Per-request timeout in seconds for all provider calls
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Default transcript language code
    pub default_language: String,

    /// Default transcript fetch policy
    pub fetch_policy: FetchPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address for `chanscribe serve`
    pub host: String,

    /// Bind port for `chanscribe serve`
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            providers: ProviderConfig {
                instance_url: "https://yewtu.be".to_string(),
                gemini_api_key: None,
                gemini_model: "gemini-2.5-flash".to_string(),
                request_timeout_secs: 30,
            },
            app: AppConfig {
                default_language: "en".to_string(),
                fetch_policy: FetchPolicy::Concurrent,
            },
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
        }
    }
}

impl Config {
    /// Load configuration from file or create default
    pub async fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content =
                fs_err::read_to_string(&config_path).context("Failed to read config file")?;

            let config: Config =
                serde_yaml::from_str(&content).context("Failed to parse config file")?;

            config.validate()?;
            Ok(config)
        } else {
            let config = Self::default();
            config.save().await?;
            Ok(config)
        }
    }

    /// Save configuration to file
    pub async fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            fs_err::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self).context("Failed to serialize config")?;

        fs_err::write(&config_path, content).context("Failed to write config file")?;

        Ok(())
    }

    /// Get configuration file path
    fn config_path() -> Result<PathBuf> {
        // First try current directory for easy testing
        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Ok(local_config);
        }

        let config_dir = dirs::config_dir().context("Could not determine config directory")?;

        Ok(config_dir.join("channel-transcriptor").join("config.yaml"))
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.providers.instance_url.is_empty() {
            anyhow::bail!("Provider instance URL must be configured");
        }
        if self.providers.request_timeout_secs == 0 {
            anyhow::bail!("Request timeout must be at least one second");
        }

        Ok(())
    }

    /// Gemini API key, environment taking precedence over the config file
    pub fn gemini_api_key(&self) -> Option<String> {
        std::env::var("GEMINI_API_KEY")
            .ok()
            .filter(|k| !k.is_empty())
            .or_else(|| self.providers.gemini_api_key.clone())
    }

    /// Shared HTTP client with the configured provider timeout.
    ///
    /// Every provider call goes through this client, so a hanging upstream
    /// fails within the timeout instead of stalling a stream forever.
    pub fn http_client(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(Duration::from_secs(self.providers.request_timeout_secs))
            .build()
            .context("Failed to build HTTP client")
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  Instance URL: {}", self.providers.instance_url);
        println!("  Gemini Model: {}", self.providers.gemini_model);
        println!(
            "  Gemini Key: {}",
            if self.gemini_api_key().is_some() {
                "configured"
            } else {
                "not set"
            }
        );
        println!("  Default Language: {}", self.app.default_language);
        println!("  Request Timeout: {}s", self.providers.request_timeout_secs);
        println!("  Server: {}:{}", self.server.host, self.server.port);
    }
}
