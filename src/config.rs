//! Configuration loading and management for summa.
//!
//! Loads settings from `summa.toml` with environment variable overrides for sensitive data.
//! Every section has defaults, so a missing file yields a usable configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("missing required API key for provider: {0}")]
    MissingApiKey(String),
}

/// How URL input reaches the extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RoutingPolicy {
    /// The model is handed the fetch tool and decides when to call it.
    #[default]
    Tool,
    /// The pipeline extracts the page once, then asks the model with no tools.
    Prefetch,
}

/// LLM agent configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Model identifier (e.g., "gemini-2.5-pro")
    pub model: String,
    /// Base URL of the generative language API
    pub api_base: String,
    /// Maximum tool invocations per summarization
    pub max_steps: usize,
    /// Timeout for a single model call, in seconds
    pub timeout_secs: u64,
    pub routing: RoutingPolicy,
}

/// Web content extraction configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    /// Timeout for a single page fetch, in seconds
    pub timeout_secs: u64,
    /// User-Agent header sent with every fetch
    pub user_agent: String,
    /// Maximum characters of extracted content handed to the model
    pub max_content_length: usize,
}

/// HTTP endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address the `serve` command binds to
    pub bind: String,
}

/// API keys configuration (loaded from environment)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ApiConfig {
    #[serde(default)]
    pub gemini_key: Option<String>,
}

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub scraper: ScraperConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

impl Config {
    /// Load configuration from the default location (summa.toml in cwd or home)
    pub fn load() -> Result<Self, ConfigError> {
        match Self::find_config_file() {
            Some(path) => Self::load_from(&path),
            None => {
                tracing::debug!("no summa.toml found, using defaults");
                let mut config = Config::default();
                config.apply_env();
                Ok(config)
            }
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::parse(&content)?;
        config.apply_env();

        tracing::debug!(
            path = %path.display(),
            model = %config.agent.model,
            max_steps = config.agent.max_steps,
            routing = ?config.agent.routing,
            "loaded configuration"
        );
        Ok(config)
    }

    /// Parse configuration from TOML text without touching the environment
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Override keys and model from environment variables
    fn apply_env(&mut self) {
        let key = env_non_empty("GEMINI_API_KEY")
            .or_else(|| env_non_empty("GOOGLE_GENERATIVE_AI_API_KEY"));
        if let Some(key) = key {
            self.api.gemini_key = Some(key);
        }
        if let Some(model) = env_non_empty("SUMMA_MODEL") {
            self.agent.model = model;
        }
    }

    /// Find the config file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        // Check current directory first
        let local_config = PathBuf::from("summa.toml");
        if local_config.exists() {
            return Some(local_config);
        }

        // Check home directory
        let home_config = dirs::home_dir()?
            .join(".config")
            .join("summa")
            .join("summa.toml");
        home_config.exists().then_some(home_config)
    }

    /// Get the API key for the model endpoint
    pub fn api_key(&self) -> Result<&str, ConfigError> {
        self.api
            .gemini_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingApiKey("gemini".to_string()))
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-pro".to_string(),
            api_base: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            max_steps: 5,
            timeout_secs: 120,
            routing: RoutingPolicy::Tool,
        }
    }
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            user_agent: "Mozilla/5.0 (compatible; SummarizerBot/1.0)".to_string(),
            max_content_length: 10_000,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:3000".to_string(),
        }
    }
}
