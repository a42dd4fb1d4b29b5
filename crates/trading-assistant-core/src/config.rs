use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use anyhow::{Context, Result, anyhow};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Environment variable holding the endpoint base URL
pub const BASE_URL_ENV: &str = "ASSISTANT_API_BASE_URL";
/// Environment variable holding the request timeout in seconds
pub const TIMEOUT_ENV: &str = "ASSISTANT_TIMEOUT_SECS";

/// Persisted settings, stored as JSON in the user's config directory
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub base_url: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = serde_json::from_str(&config_content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        Ok(config)
    }

    pub fn save(&self) -> Result<PathBuf> {
        let config_path = Self::get_config_path()?;
        self.save_to(&config_path)?;
        Ok(config_path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("trading-assistant").join("config.json"))
    }
}

/// Connection settings injected into the query client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into(),
            timeout,
        }
    }

    /// Merge explicit overrides (CLI flags or environment) over the saved
    /// config file, falling back to the built-in defaults.
    pub fn resolve(
        base_url: Option<String>,
        timeout_secs: Option<u64>,
        saved: &Config,
    ) -> Self {
        let base_url = base_url
            .filter(|url| !url.trim().is_empty())
            .or_else(|| saved.base_url.clone())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let timeout_secs = timeout_secs
            .or(saved.timeout_secs)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        Self {
            base_url: base_url.trim().to_string(),
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    /// Full URL of the ask endpoint
    pub fn ask_url(&self) -> String {
        format!("{}/ask", self.base_url.trim_end_matches('/'))
    }

    /// The persistable form of these settings
    pub fn to_saved(&self) -> Config {
        Config {
            base_url: Some(self.base_url.clone()),
            timeout_secs: Some(self.timeout.as_secs()),
        }
    }
}
