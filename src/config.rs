use crate::http_client::DEFAULT_USER_AGENT;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::time::Duration;

pub const CONFIG_PATH: &str = "data/config.yaml";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Config {
    #[serde(default = "default_tracing_level")]
    pub tracing_level: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,
    #[serde(default = "default_database_path")]
    pub database_path: String,
    #[serde(default = "default_max_results_per_platform")]
    pub max_results_per_platform: usize,
    /// Used when `search` is run without `--keyword`
    #[serde(default)]
    pub default_keywords: Vec<String>,
}

fn default_tracing_level() -> String {
    "info".to_string()
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_request_delay_ms() -> u64 {
    2000 // 2 seconds between requests
}

fn default_request_timeout_seconds() -> u64 {
    30
}

fn default_database_path() -> String {
    "data/jobs.db".to_string()
}

fn default_max_results_per_platform() -> usize {
    50
}

impl Default for Config {
    fn default() -> Self {
        Config {
            tracing_level: default_tracing_level(),
            user_agent: default_user_agent(),
            request_delay_ms: default_request_delay_ms(),
            request_timeout_seconds: default_request_timeout_seconds(),
            database_path: default_database_path(),
            max_results_per_platform: default_max_results_per_platform(),
            default_keywords: Vec::new(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        // A missing file is fine, defaults plus env vars are enough to run
        let mut config = match fs::read_to_string(CONFIG_PATH) {
            Ok(config_str) => Self::from_yaml(&config_str)
                .with_context(|| format!("Failed to parse {}", CONFIG_PATH))?,
            Err(_) => Config::default(),
        };

        config.apply_overrides(|key| env::var(key).ok())?;
        config.validate()?;

        Ok(config)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Override fields from environment-style variables
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(tracing_level) = lookup("TRACING_LEVEL") {
            self.tracing_level = tracing_level;
        }

        if let Some(user_agent) = lookup("USER_AGENT") {
            self.user_agent = user_agent;
        }

        if let Some(request_delay) = lookup("REQUEST_DELAY_MS") {
            self.request_delay_ms = request_delay.parse()
                .context("Failed to parse REQUEST_DELAY_MS environment variable")?;
        }

        if let Some(timeout) = lookup("REQUEST_TIMEOUT_SECONDS") {
            self.request_timeout_seconds = timeout.parse()
                .context("Failed to parse REQUEST_TIMEOUT_SECONDS environment variable")?;
        }

        if let Some(path) = lookup("DATABASE_PATH") {
            self.database_path = path;
        }

        if let Some(max_results) = lookup("MAX_RESULTS_PER_PLATFORM") {
            self.max_results_per_platform = max_results.parse()
                .context("Failed to parse MAX_RESULTS_PER_PLATFORM environment variable")?;
        }

        if let Some(keywords) = lookup("DEFAULT_KEYWORDS") {
            // Parse comma-separated keywords
            self.default_keywords = keywords.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.request_timeout_seconds == 0 {
            anyhow::bail!("request_timeout_seconds must be greater than zero");
        }

        if self.max_results_per_platform == 0 {
            anyhow::bail!("max_results_per_platform must be greater than zero");
        }

        Ok(())
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn create_default() -> Result<()> {
        // Ensure data directory exists
        fs::create_dir_all("data")?;

        let default_config = Config {
            default_keywords: vec!["rust".to_string(), "backend".to_string()],
            ..Config::default()
        };

        let config_str = serde_yaml::to_string(&default_config)?;
        fs::write(CONFIG_PATH, config_str)?;
        Ok(())
    }
}
