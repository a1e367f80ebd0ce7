//! Centralized configuration management for procdesk

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_API_URL: &str = "http://localhost:3000/api";
const DEFAULT_EXPORT_DIR: &str = "./exports";
const DEFAULT_USER_AGENT: &str = "procdesk/0.1.0";

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the remote API, without a trailing slash
    pub api_url: String,
    /// Directory where spreadsheet, PDF and print files are written
    pub export_dir: PathBuf,
    /// HTTP client configuration
    pub http: HttpConfig,
}

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// User agent string
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            export_dir: DEFAULT_EXPORT_DIR.into(),
            http: HttpConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables and defaults
    pub fn from_env() -> Result<Self> {
        let api_url = std::env::var("PROCDESK_API_URL")
            .unwrap_or_else(|_| DEFAULT_API_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let export_dir = std::env::var("PROCDESK_EXPORT_DIR")
            .unwrap_or_else(|_| DEFAULT_EXPORT_DIR.to_string())
            .into();

        let http = HttpConfig {
            timeout_seconds: parse_env_var("PROCDESK_HTTP_TIMEOUT_SECONDS")?.unwrap_or(30),
            user_agent: std::env::var("PROCDESK_USER_AGENT")
                .unwrap_or_else(|_| DEFAULT_USER_AGENT.to_string()),
        };

        Ok(Config {
            api_url,
            export_dir,
            http,
        })
    }

    pub fn with_api_url(mut self, api_url: &str) -> Self {
        self.api_url = api_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_export_dir(mut self, export_dir: impl Into<PathBuf>) -> Self {
        self.export_dir = export_dir.into();
        self
    }

    /// Get HTTP timeout as Duration
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http.timeout_seconds)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !(self.api_url.starts_with("http://") || self.api_url.starts_with("https://")) {
            return Err(anyhow::anyhow!(
                "API URL must start with http:// or https://: {}",
                self.api_url
            ));
        }

        std::fs::create_dir_all(&self.export_dir)
            .with_context(|| format!("Cannot create export directory: {}", self.export_dir.display()))?;

        Ok(())
    }
}

/// Helper function to parse environment variable as a specific type
fn parse_env_var<T>(var_name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display + Send + Sync + std::error::Error + 'static,
{
    match std::env::var(var_name) {
        Ok(val) => val.parse().map(Some).with_context(|| {
            format!("Failed to parse environment variable {} = '{}'", var_name, val)
        }),
        Err(_) => Ok(None),
    }
}
