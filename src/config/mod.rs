use std::time::Duration;

use garde::Validate;
use reqwest::Url;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ClientConfig {
    /// Restoration backend address (e.g., "http://localhost:8000"). The `/api`
    /// prefix is appended by the client.
    #[serde(default = "default_backend_url")]
    #[garde(length(min = 1))]
    pub backend_url: String,

    /// Delay between the completion of one status fetch and the next.
    #[serde(default = "default_poll_interval_ms")]
    #[garde(range(min = 1, max = 60_000))]
    pub poll_interval_ms: u64,
}

fn default_backend_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_poll_interval_ms() -> u64 {
    2000
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            backend_url: default_backend_url(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let config: Self = envy::from_env()?;
        config.check()?;
        Ok(config)
    }

    /// Build a config for an explicit backend address, keeping the default poll delay.
    pub fn for_backend(backend_url: impl Into<String>) -> Self {
        Self {
            backend_url: backend_url.into(),
            ..Self::default()
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Validate field rules and that the backend address forms a usable API base.
    pub fn check(&self) -> Result<(), ConfigError> {
        self.validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        self.api_base()?;
        Ok(())
    }

    /// `{backend_url}/api/`, always with a trailing slash so relative joins stay under it.
    pub fn api_base(&self) -> Result<Url, ConfigError> {
        let trimmed = self.backend_url.trim_end_matches('/');
        let url = Url::parse(&format!("{trimmed}/api/"))
            .map_err(|e| ConfigError::BackendUrl(format!("{}: {e}", self.backend_url)))?;

        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(ConfigError::BackendUrl(format!(
                "unsupported scheme '{other}' in {}",
                self.backend_url
            ))),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read configuration from environment: {0}")]
    Env(#[from] envy::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Invalid backend URL {0}")]
    BackendUrl(String),
}
