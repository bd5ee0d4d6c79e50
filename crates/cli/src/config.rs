//! Configuration management for the CLI

use anyhow::{Context, Result};
use edgeci_lib::gateway::{EdgeClient, EdgeClientBuilder, DEFAULT_BASE_URL};
use serde::Deserialize;
use std::time::Duration;

/// Management API settings, read from `EDGE_*` variables over an optional `edgeci.toml`
#[derive(Debug, Clone, Deserialize)]
pub struct EdgeConfig {
    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    /// Organizations root of the management API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl EdgeConfig {
    /// Load configuration from the config file and environment
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("edgeci").required(false))
            .add_source(config::Environment::with_prefix("EDGE"))
            .build()
            .context("Failed to load configuration")?;

        config
            .try_deserialize()
            .context("Invalid configuration")
    }

    /// Build a management API client; credentials are mandatory
    pub fn client(&self) -> Result<EdgeClient> {
        let username = non_empty(self.username.as_deref())
            .context("Missing credentials: set EDGE_USERNAME")?;
        let password = non_empty(self.password.as_deref())
            .context("Missing credentials: set EDGE_PASSWORD")?;

        EdgeClientBuilder::new()
            .base_url(&self.base_url)
            .request_timeout(Duration::from_secs(self.timeout_secs))
            .credentials(username, password)
            .build()
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(username: Option<&str>, password: Option<&str>) -> EdgeConfig {
        EdgeConfig {
            username: username.map(str::to_string),
            password: password.map(str::to_string),
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }

    #[test]
    fn test_client_requires_username() {
        let err = config(None, Some("pass")).client().unwrap_err();
        assert!(err.to_string().contains("EDGE_USERNAME"));
    }

    #[test]
    fn test_client_rejects_blank_password() {
        let err = config(Some("user"), Some("  ")).client().unwrap_err();
        assert!(err.to_string().contains("EDGE_PASSWORD"));
    }

    #[test]
    fn test_client_with_credentials() {
        let client = config(Some("user"), Some("pass")).client().unwrap();
        assert_eq!(client.base_url().as_str(), DEFAULT_BASE_URL);
    }

    #[test]
    fn test_invalid_base_url() {
        let mut config = config(Some("user"), Some("pass"));
        config.base_url = "not a url".to_string();
        assert!(config.client().is_err());
    }
}
