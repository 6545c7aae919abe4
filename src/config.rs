use serde::{Deserialize, Serialize};
use std::env;
use std::net::SocketAddr;
use std::path::Path;

use crate::error::{NylasError, Result};

/// Default API endpoint
pub const DEFAULT_BASE_URL: &str = "https://api.nylas.com";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub webhook: WebhookConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            client_id: None,
            client_secret: None,
            access_token: None,
        }
    }
}

/// Transport timeouts.
///
/// Streaming sessions only honour cancellation between reads unless the
/// connection itself gives up, so these should always be set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_response_header_timeout")]
    pub response_header_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout(),
            response_header_timeout_secs: default_response_header_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_connect_timeout() -> u64 {
    5
}

fn default_response_header_timeout() -> u64 {
    10
}

fn default_listen_addr() -> String {
    "127.0.0.1:8080".to_string()
}

const MAX_TIMEOUT_SECS: u64 = 300;

impl Config {
    pub async fn load(path: &Path) -> Result<Self> {
        // If file doesn't exist, return default config with warning
        if !path.exists() {
            tracing::warn!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| NylasError::ConfigError(format!("Failed to read config file: {}", e)))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| NylasError::ConfigError(format!("Failed to parse config file: {}", e)))?;

        config.validate()?;

        tracing::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                NylasError::ConfigError(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| NylasError::ConfigError(format!("Failed to serialize config: {}", e)))?;

        tokio::fs::write(path, content)
            .await
            .map_err(|e| NylasError::ConfigError(format!("Failed to write config file: {}", e)))?;

        tracing::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Overlay credentials and endpoint from the environment
    ///
    /// # Environment Variables
    /// - `NYLAS_CLIENT_ID`: application client ID
    /// - `NYLAS_CLIENT_SECRET`: application client secret
    /// - `NYLAS_ACCESS_TOKEN`: account access token for mailbox calls
    /// - `NYLAS_BASE_URL`: API endpoint override
    pub fn apply_env(&mut self) {
        if let Ok(client_id) = env::var("NYLAS_CLIENT_ID") {
            self.api.client_id = Some(client_id);
        }
        if let Ok(client_secret) = env::var("NYLAS_CLIENT_SECRET") {
            self.api.client_secret = Some(client_secret);
        }
        if let Ok(access_token) = env::var("NYLAS_ACCESS_TOKEN") {
            self.api.access_token = Some(access_token);
        }
        if let Ok(base_url) = env::var("NYLAS_BASE_URL") {
            self.api.base_url = base_url;
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if !(self.api.base_url.starts_with("http://") || self.api.base_url.starts_with("https://"))
        {
            return Err(NylasError::ConfigError(format!(
                "api.base_url must start with http:// or https://, got '{}'",
                self.api.base_url
            )));
        }

        check_timeout("http.connect_timeout_secs", self.http.connect_timeout_secs)?;
        check_timeout(
            "http.response_header_timeout_secs",
            self.http.response_header_timeout_secs,
        )?;

        if self.webhook.listen_addr.parse::<SocketAddr>().is_err() {
            return Err(NylasError::ConfigError(format!(
                "webhook.listen_addr is not a socket address: '{}'",
                self.webhook.listen_addr
            )));
        }

        tracing::debug!("Configuration validation passed");
        Ok(())
    }

    /// Create an example configuration file
    pub async fn create_example(path: &Path) -> Result<()> {
        let config = Self::default();
        config.save(path).await
    }
}

fn check_timeout(name: &str, secs: u64) -> Result<()> {
    if secs == 0 {
        return Err(NylasError::ConfigError(format!(
            "{} must be at least 1",
            name
        )));
    }
    if secs > MAX_TIMEOUT_SECS {
        return Err(NylasError::ConfigError(format!(
            "{} cannot exceed {}",
            name, MAX_TIMEOUT_SECS
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.api.base_url, "https://api.nylas.com");
        assert!(config.api.client_id.is_none());
        assert!(config.api.access_token.is_none());
        assert_eq!(config.http.connect_timeout_secs, 5);
        assert_eq!(config.http.response_header_timeout_secs, 10);
        assert_eq!(config.webhook.listen_addr, "127.0.0.1:8080");
    }

    #[test]
    fn test_config_validation_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_bad_base_url() {
        let mut config = Config::default();
        config.api.base_url = "api.nylas.com".to_string();
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("api.base_url"));
    }

    #[test]
    fn test_config_validation_timeout_zero() {
        let mut config = Config::default();
        config.http.connect_timeout_secs = 0;
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("at least 1"));
    }

    #[test]
    fn test_config_validation_timeout_too_high() {
        let mut config = Config::default();
        config.http.response_header_timeout_secs = 301;
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("cannot exceed 300"));
    }

    #[test]
    fn test_config_validation_timeout_boundaries() {
        let mut config = Config::default();
        config.http.connect_timeout_secs = 1;
        config.http.response_header_timeout_secs = 300;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_bad_listen_addr() {
        let mut config = Config::default();
        config.webhook.listen_addr = "localhost".to_string();
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("webhook.listen_addr"));
    }

    #[tokio::test]
    async fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("absent.toml")).await.unwrap();
        assert_eq!(config.api.base_url, DEFAULT_BASE_URL);
    }

    #[tokio::test]
    async fn test_load_partial_file() {
        let temp_file = NamedTempFile::new().unwrap();
        tokio::fs::write(
            temp_file.path(),
            "[api]\naccess_token = \"token\"\n\n[http]\nconnect_timeout_secs = 2\n",
        )
        .await
        .unwrap();

        let config = Config::load(temp_file.path()).await.unwrap();
        assert_eq!(config.api.access_token.as_deref(), Some("token"));
        assert_eq!(config.api.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.http.connect_timeout_secs, 2);
        assert_eq!(config.http.response_header_timeout_secs, 10);
    }

    #[tokio::test]
    async fn test_load_invalid_file() {
        let temp_file = NamedTempFile::new().unwrap();
        tokio::fs::write(temp_file.path(), "[http]\nconnect_timeout_secs = 0\n")
            .await
            .unwrap();

        let result = Config::load(temp_file.path()).await;
        assert!(matches!(result, Err(NylasError::ConfigError(_))));
    }

    #[tokio::test]
    async fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.api.client_id = Some("client".to_string());
        config.save(&path).await.unwrap();

        let loaded = Config::load(&path).await.unwrap();
        assert_eq!(loaded.api.client_id.as_deref(), Some("client"));
    }

    #[test]
    #[serial]
    fn test_apply_env() {
        env::set_var("NYLAS_CLIENT_ID", "env-id");
        env::set_var("NYLAS_ACCESS_TOKEN", "env-token");
        env::remove_var("NYLAS_CLIENT_SECRET");
        env::remove_var("NYLAS_BASE_URL");

        let mut config = Config::default();
        config.api.client_secret = Some("file-secret".to_string());
        config.apply_env();

        assert_eq!(config.api.client_id.as_deref(), Some("env-id"));
        assert_eq!(config.api.access_token.as_deref(), Some("env-token"));
        assert_eq!(config.api.client_secret.as_deref(), Some("file-secret"));
        assert_eq!(config.api.base_url, DEFAULT_BASE_URL);

        env::remove_var("NYLAS_CLIENT_ID");
        env::remove_var("NYLAS_ACCESS_TOKEN");
    }
}
