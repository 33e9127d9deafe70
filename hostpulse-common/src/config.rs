use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{Error, Result};

/// Ingestion backend connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the ingestion API (e.g. "https://ingest.example.com").
    #[serde(default)]
    pub url: String,

    /// Agent token sent in the `X-Agent-Token` header.
    #[serde(default)]
    pub token: String,

    /// Per-request timeout in seconds (default: 10).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            token: String::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl BackendConfig {
    /// Base URL with surrounding whitespace and trailing slashes removed.
    pub fn base_url(&self) -> &str {
        self.url.trim().trim_end_matches('/')
    }

    /// Request timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Check that the backend can actually be addressed.
    pub fn validate(&self) -> Result<()> {
        if self.base_url().is_empty() {
            return Err(Error::Config("backend url is required".to_string()));
        }
        if self.token.trim().is_empty() {
            return Err(Error::Config("backend token is required".to_string()));
        }
        if self.timeout_secs == 0 {
            return Err(Error::Config("backend timeout_secs must be > 0".to_string()));
        }
        Ok(())
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text format (default).
    #[default]
    Text,
    /// Structured JSON format.
    Json,
}

/// Common logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log output format: "text" or "json".
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Sample {
        #[serde(default)]
        backend: BackendConfig,
        #[serde(default)]
        logging: LoggingConfig,
    }

    #[test]
    fn test_parse_backend_config() {
        let content = r#"
        {
            backend: {
                url: "https://ingest.example.com/",
                token: "tok",
                timeout_secs: 3,
            },
            logging: {
                level: "debug",
            },
        }
        "#;

        let config: Sample = json5::from_str(content).unwrap();

        assert_eq!(config.backend.base_url(), "https://ingest.example.com");
        assert_eq!(config.backend.timeout(), Duration::from_secs(3));
        assert_eq!(config.logging.level, "debug");
        config.backend.validate().unwrap();
    }

    #[test]
    fn test_default_config() {
        let config: Sample = json5::from_str("{}").unwrap();

        assert!(config.backend.url.is_empty());
        assert_eq!(config.backend.timeout_secs, 10);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormat::Text);
    }

    #[test]
    fn test_backend_requires_url_and_token() {
        let mut backend = BackendConfig::default();
        assert!(backend.validate().is_err());

        backend.url = "http://localhost".to_string();
        assert!(backend.validate().is_err());

        backend.token = "   ".to_string();
        assert!(backend.validate().is_err());

        backend.token = "tok".to_string();
        assert!(backend.validate().is_ok());
    }

    #[test]
    fn test_base_url_trims_trailing_slashes() {
        let backend = BackendConfig {
            url: " http://localhost:8080// ".to_string(),
            ..Default::default()
        };
        assert_eq!(backend.base_url(), "http://localhost:8080");
    }

    #[test]
    fn test_json_logging_format() {
        let content = r#"{ logging: { level: "debug", format: "json" } }"#;
        let config: Sample = json5::from_str(content).unwrap();
        assert_eq!(config.logging.format, LogFormat::Json);
    }
}
