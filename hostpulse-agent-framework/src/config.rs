//! Configuration traits and utilities.

use std::path::Path;

use serde::de::DeserializeOwned;

use crate::error::{AgentError, Result};
use crate::{BackendConfig, LoggingConfig};

/// Trait for agent configuration types.
///
/// Implement this trait for the agent's configuration struct to get
/// loading, validation, and access to the shared config sections.
///
/// # Example
///
/// ```ignore
/// use serde::Deserialize;
/// use hostpulse_agent_framework::{AgentConfig, BackendConfig, LoggingConfig};
///
/// #[derive(Debug, Deserialize)]
/// pub struct MyAgentConfig {
///     pub backend: BackendConfig,
///     pub logging: LoggingConfig,
/// }
///
/// impl AgentConfig for MyAgentConfig {
///     fn backend(&self) -> &BackendConfig {
///         &self.backend
///     }
///
///     fn logging(&self) -> &LoggingConfig {
///         &self.logging
///     }
/// }
/// ```
pub trait AgentConfig: Sized + DeserializeOwned {
    /// Get the ingestion backend configuration.
    fn backend(&self) -> &BackendConfig;

    /// Get the logging configuration.
    fn logging(&self) -> &LoggingConfig;

    /// Validate the configuration.
    ///
    /// The default checks the backend section. Override to add custom
    /// validation, calling `self.backend().validate()` as well.
    fn validate(&self) -> Result<()> {
        self.backend().validate()?;
        Ok(())
    }

    /// Read a configuration file without validating it.
    ///
    /// Useful when command-line or environment overrides still have to be
    /// applied before the configuration is complete.
    fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(AgentError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path)?;
        let config: Self = json5::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from a file path.
    ///
    /// Supports JSON5 format. Calls [`validate`](Self::validate) after loading.
    fn load(path: impl AsRef<Path>) -> Result<Self> {
        let config = Self::read(path)?;
        config.validate()?;
        Ok(config)
    }
}
