//! HostPulse Common Library
//!
//! Shared types and utilities for the HostPulse telemetry agent:
//!
//! - [`telemetry`] - Ingestion payloads (`MetricPayload`, `WatchdogPayload`, ...) and [`Channel`]
//! - [`config`] - Shared configuration sections (backend, logging)
//! - [`error`] - Error types

pub mod config;
pub mod error;
pub mod telemetry;

// Re-export commonly used types at the crate root
pub use config::{BackendConfig, LogFormat, LoggingConfig};
pub use error::{Error, Result};
pub use telemetry::{
    Channel, DiscoveredService, LogEntry, LogIngestPayload, MetricPayload, NetIfaceMetric,
    NetIfacePayload, ProcessInfo, ProcessesPayload, ServiceDiscoveryPayload, WatchdogEntry,
    WatchdogPayload, WatchdogStatus, rfc3339_nanos, rfc3339_secs,
};

/// Initialize tracing with the given configuration.
///
/// Supports two output formats:
/// - `LogFormat::Text` (default): Human-readable text format
/// - `LogFormat::Json`: Structured JSON format for log aggregation systems
///
/// `RUST_LOG` takes precedence over the configured level.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    match config.format {
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(fmt::layer())
                .with(filter)
                .try_init()
                .map_err(|e| Error::Config(format!("Failed to initialize tracing: {}", e)))?;
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(fmt::layer().json())
                .with(filter)
                .try_init()
                .map_err(|e| Error::Config(format!("Failed to initialize tracing: {}", e)))?;
        }
    }

    Ok(())
}
