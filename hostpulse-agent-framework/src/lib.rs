//! HostPulse Agent Framework
//!
//! Scheduling, delivery and lifecycle building blocks for the HostPulse agent.
//!
//! # Overview
//!
//! This framework provides:
//! - [`AgentConfig`] trait for configuration loading and validation
//! - [`AgentRunner`] for managing agent lifecycle (startup, shutdown, signal handling)
//! - [`Dispatcher`] / [`HttpDispatcher`] for delivering JSON payloads to the backend
//! - [`Schedule`] and [`Collector`] for independent polling loops with backoff
//! - [`AgentArgs`] for command-line argument parsing
//!
//! # Example
//!
//! ```ignore
//! use hostpulse_agent_framework::{AgentArgs, AgentRunner};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = AgentArgs::parse();
//!     let config = MyAgentConfig::resolve(&args)?;
//!
//!     let mut runner = AgentRunner::new_with_args("my-agent", config, Some(&args))?;
//!     runner.spawn_schedule(Duration::from_secs(10), my_collector(runner.dispatcher()));
//!
//!     // Run until Ctrl+C
//!     runner.run().await
//! }
//! ```

mod args;
mod config;
mod dispatch;
mod error;
mod runner;
pub mod scheduler;

pub use args::AgentArgs;
pub use config::AgentConfig;
pub use dispatch::{DispatchError, Dispatcher, HttpDispatcher, dispatch_json};
pub use error::{AgentError, Result};
pub use runner::{AgentRunner, shutdown_signal};
pub use scheduler::{Collector, MAX_BACKOFF, RoundOutcome, Schedule, next_delay};

// Re-export commonly used types from hostpulse-common
pub use hostpulse_common::{BackendConfig, Channel, LogFormat, LoggingConfig};
