//! CLI argument parsing for the agent.

use std::path::PathBuf;

use clap::Parser;

/// Command-line arguments for the agent.
///
/// Flags take precedence over environment variables, which take precedence
/// over the configuration file.
#[derive(Parser, Debug, Clone, Default)]
#[command(about = "HostPulse telemetry agent", version)]
pub struct AgentArgs {
    /// Path to configuration file (JSON5). Optional when url and token are given.
    #[arg(short, long, env = "HOSTPULSE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Base URL of the ingestion backend.
    #[arg(long, env = "HOSTPULSE_URL")]
    pub url: Option<String>,

    /// Agent token sent with every request.
    #[arg(long, env = "HOSTPULSE_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Metrics interval in seconds.
    #[arg(long, env = "HOSTPULSE_INTERVAL_SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub interval: Option<u64>,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long)]
    pub log_level: Option<String>,
}

impl AgentArgs {
    /// Parse CLI arguments from the process environment.
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }
}
