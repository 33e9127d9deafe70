//! Configuration for the host agent.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use hostpulse_agent_framework::{AgentArgs, AgentConfig, AgentError, BackendConfig, LoggingConfig};

/// Complete agent configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HostAgentConfig {
    /// Ingestion backend settings.
    #[serde(default)]
    pub backend: BackendConfig,

    /// Sampling settings.
    #[serde(default)]
    pub agent: SamplerConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// What to sample and how often.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplerConfig {
    /// Hostname reported with shipped logs.
    /// Use "auto" to detect automatically (default).
    #[serde(default = "default_hostname")]
    pub hostname: String,

    /// Metrics interval in seconds (default: 10).
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    /// Upper bound for a single OS query or external command (default: 5).
    #[serde(default = "default_provider_timeout")]
    pub provider_timeout_secs: u64,

    /// Which optional collectors to run.
    #[serde(default)]
    pub collect: CollectConfig,

    /// Intervals of the optional collectors.
    #[serde(default)]
    pub schedules: ScheduleConfig,

    #[serde(default)]
    pub processes: ProcessesConfig,

    #[serde(default)]
    pub watchdog: WatchdogConfig,

    #[serde(default)]
    pub logs: LogsConfig,

    /// Network interface filters.
    #[serde(default)]
    pub network: NetworkConfig,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            hostname: default_hostname(),
            interval_secs: default_interval(),
            provider_timeout_secs: default_provider_timeout(),
            collect: CollectConfig::default(),
            schedules: ScheduleConfig::default(),
            processes: ProcessesConfig::default(),
            watchdog: WatchdogConfig::default(),
            logs: LogsConfig::default(),
            network: NetworkConfig::default(),
        }
    }
}

fn default_hostname() -> String {
    "auto".to_string()
}

fn default_interval() -> u64 {
    10
}

fn default_provider_timeout() -> u64 {
    5
}

impl SamplerConfig {
    /// Metrics interval.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Timeout applied to every provider query.
    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs)
    }
}

/// Toggles for the collectors that run next to metrics.
///
/// Metrics are always collected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectConfig {
    /// Top processes by CPU.
    #[serde(default = "default_true")]
    pub processes: bool,

    /// Process liveness (crash / restart detection).
    #[serde(default = "default_true")]
    pub watchdog: bool,

    /// Recent system logs from journald or syslog.
    #[serde(default = "default_true")]
    pub logs: bool,

    /// Listening services.
    #[serde(default = "default_true")]
    pub services: bool,
}

impl Default for CollectConfig {
    fn default() -> Self {
        Self {
            processes: true,
            watchdog: true,
            logs: true,
            services: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Intervals, in seconds, of the optional collectors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_processes_secs")]
    pub processes_secs: u64,

    #[serde(default = "default_watchdog_secs")]
    pub watchdog_secs: u64,

    #[serde(default = "default_logs_secs")]
    pub logs_secs: u64,

    #[serde(default = "default_services_secs")]
    pub services_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            processes_secs: default_processes_secs(),
            watchdog_secs: default_watchdog_secs(),
            logs_secs: default_logs_secs(),
            services_secs: default_services_secs(),
        }
    }
}

fn default_processes_secs() -> u64 {
    30
}

fn default_watchdog_secs() -> u64 {
    30
}

fn default_logs_secs() -> u64 {
    60
}

fn default_services_secs() -> u64 {
    300
}

impl ScheduleConfig {
    pub fn processes(&self) -> Duration {
        Duration::from_secs(self.processes_secs)
    }

    pub fn watchdog(&self) -> Duration {
        Duration::from_secs(self.watchdog_secs)
    }

    pub fn logs(&self) -> Duration {
        Duration::from_secs(self.logs_secs)
    }

    pub fn services(&self) -> Duration {
        Duration::from_secs(self.services_secs)
    }
}

/// Process inventory settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessesConfig {
    /// Number of processes reported, highest CPU first (default: 50).
    #[serde(default = "default_top")]
    pub top: usize,
}

impl Default for ProcessesConfig {
    fn default() -> Self {
        Self { top: default_top() }
    }
}

fn default_top() -> usize {
    50
}

/// Watchdog settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchdogConfig {
    /// Maximum entries per payload (default: 100).
    #[serde(default = "default_watchdog_max")]
    pub max_entries: usize,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            max_entries: default_watchdog_max(),
        }
    }
}

fn default_watchdog_max() -> usize {
    100
}

/// Log shipping settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogsConfig {
    /// Maximum entries per batch (default: 200).
    #[serde(default = "default_logs_max")]
    pub max_entries: usize,

    /// journalctl `--since` window (default: "5 minutes ago").
    #[serde(default = "default_since")]
    pub since: String,
}

impl Default for LogsConfig {
    fn default() -> Self {
        Self {
            max_entries: default_logs_max(),
            since: default_since(),
        }
    }
}

fn default_logs_max() -> usize {
    200
}

fn default_since() -> String {
    "5 minutes ago".to_string()
}

/// Network interface filtering configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Exclude these interfaces.
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Exclude loopback interfaces (default: true).
    #[serde(default = "default_true")]
    pub exclude_loopback: bool,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            exclude: Vec::new(),
            exclude_loopback: true,
        }
    }
}

impl NetworkConfig {
    /// Check if an interface counts towards the network figures.
    pub fn should_include(&self, name: &str) -> bool {
        if self.exclude.iter().any(|e| e == name) {
            return false;
        }

        !(self.exclude_loopback && is_loopback(name))
    }
}

/// Loopback interfaces are the ones whose name starts with "lo", in any case.
pub fn is_loopback(name: &str) -> bool {
    name.to_lowercase().starts_with("lo")
}

impl HostAgentConfig {
    /// Build the effective configuration from the optional file and the
    /// command-line / environment overrides, then validate it.
    pub fn resolve(args: &AgentArgs) -> Result<Self, AgentError> {
        let mut config = match &args.config {
            Some(path) => Self::read(path)?,
            None => Self::default(),
        };

        if let Some(url) = &args.url {
            config.backend.url = url.clone();
        }
        if let Some(token) = &args.token {
            config.backend.token = token.clone();
        }
        if let Some(interval) = args.interval {
            config.agent.interval_secs = interval;
        }

        config.validate()?;
        Ok(config)
    }

    /// Get the hostname to use, resolving "auto" if needed.
    pub fn get_hostname(&self) -> String {
        if self.agent.hostname == "auto" {
            local_hostname()
        } else {
            self.agent.hostname.clone()
        }
    }
}

/// Hostname of the machine, or "unknown".
pub fn local_hostname() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string())
}

impl AgentConfig for HostAgentConfig {
    fn backend(&self) -> &BackendConfig {
        &self.backend
    }

    fn logging(&self) -> &LoggingConfig {
        &self.logging
    }

    fn validate(&self) -> Result<(), AgentError> {
        self.backend.validate()?;

        let agent = &self.agent;
        let intervals = [
            ("agent.interval_secs", agent.interval_secs),
            ("agent.provider_timeout_secs", agent.provider_timeout_secs),
            ("agent.schedules.processes_secs", agent.schedules.processes_secs),
            ("agent.schedules.watchdog_secs", agent.schedules.watchdog_secs),
            ("agent.schedules.logs_secs", agent.schedules.logs_secs),
            ("agent.schedules.services_secs", agent.schedules.services_secs),
        ];
        for (field, value) in intervals {
            if value == 0 {
                return Err(AgentError::validation(format!("{} must be > 0", field)));
            }
        }

        if agent.processes.top == 0 {
            return Err(AgentError::validation("agent.processes.top must be > 0"));
        }
        if agent.watchdog.max_entries == 0 {
            return Err(AgentError::validation(
                "agent.watchdog.max_entries must be > 0",
            ));
        }
        if agent.logs.max_entries == 0 {
            return Err(AgentError::validation("agent.logs.max_entries must be > 0"));
        }
        if agent.logs.since.trim().is_empty() {
            return Err(AgentError::validation("agent.logs.since must not be empty"));
        }

        Ok(())
    }
}
