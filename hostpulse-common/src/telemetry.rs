use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Logical ingestion channel a payload is delivered to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Metrics,
    Network,
    Processes,
    Watchdog,
    Logs,
    Services,
}

impl Channel {
    /// Get the string representation used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Metrics => "metrics",
            Channel::Network => "network",
            Channel::Processes => "processes",
            Channel::Watchdog => "watchdog",
            Channel::Logs => "logs",
            Channel::Services => "services",
        }
    }

    /// Ingestion path on the backend, relative to its base URL.
    pub fn path(&self) -> &'static str {
        match self {
            Channel::Metrics => "/api/ingest/server-metrics",
            Channel::Network => "/api/ingest/server-network",
            Channel::Processes => "/api/ingest/server-processes",
            Channel::Watchdog => "/api/ingest/server-watchdog",
            Channel::Logs => "/api/ingest/server-logs",
            Channel::Services => "/api/ingest/server-services",
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Host-level gauges plus aggregate network deltas for one round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricPayload {
    /// RFC3339 UTC with nanoseconds.
    pub timestamp: String,
    pub cpu: f64,
    pub mem: f64,
    pub disk: f64,
    /// Bytes received since the last delivered round, 0 without a baseline.
    pub net_in: u64,
    /// Bytes sent since the last delivered round, 0 without a baseline.
    pub net_out: u64,
}

/// Per-interface counter deltas for one round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetIfaceMetric {
    pub iface: String,
    pub bytes_in: u64,
    pub bytes_out: u64,
    pub packets_in: u64,
    pub packets_out: u64,
    pub errors_in: u64,
    pub errors_out: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetIfacePayload {
    pub timestamp: String,
    pub interfaces: Vec<NetIfaceMetric>,
}

/// A single entry of the process inventory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessInfo {
    pub pid: u32,
    pub name: String,
    /// CPU usage in percent.
    pub cpu: f64,
    /// Resident memory as a percentage of total memory.
    pub mem: f64,
    /// Resident set size in bytes.
    pub rss: u64,
    pub user: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessesPayload {
    pub timestamp: String,
    pub processes: Vec<ProcessInfo>,
}

/// Liveness classification of a tracked process name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WatchdogStatus {
    Running,
    Restarted,
    Crashed,
}

impl WatchdogStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WatchdogStatus::Running => "running",
            WatchdogStatus::Restarted => "restarted",
            WatchdogStatus::Crashed => "crashed",
        }
    }
}

impl std::fmt::Display for WatchdogStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Watchdog verdict for one process name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchdogEntry {
    pub name: String,
    pub status: WatchdogStatus,
    /// 1 when the PID set changed since the previous round, else 0.
    pub restart_count: u32,
    pub last_seen_at: String,
    pub pids: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchdogPayload {
    pub timestamp: String,
    pub entries: Vec<WatchdogEntry>,
}

/// A single shipped log line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: String,
    pub level: String,
    pub service: String,
    pub host: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogIngestPayload {
    pub entries: Vec<LogEntry>,
}

/// A listening service found on the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredService {
    pub port: u16,
    pub protocol: String,
    pub process: String,
    pub service: String,
    pub bind_addr: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDiscoveryPayload {
    pub timestamp: String,
    pub services: Vec<DiscoveredService>,
}

/// Format a UTC instant as RFC3339 with up to nanosecond precision.
///
/// Trailing zeros of the fraction are dropped, and so is the fraction
/// itself on a whole second.
pub fn rfc3339_nanos(at: DateTime<Utc>) -> String {
    let seconds = at.format("%Y-%m-%dT%H:%M:%S");
    let nanos = at.timestamp_subsec_nanos();
    if nanos == 0 {
        return format!("{}Z", seconds);
    }
    let fraction = format!("{:09}", nanos);
    format!("{}.{}Z", seconds, fraction.trim_end_matches('0'))
}

/// Format a UTC instant as RFC3339 with whole seconds.
pub fn rfc3339_secs(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_channel_paths() {
        assert_eq!(Channel::Metrics.path(), "/api/ingest/server-metrics");
        assert_eq!(Channel::Network.path(), "/api/ingest/server-network");
        assert_eq!(Channel::Services.path(), "/api/ingest/server-services");
        assert_eq!(Channel::Watchdog.to_string(), "watchdog");
    }

    #[test]
    fn test_timestamp_formats() {
        let at = Utc.with_ymd_and_hms(2026, 2, 18, 12, 0, 0).unwrap();
        assert_eq!(rfc3339_secs(at), "2026-02-18T12:00:00Z");
        assert_eq!(rfc3339_nanos(at), "2026-02-18T12:00:00Z");

        let at = at + chrono::Duration::nanoseconds(123_450_000);
        assert_eq!(rfc3339_nanos(at), "2026-02-18T12:00:00.12345Z");
        let at = at + chrono::Duration::nanoseconds(7);
        assert_eq!(rfc3339_nanos(at), "2026-02-18T12:00:00.123450007Z");
    }

    #[test]
    fn test_watchdog_entry_json_shape() {
        let entry = WatchdogEntry {
            name: "redis".to_string(),
            status: WatchdogStatus::Crashed,
            restart_count: 0,
            last_seen_at: "2026-02-18T12:00:00Z".to_string(),
            pids: Vec::new(),
        };

        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["status"], "crashed");
        assert_eq!(value["restart_count"], 0);
        // Crashed entries carry an empty list, never null.
        assert!(value["pids"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_metric_payload_field_names() {
        let payload = MetricPayload {
            timestamp: "2026-02-18T12:00:00.000000000Z".to_string(),
            cpu: 12.5,
            mem: 40.0,
            disk: 71.25,
            net_in: 1024,
            net_out: 2048,
        };

        let json = serde_json::to_string(&payload).unwrap();
        assert!(json.contains("\"net_in\":1024"));
        assert!(json.contains("\"net_out\":2048"));
        assert!(json.contains("\"cpu\":12.5"));
    }
}
