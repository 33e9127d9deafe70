//! Log shipping from journald, falling back to the syslog file.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, warn};

use hostpulse_agent_framework::{Collector, Dispatcher, RoundOutcome, dispatch_json};
use hostpulse_common::{Channel, LogEntry, LogIngestPayload, rfc3339_nanos, rfc3339_secs};

use crate::AGENT_NAME;
use crate::config::LogsConfig;
use crate::provider::{ProviderError, ProviderResult};

/// Syslog files tried, in order, when journald yields nothing.
const SYSLOG_FILES: [&str; 2] = ["/var/log/syslog", "/var/log/messages"];

/// Lines read from the syslog file.
const SYSLOG_TAIL_LINES: usize = 50;

/// One line of `journalctl --output json`.
#[derive(Debug, Default, Deserialize)]
struct JournalRecord {
    #[serde(rename = "MESSAGE", default)]
    message: String,
    #[serde(rename = "PRIORITY", default)]
    priority: String,
    #[serde(rename = "SYSLOG_IDENTIFIER", default)]
    syslog_identifier: String,
    #[serde(rename = "_COMM", default)]
    comm: String,
    #[serde(rename = "_HOSTNAME", default)]
    hostname: String,
    #[serde(rename = "__REALTIME_TIMESTAMP", default)]
    realtime_timestamp: String,
}

/// Map a journald priority (0-7) to a level name.
pub fn journal_level(priority: &str) -> &'static str {
    match priority {
        "0" | "1" | "2" | "3" => "error",
        "4" => "warning",
        "5" | "6" => "info",
        "7" => "debug",
        _ => "info",
    }
}

/// Convert `__REALTIME_TIMESTAMP` (microseconds since the epoch) to RFC3339,
/// using `now` when it does not parse.
pub fn journal_timestamp(micros: &str, now: DateTime<Utc>) -> String {
    let at = micros
        .trim()
        .parse::<i64>()
        .ok()
        .and_then(DateTime::from_timestamp_micros)
        .unwrap_or(now);
    rfc3339_nanos(at)
}

/// Parse `journalctl --output json` output.
///
/// Lines that are not JSON objects, entries without a message and the
/// agent's own entries are skipped. Only the last `max_entries` are kept.
pub fn parse_journal(output: &str, hostname: &str, max_entries: usize, now: DateTime<Utc>) -> Vec<LogEntry> {
    let mut entries: Vec<LogEntry> = output
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| serde_json::from_str::<JournalRecord>(line).ok())
        .filter(|record| !record.message.is_empty())
        .filter_map(|record| {
            let service = if record.syslog_identifier.is_empty() {
                record.comm
            } else {
                record.syslog_identifier
            };
            if service == AGENT_NAME {
                return None;
            }

            let host = if record.hostname.is_empty() {
                hostname.to_string()
            } else {
                record.hostname
            };

            Some(LogEntry {
                timestamp: journal_timestamp(&record.realtime_timestamp, now),
                level: journal_level(&record.priority).to_string(),
                service,
                host,
                message: record.message,
            })
        })
        .collect();

    if entries.len() > max_entries {
        entries.drain(..entries.len() - max_entries);
    }
    entries
}

/// Split `Mon DD HH:MM:SS host service[pid]: message` into service and
/// message.
///
/// The service defaults to `syslog`; a line without `": "` is all message.
pub fn parse_syslog_line(line: &str) -> (String, String) {
    let Some((prefix, message)) = line.split_once(": ") else {
        return ("syslog".to_string(), line.to_string());
    };

    let service = prefix
        .split_whitespace()
        .nth(4)
        .map(|field| match field.find('[') {
            Some(idx) if idx > 0 => &field[..idx],
            _ => field,
        })
        .filter(|s| !s.is_empty())
        .unwrap_or("syslog");

    (service.to_string(), message.to_string())
}

/// Parse the tail of a syslog file. All lines are stamped with `now`.
pub fn parse_syslog(output: &str, hostname: &str, now: DateTime<Utc>) -> Vec<LogEntry> {
    let timestamp = rfc3339_secs(now);

    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.contains(AGENT_NAME))
        .map(|line| {
            let (service, message) = parse_syslog_line(line);
            LogEntry {
                timestamp: timestamp.clone(),
                level: "info".to_string(),
                service,
                host: hostname.to_string(),
                message,
            }
        })
        .collect()
}

/// Run an external command under `timeout` and return its stdout.
async fn run_command(what: &'static str, program: &str, args: &[&str], timeout: Duration) -> ProviderResult<String> {
    let output = Command::new(program)
        .args(args)
        .kill_on_drop(true)
        .output();

    let output = tokio::time::timeout(timeout, output)
        .await
        .map_err(|_| ProviderError::Timeout { what, after: timeout })?
        .map_err(|e| ProviderError::failed(what, e))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ProviderError::failed(
            what,
            format!("{}: {}", output.status, stderr.trim()),
        ));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Collector for the logs channel.
pub struct LogsCollector {
    dispatcher: Arc<dyn Dispatcher>,
    hostname: String,
    config: LogsConfig,
    timeout: Duration,
}

impl LogsCollector {
    pub fn new(
        dispatcher: Arc<dyn Dispatcher>,
        hostname: impl Into<String>,
        config: LogsConfig,
        timeout: Duration,
    ) -> Self {
        Self {
            dispatcher,
            hostname: hostname.into(),
            config,
            timeout,
        }
    }

    async fn journal(&self) -> ProviderResult<Vec<LogEntry>> {
        let max = self.config.max_entries.to_string();
        let output = run_command(
            "journalctl",
            "journalctl",
            &[
                "--since",
                self.config.since.as_str(),
                "--output",
                "json",
                "--no-pager",
                "-n",
                max.as_str(),
            ],
            self.timeout,
        )
        .await?;

        Ok(parse_journal(&output, &self.hostname, self.config.max_entries, Utc::now()))
    }

    async fn syslog_tail(&self) -> ProviderResult<Vec<LogEntry>> {
        let target: &str = SYSLOG_FILES
            .iter()
            .copied()
            .find(|f| Path::new(f).exists())
            .ok_or_else(|| ProviderError::failed("syslog", "no syslog file found"))?;

        let lines = SYSLOG_TAIL_LINES.to_string();
        let output = run_command("syslog", "tail", &["-n", lines.as_str(), target], self.timeout).await?;

        Ok(parse_syslog(&output, &self.hostname, Utc::now()))
    }

    /// Recent log entries from journald, or from the syslog file when
    /// journald fails or has nothing.
    pub async fn collect(&self) -> ProviderResult<Vec<LogEntry>> {
        match self.journal().await {
            Ok(entries) if !entries.is_empty() => return Ok(entries),
            Ok(_) => debug!("journalctl returned no entries, trying syslog"),
            Err(e) => debug!(error = %e, "journalctl unavailable, trying syslog"),
        }

        self.syslog_tail().await
    }

    /// Deliver a batch. Empty batches are not sent.
    pub async fn ship(&self, entries: Vec<LogEntry>) -> RoundOutcome {
        if entries.is_empty() {
            debug!("No new log entries");
            return RoundOutcome::Idle;
        }

        let count = entries.len();
        let payload = LogIngestPayload { entries };

        match dispatch_json(self.dispatcher.as_ref(), Channel::Logs, &payload).await {
            Ok(()) => {
                debug!(entries = count, "Logs sent");
                RoundOutcome::Delivered
            }
            Err(e) => {
                warn!(channel = %Channel::Logs, error = %e, "Log ingest failed");
                RoundOutcome::Failed
            }
        }
    }
}

#[async_trait]
impl Collector for LogsCollector {
    fn name(&self) -> &str {
        "logs"
    }

    async fn round(&self) -> RoundOutcome {
        match self.collect().await {
            Ok(entries) => self.ship(entries).await,
            Err(e) => {
                warn!(error = %e, "Log collection failed");
                RoundOutcome::Idle
            }
        }
    }
}
