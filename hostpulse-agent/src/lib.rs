//! HostPulse host agent.
//!
//! Samples the local machine and delivers JSON snapshots to the ingestion
//! backend, one independent schedule per channel:
//!
//! ```text
//! metrics    cpu / mem / disk percent + aggregate network deltas
//! network    per-interface counter deltas (sent after each metrics round)
//! processes  top processes by CPU
//! watchdog   crashed / restarted / running process names
//! logs       recent journald or syslog entries
//! services   listening TCP / UDP ports with a service label
//! ```

pub mod config;
pub mod delta;
pub mod discovery;
pub mod logs;
pub mod metrics;
pub mod processes;
pub mod provider;
pub mod system;
pub mod watchdog;

#[cfg(target_os = "linux")]
mod linux;

/// Agent name used in the User-Agent header and to skip the agent's own logs.
pub const AGENT_NAME: &str = "hostpulse-agent";
