//! Process inventory: the busiest processes by CPU.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, warn};

use hostpulse_agent_framework::{Collector, Dispatcher, RoundOutcome, dispatch_json};
use hostpulse_common::{Channel, ProcessInfo, ProcessesPayload, rfc3339_secs};

use crate::provider::{ProcessRecord, ProviderHandle};

/// Named processes ordered by CPU descending, at most `top` of them.
///
/// Processes with equal CPU keep their listing order.
pub fn top_by_cpu(records: Vec<ProcessRecord>, top: usize) -> Vec<ProcessInfo> {
    let mut named: Vec<ProcessRecord> = records.into_iter().filter(|r| !r.name.is_empty()).collect();
    named.sort_by(|a, b| b.cpu.total_cmp(&a.cpu));
    named.truncate(top);

    named
        .into_iter()
        .map(|r| ProcessInfo {
            pid: r.pid,
            name: r.name,
            cpu: r.cpu,
            mem: r.mem,
            rss: r.rss,
            user: r.user,
            status: r.status.unwrap_or_else(|| "unknown".to_string()),
        })
        .collect()
}

/// Collector for the processes channel.
pub struct ProcessesCollector {
    provider: ProviderHandle,
    dispatcher: Arc<dyn Dispatcher>,
    top: usize,
}

impl ProcessesCollector {
    pub fn new(provider: ProviderHandle, dispatcher: Arc<dyn Dispatcher>, top: usize) -> Self {
        Self {
            provider,
            dispatcher,
            top,
        }
    }
}

#[async_trait]
impl Collector for ProcessesCollector {
    fn name(&self) -> &str {
        "processes"
    }

    async fn round(&self) -> RoundOutcome {
        let records = match self.provider.processes().await {
            Ok(records) => records,
            Err(e) => {
                warn!(error = %e, "Process listing failed");
                return RoundOutcome::Idle;
            }
        };

        let processes = top_by_cpu(records, self.top);
        let count = processes.len();
        let payload = ProcessesPayload {
            timestamp: rfc3339_secs(Utc::now()),
            processes,
        };

        match dispatch_json(self.dispatcher.as_ref(), Channel::Processes, &payload).await {
            Ok(()) => {
                debug!(processes = count, "Processes sent");
                RoundOutcome::Delivered
            }
            Err(e) => {
                warn!(channel = %Channel::Processes, error = %e, "Processes ingest failed");
                RoundOutcome::Failed
            }
        }
    }
}
