//! Host metrics collection: CPU, memory, disk and network deltas.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use hostpulse_agent_framework::{Collector, Dispatcher, RoundOutcome, dispatch_json};
use hostpulse_common::{Channel, MetricPayload, NetIfaceMetric, NetIfacePayload, rfc3339_nanos};

use crate::config::NetworkConfig;
use crate::delta::{IfaceSnapshot, NetTotals, interface_deltas};
use crate::provider::{InterfaceSample, ProviderHandle, ProviderResult};

/// Network counters retained between rounds.
#[derive(Debug, Default)]
struct NetState {
    /// Aggregate totals of the last delivered round.
    totals: Option<NetTotals>,
    /// Per-interface counters of the last successful listing.
    interfaces: Option<IfaceSnapshot>,
}

/// Collector for the metrics and network channels.
pub struct MetricsCollector {
    provider: ProviderHandle,
    dispatcher: Arc<dyn Dispatcher>,
    network: NetworkConfig,
    state: Mutex<NetState>,
}

impl MetricsCollector {
    pub fn new(
        provider: ProviderHandle,
        dispatcher: Arc<dyn Dispatcher>,
        network: NetworkConfig,
    ) -> Self {
        Self {
            provider,
            dispatcher,
            network,
            state: Mutex::new(NetState::default()),
        }
    }

    async fn send_interfaces(&self, timestamp: String, interfaces: Vec<NetIfaceMetric>) {
        let count = interfaces.len();
        let payload = NetIfacePayload {
            timestamp,
            interfaces,
        };

        match dispatch_json(self.dispatcher.as_ref(), Channel::Network, &payload).await {
            Ok(()) => debug!(interfaces = count, "Network metrics sent"),
            Err(e) => warn!(channel = %Channel::Network, error = %e, "Network ingest failed"),
        }
    }
}

/// Unwrap a gauge, degrading to zero when the provider failed.
fn gauge(field: &'static str, value: ProviderResult<f64>) -> f64 {
    match value {
        Ok(v) => v,
        Err(e) => {
            warn!(field, error = %e, "Metric unavailable, reporting 0");
            0.0
        }
    }
}

/// Sum of the included interfaces.
pub fn aggregate_totals(samples: &[InterfaceSample], filter: &NetworkConfig) -> NetTotals {
    samples
        .iter()
        .filter(|s| filter.should_include(&s.name))
        .map(|s| &s.counters)
        .collect()
}

/// Per-interface counters of the included interfaces.
pub fn interface_snapshot(samples: &[InterfaceSample], filter: &NetworkConfig) -> IfaceSnapshot {
    samples
        .iter()
        .filter(|s| filter.should_include(&s.name))
        .map(|s| (s.name.clone(), s.counters))
        .collect()
}

/// Interfaces with six valid deltas against `previous`, sorted by name.
pub fn interface_metrics(previous: &IfaceSnapshot, current: &IfaceSnapshot) -> Vec<NetIfaceMetric> {
    interface_deltas(previous, current)
        .into_iter()
        .map(|(iface, d)| NetIfaceMetric {
            iface,
            bytes_in: d.bytes_in,
            bytes_out: d.bytes_out,
            packets_in: d.packets_in,
            packets_out: d.packets_out,
            errors_in: d.errors_in,
            errors_out: d.errors_out,
        })
        .collect()
}

#[async_trait]
impl Collector for MetricsCollector {
    fn name(&self) -> &str {
        "metrics"
    }

    async fn round(&self) -> RoundOutcome {
        let cpu = gauge("cpu", self.provider.cpu_percent().await);
        let mem = gauge("mem", self.provider.memory_percent().await);
        let disk = gauge("disk", self.provider.disk_percent().await);

        let samples = match self.provider.interfaces().await {
            Ok(samples) => Some(samples),
            Err(e) => {
                warn!(field = "net", error = %e, "Network counters unavailable");
                None
            }
        };

        let mut state = self.state.lock().await;

        // No included interface means no reading, not a zero reading.
        let totals = samples
            .as_deref()
            .filter(|s| s.iter().any(|i| self.network.should_include(&i.name)))
            .map(|s| aggregate_totals(s, &self.network));
        let (net_in, net_out) = match (&state.totals, &totals) {
            (Some(previous), Some(current)) => current.delta_from(previous).unwrap_or((0, 0)),
            _ => (0, 0),
        };

        let payload = MetricPayload {
            timestamp: rfc3339_nanos(chrono::Utc::now()),
            cpu,
            mem,
            disk,
            net_in,
            net_out,
        };

        let outcome = match dispatch_json(self.dispatcher.as_ref(), Channel::Metrics, &payload).await {
            Ok(()) => {
                debug!(cpu, mem, disk, net_in, net_out, "Metrics sent");
                // Undelivered traffic stays in the next delivered delta.
                if totals.is_some() {
                    state.totals = totals;
                }
                RoundOutcome::Delivered
            }
            Err(e) => {
                warn!(channel = %Channel::Metrics, error = %e, "Metrics ingest failed");
                RoundOutcome::Failed
            }
        };

        if let Some(samples) = samples {
            let current = interface_snapshot(&samples, &self.network);

            if let Some(previous) = &state.interfaces {
                let interfaces = interface_metrics(previous, &current);
                if !interfaces.is_empty() {
                    self.send_interfaces(payload.timestamp.clone(), interfaces)
                        .await;
                }
            }

            if !current.is_empty() {
                state.interfaces = Some(current);
            }
        }

        outcome
    }
}
