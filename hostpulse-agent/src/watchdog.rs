//! Process liveness tracking.
//!
//! Every round the process list is grouped by name and compared with the
//! previous round:
//!
//! | previous | current          | status      | restart_count |
//! |----------|------------------|-------------|---------------|
//! | present  | absent           | `crashed`   | 0             |
//! | present  | same PID set     | `running`   | 0             |
//! | present  | other PID set    | `restarted` | 1             |
//! | absent   | present          | `running`   | 0             |
//!
//! The first round only records a baseline and is not transmitted.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use hostpulse_agent_framework::{Collector, Dispatcher, RoundOutcome, dispatch_json};
use hostpulse_common::{Channel, WatchdogEntry, WatchdogPayload, WatchdogStatus, rfc3339_secs};

use crate::provider::ProviderHandle;

/// Whether two PID lists hold the same PIDs, ignoring order and duplicates.
pub fn same_pids(a: &[u32], b: &[u32]) -> bool {
    let a: BTreeSet<u32> = a.iter().copied().collect();
    let b: BTreeSet<u32> = b.iter().copied().collect();
    a == b
}

/// Process name to the PIDs currently running under it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessSnapshot {
    names: BTreeMap<String, Vec<u32>>,
}

impl ProcessSnapshot {
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn pids(&self, name: &str) -> Option<&[u32]> {
        self.names.get(name).map(Vec::as_slice)
    }
}

impl FromIterator<(String, u32)> for ProcessSnapshot {
    /// Group `(name, pid)` pairs; unnamed processes are skipped.
    fn from_iter<I: IntoIterator<Item = (String, u32)>>(iter: I) -> Self {
        let mut names: BTreeMap<String, Vec<u32>> = BTreeMap::new();
        for (name, pid) in iter {
            if name.is_empty() {
                continue;
            }
            names.entry(name).or_default().push(pid);
        }
        for pids in names.values_mut() {
            pids.sort_unstable();
            pids.dedup();
        }
        Self { names }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Tracked {
    pids: Vec<u32>,
    last_seen: DateTime<Utc>,
}

/// Result of one diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchdogRound {
    /// Entries sorted by name, capped.
    pub entries: Vec<WatchdogEntry>,
    /// The previous snapshot was empty; nothing should be transmitted.
    pub baseline: bool,
}

/// Previous snapshot with the time each name was last confirmed.
#[derive(Debug, Default)]
pub struct WatchdogState {
    previous: BTreeMap<String, Tracked>,
}

impl WatchdogState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names tracked from the last round.
    pub fn tracked(&self) -> impl Iterator<Item = &str> {
        self.previous.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.previous.is_empty()
    }

    /// Diff `current` against the stored snapshot, then store `current`.
    pub fn advance(
        &mut self,
        current: ProcessSnapshot,
        now: DateTime<Utc>,
        max_entries: usize,
    ) -> WatchdogRound {
        let baseline = self.previous.is_empty();
        let seen_at = rfc3339_secs(now);

        let mut entries = Vec::with_capacity(self.previous.len().max(current.len()));

        for (name, tracked) in &self.previous {
            let entry = match current.pids(name) {
                None => WatchdogEntry {
                    name: name.clone(),
                    status: WatchdogStatus::Crashed,
                    restart_count: 0,
                    last_seen_at: rfc3339_secs(tracked.last_seen),
                    pids: Vec::new(),
                },
                Some(pids) => {
                    let unchanged = same_pids(&tracked.pids, pids);
                    WatchdogEntry {
                        name: name.clone(),
                        status: if unchanged {
                            WatchdogStatus::Running
                        } else {
                            WatchdogStatus::Restarted
                        },
                        restart_count: if unchanged { 0 } else { 1 },
                        last_seen_at: seen_at.clone(),
                        pids: pids.to_vec(),
                    }
                }
            };
            entries.push(entry);
        }

        for (name, pids) in &current.names {
            if !self.previous.contains_key(name) {
                entries.push(WatchdogEntry {
                    name: name.clone(),
                    status: WatchdogStatus::Running,
                    restart_count: 0,
                    last_seen_at: seen_at.clone(),
                    pids: pids.clone(),
                });
            }
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        entries.truncate(max_entries);

        self.previous = current
            .names
            .into_iter()
            .map(|(name, pids)| {
                (
                    name,
                    Tracked {
                        pids,
                        last_seen: now,
                    },
                )
            })
            .collect();

        WatchdogRound { entries, baseline }
    }
}

/// Collector for the watchdog channel.
pub struct WatchdogCollector {
    provider: ProviderHandle,
    dispatcher: Arc<dyn Dispatcher>,
    max_entries: usize,
    state: Mutex<WatchdogState>,
}

impl WatchdogCollector {
    pub fn new(provider: ProviderHandle, dispatcher: Arc<dyn Dispatcher>, max_entries: usize) -> Self {
        Self {
            provider,
            dispatcher,
            max_entries,
            state: Mutex::new(WatchdogState::new()),
        }
    }

    /// Run the listing and diff as one critical section.
    ///
    /// `None` when the listing failed; the stored snapshot is then untouched.
    pub async fn diff(&self) -> Option<WatchdogRound> {
        let mut state = self.state.lock().await;

        let listing = match self.provider.process_names().await {
            Ok(listing) => listing,
            Err(e) => {
                warn!(error = %e, "Watchdog listing failed, keeping previous snapshot");
                return None;
            }
        };

        let current: ProcessSnapshot = listing.into_iter().collect();
        Some(state.advance(current, Utc::now(), self.max_entries))
    }
}

#[async_trait]
impl Collector for WatchdogCollector {
    fn name(&self) -> &str {
        "watchdog"
    }

    async fn round(&self) -> RoundOutcome {
        let Some(round) = self.diff().await else {
            return RoundOutcome::Idle;
        };

        if round.baseline {
            info!(processes = round.entries.len(), "Watchdog baseline snapshot stored");
            return RoundOutcome::Idle;
        }

        let crashed = round
            .entries
            .iter()
            .filter(|e| e.status == WatchdogStatus::Crashed)
            .count();
        let restarted = round
            .entries
            .iter()
            .filter(|e| e.status == WatchdogStatus::Restarted)
            .count();
        let count = round.entries.len();

        let payload = WatchdogPayload {
            timestamp: rfc3339_secs(Utc::now()),
            entries: round.entries,
        };

        match dispatch_json(self.dispatcher.as_ref(), Channel::Watchdog, &payload).await {
            Ok(()) => {
                debug!(entries = count, crashed, restarted, "Watchdog sent");
                RoundOutcome::Delivered
            }
            Err(e) => {
                warn!(channel = %Channel::Watchdog, error = %e, "Watchdog ingest failed");
                RoundOutcome::Failed
            }
        }
    }
}
