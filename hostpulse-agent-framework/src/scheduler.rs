//! Adaptive polling schedule with exponential backoff.
//!
//! Every collector runs on its own [`Schedule`]: a nominal interval that is
//! stretched while deliveries keep failing, and reset on the first success.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::time::Instant;

/// Upper bound for a backed-off delay.
pub const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Backoff doubles at most this many times.
const MAX_BACKOFF_EXPONENT: u32 = 4;

/// Delay before the next round given the consecutive failure count.
///
/// Never below `interval`, never above [`MAX_BACKOFF`] unless `interval`
/// itself is larger, and monotonic non-decreasing in `fail_count`.
pub fn next_delay(interval: Duration, fail_count: u32) -> Duration {
    if fail_count == 0 {
        return interval;
    }

    let factor = 1u32 << fail_count.min(MAX_BACKOFF_EXPONENT);
    interval
        .saturating_mul(factor)
        .min(MAX_BACKOFF)
        .max(interval)
}

/// Result of a single collection round, as seen by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundOutcome {
    /// The payload was accepted by the backend.
    Delivered,
    /// Delivery failed; the next round is backed off.
    Failed,
    /// Nothing was dispatched (baseline round, empty batch, collection error).
    Idle,
}

/// A unit of work run once per scheduled round.
///
/// Implementations own their previous-round state and must finish all
/// bookkeeping before returning.
#[async_trait]
pub trait Collector: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Collect, dispatch, and report how delivery went.
    async fn round(&self) -> RoundOutcome;
}

/// Interval and backoff state of one collector loop.
#[derive(Debug, Clone)]
pub struct Schedule {
    interval: Duration,
    fail_count: u32,
}

impl Schedule {
    /// Create a schedule with the nominal `interval`.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            fail_count: 0,
        }
    }

    /// Nominal interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Consecutive delivery failures.
    pub fn fail_count(&self) -> u32 {
        self.fail_count
    }

    /// Update backoff state from a round outcome.
    pub fn record(&mut self, outcome: RoundOutcome) {
        match outcome {
            RoundOutcome::Delivered => self.fail_count = 0,
            RoundOutcome::Failed => self.fail_count = self.fail_count.saturating_add(1),
            RoundOutcome::Idle => {}
        }
    }

    /// Delay between the start of the last round and the start of the next.
    pub fn next_delay(&self) -> Duration {
        next_delay(self.interval, self.fail_count)
    }

    /// Run `collector` until `shutdown` turns true (or its sender is dropped).
    ///
    /// Rounds are never interrupted; cancellation is observed before a round
    /// starts and while waiting for the next one. Returns the final state.
    pub async fn run(
        mut self,
        collector: Arc<dyn Collector>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Self {
        tracing::info!(
            collector = collector.name(),
            interval_secs = self.interval.as_secs_f64(),
            "Starting collector schedule"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            let started = Instant::now();
            let outcome = collector.round().await;
            let previous_failures = self.fail_count;
            self.record(outcome);

            if outcome == RoundOutcome::Failed {
                tracing::warn!(
                    collector = collector.name(),
                    failures = self.fail_count,
                    next_delay_secs = self.next_delay().as_secs_f64(),
                    "Delivery failed, backing off"
                );
            } else if previous_failures > 0 && self.fail_count == 0 {
                tracing::info!(
                    collector = collector.name(),
                    after_failures = previous_failures,
                    "Delivery recovered"
                );
            }

            let wait = self.next_delay().saturating_sub(started.elapsed());
            if wait.is_zero() {
                continue;
            }

            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                _ = cancelled(&mut shutdown) => break,
            }
        }

        tracing::info!(collector = collector.name(), "Collector schedule stopped");
        self
    }
}

/// Resolve once shutdown has been requested or the sender is gone.
pub async fn cancelled(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}
