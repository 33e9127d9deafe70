//! Agent runner for lifecycle management.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use hostpulse_common::{LoggingConfig, init_tracing};

use crate::AgentArgs;
use crate::config::AgentConfig;
use crate::dispatch::{Dispatcher, HttpDispatcher};
use crate::error::{AgentError, Result};
use crate::scheduler::{Collector, Schedule};

/// How long running schedules get to finish after shutdown is requested.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Agent runner that manages the lifecycle of the collector schedules.
///
/// Handles:
/// - Logging initialization
/// - HTTP dispatcher construction
/// - One task per collector schedule
/// - Graceful shutdown on Ctrl+C / SIGTERM
///
/// # Example
///
/// ```ignore
/// use hostpulse_agent_framework::{AgentArgs, AgentRunner};
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let args = AgentArgs::parse();
///     let config = MyAgentConfig::resolve(&args)?;
///
///     let mut runner = AgentRunner::new_with_args("my-agent", config, Some(&args))?;
///     let collector = Arc::new(MyCollector::new(runner.dispatcher()));
///     runner.spawn_schedule(Duration::from_secs(10), collector);
///
///     runner.run().await
/// }
/// ```
pub struct AgentRunner<C: AgentConfig> {
    /// Agent name for logging and the User-Agent header.
    name: String,
    /// Agent version.
    version: String,
    /// The loaded configuration.
    config: C,
    /// Delivery capability shared by all collectors.
    dispatcher: Arc<dyn Dispatcher>,
    /// Broadcasts `true` once shutdown is requested.
    shutdown_tx: watch::Sender<bool>,
    /// Spawned schedule tasks.
    tasks: Vec<JoinHandle<()>>,
}

impl<C: AgentConfig> AgentRunner<C> {
    /// Create a new agent runner.
    ///
    /// This will:
    /// 1. Initialize logging based on config (with optional CLI override)
    /// 2. Build the HTTP dispatcher for the configured backend
    pub fn new_with_args(
        name: impl Into<String>,
        config: C,
        args: Option<&AgentArgs>,
    ) -> Result<Self> {
        let name = name.into();
        let version = env!("CARGO_PKG_VERSION").to_string();

        // Initialize logging with optional CLI override
        let log_config = match args.and_then(|a| a.log_level.clone()) {
            Some(level) => LoggingConfig {
                level,
                ..config.logging().clone()
            },
            None => config.logging().clone(),
        };

        init_tracing(&log_config).map_err(|e| AgentError::config(e.to_string()))?;

        tracing::info!(
            agent = %name,
            version = %version,
            url = %config.backend().base_url(),
            "Starting agent"
        );

        let user_agent = format!("{}/{}", name, version);
        let dispatcher = Arc::new(HttpDispatcher::new(config.backend(), &user_agent)?);

        Ok(Self::with_dispatcher(name, config, dispatcher))
    }

    /// Create a runner around an existing dispatcher.
    ///
    /// Does not touch the global tracing subscriber.
    pub fn with_dispatcher(
        name: impl Into<String>,
        config: C,
        dispatcher: Arc<dyn Dispatcher>,
    ) -> Self {
        let (shutdown_tx, _) = watch::channel(false);

        Self {
            name: name.into(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            config,
            dispatcher,
            shutdown_tx,
            tasks: Vec::new(),
        }
    }

    /// Get the agent name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the agent version.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Get a reference to the configuration.
    pub fn config(&self) -> &C {
        &self.config
    }

    /// Get a clone of the dispatcher.
    pub fn dispatcher(&self) -> Arc<dyn Dispatcher> {
        self.dispatcher.clone()
    }

    /// A receiver that turns `true` when shutdown is requested.
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown_tx.subscribe()
    }

    /// Number of spawned schedules.
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Spawn an independent schedule for `collector`.
    ///
    /// The task stops cooperatively when the runner shuts down.
    pub fn spawn_schedule(&mut self, interval: Duration, collector: Arc<dyn Collector>) {
        let shutdown = self.shutdown_signal();
        let handle = tokio::spawn(async move {
            Schedule::new(interval).run(collector, shutdown).await;
        });
        self.tasks.push(handle);
    }

    /// Run the agent until Ctrl+C or SIGTERM is received.
    pub async fn run(self) -> Result<()> {
        self.run_until(shutdown_signal()).await
    }

    /// Run the agent until `signal` completes.
    ///
    /// This will:
    /// 1. Wait for the signal
    /// 2. Broadcast shutdown to every schedule
    /// 3. Wait up to five seconds for in-flight rounds to finish
    /// 4. Abort whatever is still running
    pub async fn run_until<F>(self, signal: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tracing::info!(
            agent = %self.name,
            schedules = self.tasks.len(),
            "Agent running. Press Ctrl+C to stop."
        );

        signal.await;

        tracing::info!(agent = %self.name, "Received shutdown signal");

        let _ = self.shutdown_tx.send(true);

        let mut tasks = self.tasks;
        let drained = tokio::time::timeout(SHUTDOWN_GRACE, async {
            for task in tasks.iter_mut() {
                if let Err(e) = task.await {
                    tracing::warn!(error = %e, "Schedule task ended abnormally");
                }
            }
        })
        .await;

        if drained.is_err() {
            tracing::warn!(
                grace_secs = SHUTDOWN_GRACE.as_secs(),
                "Schedules did not stop in time, aborting"
            );
            for task in &tasks {
                task.abort();
            }
        }

        tracing::info!(agent = %self.name, "Goodbye!");

        Ok(())
    }
}

/// Resolve on Ctrl+C, or SIGTERM on Unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
