//! HostPulse host agent.
//!
//! Collects local system telemetry and delivers it to the HostPulse backend.

use std::sync::Arc;

use anyhow::Result;
use hostpulse_agent_framework::{AgentArgs, AgentRunner};

use hostpulse_agent::AGENT_NAME;
use hostpulse_agent::config::HostAgentConfig;
use hostpulse_agent::discovery::DiscoveryCollector;
use hostpulse_agent::logs::LogsCollector;
use hostpulse_agent::metrics::MetricsCollector;
use hostpulse_agent::processes::ProcessesCollector;
use hostpulse_agent::provider::ProviderHandle;
use hostpulse_agent::system::SysinfoProvider;
use hostpulse_agent::watchdog::WatchdogCollector;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let args = AgentArgs::parse();

    // Config file, then environment and flags on top
    let config = HostAgentConfig::resolve(&args)?;
    let hostname = config.get_hostname();

    // Create the agent runner (initializes logging and the HTTP dispatcher)
    let mut runner = AgentRunner::new_with_args(AGENT_NAME, config, Some(&args))?;

    let agent = runner.config().agent.clone();
    let dispatcher = runner.dispatcher();
    let provider = ProviderHandle::new(Arc::new(SysinfoProvider::new()), agent.provider_timeout());

    tracing::info!(
        hostname = %hostname,
        interval_secs = agent.interval_secs,
        processes = agent.collect.processes,
        watchdog = agent.collect.watchdog,
        logs = agent.collect.logs,
        services = agent.collect.services,
        "Host agent configured"
    );

    runner.spawn_schedule(
        agent.interval(),
        Arc::new(MetricsCollector::new(
            provider.clone(),
            dispatcher.clone(),
            agent.network.clone(),
        )),
    );

    if agent.collect.processes {
        runner.spawn_schedule(
            agent.schedules.processes(),
            Arc::new(ProcessesCollector::new(
                provider.clone(),
                dispatcher.clone(),
                agent.processes.top,
            )),
        );
    }

    if agent.collect.watchdog {
        runner.spawn_schedule(
            agent.schedules.watchdog(),
            Arc::new(WatchdogCollector::new(
                provider.clone(),
                dispatcher.clone(),
                agent.watchdog.max_entries,
            )),
        );
    }

    if agent.collect.logs {
        runner.spawn_schedule(
            agent.schedules.logs(),
            Arc::new(LogsCollector::new(
                dispatcher.clone(),
                hostname,
                agent.logs.clone(),
                agent.provider_timeout(),
            )),
        );
    }

    if agent.collect.services {
        runner.spawn_schedule(
            agent.schedules.services(),
            Arc::new(DiscoveryCollector::new(provider, dispatcher)),
        );
    }

    // Run until Ctrl+C / SIGTERM (handles shutdown gracefully)
    runner.run().await?;
    Ok(())
}
