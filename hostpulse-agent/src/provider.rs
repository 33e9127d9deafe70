//! Host metric providers.
//!
//! [`HostProvider`] is the narrow, synchronous view of the operating system
//! the collectors work against. [`ProviderHandle`] runs those calls on the
//! blocking pool under a timeout so a stuck query only fails its own round.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::delta::InterfaceCounters;

/// Why a provider query produced no value.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    #[error("{what} failed: {reason}")]
    Failed { what: &'static str, reason: String },

    #[error("{what} timed out after {after:?}")]
    Timeout { what: &'static str, after: Duration },

    #[error("{0} is not supported on this platform")]
    Unsupported(&'static str),
}

impl ProviderError {
    pub fn failed(what: &'static str, reason: impl ToString) -> Self {
        Self::Failed {
            what,
            reason: reason.to_string(),
        }
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Counters of one network interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceSample {
    pub name: String,
    pub counters: InterfaceCounters,
}

/// One process as listed by the OS.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessRecord {
    pub pid: u32,
    pub name: String,
    /// CPU usage in percent.
    pub cpu: f64,
    /// Resident memory as a percentage of total memory.
    pub mem: f64,
    /// Resident set size in bytes.
    pub rss: u64,
    pub user: String,
    /// `None` when the OS reports no usable state.
    pub status: Option<String>,
}

/// Transport protocol of a listening socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SocketProtocol {
    Tcp,
    Udp,
}

impl SocketProtocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            SocketProtocol::Tcp => "tcp",
            SocketProtocol::Udp => "udp",
        }
    }
}

/// A socket accepting traffic on a local port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListeningSocket {
    pub port: u16,
    pub protocol: SocketProtocol,
    /// Local address, `None` when unknown.
    pub bind_addr: Option<String>,
    /// Owning process, when it could be resolved.
    pub pid: Option<u32>,
    /// Name of the owning process, empty when unknown.
    pub process: String,
}

/// Synchronous queries against the host.
///
/// Every call may fail independently of the others.
pub trait HostProvider: Send + Sync + 'static {
    /// Aggregate CPU busy percent since the previous call.
    fn cpu_percent(&self) -> ProviderResult<f64>;

    /// Used memory percent.
    fn memory_percent(&self) -> ProviderResult<f64>;

    /// Used percent of the root filesystem.
    fn disk_percent(&self) -> ProviderResult<f64>;

    /// Counters of every network interface, loopback included.
    fn interfaces(&self) -> ProviderResult<Vec<InterfaceSample>>;

    /// Full process listing with resource usage.
    fn processes(&self) -> ProviderResult<Vec<ProcessRecord>>;

    /// `(name, pid)` of every process.
    fn process_names(&self) -> ProviderResult<Vec<(String, u32)>>;

    /// Listening TCP sockets and unconnected UDP sockets.
    fn listening_sockets(&self) -> ProviderResult<Vec<ListeningSocket>>;
}

/// Shared provider whose calls run off the async runtime, each bounded by a
/// timeout.
#[derive(Clone)]
pub struct ProviderHandle {
    provider: Arc<dyn HostProvider>,
    timeout: Duration,
}

impl ProviderHandle {
    pub fn new(provider: Arc<dyn HostProvider>, timeout: Duration) -> Self {
        Self { provider, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run `query` on the blocking pool.
    ///
    /// A query that outlives the timeout keeps its blocking thread until it
    /// returns, but the caller gets [`ProviderError::Timeout`] right away.
    pub async fn call<T, F>(&self, what: &'static str, query: F) -> ProviderResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn HostProvider) -> ProviderResult<T> + Send + 'static,
    {
        let provider = self.provider.clone();
        let task = tokio::task::spawn_blocking(move || query(provider.as_ref()));

        match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => Err(ProviderError::failed(what, join_error)),
            Err(_) => Err(ProviderError::Timeout {
                what,
                after: self.timeout,
            }),
        }
    }

    pub async fn cpu_percent(&self) -> ProviderResult<f64> {
        self.call("cpu", |p| p.cpu_percent()).await
    }

    pub async fn memory_percent(&self) -> ProviderResult<f64> {
        self.call("memory", |p| p.memory_percent()).await
    }

    pub async fn disk_percent(&self) -> ProviderResult<f64> {
        self.call("disk", |p| p.disk_percent()).await
    }

    pub async fn interfaces(&self) -> ProviderResult<Vec<InterfaceSample>> {
        self.call("network interfaces", |p| p.interfaces()).await
    }

    pub async fn processes(&self) -> ProviderResult<Vec<ProcessRecord>> {
        self.call("process listing", |p| p.processes()).await
    }

    pub async fn process_names(&self) -> ProviderResult<Vec<(String, u32)>> {
        self.call("process names", |p| p.process_names()).await
    }

    pub async fn listening_sockets(&self) -> ProviderResult<Vec<ListeningSocket>> {
        self.call("listening sockets", |p| p.listening_sockets()).await
    }
}
