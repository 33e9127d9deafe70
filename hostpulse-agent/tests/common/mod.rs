//! Test doubles for the host agent: a scripted provider and a dispatcher
//! that records every payload.

#![allow(dead_code)]

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use hostpulse_agent::delta::InterfaceCounters;
use hostpulse_agent::provider::{
    HostProvider, InterfaceSample, ListeningSocket, ProcessRecord, ProviderError, ProviderHandle,
    ProviderResult,
};
use hostpulse_agent_framework::{Channel, DispatchError, Dispatcher};

/// Provider replaying queued listings. An exhausted queue yields an empty
/// listing.
pub struct ScriptedProvider {
    pub cpu: Mutex<ProviderResult<f64>>,
    pub memory: Mutex<ProviderResult<f64>>,
    pub disk: Mutex<ProviderResult<f64>>,
    pub interfaces: Mutex<VecDeque<ProviderResult<Vec<InterfaceSample>>>>,
    pub processes: Mutex<VecDeque<ProviderResult<Vec<ProcessRecord>>>>,
    pub names: Mutex<VecDeque<ProviderResult<Vec<(String, u32)>>>>,
    pub sockets: Mutex<ProviderResult<Vec<ListeningSocket>>>,
}

impl Default for ScriptedProvider {
    fn default() -> Self {
        Self {
            cpu: Mutex::new(Ok(12.5)),
            memory: Mutex::new(Ok(40.0)),
            disk: Mutex::new(Ok(71.25)),
            interfaces: Mutex::new(VecDeque::new()),
            processes: Mutex::new(VecDeque::new()),
            names: Mutex::new(VecDeque::new()),
            sockets: Mutex::new(Ok(Vec::new())),
        }
    }
}

impl ScriptedProvider {
    pub fn push_interfaces(&self, listing: ProviderResult<Vec<InterfaceSample>>) {
        self.interfaces.lock().unwrap().push_back(listing);
    }

    pub fn push_names(&self, listing: ProviderResult<Vec<(String, u32)>>) {
        self.names.lock().unwrap().push_back(listing);
    }

    pub fn push_processes(&self, listing: ProviderResult<Vec<ProcessRecord>>) {
        self.processes.lock().unwrap().push_back(listing);
    }
}

impl HostProvider for ScriptedProvider {
    fn cpu_percent(&self) -> ProviderResult<f64> {
        self.cpu.lock().unwrap().clone()
    }

    fn memory_percent(&self) -> ProviderResult<f64> {
        self.memory.lock().unwrap().clone()
    }

    fn disk_percent(&self) -> ProviderResult<f64> {
        self.disk.lock().unwrap().clone()
    }

    fn interfaces(&self) -> ProviderResult<Vec<InterfaceSample>> {
        self.interfaces
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    fn processes(&self) -> ProviderResult<Vec<ProcessRecord>> {
        self.processes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    fn process_names(&self) -> ProviderResult<Vec<(String, u32)>> {
        self.names
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    fn listening_sockets(&self) -> ProviderResult<Vec<ListeningSocket>> {
        self.sockets.lock().unwrap().clone()
    }
}

/// Wrap a scripted provider the way the agent wraps the real one.
pub fn handle(provider: &Arc<ScriptedProvider>) -> ProviderHandle {
    ProviderHandle::new(provider.clone(), Duration::from_secs(5))
}

pub fn listing_failure(what: &'static str) -> ProviderError {
    ProviderError::failed(what, "permission denied")
}

/// Dispatcher that keeps every attempted payload and fails on demand per
/// channel.
#[derive(Default)]
pub struct RecordingDispatcher {
    attempts: Mutex<Vec<(Channel, Value)>>,
    failing: Mutex<HashSet<Channel>>,
}

impl RecordingDispatcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail(&self, channel: Channel) {
        self.failing.lock().unwrap().insert(channel);
    }

    pub fn recover(&self, channel: Channel) {
        self.failing.lock().unwrap().remove(&channel);
    }

    /// Payloads attempted on `channel`, oldest first.
    pub fn sent(&self, channel: Channel) -> Vec<Value> {
        self.attempts
            .lock()
            .unwrap()
            .iter()
            .filter(|(c, _)| *c == channel)
            .map(|(_, v)| v.clone())
            .collect()
    }

    pub fn total(&self) -> usize {
        self.attempts.lock().unwrap().len()
    }
}

#[async_trait]
impl Dispatcher for RecordingDispatcher {
    async fn dispatch(&self, channel: Channel, body: Vec<u8>) -> Result<(), DispatchError> {
        let value: Value = serde_json::from_slice(&body).expect("payload is JSON");
        self.attempts.lock().unwrap().push((channel, value));

        if self.failing.lock().unwrap().contains(&channel) {
            return Err(DispatchError::Status {
                status: 503,
                body: "unavailable".to_string(),
            });
        }
        Ok(())
    }
}

pub fn iface(name: &str, bytes_in: u64, bytes_out: u64) -> InterfaceSample {
    InterfaceSample {
        name: name.to_string(),
        counters: InterfaceCounters {
            bytes_in,
            bytes_out,
            packets_in: bytes_in / 100,
            packets_out: bytes_out / 100,
            errors_in: 0,
            errors_out: 0,
        },
    }
}

pub fn names(pairs: &[(&str, u32)]) -> Vec<(String, u32)> {
    pairs.iter().map(|(n, p)| (n.to_string(), *p)).collect()
}
