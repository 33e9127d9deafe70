//! [`HostProvider`] backed by the `sysinfo` crate.

use std::path::Path;

use parking_lot::Mutex;
use sysinfo::{
    Disks, Networks, Process, ProcessRefreshKind, ProcessStatus, ProcessesToUpdate, System, Users,
};

use crate::delta::InterfaceCounters;
use crate::provider::{
    HostProvider, InterfaceSample, ListeningSocket, ProcessRecord, ProviderError, ProviderResult,
};

/// Provider reading the local system through `sysinfo`.
///
/// The refreshable handles are kept between calls: CPU usage, both global
/// and per process, is measured since the previous refresh.
pub struct SysinfoProvider {
    system: Mutex<System>,
    disks: Mutex<Disks>,
    networks: Mutex<Networks>,
}

impl SysinfoProvider {
    pub fn new() -> Self {
        let mut system = System::new();
        system.refresh_cpu_usage();
        system.refresh_memory();

        Self {
            system: Mutex::new(system),
            disks: Mutex::new(Disks::new_with_refreshed_list()),
            networks: Mutex::new(Networks::new_with_refreshed_list()),
        }
    }
}

impl Default for SysinfoProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl HostProvider for SysinfoProvider {
    fn cpu_percent(&self) -> ProviderResult<f64> {
        let mut system = self.system.lock();
        system.refresh_cpu_usage();
        if system.cpus().is_empty() {
            return Err(ProviderError::failed("cpu", "no CPUs reported"));
        }
        Ok(system.global_cpu_usage() as f64)
    }

    fn memory_percent(&self) -> ProviderResult<f64> {
        let mut system = self.system.lock();
        system.refresh_memory();
        percent(system.used_memory(), system.total_memory())
            .ok_or_else(|| ProviderError::failed("memory", "total memory is zero"))
    }

    fn disk_percent(&self) -> ProviderResult<f64> {
        let mut disks = self.disks.lock();
        disks.refresh(true);

        let root = disks
            .list()
            .iter()
            .find(|d| d.mount_point() == Path::new("/"))
            .ok_or_else(|| ProviderError::failed("disk", "root filesystem not mounted"))?;

        let total = root.total_space();
        let used = total.saturating_sub(root.available_space());
        percent(used, total).ok_or_else(|| ProviderError::failed("disk", "root filesystem is empty"))
    }

    fn interfaces(&self) -> ProviderResult<Vec<InterfaceSample>> {
        let mut networks = self.networks.lock();
        networks.refresh(true);

        Ok(networks
            .list()
            .iter()
            .map(|(name, data)| InterfaceSample {
                name: name.clone(),
                counters: InterfaceCounters {
                    bytes_in: data.total_received(),
                    bytes_out: data.total_transmitted(),
                    packets_in: data.total_packets_received(),
                    packets_out: data.total_packets_transmitted(),
                    errors_in: data.total_errors_on_received(),
                    errors_out: data.total_errors_on_transmitted(),
                },
            })
            .collect())
    }

    fn processes(&self) -> ProviderResult<Vec<ProcessRecord>> {
        let users = Users::new_with_refreshed_list();
        let mut system = self.system.lock();
        system.refresh_memory();
        system.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::everything(),
        );

        let total_memory = system.total_memory();

        Ok(system
            .processes()
            .values()
            .filter(|p| p.thread_kind().is_none())
            .map(|p| ProcessRecord {
                pid: p.pid().as_u32(),
                name: p.name().to_string_lossy().to_string(),
                cpu: p.cpu_usage() as f64,
                mem: percent(p.memory(), total_memory).unwrap_or(0.0),
                rss: p.memory(),
                user: p
                    .user_id()
                    .and_then(|uid| users.get_user_by_id(uid))
                    .map(|u| u.name().to_string())
                    .unwrap_or_default(),
                status: status_label(p),
            })
            .collect())
    }

    fn process_names(&self) -> ProviderResult<Vec<(String, u32)>> {
        let mut system = self.system.lock();
        system.refresh_processes(ProcessesToUpdate::All, true);

        Ok(system
            .processes()
            .values()
            .filter(|p| p.thread_kind().is_none())
            .map(|p| (p.name().to_string_lossy().to_string(), p.pid().as_u32()))
            .collect())
    }

    #[cfg(target_os = "linux")]
    fn listening_sockets(&self) -> ProviderResult<Vec<ListeningSocket>> {
        crate::linux::listening_sockets()
    }

    #[cfg(not(target_os = "linux"))]
    fn listening_sockets(&self) -> ProviderResult<Vec<ListeningSocket>> {
        Err(ProviderError::Unsupported("listening sockets"))
    }
}

fn percent(part: u64, total: u64) -> Option<f64> {
    (total > 0).then(|| (part as f64 / total as f64) * 100.0)
}

fn status_label(process: &Process) -> Option<String> {
    let label = match process.status() {
        ProcessStatus::Unknown(_) => return None,
        ProcessStatus::Run => "running".to_string(),
        ProcessStatus::Sleep => "sleeping".to_string(),
        ProcessStatus::Stop => "stopped".to_string(),
        other => other.to_string().to_lowercase(),
    };
    Some(label)
}
