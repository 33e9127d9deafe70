//! Linux-specific socket inspection using procfs.
//!
//! Listening sockets come from `/proc/net/{tcp,tcp6,udp,udp6}`; their owners
//! are found by matching socket inodes against `/proc/<pid>/fd`.

use std::collections::HashMap;
use std::net::SocketAddr;

use procfs::process::FDTarget;
use tracing::debug;

use crate::provider::{ListeningSocket, ProviderError, ProviderResult, SocketProtocol};

/// A socket before its owner is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RawSocket {
    local: SocketAddr,
    protocol: SocketProtocol,
    inode: u64,
}

/// Listening TCP sockets and unconnected UDP sockets, with their owners.
///
/// IPv4 TCP is required; the IPv6 and UDP tables are read when present.
pub fn listening_sockets() -> ProviderResult<Vec<ListeningSocket>> {
    let mut raw = Vec::new();

    let tcp = procfs::net::tcp().map_err(|e| ProviderError::failed("listening sockets", e))?;
    raw.extend(tcp_listeners(tcp));

    match procfs::net::tcp6() {
        Ok(tcp6) => raw.extend(tcp_listeners(tcp6)),
        Err(e) => debug!(error = %e, "Skipping /proc/net/tcp6"),
    }
    match procfs::net::udp() {
        Ok(udp) => raw.extend(udp_listeners(udp)),
        Err(e) => debug!(error = %e, "Skipping /proc/net/udp"),
    }
    match procfs::net::udp6() {
        Ok(udp6) => raw.extend(udp_listeners(udp6)),
        Err(e) => debug!(error = %e, "Skipping /proc/net/udp6"),
    }

    let owners = socket_owners();

    Ok(raw
        .into_iter()
        .map(|socket| {
            let owner = owners.get(&socket.inode);
            ListeningSocket {
                port: socket.local.port(),
                protocol: socket.protocol,
                bind_addr: Some(socket.local.ip().to_string()),
                pid: owner.map(|(pid, _)| *pid),
                process: owner.map(|(_, name)| name.clone()).unwrap_or_default(),
            }
        })
        .collect())
}

fn tcp_listeners(entries: Vec<procfs::net::TcpNetEntry>) -> impl Iterator<Item = RawSocket> {
    entries
        .into_iter()
        .filter(|e| e.state == procfs::net::TcpState::Listen)
        .map(|e| RawSocket {
            local: e.local_address,
            protocol: SocketProtocol::Tcp,
            inode: e.inode,
        })
}

fn udp_listeners(entries: Vec<procfs::net::UdpNetEntry>) -> impl Iterator<Item = RawSocket> {
    entries
        .into_iter()
        .filter(|e| e.remote_address.port() == 0 && e.remote_address.ip().is_unspecified())
        .map(|e| RawSocket {
            local: e.local_address,
            protocol: SocketProtocol::Udp,
            inode: e.inode,
        })
}

/// Socket inode to `(pid, comm)` for every process we are allowed to inspect.
fn socket_owners() -> HashMap<u64, (u32, String)> {
    let mut owners = HashMap::new();

    let processes = match procfs::process::all_processes() {
        Ok(processes) => processes,
        Err(e) => {
            debug!(error = %e, "Cannot enumerate processes for socket owners");
            return owners;
        }
    };

    for process in processes.flatten() {
        // Other users' fd tables are unreadable without privileges.
        let Ok(fds) = process.fd() else {
            continue;
        };
        let name = process
            .stat()
            .map(|s| s.comm)
            .unwrap_or_default();
        let Ok(pid) = u32::try_from(process.pid()) else {
            continue;
        };

        for fd in fds.flatten() {
            if let FDTarget::Socket(inode) = fd.target {
                owners.entry(inode).or_insert_with(|| (pid, name.clone()));
            }
        }
    }

    owners
}
