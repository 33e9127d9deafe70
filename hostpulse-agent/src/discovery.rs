//! Service discovery from listening sockets.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, warn};

use hostpulse_agent_framework::{Collector, Dispatcher, RoundOutcome, dispatch_json};
use hostpulse_common::{Channel, DiscoveredService, ServiceDiscoveryPayload, rfc3339_nanos};

use crate::provider::{ListeningSocket, ProviderHandle};

/// Label of a well-known port.
pub fn well_known_port(port: u16) -> Option<&'static str> {
    let label = match port {
        21 => "FTP",
        22 => "SSH",
        25 => "SMTP",
        53 => "DNS",
        80 => "HTTP",
        110 => "POP3",
        143 => "IMAP",
        443 => "HTTPS",
        465 => "SMTPS",
        587 => "SMTP Submission",
        993 => "IMAPS",
        995 => "POP3S",
        1433 => "MSSQL",
        1521 => "Oracle DB",
        2049 => "NFS",
        3000 => "Dev Server",
        3306 => "MySQL",
        3389 => "RDP",
        5432 => "PostgreSQL",
        5672 => "RabbitMQ",
        5900 => "VNC",
        6379 => "Redis",
        6443 => "Kubernetes API",
        8080 => "HTTP Alt",
        8443 => "HTTPS Alt",
        8888 => "HTTP Alt",
        9090 => "Prometheus",
        9200 => "Elasticsearch",
        9300 => "Elasticsearch Transport",
        11211 => "Memcached",
        15672 => "RabbitMQ Management",
        27017 => "MongoDB",
        _ => return None,
    };
    Some(label)
}

/// Friendlier label for a known server binary, matched case-insensitively.
pub fn process_label(process: &str) -> Option<&'static str> {
    let label = match process.to_lowercase().as_str() {
        "postgres" => "PostgreSQL",
        "mysqld" => "MySQL",
        "mariadbd" => "MariaDB",
        "redis-server" => "Redis",
        "mongod" => "MongoDB",
        "nginx" => "Nginx",
        "apache2" | "httpd" => "Apache",
        "caddy" => "Caddy",
        "haproxy" => "HAProxy",
        "sshd" => "SSH",
        "dockerd" => "Docker",
        "containerd" => "Containerd",
        "kubelet" => "Kubelet",
        "etcd" => "etcd",
        "java" => "Java App",
        "node" => "Node.js",
        "python" | "python3" => "Python App",
        "php-fpm" => "PHP-FPM",
        "dotnet" => ".NET App",
        "rabbitmq-server" => "RabbitMQ",
        "memcached" => "Memcached",
        "prometheus" => "Prometheus",
        "grafana-server" => "Grafana",
        "minio" => "MinIO",
        _ => return None,
    };
    Some(label)
}

/// Label for a service: process override, then well-known port, then the
/// process name, then `Port <n>`.
pub fn service_label(port: u16, process: &str) -> String {
    if let Some(label) = process_label(process) {
        return label.to_string();
    }
    if let Some(label) = well_known_port(port) {
        return label.to_string();
    }
    if !process.is_empty() {
        return process.to_string();
    }
    format!("Port {}", port)
}

/// One service per port; the first socket seen on a port wins.
pub fn discover(sockets: Vec<ListeningSocket>) -> Vec<DiscoveredService> {
    let mut seen = HashSet::new();

    sockets
        .into_iter()
        .filter(|s| s.port != 0 && seen.insert(s.port))
        .map(|s| DiscoveredService {
            port: s.port,
            protocol: s.protocol.as_str().to_string(),
            service: service_label(s.port, &s.process),
            bind_addr: s
                .bind_addr
                .filter(|a| !a.is_empty())
                .unwrap_or_else(|| "0.0.0.0".to_string()),
            process: s.process,
        })
        .collect()
}

/// Collector for the services channel.
pub struct DiscoveryCollector {
    provider: ProviderHandle,
    dispatcher: Arc<dyn Dispatcher>,
}

impl DiscoveryCollector {
    pub fn new(provider: ProviderHandle, dispatcher: Arc<dyn Dispatcher>) -> Self {
        Self {
            provider,
            dispatcher,
        }
    }
}

#[async_trait]
impl Collector for DiscoveryCollector {
    fn name(&self) -> &str {
        "services"
    }

    async fn round(&self) -> RoundOutcome {
        let sockets = match self.provider.listening_sockets().await {
            Ok(sockets) => sockets,
            Err(e) => {
                warn!(error = %e, "Service discovery failed");
                return RoundOutcome::Idle;
            }
        };

        let services = discover(sockets);
        let count = services.len();
        let payload = ServiceDiscoveryPayload {
            timestamp: rfc3339_nanos(Utc::now()),
            services,
        };

        match dispatch_json(self.dispatcher.as_ref(), Channel::Services, &payload).await {
            Ok(()) => {
                debug!(services = count, "Services sent");
                RoundOutcome::Delivered
            }
            Err(e) => {
                warn!(channel = %Channel::Services, error = %e, "Services ingest failed");
                RoundOutcome::Failed
            }
        }
    }
}
