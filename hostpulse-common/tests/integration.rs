//! Integration tests for hostpulse-common library.

use hostpulse_common::{Channel, ServiceDiscoveryPayload, WatchdogPayload, WatchdogStatus};

#[test]
fn test_watchdog_payload_decodes_backend_shape() {
    let json = r#"{
        "timestamp": "2026-02-18T12:00:00Z",
        "entries": [
            {"name": "nginx", "status": "running", "restart_count": 0,
             "last_seen_at": "2026-02-18T12:00:00Z", "pids": [100]},
            {"name": "postgres", "status": "restarted", "restart_count": 1,
             "last_seen_at": "2026-02-18T12:00:00Z", "pids": [200, 201]},
            {"name": "redis", "status": "crashed", "restart_count": 0,
             "last_seen_at": "2026-02-18T11:59:30Z", "pids": []}
        ]
    }"#;

    let payload: WatchdogPayload = serde_json::from_str(json).unwrap();
    assert_eq!(payload.entries.len(), 3);
    assert_eq!(payload.entries[0].status, WatchdogStatus::Running);
    assert_eq!(payload.entries[1].status, WatchdogStatus::Restarted);
    assert_eq!(payload.entries[1].restart_count, 1);
    assert_eq!(payload.entries[2].status, WatchdogStatus::Crashed);
    assert!(payload.entries[2].pids.is_empty());
}

#[test]
fn test_empty_service_list_serializes_as_array() {
    let payload = ServiceDiscoveryPayload {
        timestamp: "2026-02-18T12:00:00.000000000Z".to_string(),
        services: Vec::new(),
    };
    let value = serde_json::to_value(&payload).unwrap();
    assert!(value["services"].as_array().unwrap().is_empty());
}

#[test]
fn test_every_channel_has_distinct_path() {
    let channels = [
        Channel::Metrics,
        Channel::Network,
        Channel::Processes,
        Channel::Watchdog,
        Channel::Logs,
        Channel::Services,
    ];
    let mut paths: Vec<_> = channels.iter().map(|c| c.path()).collect();
    paths.sort();
    paths.dedup();
    assert_eq!(paths.len(), channels.len());
    assert!(paths.iter().all(|p| p.starts_with("/api/ingest/server-")));
}
