//! Watchdog collector rounds against a scripted process listing.

mod common;

use std::sync::Arc;

use common::{RecordingDispatcher, ScriptedProvider, handle, listing_failure, names};
use hostpulse_agent::watchdog::WatchdogCollector;
use hostpulse_agent_framework::{Channel, Collector, RoundOutcome};

fn collector(
    provider: &Arc<ScriptedProvider>,
    dispatcher: &Arc<RecordingDispatcher>,
) -> WatchdogCollector {
    WatchdogCollector::new(handle(provider), dispatcher.clone(), 100)
}

fn without_last_seen(payload: &serde_json::Value) -> Vec<serde_json::Value> {
    payload["entries"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| {
            let mut e = e.clone();
            e.as_object_mut().unwrap().remove("last_seen_at");
            e
        })
        .collect()
}

#[tokio::test]
async fn test_baseline_round_is_not_transmitted() {
    let provider = Arc::new(ScriptedProvider::default());
    let dispatcher = RecordingDispatcher::new();
    provider.push_names(Ok(names(&[("nginx", 10), ("nginx", 11), ("sshd", 2)])));
    provider.push_names(Ok(names(&[("nginx", 11), ("nginx", 10), ("sshd", 2)])));

    let watchdog = collector(&provider, &dispatcher);

    assert_eq!(watchdog.round().await, RoundOutcome::Idle);
    assert_eq!(dispatcher.total(), 0);

    // An all-running round after the baseline is still transmitted.
    assert_eq!(watchdog.round().await, RoundOutcome::Delivered);
    let sent = dispatcher.sent(Channel::Watchdog);
    assert_eq!(sent.len(), 1);

    let entries = sent[0]["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    for entry in entries {
        assert_eq!(entry["status"], "running");
        assert_eq!(entry["restart_count"], 0);
    }
    assert_eq!(entries[0]["name"], "nginx");
    assert_eq!(entries[0]["pids"], serde_json::json!([10, 11]));
}

#[tokio::test]
async fn test_crash_and_restart_are_reported() {
    let provider = Arc::new(ScriptedProvider::default());
    let dispatcher = RecordingDispatcher::new();
    provider.push_names(Ok(names(&[("api", 100), ("worker", 200), ("cron", 300)])));
    provider.push_names(Ok(names(&[("api", 100), ("worker", 201)])));

    let watchdog = collector(&provider, &dispatcher);
    watchdog.round().await;
    assert_eq!(watchdog.round().await, RoundOutcome::Delivered);

    let payload = &dispatcher.sent(Channel::Watchdog)[0];
    let entries = payload["entries"].as_array().unwrap();
    let summary: Vec<(&str, &str, u64)> = entries
        .iter()
        .map(|e| {
            (
                e["name"].as_str().unwrap(),
                e["status"].as_str().unwrap(),
                e["restart_count"].as_u64().unwrap(),
            )
        })
        .collect();

    assert_eq!(
        summary,
        vec![
            ("api", "running", 0),
            ("cron", "crashed", 0),
            ("worker", "restarted", 1),
        ]
    );
    assert_eq!(entries[1]["pids"], serde_json::json!([]));

    // Whole-second RFC3339 timestamps.
    let timestamp = payload["timestamp"].as_str().unwrap();
    assert!(timestamp.ends_with('Z') && !timestamp.contains('.'));
}

#[tokio::test]
async fn test_entries_are_capped_and_sorted() {
    let provider = Arc::new(ScriptedProvider::default());
    let dispatcher = RecordingDispatcher::new();

    let listing: Vec<(String, u32)> = (0..150u32)
        .rev()
        .map(|i| (format!("svc-{i:03}"), 1000 + i))
        .collect();
    provider.push_names(Ok(listing.clone()));
    provider.push_names(Ok(listing));

    let watchdog = collector(&provider, &dispatcher);
    watchdog.round().await;
    watchdog.round().await;

    let entries = dispatcher.sent(Channel::Watchdog)[0]["entries"]
        .as_array()
        .unwrap()
        .clone();
    assert_eq!(entries.len(), 100);

    let names: Vec<&str> = entries.iter().map(|e| e["name"].as_str().unwrap()).collect();
    let mut sorted = names.clone();
    sorted.sort();
    assert_eq!(names, sorted);
    assert_eq!(names[0], "svc-000");
    assert_eq!(names[99], "svc-099");
}

#[tokio::test]
async fn test_unchanged_process_set_is_stable() {
    let provider = Arc::new(ScriptedProvider::default());
    let dispatcher = RecordingDispatcher::new();
    let listing = names(&[("postgres", 5), ("postgres", 6), ("redis-server", 7)]);
    for _ in 0..3 {
        provider.push_names(Ok(listing.clone()));
    }

    let watchdog = collector(&provider, &dispatcher);
    for _ in 0..3 {
        watchdog.round().await;
    }

    let sent = dispatcher.sent(Channel::Watchdog);
    assert_eq!(sent.len(), 2);
    // last_seen_at moves with the clock; everything else must match.
    assert_eq!(without_last_seen(&sent[0]), without_last_seen(&sent[1]));

    for payload in &sent {
        for entry in payload["entries"].as_array().unwrap() {
            assert_eq!(entry["status"], "running");
            assert_eq!(entry["restart_count"], 0);
        }
    }
}

#[tokio::test]
async fn test_listing_failure_keeps_previous_snapshot() {
    let provider = Arc::new(ScriptedProvider::default());
    let dispatcher = RecordingDispatcher::new();
    provider.push_names(Ok(names(&[("app", 1), ("db", 2)])));
    provider.push_names(Err(listing_failure("process names")));
    provider.push_names(Ok(names(&[("app", 1), ("db", 3)])));

    let watchdog = collector(&provider, &dispatcher);
    assert_eq!(watchdog.round().await, RoundOutcome::Idle);
    assert_eq!(watchdog.round().await, RoundOutcome::Idle);
    assert_eq!(dispatcher.total(), 0);

    assert_eq!(watchdog.round().await, RoundOutcome::Delivered);
    let entries = dispatcher.sent(Channel::Watchdog)[0]["entries"]
        .as_array()
        .unwrap()
        .clone();
    assert_eq!(entries[0]["status"], "running");
    assert_eq!(entries[1]["status"], "restarted");
}

#[tokio::test]
async fn test_delivery_failure_is_reported() {
    let provider = Arc::new(ScriptedProvider::default());
    let dispatcher = RecordingDispatcher::new();
    provider.push_names(Ok(names(&[("app", 1)])));
    provider.push_names(Ok(names(&[("app", 1)])));
    dispatcher.fail(Channel::Watchdog);

    let watchdog = collector(&provider, &dispatcher);
    assert_eq!(watchdog.round().await, RoundOutcome::Idle);
    assert_eq!(watchdog.round().await, RoundOutcome::Failed);
}
