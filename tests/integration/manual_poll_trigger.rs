//! The agent's status server and poll loop wired together: manual triggers
//! through `POST /api/v1/poll-now`, the status snapshot, and shutdown.

use agent::config::GatewayConfig;
use agent::dedup::SeenIds;
use agent::gateway::GatewayClient;
use agent::scheduler::PollLoop;
use agent::status_http::{StatusConfig, StatusServer};
use agent::sync::SyncClient;
use bridge_test_utils::{MockDatastore, MockGateway};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, mpsc, watch};

struct Harness {
    gw: MockGateway,
    store: MockDatastore,
    status: StatusServer,
    shutdown_tx: watch::Sender<bool>,
}

async fn start_agent() -> Harness {
    let gw = MockGateway::start().await.unwrap();
    let store = MockDatastore::start().await.unwrap();

    let gateway_config = GatewayConfig {
        ip: gw.local_addr().to_string(),
        username: "admin".to_owned(),
        password: "password".to_owned(),
        ports: vec![1, 2],
        acknowledge: false,
    };
    let gateway = Arc::new(
        GatewayClient::new(&gateway_config, Duration::from_secs(2)).expect("gateway client"),
    );
    let sync = Arc::new(
        SyncClient::new(&store.base_url(), "service-key", Duration::from_secs(2))
            .expect("sync client"),
    );

    let (trigger_tx, trigger_rx) = mpsc::channel(1);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let status = StatusServer::start(
        StatusConfig {
            bind: "127.0.0.1:0".to_owned(),
            agent_version: "test".to_owned(),
        },
        trigger_tx,
    )
    .await
    .expect("status server");
    status.set_agent_identity("agent-test", Some("Test agent")).await;
    status.set_ready().await;

    let poll_loop = PollLoop {
        ports: vec![1, 2],
        // Long interval so only the startup tick and manual triggers run.
        interval_secs: 3600,
        acknowledge: false,
        gateway,
        sync,
        status: status.clone(),
        seen: Arc::new(Mutex::new(SeenIds::new())),
    };
    tokio::spawn(poll_loop.run(trigger_rx, shutdown_rx));

    Harness {
        gw,
        store,
        status,
        shutdown_tx,
    }
}

async fn wait_for_messages(store: &MockDatastore, count: usize) {
    for _ in 0..100 {
        if store.messages().len() >= count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!(
        "timed out waiting for {} message(s), have {}",
        count,
        store.messages().len()
    );
}

#[tokio::test]
async fn manual_trigger_runs_a_cycle() {
    let h = start_agent().await;
    // The interval's immediate first tick runs a cycle over empty inboxes.
    tokio::time::sleep(Duration::from_millis(50)).await;

    h.gw.seed_messages(
        1,
        vec![json!({"id": "t-1", "from": "+15550001", "text": "triggered"})],
    );
    let client = reqwest::Client::new();
    let resp = client
        .post(format!("http://{}/api/v1/poll-now", h.status.local_addr()))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 202);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "scheduled");

    wait_for_messages(&h.store, 1).await;
    assert_eq!(h.store.messages()[0]["external_id"], "t-1");

    let _ = h.shutdown_tx.send(true);
}

#[tokio::test]
async fn status_snapshot_reflects_the_last_cycle() {
    let h = start_agent().await;
    h.gw.seed_messages(
        2,
        vec![json!({"id": "s-1", "from": "+15550002", "text": "snapshot"})],
    );

    let client = reqwest::Client::new();
    client
        .post(format!("http://{}/api/v1/poll-now", h.status.local_addr()))
        .send()
        .await
        .unwrap();
    wait_for_messages(&h.store, 1).await;

    let status: Value = reqwest::get(format!("http://{}/api/v1/status", h.status.local_addr()))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["agent_id"], "agent-test");
    assert_eq!(status["ready"], true);
    assert_eq!(status["gateway_reachable"], true);
    assert_eq!(status["datastore_reachable"], true);
    assert_eq!(status["cycle_running"], false);
    assert!(status["last_cycle_at"].is_string());
    assert_eq!(status["last_cycle"]["ports_polled"], 2);
    assert!(status["uptime_secs"].as_i64().unwrap() >= 0);

    // Per-port counters accumulate across cycles.
    let ports = status["ports"].as_array().unwrap();
    let port2 = ports.iter().find(|p| p["port"] == 2).expect("port 2 entry");
    assert_eq!(port2["messages_stored"], 1);

    let _ = h.shutdown_tx.send(true);
}

#[tokio::test]
async fn probes_answer_while_the_loop_runs() {
    let h = start_agent().await;
    let addr = h.status.local_addr();

    let resp = reqwest::get(format!("http://{}/healthz", addr)).await.unwrap();
    assert_eq!(resp.status(), 200);
    let resp = reqwest::get(format!("http://{}/readyz", addr)).await.unwrap();
    assert_eq!(resp.status(), 200);

    let _ = h.shutdown_tx.send(true);
}

#[tokio::test]
async fn second_trigger_while_scheduled_is_refused() {
    // A standalone status server whose trigger channel nobody drains: the
    // first trigger fills the capacity-1 channel, the second is refused.
    let (trigger_tx, _trigger_rx) = mpsc::channel(1);
    let status = StatusServer::start(
        StatusConfig {
            bind: "127.0.0.1:0".to_owned(),
            agent_version: "test".to_owned(),
        },
        trigger_tx,
    )
    .await
    .expect("status server");

    let client = reqwest::Client::new();
    let url = format!("http://{}/api/v1/poll-now", status.local_addr());
    let resp = client.post(&url).send().await.unwrap();
    assert_eq!(resp.status(), 202);

    let resp = client.post(&url).send().await.unwrap();
    assert_eq!(resp.status(), 409);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "already_scheduled");
}

#[tokio::test]
async fn trigger_during_a_running_cycle_conflicts() {
    let (trigger_tx, _trigger_rx) = mpsc::channel(1);
    let status = StatusServer::start(
        StatusConfig {
            bind: "127.0.0.1:0".to_owned(),
            agent_version: "test".to_owned(),
        },
        trigger_tx,
    )
    .await
    .expect("status server");
    status.set_cycle_running(true).await;

    let client = reqwest::Client::new();
    let resp = client
        .post(format!("http://{}/api/v1/poll-now", status.local_addr()))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "already_running");
}
