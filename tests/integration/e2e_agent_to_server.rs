//! End-to-end pipeline: mock gateway -> agent poll cycle -> server.
//!
//! The server runs in-process with a temp-file SQLite store; the agent's
//! gateway and sync clients run against the mock gateway and the real server
//! HTTP API. Everything the dashboard would read afterwards is asserted
//! through the server's own endpoints.

use agent::config::GatewayConfig;
use agent::dedup::SeenIds;
use agent::gateway::GatewayClient;
use agent::poll::run_cycle;
use agent::sync::SyncClient;
use bridge_test_utils::MockGateway;
use serde_json::{Value, json};
use std::time::Duration;

// ---------------------------------------------------------------------------
// Harness helpers
// ---------------------------------------------------------------------------

async fn start_server(db_path: &std::path::Path) -> std::net::SocketAddr {
    let store = server::db::Store::open(db_path).expect("open store");
    let state = server::AppState::new(store);
    let router = server::build_router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind server");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("server error");
    });
    addr
}

fn gateway_client(gw: &MockGateway) -> GatewayClient {
    let config = GatewayConfig {
        ip: gw.local_addr().to_string(),
        username: "admin".to_owned(),
        password: "password".to_owned(),
        ports: vec![1, 2],
        acknowledge: false,
    };
    GatewayClient::new(&config, Duration::from_secs(2)).expect("gateway client")
}

fn sync_client(addr: std::net::SocketAddr) -> SyncClient {
    SyncClient::new(
        &format!("http://{}", addr),
        "service-key",
        Duration::from_secs(2),
    )
    .expect("sync client")
}

async fn get_json(url: String) -> Value {
    reqwest::get(url).await.unwrap().json().await.unwrap()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

/// One cycle moves gateway messages into the server and marks the polled
/// ports as fresh; the dashboard endpoints see all of it.
#[tokio::test]
async fn e2e_cycle_lands_messages_and_port_status() {
    let dir = tempfile::TempDir::new().unwrap();
    let addr = start_server(&dir.path().join("bridge.sqlite3")).await;
    let gw = MockGateway::start().await.unwrap();
    gw.seed_messages(
        1,
        vec![
            json!({"id": "e2e-1", "from": "+15550001", "text": "hello", "time": "2026-03-01T09:00:00Z"}),
            json!({"id": "e2e-2", "from": "+15550002", "text": "world", "time": "2026-03-01T09:01:00Z"}),
        ],
    );
    gw.seed_messages(2, vec![json!({"id": "e2e-3", "from": "32665", "text": "third"})]);

    let gateway = gateway_client(&gw);
    let sync = sync_client(addr);
    let mut seen = SeenIds::new();
    let outcome = run_cycle(&[1, 2], &gateway, &sync, &mut seen, false).await;
    assert_eq!(outcome.new_messages, 3);
    assert_eq!(outcome.failed_ports, 0);
    assert_eq!(outcome.sync_failures, 0);

    let rows = get_json(format!("http://{}/rest/v1/sms_messages", addr)).await;
    let rows = rows.as_array().unwrap();
    assert_eq!(rows.len(), 3);
    assert!(rows.iter().all(|r| r["status"] == "unread"));

    // Polled ports report fresh last_seen_at and the mock's canned signal,
    // so the health decoration comes back online.
    let ports = get_json(format!("http://{}/rest/v1/sim_port_config", addr)).await;
    for port in ports.as_array().unwrap() {
        let number = port["port_number"].as_u64().unwrap();
        if number == 1 || number == 2 {
            assert_eq!(port["health"], "online", "port {}", number);
            assert_eq!(port["signal_strength"], 72);
        } else {
            assert_eq!(port["health"], "offline", "port {}", number);
        }
    }

    // The cycle appended an sms_received activity log, which flips the
    // inferred agent status.
    let status = get_json(format!("http://{}/api/v1/agent-status", addr)).await;
    assert_eq!(status["status"], "online");

    let stats = get_json(format!("http://{}/api/v1/stats", addr)).await;
    assert_eq!(stats["total_messages"], 3);
    assert_eq!(stats["unread_messages"], 3);
    assert_eq!(stats["active_ports"], 2);
}

/// A second cycle over unchanged gateway inboxes stores nothing new, and a
/// replayed record never duplicates a row (upsert on external id).
#[tokio::test]
async fn e2e_second_cycle_is_idempotent() {
    let dir = tempfile::TempDir::new().unwrap();
    let addr = start_server(&dir.path().join("bridge.sqlite3")).await;
    let gw = MockGateway::start().await.unwrap();
    gw.seed_messages(
        1,
        vec![json!({"id": "dup-1", "from": "+15550001", "text": "only once"})],
    );

    let gateway = gateway_client(&gw);
    let sync = sync_client(addr);
    let mut seen = SeenIds::new();

    let first = run_cycle(&[1, 2], &gateway, &sync, &mut seen, false).await;
    assert_eq!(first.new_messages, 1);
    let second = run_cycle(&[1, 2], &gateway, &sync, &mut seen, false).await;
    assert_eq!(second.new_messages, 0);

    // Even a fresh dedup set (an agent restart) cannot duplicate the row.
    let mut fresh = SeenIds::new();
    let third = run_cycle(&[1, 2], &gateway, &sync, &mut fresh, false).await;
    assert_eq!(third.new_messages, 1, "re-pushed after restart");

    let rows = get_json(format!("http://{}/rest/v1/sms_messages", addr)).await;
    assert_eq!(rows.as_array().unwrap().len(), 1, "upsert kept one row");
}

/// A port that stops answering is skipped without aborting the cycle; the
/// healthy port still delivers.
#[tokio::test]
async fn e2e_failed_port_does_not_block_the_rest() {
    let dir = tempfile::TempDir::new().unwrap();
    let addr = start_server(&dir.path().join("bridge.sqlite3")).await;
    let gw = MockGateway::start().await.unwrap();
    gw.seed_messages(
        2,
        vec![json!({"id": "ok-1", "from": "+15550002", "text": "still flowing"})],
    );
    gw.fail_port(1);

    let gateway = gateway_client(&gw);
    let sync = sync_client(addr);
    let mut seen = SeenIds::new();
    let outcome = run_cycle(&[1, 2], &gateway, &sync, &mut seen, false).await;

    // The mock's status endpoint still answers for the failed port, so the
    // failure shows up as an empty message read rather than a dead port.
    assert_eq!(outcome.new_messages, 1);
    let rows = get_json(format!("http://{}/rest/v1/sms_messages", addr)).await;
    assert_eq!(rows.as_array().unwrap()[0]["external_id"], "ok-1");
}
