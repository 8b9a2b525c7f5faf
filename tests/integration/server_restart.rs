//! Durability across server restarts: everything written through the HTTP
//! API must come back from a second server instance opened on the same
//! SQLite file, and port seeding must not duplicate rows.

use serde_json::{Value, json};
use std::path::Path;

async fn start_server(db_path: &Path) -> std::net::SocketAddr {
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

#[tokio::test]
async fn data_survives_a_restart() {
    let dir = tempfile::TempDir::new().unwrap();
    let db_path = dir.path().join("bridge.sqlite3");
    let client = reqwest::Client::new();

    let addr = start_server(&db_path).await;
    client
        .post(format!("http://{}/rest/v1/sms_messages", addr))
        .json(&json!({
            "external_id": "persist-1", "sim_port": 1,
            "sender_number": "+15550001", "message_content": "durable",
            "received_at": "2026-03-01T09:00:00Z",
        }))
        .send()
        .await
        .unwrap();
    client
        .patch(format!("http://{}/rest/v1/sim_port_config?port_number=eq.2", addr))
        .json(&json!({"label": "Warehouse", "phone_number": "+15559999"}))
        .send()
        .await
        .unwrap();
    client
        .put(format!("http://{}/rest/v1/gateway_config", addr))
        .json(&json!({"ip": "10.0.0.5"}))
        .send()
        .await
        .unwrap();

    // Second instance over the same file.
    let addr = start_server(&db_path).await;

    let rows: Vec<Value> = reqwest::get(format!("http://{}/rest/v1/sms_messages", addr))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["external_id"], "persist-1");

    let ports: Vec<Value> = reqwest::get(format!("http://{}/rest/v1/sim_port_config", addr))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(ports.len(), 4, "reopening must not re-seed ports");
    let port2 = ports.iter().find(|p| p["port_number"] == 2).unwrap();
    assert_eq!(port2["label"], "Warehouse");
    assert_eq!(port2["phone_number"], "+15559999");

    let config: Value = reqwest::get(format!("http://{}/rest/v1/gateway_config", addr))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(config["ip"], "10.0.0.5");
}

#[tokio::test]
async fn status_changes_survive_a_restart() {
    let dir = tempfile::TempDir::new().unwrap();
    let db_path = dir.path().join("bridge.sqlite3");
    let client = reqwest::Client::new();

    let addr = start_server(&db_path).await;
    client
        .post(format!("http://{}/rest/v1/sms_messages", addr))
        .json(&json!({
            "external_id": "read-1", "sim_port": 1,
            "sender_number": "+15550001", "message_content": "mark me",
            "received_at": "2026-03-01T09:00:00Z",
        }))
        .send()
        .await
        .unwrap();
    client
        .patch(format!(
            "http://{}/rest/v1/sms_messages?external_id=eq.read-1",
            addr
        ))
        .json(&json!({"status": "processed"}))
        .send()
        .await
        .unwrap();

    let addr = start_server(&db_path).await;
    let rows: Vec<Value> = reqwest::get(format!("http://{}/rest/v1/sms_messages", addr))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(rows[0]["status"], "processed");
}
