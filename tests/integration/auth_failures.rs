//! Failure-path behavior: bad gateway credentials and a refusing datastore.
//! None of these conditions may abort a cycle; they degrade to empty reads
//! and retried pushes.

use agent::config::GatewayConfig;
use agent::dedup::SeenIds;
use agent::gateway::GatewayClient;
use agent::poll::run_cycle;
use agent::sync::{SyncClient, SyncError};
use bridge_test_utils::{MockDatastore, MockGateway};
use serde_json::json;
use std::time::Duration;

fn client_with_password(gw: &MockGateway, password: &str) -> GatewayClient {
    let config = GatewayConfig {
        ip: gw.local_addr().to_string(),
        username: "admin".to_owned(),
        password: password.to_owned(),
        ports: vec![1],
        acknowledge: false,
    };
    GatewayClient::new(&config, Duration::from_secs(2)).expect("gateway client")
}

#[tokio::test]
async fn bad_gateway_credentials_degrade_to_empty_reads() {
    let gw = MockGateway::start_with_credentials("admin", "correct")
        .await
        .unwrap();
    gw.seed_messages(1, vec![json!({"id": "m1", "from": "+1555", "text": "hi"})]);

    let client = client_with_password(&gw, "wrong");
    assert!(!client.probe().await);
    assert!(client.fetch_messages(1).await.is_empty());
    assert!(client.fetch_status(1).await.is_none());
    assert!(!client.acknowledge(1, &["m1".to_owned()]).await);

    // Every candidate was actually tried before giving up.
    let hits = gw.hits();
    assert!(hits.iter().any(|h| h.contains("/api/v1.0/sms/get")));
    assert!(hits.iter().any(|h| h.contains("/cgi-bin/api-get_sms")));
    assert!(hits.iter().any(|h| h.contains("/api/sms")));
}

#[tokio::test]
async fn cycle_with_bad_credentials_reports_all_ports_failed() {
    let gw = MockGateway::start_with_credentials("admin", "correct")
        .await
        .unwrap();
    let store = MockDatastore::start().await.unwrap();

    let client = client_with_password(&gw, "wrong");
    let sync = SyncClient::new(&store.base_url(), "service-key", Duration::from_secs(2))
        .expect("sync client");
    let mut seen = SeenIds::new();
    let outcome = run_cycle(&[1, 2], &client, &sync, &mut seen, false).await;

    assert_eq!(outcome.ports_polled, 2);
    assert_eq!(outcome.failed_ports, 2);
    assert_eq!(outcome.new_messages, 0);
    assert!(store.messages().is_empty());
}

#[tokio::test]
async fn refusing_datastore_surfaces_a_status_error() {
    let store = MockDatastore::start().await.unwrap();
    store.set_failing(true);
    let sync = SyncClient::new(&store.base_url(), "service-key", Duration::from_secs(2))
        .expect("sync client");

    let message = sms_core::SmsMessage {
        external_id: "x-1".to_owned(),
        sim_port: 1,
        sender_number: "+1555".to_owned(),
        message_content: "refused".to_owned(),
        received_at: chrono::Utc::now(),
        status: sms_core::MessageStatus::Unread,
    };
    match sync.push_message(&message).await {
        Err(SyncError::Status { status, .. }) => assert_eq!(status, 500),
        other => panic!("expected status error, got {:?}", other),
    }
}

#[tokio::test]
async fn failed_pushes_are_retried_next_cycle() {
    let gw = MockGateway::start().await.unwrap();
    gw.seed_messages(1, vec![json!({"id": "retry-1", "from": "+1555", "text": "later"})]);
    let store = MockDatastore::start().await.unwrap();
    store.set_failing(true);

    let client = client_with_password(&gw, "password");
    let sync = SyncClient::new(&store.base_url(), "service-key", Duration::from_secs(2))
        .expect("sync client");
    let mut seen = SeenIds::new();

    let outcome = run_cycle(&[1], &client, &sync, &mut seen, false).await;
    assert_eq!(outcome.new_messages, 0);
    assert!(outcome.sync_failures > 0);
    assert!(seen.is_empty(), "failed push must not be marked seen");

    store.set_failing(false);
    let outcome = run_cycle(&[1], &client, &sync, &mut seen, false).await;
    assert_eq!(outcome.new_messages, 1);
    assert_eq!(store.messages().len(), 1);
    assert_eq!(store.messages()[0]["external_id"], "retry-1");
}
