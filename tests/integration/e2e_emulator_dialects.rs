//! The agent's gateway client against the emulator, one firmware dialect at
//! a time. Each dialect answers on a different candidate path with its own
//! envelope and field spelling; the client must land on the right endpoint
//! and the normalizer must produce the same canonical shape regardless.

use agent::config::GatewayConfig;
use agent::gateway::GatewayClient;
use chrono::Utc;
use emulator::{Dialect, EmulatorConfig, start_background};
use sms_core::normalize::normalize_message;
use std::time::Duration;

fn emulator_config(dialect: Dialect) -> EmulatorConfig {
    EmulatorConfig {
        bind_port: 0,
        username: "admin".to_owned(),
        password: "secret".to_owned(),
        dialect,
        ports: vec![1, 2],
        // Generator off: tests seed through the dialect's own generator.
        delay: 0,
        seed_file: None,
    }
}

async fn client_for(addr: std::net::SocketAddr) -> GatewayClient {
    let config = GatewayConfig {
        ip: addr.to_string(),
        username: "admin".to_owned(),
        password: "secret".to_owned(),
        ports: vec![1, 2],
        acknowledge: true,
    };
    GatewayClient::new(&config, Duration::from_secs(2)).expect("gateway client")
}

#[tokio::test]
async fn probe_succeeds_on_every_dialect() {
    for dialect in [Dialect::Modern, Dialect::Cgi, Dialect::Bare] {
        let addr = start_background(emulator_config(dialect)).await.unwrap();
        let client = client_for(addr).await;
        assert!(client.probe().await, "dialect {:?}", dialect);
    }
}

#[tokio::test]
async fn seeded_messages_normalize_identically_across_dialects() {
    for dialect in [Dialect::Modern, Dialect::Cgi, Dialect::Bare] {
        let dir = tempfile::TempDir::new().unwrap();
        let seed_path = dir.path().join("seed.txt");
        std::fs::write(&seed_path, "+15550001|Dialect check|1\n").unwrap();

        let mut config = emulator_config(dialect);
        config.seed_file = Some(seed_path.to_string_lossy().into_owned());
        let addr = start_background(config).await.unwrap();
        let client = client_for(addr).await;

        let raw = client.fetch_messages(1).await;
        assert_eq!(raw.len(), 1, "dialect {:?}", dialect);
        let message = normalize_message(&raw[0], 1, Utc::now());
        assert_eq!(message.sender_number, "+15550001");
        assert_eq!(message.message_content, "Dialect check");
        assert_eq!(message.sim_port, 1);

        // Empty ports answer with an empty list, not an error.
        assert!(client.fetch_messages(2).await.is_empty());
    }
}

#[tokio::test]
async fn status_reads_follow_the_dialect() {
    let addr = start_background(emulator_config(Dialect::Modern))
        .await
        .unwrap();
    let client = client_for(addr).await;
    let status = client.fetch_status(3).await.expect("modern status");
    assert_eq!(status.signal_strength, Some(70));
    assert_eq!(status.carrier.as_deref(), Some("EmuCell"));

    // The cgi firmware nests the reading and stringifies the signal.
    let addr = start_background(emulator_config(Dialect::Cgi)).await.unwrap();
    let client = client_for(addr).await;
    let status = client.fetch_status(3).await.expect("cgi status");
    assert_eq!(status.signal_strength, Some(70));
    assert_eq!(status.carrier.as_deref(), Some("EmuCell"));

    // The bare firmware has no status endpoint at all.
    let addr = start_background(emulator_config(Dialect::Bare)).await.unwrap();
    let client = client_for(addr).await;
    assert!(client.fetch_status(3).await.is_none());
}

#[tokio::test]
async fn acknowledge_empties_the_modern_inbox() {
    let dir = tempfile::TempDir::new().unwrap();
    let seed_path = dir.path().join("seed.txt");
    std::fs::write(&seed_path, "+15550001|ack me|1\n+15550002|keep me|2\n").unwrap();

    let mut config = emulator_config(Dialect::Modern);
    config.seed_file = Some(seed_path.to_string_lossy().into_owned());
    let addr = start_background(config).await.unwrap();
    let client = client_for(addr).await;

    let raw = client.fetch_messages(1).await;
    let ids: Vec<String> = raw
        .iter()
        .filter_map(sms_core::normalize::vendor_id)
        .collect();
    assert_eq!(ids, vec!["seed-1".to_owned()]);
    assert!(client.acknowledge(1, &ids).await);

    assert!(client.fetch_messages(1).await.is_empty(), "inbox drained");
    assert_eq!(client.fetch_messages(2).await.len(), 1, "other port kept");
}

#[tokio::test]
async fn wrong_credentials_fetch_nothing() {
    let addr = start_background(emulator_config(Dialect::Modern))
        .await
        .unwrap();
    let config = GatewayConfig {
        ip: addr.to_string(),
        username: "admin".to_owned(),
        password: "wrong".to_owned(),
        ports: vec![1],
        acknowledge: false,
    };
    let client = GatewayClient::new(&config, Duration::from_secs(2)).expect("gateway client");
    assert!(!client.probe().await);
    assert!(client.fetch_messages(1).await.is_empty());
}
