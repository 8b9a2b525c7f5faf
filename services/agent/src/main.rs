// agent: Polls SMS gateway hardware and syncs messages to the datastore.
//
// Runtime event loop: wires together the gateway client, datastore sync
// client, poll loop, and the status HTTP server.

use agent::config::AgentConfig;
use agent::dedup::SeenIds;
use agent::gateway::GatewayClient;
use agent::scheduler::PollLoop;
use agent::status_http::{StatusConfig, StatusServer};
use agent::sync::{ActivityLogEntry, SyncClient};
use serde_json::json;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::time::sleep;
use tracing::{error, info, warn};

/// Derive the agent_id from the raw API key bytes.
///
/// SHA-256 hex of key bytes, first 16 hex chars, prefixed with "agent-".
fn derive_agent_id(api_key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(api_key.as_bytes());
    let result = hasher.finalize();
    let hex = format!("{:x}", result);
    format!("agent-{}", &hex[..16])
}

#[tokio::main]
async fn main() {
    // Initialize tracing subscriber for structured logging to stdout.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "agent starting");

    // Parse optional --config <path> argument.
    // Defaults to /etc/simbridge/agent.toml when not supplied.
    let args: Vec<String> = std::env::args().collect();
    let config_path = match args.iter().position(|a| a == "--config") {
        Some(i) => match args.get(i + 1) {
            Some(p) => std::path::PathBuf::from(p),
            None => {
                eprintln!("FATAL: --config requires a path argument");
                std::process::exit(1);
            }
        },
        None => std::path::PathBuf::from("/etc/simbridge/agent.toml"),
    };

    let cfg: AgentConfig = match agent::config::load_config_from_path(&config_path) {
        Ok(cfg) => {
            info!(
                gateway = %cfg.gateway.ip,
                datastore = %cfg.datastore.base_url,
                ports = cfg.gateway.ports.len(),
                "config loaded"
            );
            cfg
        }
        Err(e) => {
            eprintln!("FATAL: failed to load config: {}", e);
            std::process::exit(1);
        }
    };

    // Derive agent_id from the API key
    let agent_id = derive_agent_id(&cfg.datastore.api_key);
    info!(agent_id = %agent_id, "agent identity derived");

    let timeout = Duration::from_secs(cfg.poll.request_timeout_secs);
    let gateway = match GatewayClient::new(&cfg.gateway, timeout) {
        Ok(g) => Arc::new(g),
        Err(e) => {
            eprintln!("FATAL: failed to build gateway client: {}", e);
            std::process::exit(1);
        }
    };
    let sync = match SyncClient::new(&cfg.datastore.base_url, &cfg.datastore.api_key, timeout) {
        Ok(s) => Arc::new(s),
        Err(e) => {
            eprintln!("FATAL: failed to build datastore client: {}", e);
            std::process::exit(1);
        }
    };

    // Set up shutdown and manual-trigger channels
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (trigger_tx, trigger_rx) = mpsc::channel::<()>(1);

    // Start status HTTP server (not-ready initially)
    let status_cfg = StatusConfig {
        bind: cfg.status_http.bind.clone(),
        agent_version: env!("CARGO_PKG_VERSION").to_owned(),
    };
    let status = match StatusServer::start(status_cfg, trigger_tx).await {
        Ok(s) => {
            info!(addr = %s.local_addr(), "status HTTP server started");
            s
        }
        Err(e) => {
            eprintln!("FATAL: failed to start status HTTP server: {}", e);
            std::process::exit(1);
        }
    };
    status
        .set_agent_identity(&agent_id, cfg.agent_name.as_deref())
        .await;

    // Startup probe: find out whether the gateway answers at all, and record
    // the connection test in the activity log either way.
    let reachable = gateway.probe().await;
    if reachable {
        info!(gateway = %gateway.base_url(), "gateway reachable");
    } else {
        warn!(gateway = %gateway.base_url(), "gateway did not answer any probe endpoint");
    }
    status.set_gateway_reachable(reachable).await;
    let entry = ActivityLogEntry {
        event_type: "connection_test".to_owned(),
        message: if reachable {
            format!("Agent {} connected to gateway", agent_id)
        } else {
            format!("Agent {} could not reach gateway", agent_id)
        },
        severity: if reachable { "info" } else { "warning" }.to_owned(),
        metadata: Some(json!({ "agent_id": agent_id, "gateway": gateway.base_url() })),
    };
    if let Err(e) = sync.append_log(&entry).await {
        warn!(error = %e, "failed to record connection test in activity log");
    }

    // Spawn the poll loop
    {
        let poll_loop = PollLoop {
            ports: cfg.gateway.ports.clone(),
            interval_secs: cfg.poll.interval_secs,
            acknowledge: cfg.gateway.acknowledge,
            gateway: gateway.clone(),
            sync: sync.clone(),
            status: status.clone(),
            seen: Arc::new(Mutex::new(SeenIds::new())),
        };
        let rx = shutdown_rx.clone();
        tokio::spawn(async move {
            poll_loop.run(trigger_rx, rx).await;
        });
    }

    // Poll loop started — mark ready
    status.set_ready().await;
    info!(interval_secs = cfg.poll.interval_secs, "agent initialized, poll loop running");

    // Wait for Ctrl-C or SIGTERM
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(s) => s,
            Err(e) => {
                error!("failed to install SIGTERM handler: {}", e);
                tokio::signal::ctrl_c().await.ok();
                shutdown_tx.send(true).ok();
                return;
            }
        };

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown: SIGINT received");
            }
            _ = sigterm.recv() => {
                info!("shutdown: SIGTERM received");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await.ok();
        info!("shutdown: Ctrl-C received");
    }

    // Signal all tasks to stop
    shutdown_tx.send(true).ok();

    // Brief delay to allow the poll loop to observe shutdown
    sleep(Duration::from_millis(200)).await;

    info!("agent shutdown complete");
}
