//! Local status HTTP endpoint for the agent.
//!
//! Serves liveness/readiness probes, a JSON status snapshot, and a manual
//! poll trigger. Bound on the configured address; bind failures are fatal at
//! startup.
//!
//! `POST /api/v1/poll-now` never runs a cycle itself. It hands a token to the
//! poll loop's trigger channel (capacity 1); the loop runs cycles strictly one
//! at a time, so a trigger that arrives mid-cycle is queued and a second one
//! is refused with 409.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use axum::Router;
use chrono::{DateTime, Utc};
use serde_json::json;
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::info;

use crate::poll::CycleOutcome;

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct StatusConfig {
    /// Bind address, e.g. "0.0.0.0:8081".
    pub bind: String,
    pub agent_version: String,
}

#[derive(Debug, Default)]
struct StatusState {
    ready: bool,
    agent_id: String,
    agent_name: Option<String>,
    gateway_reachable: bool,
    datastore_reachable: bool,
    cycle_running: bool,
    last_cycle_at: Option<DateTime<Utc>>,
    last_cycle: Option<CycleOutcome>,
    /// Messages stored per port since startup.
    port_totals: BTreeMap<u16, u64>,
    seen_ids: usize,
}

struct Inner {
    config: StatusConfig,
    started_at: DateTime<Utc>,
    state: Mutex<StatusState>,
    trigger_tx: mpsc::Sender<()>,
}

/// Handle to the running status server; cheap to clone.
#[derive(Clone)]
pub struct StatusServer {
    inner: Arc<Inner>,
    local_addr: SocketAddr,
}

impl StatusServer {
    /// Bind and start serving. `trigger_tx` feeds the poll loop's manual
    /// trigger channel.
    pub async fn start(
        config: StatusConfig,
        trigger_tx: mpsc::Sender<()>,
    ) -> Result<Self, std::io::Error> {
        let listener = tokio::net::TcpListener::bind(&config.bind).await?;
        let local_addr = listener.local_addr()?;
        let inner = Arc::new(Inner {
            config,
            started_at: Utc::now(),
            state: Mutex::new(StatusState::default()),
            trigger_tx,
        });
        let router = Router::new()
            .route("/healthz", get(handle_healthz))
            .route("/readyz", get(handle_readyz))
            .route("/api/v1/status", get(handle_status))
            .route("/api/v1/poll-now", post(handle_poll_now))
            .with_state(inner.clone());
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                tracing::error!(error = %e, "status HTTP server stopped");
            }
        });
        Ok(Self { inner, local_addr })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub async fn set_ready(&self) {
        self.inner.state.lock().await.ready = true;
    }

    pub async fn set_agent_identity(&self, agent_id: &str, agent_name: Option<&str>) {
        let mut s = self.inner.state.lock().await;
        s.agent_id = agent_id.to_owned();
        s.agent_name = agent_name.map(str::to_owned);
    }

    pub async fn set_gateway_reachable(&self, reachable: bool) {
        self.inner.state.lock().await.gateway_reachable = reachable;
    }

    pub async fn set_datastore_reachable(&self, reachable: bool) {
        self.inner.state.lock().await.datastore_reachable = reachable;
    }

    pub async fn set_cycle_running(&self, running: bool) {
        self.inner.state.lock().await.cycle_running = running;
    }

    pub async fn record_cycle(&self, outcome: CycleOutcome, seen_ids: usize) {
        let mut s = self.inner.state.lock().await;
        s.last_cycle_at = Some(Utc::now());
        for &(port, new) in &outcome.per_port {
            *s.port_totals.entry(port).or_insert(0) += new as u64;
        }
        s.last_cycle = Some(outcome);
        s.seen_ids = seen_ids;
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn handle_healthz() -> &'static str {
    "ok"
}

async fn handle_readyz(State(inner): State<Arc<Inner>>) -> impl IntoResponse {
    if inner.state.lock().await.ready {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "starting")
    }
}

async fn handle_status(State(inner): State<Arc<Inner>>) -> impl IntoResponse {
    let s = inner.state.lock().await;
    let last_cycle = s.last_cycle.as_ref().map(|c| {
        json!({
            "ports_polled": c.ports_polled,
            "new_messages": c.new_messages,
            "failed_ports": c.failed_ports,
        })
    });
    let ports: Vec<_> = s
        .port_totals
        .iter()
        .map(|(port, total)| json!({"port": port, "messages_stored": total}))
        .collect();
    let uptime_secs = (Utc::now() - inner.started_at).num_seconds().max(0);
    Json(json!({
        "agent_id": s.agent_id,
        "agent_name": s.agent_name,
        "version": inner.config.agent_version,
        "ready": s.ready,
        "uptime_secs": uptime_secs,
        "gateway_reachable": s.gateway_reachable,
        "datastore_reachable": s.datastore_reachable,
        "cycle_running": s.cycle_running,
        "last_cycle_at": s.last_cycle_at,
        "last_cycle": last_cycle,
        "ports": ports,
        "seen_ids": s.seen_ids,
    }))
}

async fn handle_poll_now(State(inner): State<Arc<Inner>>) -> impl IntoResponse {
    if inner.state.lock().await.cycle_running {
        return (
            StatusCode::CONFLICT,
            Json(json!({ "status": "already_running" })),
        );
    }
    match inner.trigger_tx.try_send(()) {
        Ok(()) => {
            info!("manual poll requested");
            (StatusCode::ACCEPTED, Json(json!({ "status": "scheduled" })))
        }
        Err(_) => (
            StatusCode::CONFLICT,
            Json(json!({ "status": "already_scheduled" })),
        ),
    }
}
