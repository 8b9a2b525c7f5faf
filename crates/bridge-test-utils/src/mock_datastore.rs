// mock_datastore: Records the agent's REST writes for assertions.
//
// Implements just enough of the datastore surface the sync client talks to:
// message upsert, port-status patch, and activity-log append. Rows are kept
// in memory with upsert-by-external_id semantics so tests can assert on the
// final state after duplicate pushes.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::extract::{RawQuery, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{patch, post};
use serde_json::Value;

#[derive(Default)]
struct DatastoreState {
    /// Message rows in insertion order; upserts replace in place.
    messages: Mutex<Vec<Value>>,
    /// `(port_number, patch body)` pairs.
    port_patches: Mutex<Vec<(u16, Value)>>,
    logs: Mutex<Vec<Value>>,
    /// When set, all writes return 500.
    failing: Mutex<bool>,
}

/// A mock datastore REST endpoint for integration testing.
pub struct MockDatastore {
    addr: SocketAddr,
    state: Arc<DatastoreState>,
    _task: tokio::task::JoinHandle<()>,
}

impl MockDatastore {
    pub async fn start() -> Result<Self, std::io::Error> {
        let state = Arc::new(DatastoreState::default());
        let router = Router::new()
            .route("/rest/v1/sms_messages", post(handle_push_message))
            .route("/rest/v1/sim_port_config", patch(handle_patch_port))
            .route("/rest/v1/activity_logs", post(handle_append_log))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let task = tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        Ok(Self {
            addr,
            state,
            _task: task,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Make every write fail with 500 (storage outage simulation).
    pub fn set_failing(&self, failing: bool) {
        *self.state.failing.lock().unwrap() = failing;
    }

    /// Current message rows, post-upsert.
    pub fn messages(&self) -> Vec<Value> {
        self.state.messages.lock().unwrap().clone()
    }

    /// The row with the given external id, if present.
    pub fn message(&self, external_id: &str) -> Option<Value> {
        self.state
            .messages
            .lock()
            .unwrap()
            .iter()
            .find(|row| row["external_id"] == external_id)
            .cloned()
    }

    pub fn port_patches(&self) -> Vec<(u16, Value)> {
        self.state.port_patches.lock().unwrap().clone()
    }

    pub fn logs(&self) -> Vec<Value> {
        self.state.logs.lock().unwrap().clone()
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

fn rows_of(body: Value) -> Vec<Value> {
    match body {
        Value::Array(rows) => rows,
        single => vec![single],
    }
}

async fn handle_push_message(
    State(state): State<Arc<DatastoreState>>,
    RawQuery(query): RawQuery,
    axum::Json(body): axum::Json<Value>,
) -> impl IntoResponse {
    if *state.failing.lock().unwrap() {
        return StatusCode::INTERNAL_SERVER_ERROR;
    }
    let upsert = query
        .as_deref()
        .is_some_and(|q| q.contains("on_conflict=external_id"));

    let mut messages = state.messages.lock().unwrap();
    for row in rows_of(body) {
        let existing = messages
            .iter_mut()
            .find(|r| r["external_id"] == row["external_id"]);
        match existing {
            Some(slot) if upsert => *slot = row,
            Some(_) => return StatusCode::CONFLICT,
            None => messages.push(row),
        }
    }
    StatusCode::CREATED
}

async fn handle_patch_port(
    State(state): State<Arc<DatastoreState>>,
    RawQuery(query): RawQuery,
    axum::Json(body): axum::Json<Value>,
) -> impl IntoResponse {
    if *state.failing.lock().unwrap() {
        return StatusCode::INTERNAL_SERVER_ERROR;
    }
    // Filter arrives PostgREST-style: ?port_number=eq.3
    let port = query
        .as_deref()
        .and_then(|q| {
            q.split('&')
                .find_map(|pair| pair.strip_prefix("port_number=eq."))
        })
        .and_then(|p| p.parse::<u16>().ok());
    let Some(port) = port else {
        return StatusCode::BAD_REQUEST;
    };
    state.port_patches.lock().unwrap().push((port, body));
    StatusCode::NO_CONTENT
}

async fn handle_append_log(
    State(state): State<Arc<DatastoreState>>,
    axum::Json(body): axum::Json<Value>,
) -> impl IntoResponse {
    if *state.failing.lock().unwrap() {
        return StatusCode::INTERNAL_SERVER_ERROR;
    }
    state.logs.lock().unwrap().push(body);
    StatusCode::CREATED
}
