// mock_gateway: An in-process stand-in for the vendor SMS gateway device.
//
// Serves the candidate HTTP endpoint shapes the agent probes, behind HTTP
// Basic auth. Each test spins up its own isolated instance on a random port
// and configures which candidate path answers, which envelope key the
// response uses, and which ports fail.

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::extract::{RawQuery, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use base64::Engine;
use serde_json::{Value, json};

/// Candidate paths the agent tries for message fetches, in probe order.
pub const SMS_PATHS: &[&str] = &["/api/v1.0/sms/get", "/cgi-bin/api-get_sms", "/api/sms"];
/// Candidate paths for per-port GSM status.
pub const STATUS_PATHS: &[&str] = &["/api/v1.0/gsm/status", "/cgi-bin/api-get_gsm_status"];
/// Candidate paths for the connectivity probe.
pub const PROBE_PATHS: &[&str] = &["/api/v1.0/system/status", "/cgi-bin/api-get_status", "/api/status"];

struct GatewayState {
    username: String,
    password: String,
    /// The one SMS candidate path that answers; the others 404.
    answer_path: Mutex<String>,
    /// SMS candidate paths that answer 2xx with a generic non-inbox body.
    decoy_paths: Mutex<HashSet<String>>,
    /// Envelope key for responses; `None` means a bare top-level array.
    envelope_key: Mutex<Option<String>>,
    messages: Mutex<HashMap<u16, Vec<Value>>>,
    failing_ports: Mutex<HashSet<u16>>,
    hits: Mutex<Vec<String>>,
    acked: Mutex<Vec<Value>>,
}

/// A mock vendor gateway for integration testing.
pub struct MockGateway {
    addr: SocketAddr,
    state: Arc<GatewayState>,
    _task: tokio::task::JoinHandle<()>,
}

impl MockGateway {
    /// Start with defaults: credentials `admin`/`password`, first SMS
    /// candidate path answering, `messages` envelope.
    pub async fn start() -> Result<Self, std::io::Error> {
        Self::start_with_credentials("admin", "password").await
    }

    pub async fn start_with_credentials(
        username: &str,
        password: &str,
    ) -> Result<Self, std::io::Error> {
        let state = Arc::new(GatewayState {
            username: username.to_owned(),
            password: password.to_owned(),
            answer_path: Mutex::new(SMS_PATHS[0].to_owned()),
            decoy_paths: Mutex::new(HashSet::new()),
            envelope_key: Mutex::new(Some("messages".to_owned())),
            messages: Mutex::new(HashMap::new()),
            failing_ports: Mutex::new(HashSet::new()),
            hits: Mutex::new(Vec::new()),
            acked: Mutex::new(Vec::new()),
        });

        let mut router = Router::new();
        for path in SMS_PATHS {
            router = router.route(path, get(handle_sms));
        }
        for path in STATUS_PATHS {
            router = router.route(path, get(handle_status));
        }
        for path in PROBE_PATHS {
            router = router.route(path, get(handle_probe));
        }
        router = router.route("/api/v1.0/sms/delete", post(handle_delete));
        let router = router.with_state(state.clone());

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

    /// Base URL (`http://127.0.0.1:port`), handy for agent config.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Choose which SMS candidate path answers (index into [`SMS_PATHS`]).
    pub fn answer_on_candidate(&self, index: usize) {
        *self.state.answer_path.lock().unwrap() = SMS_PATHS[index].to_owned();
    }

    /// Make an SMS candidate path (index into [`SMS_PATHS`]) answer 200 with
    /// a generic `{"status":"ok"}` body instead of an inbox, mimicking
    /// firmwares that acknowledge every path they do not implement.
    pub fn decoy_on_candidate(&self, index: usize) {
        self.state
            .decoy_paths
            .lock()
            .unwrap()
            .insert(SMS_PATHS[index].to_owned());
    }

    /// Change the response envelope key; `None` serves a bare array.
    pub fn set_envelope_key(&self, key: Option<&str>) {
        *self.state.envelope_key.lock().unwrap() = key.map(str::to_owned);
    }

    /// Replace the canned messages for a port.
    pub fn seed_messages(&self, port: u16, messages: Vec<Value>) {
        self.state.messages.lock().unwrap().insert(port, messages);
    }

    /// Make SMS fetches for a port return 500.
    pub fn fail_port(&self, port: u16) {
        self.state.failing_ports.lock().unwrap().insert(port);
    }

    /// All requests seen so far, as `"METHOD path?query"` strings.
    pub fn hits(&self) -> Vec<String> {
        self.state.hits.lock().unwrap().clone()
    }

    /// Bodies of delete/acknowledge calls.
    pub fn acked(&self) -> Vec<Value> {
        self.state.acked.lock().unwrap().clone()
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

fn check_auth(state: &GatewayState, headers: &HeaderMap) -> bool {
    let Some(value) = headers.get("authorization").and_then(|v| v.to_str().ok()) else {
        return false;
    };
    let Some(encoded) = value.strip_prefix("Basic ") else {
        return false;
    };
    let Ok(decoded) = base64::engine::general_purpose::STANDARD.decode(encoded) else {
        return false;
    };
    let Ok(decoded) = String::from_utf8(decoded) else {
        return false;
    };
    decoded == format!("{}:{}", state.username, state.password)
}

fn record_hit(state: &GatewayState, method: &str, path: &str, query: Option<&str>) {
    let entry = match query {
        Some(q) => format!("{method} {path}?{q}"),
        None => format!("{method} {path}"),
    };
    state.hits.lock().unwrap().push(entry);
}

fn port_from_query(query: Option<&str>) -> Option<u16> {
    query?
        .split('&')
        .find_map(|pair| pair.strip_prefix("port="))
        .and_then(|p| p.parse().ok())
}

async fn handle_sms(
    State(state): State<Arc<GatewayState>>,
    uri: axum::http::Uri,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> impl IntoResponse {
    record_hit(&state, "GET", uri.path(), query.as_deref());
    if !check_auth(&state, &headers) {
        return (StatusCode::UNAUTHORIZED, axum::Json(json!({"error": "auth"})));
    }
    if state.decoy_paths.lock().unwrap().contains(uri.path()) {
        return (StatusCode::OK, axum::Json(json!({"status": "ok"})));
    }
    if uri.path() != *state.answer_path.lock().unwrap() {
        return (StatusCode::NOT_FOUND, axum::Json(json!({"error": "no such endpoint"})));
    }
    let Some(port) = port_from_query(query.as_deref()) else {
        return (StatusCode::BAD_REQUEST, axum::Json(json!({"error": "missing port"})));
    };
    if state.failing_ports.lock().unwrap().contains(&port) {
        return (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(json!({"error": "modem fault"})));
    }

    let messages = state
        .messages
        .lock()
        .unwrap()
        .get(&port)
        .cloned()
        .unwrap_or_default();
    let body = match &*state.envelope_key.lock().unwrap() {
        Some(key) => json!({ key.as_str(): messages }),
        None => Value::Array(messages),
    };
    (StatusCode::OK, axum::Json(body))
}

async fn handle_status(
    State(state): State<Arc<GatewayState>>,
    uri: axum::http::Uri,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> impl IntoResponse {
    record_hit(&state, "GET", uri.path(), query.as_deref());
    if !check_auth(&state, &headers) {
        return (StatusCode::UNAUTHORIZED, axum::Json(json!({"error": "auth"})));
    }
    let port = port_from_query(query.as_deref()).unwrap_or(0);
    (
        StatusCode::OK,
        axum::Json(json!({"port": port, "signal": 72, "carrier": "TestCell"})),
    )
}

async fn handle_probe(
    State(state): State<Arc<GatewayState>>,
    uri: axum::http::Uri,
    headers: HeaderMap,
) -> impl IntoResponse {
    record_hit(&state, "GET", uri.path(), None);
    if !check_auth(&state, &headers) {
        return (StatusCode::UNAUTHORIZED, axum::Json(json!({"error": "auth"})));
    }
    (
        StatusCode::OK,
        axum::Json(json!({"status": "ok", "model": "mock-gw", "uptime": 1234})),
    )
}

async fn handle_delete(
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
    axum::Json(body): axum::Json<Value>,
) -> impl IntoResponse {
    record_hit(&state, "POST", "/api/v1.0/sms/delete", None);
    if !check_auth(&state, &headers) {
        return (StatusCode::UNAUTHORIZED, axum::Json(json!({"error": "auth"})));
    }
    state.acked.lock().unwrap().push(body);
    (StatusCode::OK, axum::Json(json!({"status": "ok"})))
}
