//! A vendor SMS-gateway emulator for demos and end-to-end testing.
//!
//! Serves the candidate endpoint paths real gateway firmwares expose, behind
//! HTTP Basic auth, speaking one configurable response dialect at a time.
//! Messages arrive either from a seed file (one `sender|content|port` line
//! per message) or from the built-in traffic generator, which deposits a
//! fresh message into a rotating port inbox at a fixed interval.

use std::collections::HashMap;
use std::convert::TryFrom;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::extract::{RawQuery, State};
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use base64::Engine;
use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use tokio::time::sleep;
use tracing::{debug, info};

// ---------------------------------------------------------------------------
// Dialects
// ---------------------------------------------------------------------------

/// Which firmware flavour the emulator imitates.
///
/// Each dialect answers on a different candidate path, wraps the message
/// list differently, and spells the record fields its own way. Requests to
/// the other dialects' paths return 404, which is exactly what a real device
/// of that firmware generation does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// `/api/v1.0/*`, `messages` envelope, `id`/`from`/`text`/`time` fields.
    Modern,
    /// `/cgi-bin/*`, `data` envelope, `msgid`/`number`/`content`/`date`
    /// fields with SQL-style timestamps.
    Cgi,
    /// `/api/sms`, bare top-level array, no id field at all.
    Bare,
}

impl TryFrom<&str> for Dialect {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "modern" => Ok(Dialect::Modern),
            "cgi" => Ok(Dialect::Cgi),
            "bare" => Ok(Dialect::Bare),
            other => Err(format!("unknown dialect '{}'", other)),
        }
    }
}

impl Dialect {
    pub fn sms_path(self) -> &'static str {
        match self {
            Dialect::Modern => "/api/v1.0/sms/get",
            Dialect::Cgi => "/cgi-bin/api-get_sms",
            Dialect::Bare => "/api/sms",
        }
    }

    pub fn status_path(self) -> Option<&'static str> {
        match self {
            Dialect::Modern => Some("/api/v1.0/gsm/status"),
            Dialect::Cgi => Some("/cgi-bin/api-get_gsm_status"),
            // The bare firmware generation has no status endpoint.
            Dialect::Bare => None,
        }
    }

    pub fn probe_path(self) -> &'static str {
        match self {
            Dialect::Modern => "/api/v1.0/system/status",
            Dialect::Cgi => "/cgi-bin/api-get_status",
            Dialect::Bare => "/api/status",
        }
    }

    fn wrap(self, messages: Vec<Value>) -> Value {
        match self {
            Dialect::Modern => json!({ "messages": messages }),
            Dialect::Cgi => json!({ "data": messages }),
            Dialect::Bare => Value::Array(messages),
        }
    }
}

// ---------------------------------------------------------------------------
// Traffic generation
// ---------------------------------------------------------------------------

const SAMPLE_SENDERS: &[&str] = &["+15550100", "+15550101", "+442071234567", "32665"];
const SAMPLE_TEXTS: &[&str] = &[
    "Your verification code is 482913",
    "Reminder: appointment tomorrow at 10:00",
    "Your package is out for delivery",
    "Balance alert: account ending 4821",
];

/// Render one message record in the dialect's field spelling.
///
/// `seq` drives both the sample rotation and the vendor id, so generated
/// traffic is deterministic for a given sequence position.
pub fn generate_message(dialect: Dialect, seq: u64, now: DateTime<Utc>) -> Value {
    let sender = SAMPLE_SENDERS[(seq as usize) % SAMPLE_SENDERS.len()];
    let text = SAMPLE_TEXTS[(seq as usize) % SAMPLE_TEXTS.len()];
    match dialect {
        Dialect::Modern => json!({
            "id": format!("gen-{}", seq),
            "from": sender,
            "text": text,
            "time": now.to_rfc3339(),
        }),
        Dialect::Cgi => json!({
            "msgid": format!("gen-{}", seq),
            "number": sender,
            "content": text,
            "date": now.format("%Y-%m-%d %H:%M:%S").to_string(),
        }),
        Dialect::Bare => json!({
            "sender": sender,
            "message": text,
            "timestamp": now.to_rfc3339(),
        }),
    }
}

/// Parse one `sender|content|port` seed line. Blank lines and `#` comments
/// are skipped by the caller.
pub fn parse_seed_line(line: &str) -> Option<(String, String, u16)> {
    let mut parts = line.splitn(3, '|');
    let sender = parts.next()?.trim();
    let content = parts.next()?.trim();
    let port = parts.next().and_then(|p| p.trim().parse().ok()).unwrap_or(1);
    if sender.is_empty() || content.is_empty() {
        return None;
    }
    Some((sender.to_owned(), content.to_owned(), port))
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

pub struct EmulatorConfig {
    pub bind_port: u16,
    pub username: String,
    pub password: String,
    pub dialect: Dialect,
    pub ports: Vec<u16>,
    /// Milliseconds between generated messages; 0 disables the generator.
    pub delay: u64,
    pub seed_file: Option<String>,
}

struct Inboxes {
    dialect: Dialect,
    username: String,
    password: String,
    messages: Mutex<HashMap<u16, Vec<Value>>>,
    seq: Mutex<u64>,
}

impl Inboxes {
    fn next_seq(&self) -> u64 {
        let mut seq = self.seq.lock().unwrap();
        *seq += 1;
        *seq
    }

    fn deposit(&self, port: u16, message: Value) {
        self.messages
            .lock()
            .unwrap()
            .entry(port)
            .or_default()
            .push(message);
    }

    /// Drop messages whose vendor id is in `ids`. Bare-dialect records carry
    /// no id, so acknowledgement is a no-op there.
    fn remove_acked(&self, port: u16, ids: &[String]) -> usize {
        let mut inboxes = self.messages.lock().unwrap();
        let Some(inbox) = inboxes.get_mut(&port) else {
            return 0;
        };
        let before = inbox.len();
        inbox.retain(|m| {
            sms_core::normalize::vendor_id(m)
                .map(|id| !ids.contains(&id))
                .unwrap_or(true)
        });
        before - inbox.len()
    }
}

fn check_auth(state: &Inboxes, headers: &HeaderMap) -> bool {
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

fn port_from_query(query: Option<&str>) -> Option<u16> {
    query?
        .split('&')
        .find_map(|pair| pair.strip_prefix("port="))
        .and_then(|p| p.parse().ok())
}

async fn handle_sms(
    State(state): State<Arc<Inboxes>>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> impl IntoResponse {
    if !check_auth(&state, &headers) {
        return (StatusCode::UNAUTHORIZED, axum::Json(json!({"error": "auth required"})));
    }
    let Some(port) = port_from_query(query.as_deref()) else {
        return (StatusCode::BAD_REQUEST, axum::Json(json!({"error": "missing port"})));
    };
    let messages = state
        .messages
        .lock()
        .unwrap()
        .get(&port)
        .cloned()
        .unwrap_or_default();
    debug!(port, count = messages.len(), "serving inbox");
    (StatusCode::OK, axum::Json(state.dialect.wrap(messages)))
}

async fn handle_status(
    State(state): State<Arc<Inboxes>>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> impl IntoResponse {
    if !check_auth(&state, &headers) {
        return (StatusCode::UNAUTHORIZED, axum::Json(json!({"error": "auth required"})));
    }
    let port = port_from_query(query.as_deref()).unwrap_or(0);
    // Signal varies by port so dashboards show distinct bars.
    let signal = 55 + i64::from(port % 8) * 5;
    let body = match state.dialect {
        Dialect::Modern => json!({"port": port, "signal": signal, "carrier": "EmuCell"}),
        Dialect::Cgi => {
            json!({"data": {"signal_strength": signal.to_string(), "network": "EmuCell"}})
        }
        Dialect::Bare => json!({}),
    };
    (StatusCode::OK, axum::Json(body))
}

async fn handle_probe(
    State(state): State<Arc<Inboxes>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    if !check_auth(&state, &headers) {
        return (StatusCode::UNAUTHORIZED, axum::Json(json!({"error": "auth required"})));
    }
    (
        StatusCode::OK,
        axum::Json(json!({"status": "ok", "model": "SMS-EMU-8", "ports": 8})),
    )
}

async fn handle_delete(
    State(state): State<Arc<Inboxes>>,
    headers: HeaderMap,
    axum::Json(body): axum::Json<Value>,
) -> impl IntoResponse {
    if !check_auth(&state, &headers) {
        return (StatusCode::UNAUTHORIZED, axum::Json(json!({"error": "auth required"})));
    }
    let port = body
        .get("port")
        .and_then(Value::as_u64)
        .and_then(|p| u16::try_from(p).ok())
        .unwrap_or(0);
    let ids: Vec<String> = body
        .get("ids")
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().map(str::to_owned))
                .collect()
        })
        .unwrap_or_default();
    let removed = state.remove_acked(port, &ids);
    info!(port, removed, "acknowledged messages");
    (StatusCode::OK, axum::Json(json!({"status": "ok", "removed": removed})))
}

async fn handle_wrong_dialect(uri: Uri) -> impl IntoResponse {
    debug!(path = %uri.path(), "request for a path this firmware does not serve");
    (StatusCode::NOT_FOUND, axum::Json(json!({"error": "not found"})))
}

fn build_router(state: Arc<Inboxes>) -> Router {
    let dialect = state.dialect;
    let mut router = Router::new()
        .route(dialect.sms_path(), get(handle_sms))
        .route(dialect.probe_path(), get(handle_probe));
    if let Some(path) = dialect.status_path() {
        router = router.route(path, get(handle_status));
    }
    if dialect == Dialect::Modern {
        router = router.route("/api/v1.0/sms/delete", post(handle_delete));
    }
    router.fallback(handle_wrong_dialect).with_state(state)
}

/// Generate one message per tick into a rotating port inbox.
async fn feed_inboxes(state: Arc<Inboxes>, ports: Vec<u16>, delay: u64) {
    loop {
        let seq = state.next_seq();
        let port = ports[(seq as usize) % ports.len()];
        let message = generate_message(state.dialect, seq, Utc::now());
        state.deposit(port, message);
        debug!(port, seq, "generated message");
        sleep(Duration::from_millis(delay)).await;
    }
}

fn load_seed_file(state: &Inboxes, path: &str) -> Result<usize, std::io::Error> {
    let content = std::fs::read_to_string(path)?;
    let mut loaded = 0;
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((sender, text, port)) = parse_seed_line(line) {
            let seq = state.next_seq();
            let message = match state.dialect {
                Dialect::Modern => json!({
                    "id": format!("seed-{}", seq),
                    "from": sender, "text": text, "time": Utc::now().to_rfc3339(),
                }),
                Dialect::Cgi => json!({
                    "msgid": format!("seed-{}", seq),
                    "number": sender, "content": text,
                    "date": Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
                }),
                Dialect::Bare => json!({
                    "sender": sender, "message": text,
                    "timestamp": Utc::now().to_rfc3339(),
                }),
            };
            state.deposit(port, message);
            loaded += 1;
        }
    }
    Ok(loaded)
}

fn setup(config: &EmulatorConfig) -> Result<Arc<Inboxes>, std::io::Error> {
    let state = Arc::new(Inboxes {
        dialect: config.dialect,
        username: config.username.clone(),
        password: config.password.clone(),
        messages: Mutex::new(HashMap::new()),
        seq: Mutex::new(0),
    });

    if let Some(path) = &config.seed_file {
        let loaded = load_seed_file(&state, path)?;
        info!(loaded, path = path.as_str(), "seeded inboxes from file");
    }

    if config.delay > 0 {
        tokio::spawn(feed_inboxes(
            state.clone(),
            config.ports.clone(),
            config.delay,
        ));
    }
    Ok(state)
}

pub async fn run(config: EmulatorConfig) -> Result<(), std::io::Error> {
    let state = setup(&config)?;
    let listener =
        tokio::net::TcpListener::bind(("0.0.0.0", config.bind_port)).await?;
    info!(
        port = config.bind_port,
        dialect = ?config.dialect,
        "emulator listening"
    );
    axum::serve(listener, build_router(state)).await
}

/// Bind a loopback port and serve in the background, for in-process demos
/// and integration tests. `bind_port` 0 picks an ephemeral port; the bound
/// address is returned.
pub async fn start_background(
    config: EmulatorConfig,
) -> Result<std::net::SocketAddr, std::io::Error> {
    let state = setup(&config)?;
    let listener =
        tokio::net::TcpListener::bind(("127.0.0.1", config.bind_port)).await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, build_router(state)).await;
    });
    Ok(addr)
}
