//! HTTP client for the SMS gateway hardware.
//!
//! Gateway firmware varies by vendor and revision, so every read goes through
//! a fixed list of candidate endpoints. The first candidate whose 2xx JSON
//! answer the caller recognizes is cached and tried first on subsequent
//! calls; a cached candidate that stops answering (or stops making sense)
//! falls back to the full scan. For message reads "recognized" means the
//! body carries one of the known inbox envelope shapes, so a firmware that
//! answers every path with a generic `{"status":"ok"}` cannot shadow the
//! path that actually serves the inbox.
//!
//! Read failures are soft: a port that cannot be reached yields no messages
//! and no status rather than an error, and the caller decides how to log it.

use serde_json::Value;
use sms_core::normalize::extract_messages;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::config::GatewayConfig;

/// Candidate endpoints for reading a port's inbox (`?port=N` appended).
pub const SMS_ENDPOINTS: &[&str] = &["/api/v1.0/sms/get", "/cgi-bin/api-get_sms", "/api/sms"];

/// Candidate endpoints for a port's GSM status (`?port=N` appended).
pub const STATUS_ENDPOINTS: &[&str] = &["/api/v1.0/gsm/status", "/cgi-bin/api-get_gsm_status"];

/// Candidate endpoints for a bare reachability probe.
pub const PROBE_ENDPOINTS: &[&str] =
    &["/api/v1.0/system/status", "/cgi-bin/api-get_status", "/api/status"];

/// Endpoint for deleting delivered messages from the gateway inbox.
pub const DELETE_ENDPOINT: &str = "/api/v1.0/sms/delete";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// GSM status of a single SIM port as reported by the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortStatus {
    pub signal_strength: Option<i64>,
    pub carrier: Option<String>,
}

pub struct GatewayClient {
    http: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
    sms_endpoint: Mutex<Option<&'static str>>,
    status_endpoint: Mutex<Option<&'static str>>,
}

impl GatewayClient {
    pub fn new(config: &GatewayConfig, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: format!("http://{}", config.ip),
            username: config.username.clone(),
            password: config.password.clone(),
            sms_endpoint: Mutex::new(None),
            status_endpoint: Mutex::new(None),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Check whether the gateway answers any probe endpoint at all.
    pub async fn probe(&self) -> bool {
        for path in PROBE_ENDPOINTS {
            if self.get_json(path, None).await.is_some() {
                return true;
            }
        }
        false
    }

    /// Fetch the raw inbox of one SIM port.
    ///
    /// Returns an empty vec when the gateway is unreachable, answers with an
    /// unexpected payload, or the port has no messages.
    pub async fn fetch_messages(&self, port: u16) -> Vec<Value> {
        // Only a body with a known inbox shape counts as an answer; a 2xx
        // candidate without one keeps the scan going.
        let Some(body) = self
            .get_via_candidates(&self.sms_endpoint, SMS_ENDPOINTS, port, |b| {
                extract_messages(b).is_some()
            })
            .await
        else {
            return Vec::new();
        };
        extract_messages(&body).unwrap_or_default()
    }

    /// Fetch GSM status for one SIM port.
    pub async fn fetch_status(&self, port: u16) -> Option<PortStatus> {
        // Status payloads have no common shape across firmwares; any JSON
        // answer is taken and parsed field-by-field.
        let body = self
            .get_via_candidates(&self.status_endpoint, STATUS_ENDPOINTS, port, |_| true)
            .await?;
        Some(parse_port_status(&body))
    }

    /// Delete delivered messages from the gateway inbox.
    ///
    /// Returns true on a 2xx response. Failure is logged and swallowed; the
    /// messages just come back on the next poll and dedup drops them.
    pub async fn acknowledge(&self, port: u16, ids: &[String]) -> bool {
        let url = format!("{}{}", self.base_url, DELETE_ENDPOINT);
        let body = serde_json::json!({ "port": port, "ids": ids });
        match self
            .http
            .post(&url)
            .basic_auth(&self.username, Some(&self.password))
            .json(&body)
            .send()
            .await
        {
            Ok(resp) if resp.status().is_success() => true,
            Ok(resp) => {
                warn!(port = %port, status = %resp.status(), "gateway rejected message delete");
                false
            }
            Err(e) => {
                warn!(port = %port, error = %e, "gateway delete request failed");
                false
            }
        }
    }

    // -----------------------------------------------------------------------
    // Candidate resolution
    // -----------------------------------------------------------------------

    /// GET `?port=N` via the cached candidate first, then the full list.
    ///
    /// A candidate only wins (and gets cached) when `accept` recognizes its
    /// body; an unrecognized 2xx answer is treated like a miss.
    async fn get_via_candidates(
        &self,
        cache: &Mutex<Option<&'static str>>,
        candidates: &[&'static str],
        port: u16,
        accept: impl Fn(&Value) -> bool,
    ) -> Option<Value> {
        let cached = *cache.lock().await;
        if let Some(path) = cached {
            match self.get_json(path, Some(port)).await {
                Some(body) if accept(&body) => return Some(body),
                Some(_) => {
                    debug!(path = %path, "cached gateway endpoint answered with an unrecognized payload, rescanning");
                }
                None => {
                    debug!(path = %path, "cached gateway endpoint stopped answering, rescanning");
                }
            }
        }
        for &path in candidates {
            if cached == Some(path) {
                continue;
            }
            match self.get_json(path, Some(port)).await {
                Some(body) if accept(&body) => {
                    *cache.lock().await = Some(path);
                    return Some(body);
                }
                Some(_) => {
                    debug!(path = %path, "gateway endpoint answered with an unrecognized payload, skipping");
                }
                None => {}
            }
        }
        None
    }

    /// Single authenticated GET; Some only on 2xx with a JSON body.
    async fn get_json(&self, path: &str, port: Option<u16>) -> Option<Value> {
        let url = match port {
            Some(p) => format!("{}{}?port={}", self.base_url, path, p),
            None => format!("{}{}", self.base_url, path),
        };
        let resp = match self
            .http
            .get(&url)
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => {
                debug!(url = %url, error = %e, "gateway request failed");
                return None;
            }
        };
        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            warn!(url = %url, status = %status, "gateway rejected credentials");
            return None;
        }
        if !status.is_success() {
            debug!(url = %url, status = %status, "gateway endpoint not available");
            return None;
        }
        match resp.json::<Value>().await {
            Ok(body) => Some(body),
            Err(e) => {
                debug!(url = %url, error = %e, "gateway returned non-JSON body");
                None
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Status payload parsing
// ---------------------------------------------------------------------------

fn parse_port_status(body: &Value) -> PortStatus {
    // Some firmwares nest the status under "data".
    let obj = body.get("data").filter(|v| v.is_object()).unwrap_or(body);
    let signal_strength = ["signal", "signal_strength"]
        .iter()
        .find_map(|k| obj.get(*k))
        .and_then(signal_value);
    let carrier = ["carrier", "network"]
        .iter()
        .find_map(|k| obj.get(*k))
        .and_then(Value::as_str)
        .map(str::to_owned);
    PortStatus {
        signal_strength,
        carrier,
    }
}

/// Signal may arrive as a number or a numeric string.
fn signal_value(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
