//! REST resource `/rest/v1/sim_port_config`.
//!
//! GET decorates each row with derived health and the port's message count.
//! PATCH serves two writers: the agent updating liveness fields after each
//! status read, and the dashboard editing the extension mapping.

use crate::events::ChangeEvent;
use crate::events::ChangeOp;
use crate::http::response::{HttpResult, bad_request, internal_error, not_found};
use crate::http::{canonical_timestamp, eq_filter};
use crate::repo::messages;
use crate::repo::ports::{self, PortPatch, PortRow};
use crate::state::AppState;
use axum::extract::{RawQuery, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sms_core::health::{Health, classify_port};

#[derive(Debug, Serialize)]
pub struct PortView {
    #[serde(flatten)]
    pub row: PortRow,
    pub health: Health,
    pub message_count: i64,
}

#[derive(Debug, Deserialize)]
pub struct PortPatchBody {
    pub extension: Option<String>,
    pub label: Option<String>,
    pub enabled: Option<bool>,
    pub phone_number: Option<String>,
    pub carrier: Option<String>,
    pub signal_strength: Option<i64>,
    pub last_seen_at: Option<String>,
}

fn parse_last_seen(raw: &Option<String>) -> Option<DateTime<Utc>> {
    raw.as_deref()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

pub async fn list_ports(State(state): State<AppState>) -> HttpResult<Json<Vec<PortView>>> {
    let now = Utc::now();
    let store = state.store.lock().await;
    let rows = ports::list_ports(&store).map_err(internal_error)?;
    let mut views = Vec::with_capacity(rows.len());
    for row in rows {
        let message_count =
            messages::count_by_port(&store, row.port_number).map_err(internal_error)?;
        let health = classify_port(
            row.enabled,
            parse_last_seen(&row.last_seen_at),
            row.signal_strength,
            now,
        );
        views.push(PortView {
            row,
            health,
            message_count,
        });
    }
    Ok(Json(views))
}

pub async fn patch_port(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
    Json(body): Json<PortPatchBody>,
) -> HttpResult<Json<PortView>> {
    let query = query.unwrap_or_default();
    let port_number: u16 = eq_filter(&query, "port_number")
        .ok_or_else(|| bad_request("a port_number=eq. filter is required"))?
        .parse()
        .map_err(|_| bad_request("invalid port_number filter"))?;

    let last_seen_at = match &body.last_seen_at {
        Some(raw) => Some(canonical_timestamp(raw).ok_or_else(|| {
            bad_request(format!("last_seen_at must be RFC 3339, got '{}'", raw))
        })?),
        None => None,
    };

    let patch = PortPatch {
        extension: body.extension,
        label: body.label,
        enabled: body.enabled,
        phone_number: body.phone_number,
        carrier: body.carrier,
        signal_strength: body.signal_strength,
        last_seen_at,
    };
    if patch.is_empty() {
        return Err(bad_request("patch body names no columns"));
    }

    let store = state.store.lock().await;
    let updated = ports::patch_port(&store, port_number, &patch).map_err(internal_error)?;
    if !updated {
        return Err(not_found(format!("no port {}", port_number)));
    }
    let row = ports::get_port(&store, port_number)
        .map_err(internal_error)?
        .ok_or_else(|| internal_error("patched port not found"))?;
    let message_count = messages::count_by_port(&store, port_number).map_err(internal_error)?;
    drop(store);

    let health = classify_port(
        row.enabled,
        parse_last_seen(&row.last_seen_at),
        row.signal_strength,
        Utc::now(),
    );
    state.emit(ChangeEvent::PortsChanged {
        op: ChangeOp::Update,
    });
    Ok(Json(PortView {
        row,
        health,
        message_count,
    }))
}
