//! Dashboard rollups: `/api/v1/stats`, `/api/v1/analytics`,
//! `/api/v1/agent-status`.

use crate::http::query_param;
use crate::http::response::{HttpResult, bad_request, internal_error};
use crate::repo::{logs, messages, ports};
use crate::state::AppState;
use axum::Json;
use axum::extract::{RawQuery, State};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sms_core::analytics::{AnalyticsSummary, aggregate};
use sms_core::health::{Health, classify_agent, classify_port};
use sms_core::MessageStatus;

const DEFAULT_ANALYTICS_DAYS: u32 = 7;

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub total_messages: i64,
    pub unread_messages: i64,
    pub active_ports: usize,
    pub total_ports: usize,
}

#[derive(Debug, Serialize)]
pub struct AgentStatusResponse {
    pub status: Health,
    pub last_activity_at: Option<String>,
}

pub async fn get_stats(State(state): State<AppState>) -> HttpResult<Json<StatsResponse>> {
    let now = Utc::now();
    let store = state.store.lock().await;
    let total_messages = messages::count_total(&store).map_err(internal_error)?;
    let unread_messages = messages::count_by_status(&store, MessageStatus::Unread.as_str())
        .map_err(internal_error)?;
    let port_rows = ports::list_ports(&store).map_err(internal_error)?;
    drop(store);

    let total_ports = port_rows.len();
    let active_ports = port_rows
        .iter()
        .filter(|p| {
            classify_port(p.enabled, parse_rfc3339(&p.last_seen_at), p.signal_strength, now)
                == Health::Online
        })
        .count();

    Ok(Json(StatsResponse {
        total_messages,
        unread_messages,
        active_ports,
        total_ports,
    }))
}

pub async fn get_analytics(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> HttpResult<Json<AnalyticsSummary>> {
    let query = query.unwrap_or_default();
    let days: u32 = match query_param(&query, "days") {
        Some(raw) => raw
            .parse()
            .map_err(|_| bad_request(format!("invalid days '{}'", raw)))?,
        None => DEFAULT_ANALYTICS_DAYS,
    };
    if days == 0 || days > 365 {
        return Err(bad_request("days must be between 1 and 365"));
    }

    let now = Utc::now();
    let since = now - Duration::days(i64::from(days));
    let store = state.store.lock().await;
    let received = messages::received_since(&store, since).map_err(internal_error)?;
    let port_numbers: Vec<u16> = ports::list_ports(&store)
        .map_err(internal_error)?
        .iter()
        .map(|p| p.port_number)
        .collect();
    drop(store);

    Ok(Json(aggregate(&received, &port_numbers, days, now)))
}

pub async fn get_agent_status(
    State(state): State<AppState>,
) -> HttpResult<Json<AgentStatusResponse>> {
    let store = state.store.lock().await;
    let last_activity_at = logs::latest_agent_activity(&store).map_err(internal_error)?;
    drop(store);

    let status = classify_agent(parse_rfc3339(&last_activity_at), Utc::now());
    Ok(Json(AgentStatusResponse {
        status,
        last_activity_at,
    }))
}

fn parse_rfc3339(raw: &Option<String>) -> Option<DateTime<Utc>> {
    raw.as_deref()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}
