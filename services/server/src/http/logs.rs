//! REST resource `/rest/v1/activity_logs`.

use crate::events::ChangeEvent;
use crate::http::query_param;
use crate::http::response::{HttpResult, bad_request, internal_error};
use crate::repo::logs::{self, LogRow, NewLog};
use crate::state::AppState;
use axum::extract::{RawQuery, State};
use axum::{Json, http::StatusCode};
use serde::Deserialize;
use serde_json::Value;

const DEFAULT_LOG_LIMIT: u32 = 50;

#[derive(Debug, Deserialize)]
pub struct LogBody {
    pub event_type: String,
    pub message: String,
    #[serde(default = "default_severity")]
    pub severity: String,
    pub metadata: Option<Value>,
}

fn default_severity() -> String {
    "info".to_owned()
}

pub async fn list_logs(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> HttpResult<Json<Vec<LogRow>>> {
    let query = query.unwrap_or_default();
    let limit = match query_param(&query, "limit") {
        Some(raw) => raw
            .parse()
            .map_err(|_| bad_request(format!("invalid limit '{}'", raw)))?,
        None => DEFAULT_LOG_LIMIT,
    };
    let store = state.store.lock().await;
    let rows = logs::recent_logs(&store, limit).map_err(internal_error)?;
    Ok(Json(rows))
}

pub async fn post_log(
    State(state): State<AppState>,
    Json(body): Json<LogBody>,
) -> HttpResult<(StatusCode, Json<LogRow>)> {
    if !["info", "warning", "error"].contains(&body.severity.as_str()) {
        return Err(bad_request(format!(
            "unknown severity '{}'",
            body.severity
        )));
    }
    let new = NewLog {
        event_type: body.event_type,
        message: body.message,
        severity: body.severity,
        metadata: body.metadata,
    };
    let store = state.store.lock().await;
    let row = logs::append_log(&store, &new).map_err(internal_error)?;
    drop(store);

    state.emit(ChangeEvent::LogsChanged);
    Ok((StatusCode::CREATED, Json(row)))
}
