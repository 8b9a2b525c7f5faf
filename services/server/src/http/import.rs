//! Manual bulk import: `POST /api/v1/import`.
//!
//! The body is the raw pasted payload (JSON or CSV, see
//! `sms_core::import::parse_bulk`). Every accepted row is stored as a fresh
//! `unread` message with a generated `manual-` external id, so imports never
//! collide with gateway-sourced ids.

use crate::events::{ChangeEvent, ChangeOp};
use crate::http::response::{HttpResult, bad_request, internal_error};
use crate::repo::logs::{self, NewLog};
use crate::repo::messages::{self, NewMessage};
use crate::state::AppState;
use axum::extract::State;
use axum::{Json, http::StatusCode};
use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use sms_core::MessageStatus;
use sms_core::import::parse_bulk;
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct ImportResponse {
    pub imported: usize,
}

pub async fn import_messages(
    State(state): State<AppState>,
    body: String,
) -> HttpResult<(StatusCode, Json<ImportResponse>)> {
    let rows = parse_bulk(&body).map_err(|e| bad_request(e.to_string()))?;

    // Same rendering as canonicalized POST bodies, so ordering stays stable.
    let now = crate::repo::render_timestamp(Utc::now());
    let store = state.store.lock().await;
    for row in &rows {
        let new = NewMessage {
            external_id: format!("manual-{}", Uuid::new_v4()),
            sim_port: row.sim_port,
            sender_number: row.sender_number.clone(),
            message_content: row.message_content.clone(),
            received_at: now.clone(),
            status: MessageStatus::Unread.as_str().to_owned(),
        };
        messages::insert_message(&store, &new).map_err(internal_error)?;
    }
    let log = NewLog {
        event_type: "manual_import".to_owned(),
        message: format!("Imported {} message(s)", rows.len()),
        severity: "info".to_owned(),
        metadata: Some(json!({ "count": rows.len() })),
    };
    logs::append_log(&store, &log).map_err(internal_error)?;
    drop(store);

    state.emit(ChangeEvent::MessagesChanged {
        op: ChangeOp::Insert,
    });
    state.emit(ChangeEvent::LogsChanged);
    Ok((
        StatusCode::CREATED,
        Json(ImportResponse {
            imported: rows.len(),
        }),
    ))
}
