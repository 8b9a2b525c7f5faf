//! REST resource `/rest/v1/sms_messages`.
//!
//! PostgREST-flavoured: equality filters as `column=eq.value` query pairs,
//! upsert opt-in via `?on_conflict=external_id` on POST.

use crate::db::StoreError;
use crate::events::{ChangeEvent, ChangeOp};
use crate::http::response::{
    HttpResult, bad_request, duplicate_external_id, internal_error, not_found,
};
use crate::http::{canonical_timestamp, eq_filter, query_param};
use crate::repo::messages::{self, MessageFilter, MessageRow, NewMessage};
use crate::state::AppState;
use axum::extract::{RawQuery, State};
use axum::{Json, http::StatusCode};
use serde::Deserialize;
use sms_core::MessageStatus;

#[derive(Debug, Deserialize)]
pub struct MessageBody {
    pub external_id: String,
    pub sim_port: u16,
    pub sender_number: String,
    pub message_content: String,
    pub received_at: String,
    #[serde(default = "default_status")]
    pub status: String,
}

fn default_status() -> String {
    MessageStatus::Unread.as_str().to_owned()
}

#[derive(Debug, Deserialize)]
pub struct StatusPatchBody {
    pub status: String,
}

fn is_unique_violation(err: &StoreError) -> bool {
    matches!(
        err,
        StoreError::Sqlite(rusqlite::Error::SqliteFailure(e, _))
            if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

fn parse_status(raw: &str) -> Result<MessageStatus, axum::response::Response> {
    raw.parse::<MessageStatus>()
        .map_err(|_| bad_request(format!("unknown message status '{}'", raw)))
}

pub async fn list_messages(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> HttpResult<Json<Vec<MessageRow>>> {
    let query = query.unwrap_or_default();
    let mut filter = MessageFilter {
        status: eq_filter(&query, "status"),
        search: query_param(&query, "search"),
        ..MessageFilter::default()
    };
    if let Some(status) = &filter.status {
        parse_status(status)?;
    }
    if let Some(raw) = eq_filter(&query, "sim_port") {
        filter.sim_port = Some(
            raw.parse()
                .map_err(|_| bad_request(format!("invalid sim_port filter '{}'", raw)))?,
        );
    }
    if let Some(raw) = query_param(&query, "limit") {
        filter.limit = Some(
            raw.parse()
                .map_err(|_| bad_request(format!("invalid limit '{}'", raw)))?,
        );
    }

    let store = state.store.lock().await;
    let rows = messages::list_messages(&store, &filter).map_err(internal_error)?;
    Ok(Json(rows))
}

pub async fn post_message(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
    Json(body): Json<MessageBody>,
) -> HttpResult<(StatusCode, Json<MessageRow>)> {
    parse_status(&body.status)?;
    let received_at = canonical_timestamp(&body.received_at).ok_or_else(|| {
        bad_request(format!(
            "received_at must be RFC 3339, got '{}'",
            body.received_at
        ))
    })?;
    let query = query.unwrap_or_default();
    let upsert = query_param(&query, "on_conflict").as_deref() == Some("external_id");

    let new = NewMessage {
        external_id: body.external_id,
        sim_port: body.sim_port,
        sender_number: body.sender_number,
        message_content: body.message_content,
        received_at,
        status: body.status,
    };

    let store = state.store.lock().await;
    let row = if upsert {
        messages::upsert_message(&store, &new).map_err(internal_error)?
    } else {
        match messages::insert_message(&store, &new) {
            Ok(row) => row,
            Err(e) if is_unique_violation(&e) => {
                return Err(duplicate_external_id(&new.external_id));
            }
            Err(e) => return Err(internal_error(e)),
        }
    };
    drop(store);

    state.emit(ChangeEvent::MessagesChanged {
        op: ChangeOp::Insert,
    });
    Ok((StatusCode::CREATED, Json(row)))
}

pub async fn patch_message(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
    Json(body): Json<StatusPatchBody>,
) -> HttpResult<Json<MessageRow>> {
    let status = parse_status(&body.status)?;
    let query = query.unwrap_or_default();

    let store = state.store.lock().await;
    let id = match (eq_filter(&query, "id"), eq_filter(&query, "external_id")) {
        (Some(id), _) => id,
        (None, Some(external_id)) => messages::get_by_external_id(&store, &external_id)
            .map_err(internal_error)?
            .ok_or_else(|| not_found(format!("no message with external_id '{}'", external_id)))?
            .id,
        (None, None) => {
            return Err(bad_request(
                "an id=eq. or external_id=eq. filter is required",
            ));
        }
    };

    let updated =
        messages::update_status(&store, &id, status.as_str()).map_err(internal_error)?;
    if !updated {
        return Err(not_found(format!("no message with id '{}'", id)));
    }
    let row = messages::get_by_id(&store, &id)
        .map_err(internal_error)?
        .ok_or_else(|| internal_error("updated row not found"))?;
    drop(store);

    state.emit(ChangeEvent::MessagesChanged {
        op: ChangeOp::Update,
    });
    Ok(Json(row))
}

pub async fn delete_message(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> HttpResult<StatusCode> {
    let query = query.unwrap_or_default();

    let store = state.store.lock().await;
    let id = match (eq_filter(&query, "id"), eq_filter(&query, "external_id")) {
        (Some(id), _) => id,
        (None, Some(external_id)) => messages::get_by_external_id(&store, &external_id)
            .map_err(internal_error)?
            .ok_or_else(|| not_found(format!("no message with external_id '{}'", external_id)))?
            .id,
        (None, None) => {
            return Err(bad_request(
                "an id=eq. or external_id=eq. filter is required",
            ));
        }
    };

    let deleted = messages::delete_message(&store, &id).map_err(internal_error)?;
    drop(store);
    if !deleted {
        return Err(not_found(format!("no message with id '{}'", id)));
    }

    state.emit(ChangeEvent::MessagesChanged {
        op: ChangeOp::Delete,
    });
    Ok(StatusCode::NO_CONTENT)
}
