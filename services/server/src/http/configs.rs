//! Singleton config resources `/rest/v1/gateway_config` and
//! `/rest/v1/pbx_config`. GET returns the stored JSON document (404 until one
//! is written); PUT replaces it whole.

use crate::events::ChangeEvent;
use crate::http::response::{HttpResult, bad_request, internal_error, not_found};
use crate::repo::configs::{self, ConfigTable};
use crate::state::AppState;
use axum::Json;
use axum::extract::State;
use serde_json::Value;

async fn get_config(state: AppState, table: ConfigTable) -> HttpResult<Json<Value>> {
    let store = state.store.lock().await;
    let value = configs::get_config(&store, table)
        .map_err(internal_error)?
        .ok_or_else(|| not_found(format!("no {} stored yet", table.table_name())))?;
    Ok(Json(value))
}

async fn put_config(state: AppState, table: ConfigTable, body: Value) -> HttpResult<Json<Value>> {
    if !body.is_object() {
        return Err(bad_request("config body must be a JSON object"));
    }
    let store = state.store.lock().await;
    configs::put_config(&store, table, &body).map_err(internal_error)?;
    drop(store);

    state.emit(ChangeEvent::ConfigChanged {
        table: table.table_name().to_owned(),
    });
    Ok(Json(body))
}

pub async fn get_gateway_config(State(state): State<AppState>) -> HttpResult<Json<Value>> {
    get_config(state, ConfigTable::Gateway).await
}

pub async fn put_gateway_config(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> HttpResult<Json<Value>> {
    put_config(state, ConfigTable::Gateway, body).await
}

pub async fn get_pbx_config(State(state): State<AppState>) -> HttpResult<Json<Value>> {
    get_config(state, ConfigTable::Pbx).await
}

pub async fn put_pbx_config(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> HttpResult<Json<Value>> {
    put_config(state, ConfigTable::Pbx, body).await
}
