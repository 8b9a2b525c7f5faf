pub mod db;
pub mod events;
pub mod http;
pub mod repo;
pub mod state;

pub use state::AppState;

use axum::{
    Router,
    routing::{get, post},
};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(health::healthz))
        .route("/readyz", get(health::readyz))
        .route(
            "/rest/v1/sms_messages",
            get(http::messages::list_messages)
                .post(http::messages::post_message)
                .patch(http::messages::patch_message)
                .delete(http::messages::delete_message),
        )
        .route(
            "/rest/v1/sim_port_config",
            get(http::ports::list_ports).patch(http::ports::patch_port),
        )
        .route(
            "/rest/v1/activity_logs",
            get(http::logs::list_logs).post(http::logs::post_log),
        )
        .route(
            "/rest/v1/gateway_config",
            get(http::configs::get_gateway_config).put(http::configs::put_gateway_config),
        )
        .route(
            "/rest/v1/pbx_config",
            get(http::configs::get_pbx_config).put(http::configs::put_pbx_config),
        )
        .route("/api/v1/stats", get(http::stats::get_stats))
        .route("/api/v1/analytics", get(http::stats::get_analytics))
        .route("/api/v1/agent-status", get(http::stats::get_agent_status))
        .route("/api/v1/import", post(http::import::import_messages))
        .route("/api/v1/events", get(http::sse::change_events))
        .with_state(state)
}

mod health {
    use axum::response::IntoResponse;
    pub async fn healthz() -> impl IntoResponse {
        "ok"
    }
    pub async fn readyz() -> impl IntoResponse {
        "ok"
    }
}
