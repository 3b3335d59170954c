//! Manual collection trigger and scheduler status.

use {
    crate::state::AppState,
    axum::{
        Json, Router,
        extract::State,
        http::StatusCode,
        response::IntoResponse,
        routing::{get, post},
    },
    chanstat_collector::types::{CollectorStatus, TriggerOutcome},
    serde_json::json,
    tracing::info,
};

async fn collect_handler(State(state): State<AppState>) -> impl IntoResponse {
    let started = state.scheduler.trigger_now() == TriggerOutcome::Started;
    info!(started, "manual collection requested");
    let status = if started {
        StatusCode::ACCEPTED
    } else {
        StatusCode::OK
    };
    (status, Json(json!({ "started": started })))
}

async fn status_handler(State(state): State<AppState>) -> Json<CollectorStatus> {
    Json(state.scheduler.status().await)
}

pub fn collector_router() -> Router<AppState> {
    Router::new()
        .route("/api/collect", post(collect_handler))
        .route("/api/collector/status", get(status_handler))
}
