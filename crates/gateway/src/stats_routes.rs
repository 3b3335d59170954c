//! Statistics history routes.

use {
    crate::{error::ApiError, state::AppState},
    axum::{
        Json, Router,
        extract::{Path, Query, State},
        routing::get,
    },
    chanstat_collector::{
        processor::now_ms,
        types::{StatsPeriod, StatsSnapshot},
    },
    serde::Deserialize,
};

#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    /// `24h`, `7d`, `30d` or `all`. Anything else means `7d`.
    pub period: Option<String>,
}

async fn history_handler(
    State(state): State<AppState>,
    Path(channel_id): Path<i64>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<StatsSnapshot>>, ApiError> {
    if state.store.get_channel(channel_id).await?.is_none() {
        return Err(ApiError::NotFound("Channel not found".into()));
    }
    let since = StatsPeriod::parse(query.period.as_deref()).since_ms(now_ms());
    let snapshots = state.store.snapshots_since(channel_id, since).await?;
    Ok(Json(snapshots))
}

/// Routes mounted under `/api/stats`.
pub fn stats_router() -> Router<AppState> {
    Router::new().route("/{channel_id}", get(history_handler))
}
