//! Tracked channel API routes.

use {
    crate::{
        error::{ApiError, DUPLICATE_CHANNEL},
        state::AppState,
    },
    axum::{
        Json, Router,
        extract::{Path, State},
        routing::{delete, get},
    },
    chanstat_collector::{
        Error as CollectorError,
        parse::parse_channel_url,
        processor::now_ms,
        types::{NewChannel, Platform, StatsSnapshot, TrackedChannel},
        validity::is_valid,
    },
    serde::{Deserialize, Serialize},
    tracing::{info, warn},
};

/// Request to start tracking a channel.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AddChannelRequest {
    pub platform: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddChannelResponse {
    pub success: bool,
    pub channel_id: i64,
    pub message: String,
}

/// A channel with its most recent snapshot. Stat fields are null until the
/// first successful collection.
#[derive(Debug, Serialize)]
pub struct ChannelSummary {
    pub id: i64,
    pub name: String,
    pub platform: Platform,
    /// The handle the channel was added with.
    pub channel_id: String,
    pub resolved_id: Option<String>,
    pub channel_url: String,
    pub subscribers: Option<u64>,
    pub views: Option<u64>,
    pub videos: Option<u64>,
    pub likes: Option<u64>,
    pub timestamp: Option<u64>,
}

impl ChannelSummary {
    fn new(channel: TrackedChannel, latest: Option<StatsSnapshot>) -> Self {
        Self {
            id: channel.id,
            name: channel.display_name,
            platform: channel.platform,
            channel_id: channel.handle,
            resolved_id: channel.resolved_id,
            channel_url: channel.channel_url,
            subscribers: latest.as_ref().map(|s| s.subscribers),
            views: latest.as_ref().map(|s| s.total_views),
            videos: latest.as_ref().map(|s| s.videos),
            likes: latest.as_ref().map(|s| s.likes),
            timestamp: latest.as_ref().map(|s| s.recorded_at_ms),
        }
    }
}

async fn list_channels_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<ChannelSummary>>, ApiError> {
    let channels = state.store.list_channels().await?;
    let mut summaries = Vec::with_capacity(channels.len());
    for channel in channels {
        let latest = state.store.latest_snapshot(channel.id).await?;
        summaries.push(ChannelSummary::new(channel, latest));
    }
    Ok(Json(summaries))
}

fn required(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

async fn add_channel_handler(
    State(state): State<AppState>,
    Json(req): Json<AddChannelRequest>,
) -> Result<Json<AddChannelResponse>, ApiError> {
    let (Some(platform), Some(url)) = (required(req.platform), required(req.url)) else {
        return Err(ApiError::BadRequest("Platform and URL are required".into()));
    };
    let platform: Platform = platform
        .parse()
        .map_err(|_| ApiError::BadRequest("Invalid platform".into()))?;
    let (platform, handle) = parse_channel_url(&url, Some(platform))
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    // Checked before any platform call so duplicates cost no quota.
    if state.store.find_channel(platform, &handle).await?.is_some() {
        return Err(ApiError::Conflict(DUPLICATE_CHANNEL.into()));
    }

    let label = format!("{platform} channel info for {handle}");
    let stats = state
        .processor()
        .fetch(platform, &handle, &label)
        .await
        .map_err(ApiError::AddChannel)?;

    let display_name = match stats.name.trim() {
        "" => handle.clone(),
        name => name.to_string(),
    };
    let channel = state
        .store
        .add_channel(&NewChannel {
            platform,
            handle: handle.clone(),
            resolved_id: Some(stats.internal_id.clone()).filter(|id| !id.is_empty()),
            display_name,
            channel_url: url,
        })
        .await
        .map_err(ApiError::AddChannel)?;

    if is_valid(&stats, platform) {
        state
            .store
            .insert_snapshot(channel.id, &stats, now_ms())
            .await
            .map_err(ApiError::AddChannel)?;
    } else {
        warn!(%platform, handle, "initial statistics look invalid, skipping first snapshot");
    }

    info!(id = channel.id, %platform, handle, name = %channel.display_name, "channel added");
    Ok(Json(AddChannelResponse {
        success: true,
        channel_id: channel.id,
        message: "Channel added successfully".into(),
    }))
}

async fn delete_channel_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    match state.store.delete_channel(id).await {
        Ok(()) => {
            info!(id, "channel deleted");
            Ok(Json(serde_json::json!({ "success": true })))
        },
        Err(CollectorError::ChannelMissing { .. }) => {
            Err(ApiError::NotFound("Channel not found".into()))
        },
        Err(e) => Err(e.into()),
    }
}

/// Routes mounted under `/api/channels`.
pub fn channel_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_channels_handler).post(add_channel_handler))
        .route("/{id}", delete(delete_channel_handler))
}
