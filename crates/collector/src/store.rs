//! Persistence trait for tracked channels and their snapshots.

use async_trait::async_trait;

use crate::{
    Result,
    types::{ChannelStats, NewChannel, Platform, StatsSnapshot, TrackedChannel},
};

/// Persistence backend shared by the HTTP handlers and the collection sweep.
///
/// Handles passed in are expected to be normalized already.
#[async_trait]
pub trait ChannelStore: Send + Sync {
    /// All tracked channels, oldest first.
    async fn list_channels(&self) -> Result<Vec<TrackedChannel>>;
    async fn get_channel(&self, id: i64) -> Result<Option<TrackedChannel>>;
    async fn find_channel(&self, platform: Platform, handle: &str)
    -> Result<Option<TrackedChannel>>;
    /// Fails with `DuplicateChannel` when `(platform, handle)` is already tracked.
    async fn add_channel(&self, channel: &NewChannel) -> Result<TrackedChannel>;
    /// Deletes the channel and its snapshots. Fails with `ChannelMissing`.
    async fn delete_channel(&self, id: i64) -> Result<()>;

    async fn get_cached_internal_id(&self, platform: Platform, handle: &str)
    -> Result<Option<String>>;
    /// Stores a resolved id. A non-null cached id is never overwritten.
    async fn set_cached_internal_id(
        &self,
        platform: Platform,
        handle: &str,
        internal_id: &str,
    ) -> Result<()>;
    async fn update_display_name(&self, id: i64, name: &str) -> Result<()>;

    async fn insert_snapshot(
        &self,
        channel_id: i64,
        stats: &ChannelStats,
        recorded_at_ms: u64,
    ) -> Result<StatsSnapshot>;
    /// Zero-valued snapshot that records a failed collection.
    async fn insert_error_snapshot(
        &self,
        channel_id: i64,
        error: &str,
        recorded_at_ms: u64,
    ) -> Result<StatsSnapshot>;
    async fn latest_snapshot(&self, channel_id: i64) -> Result<Option<StatsSnapshot>>;
    /// Snapshots recorded at or after `since_ms`, ascending by time.
    async fn snapshots_since(&self, channel_id: i64, since_ms: u64) -> Result<Vec<StatsSnapshot>>;
}
