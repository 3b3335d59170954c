//! In-memory store for tests and throwaway runs.

use std::{collections::BTreeMap, sync::Mutex};

use async_trait::async_trait;

use crate::{
    Error, Result,
    processor::now_ms,
    store::ChannelStore,
    types::{ChannelStats, NewChannel, Platform, StatsSnapshot, TrackedChannel},
};

#[derive(Default)]
struct Inner {
    channels: BTreeMap<i64, TrackedChannel>,
    snapshots: Vec<StatsSnapshot>,
    next_channel_id: i64,
    next_snapshot_id: i64,
}

impl Inner {
    fn push_snapshot(
        &mut self,
        channel_id: i64,
        stats: &ChannelStats,
        recorded_at_ms: u64,
        error: Option<String>,
    ) -> Result<StatsSnapshot> {
        if !self.channels.contains_key(&channel_id) {
            return Err(Error::ChannelMissing { id: channel_id });
        }
        self.next_snapshot_id += 1;
        let snapshot = StatsSnapshot {
            id: self.next_snapshot_id,
            channel_id,
            subscribers: stats.subscribers,
            total_views: stats.views,
            videos: stats.videos,
            likes: stats.likes,
            recorded_at_ms,
            error,
        };
        self.snapshots.push(snapshot.clone());
        Ok(snapshot)
    }
}

/// In-memory store backed by ordered maps. No persistence.
pub struct InMemoryStore {
    inner: Mutex<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChannelStore for InMemoryStore {
    async fn list_channels(&self) -> Result<Vec<TrackedChannel>> {
        Ok(self.lock().channels.values().cloned().collect())
    }

    async fn get_channel(&self, id: i64) -> Result<Option<TrackedChannel>> {
        Ok(self.lock().channels.get(&id).cloned())
    }

    async fn find_channel(
        &self,
        platform: Platform,
        handle: &str,
    ) -> Result<Option<TrackedChannel>> {
        Ok(self
            .lock()
            .channels
            .values()
            .find(|c| c.platform == platform && c.handle == handle)
            .cloned())
    }

    async fn add_channel(&self, channel: &NewChannel) -> Result<TrackedChannel> {
        let mut inner = self.lock();
        if inner
            .channels
            .values()
            .any(|c| c.platform == channel.platform && c.handle == channel.handle)
        {
            return Err(Error::DuplicateChannel {
                platform: channel.platform,
                handle: channel.handle.clone(),
            });
        }
        inner.next_channel_id += 1;
        let tracked = TrackedChannel {
            id: inner.next_channel_id,
            platform: channel.platform,
            handle: channel.handle.clone(),
            resolved_id: channel.resolved_id.clone(),
            display_name: channel.display_name.clone(),
            channel_url: channel.channel_url.clone(),
            created_at_ms: now_ms(),
        };
        inner.channels.insert(tracked.id, tracked.clone());
        Ok(tracked)
    }

    async fn delete_channel(&self, id: i64) -> Result<()> {
        let mut inner = self.lock();
        if inner.channels.remove(&id).is_none() {
            return Err(Error::ChannelMissing { id });
        }
        inner.snapshots.retain(|s| s.channel_id != id);
        Ok(())
    }

    async fn get_cached_internal_id(
        &self,
        platform: Platform,
        handle: &str,
    ) -> Result<Option<String>> {
        Ok(self
            .lock()
            .channels
            .values()
            .find(|c| c.platform == platform && c.handle == handle)
            .and_then(|c| c.resolved_id.clone()))
    }

    async fn set_cached_internal_id(
        &self,
        platform: Platform,
        handle: &str,
        internal_id: &str,
    ) -> Result<()> {
        let mut inner = self.lock();
        if let Some(channel) = inner
            .channels
            .values_mut()
            .find(|c| c.platform == platform && c.handle == handle)
            && channel.resolved_id.is_none()
        {
            channel.resolved_id = Some(internal_id.to_string());
        }
        Ok(())
    }

    async fn update_display_name(&self, id: i64, name: &str) -> Result<()> {
        let mut inner = self.lock();
        let channel = inner
            .channels
            .get_mut(&id)
            .ok_or(Error::ChannelMissing { id })?;
        channel.display_name = name.to_string();
        Ok(())
    }

    async fn insert_snapshot(
        &self,
        channel_id: i64,
        stats: &ChannelStats,
        recorded_at_ms: u64,
    ) -> Result<StatsSnapshot> {
        self.lock().push_snapshot(channel_id, stats, recorded_at_ms, None)
    }

    async fn insert_error_snapshot(
        &self,
        channel_id: i64,
        error: &str,
        recorded_at_ms: u64,
    ) -> Result<StatsSnapshot> {
        self.lock().push_snapshot(
            channel_id,
            &ChannelStats::default(),
            recorded_at_ms,
            Some(error.to_string()),
        )
    }

    async fn latest_snapshot(&self, channel_id: i64) -> Result<Option<StatsSnapshot>> {
        Ok(self
            .lock()
            .snapshots
            .iter()
            .filter(|s| s.channel_id == channel_id)
            .max_by_key(|s| (s.recorded_at_ms, s.id))
            .cloned())
    }

    async fn snapshots_since(&self, channel_id: i64, since_ms: u64) -> Result<Vec<StatsSnapshot>> {
        let mut out: Vec<StatsSnapshot> = self
            .lock()
            .snapshots
            .iter()
            .filter(|s| s.channel_id == channel_id && s.recorded_at_ms >= since_ms)
            .cloned()
            .collect();
        out.sort_by_key(|s| (s.recorded_at_ms, s.id));
        Ok(out)
    }
}
