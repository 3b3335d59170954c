//! Handle → internal id resolution (cached) and statistics fetch.

use std::sync::Arc;

use {
    async_trait::async_trait,
    tracing::{debug, warn},
};

use crate::{
    Error, Result,
    store::ChannelStore,
    types::{ChannelStats, Platform, normalize_handle},
};

/// Raw platform calls. Implemented by the HTTP clients.
#[async_trait]
pub trait PlatformApi: Send + Sync {
    fn platform(&self) -> Platform;

    /// Look up the platform-internal id for a handle. `None` if no match.
    async fn search(&self, handle: &str) -> Result<Option<String>>;

    /// Fetch current counts for an internal id. `None` if the platform
    /// returned nothing for it.
    async fn get_stats(&self, internal_id: &str) -> Result<Option<ChannelStats>>;
}

/// Resolves a handle and fetches its statistics.
#[async_trait]
pub trait StatsResolver: Send + Sync {
    fn platform(&self) -> Platform;
    async fn resolve_and_fetch(&self, handle: &str) -> Result<ChannelStats>;
}

/// [`StatsResolver`] over one [`PlatformApi`], caching resolved ids in the store.
pub struct PlatformResolver<A> {
    api: A,
    store: Arc<dyn ChannelStore>,
}

impl<A: PlatformApi> PlatformResolver<A> {
    pub fn new(api: A, store: Arc<dyn ChannelStore>) -> Self {
        Self { api, store }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Cached id if present, otherwise a platform search whose result is
    /// written back to the store.
    async fn resolve_id(&self, handle: &str) -> Result<String> {
        let platform = self.api.platform();
        if let Some(id) = self.store.get_cached_internal_id(platform, handle).await? {
            debug!(%platform, handle, internal_id = %id, "using cached internal id");
            return Ok(id);
        }

        let id = self
            .api
            .search(handle)
            .await?
            .ok_or_else(|| Error::not_found(platform, handle))?;

        if let Err(e) = self.store.set_cached_internal_id(platform, handle, &id).await {
            warn!(%platform, handle, error = %e, "failed to cache internal id");
        }
        debug!(%platform, handle, internal_id = %id, "resolved internal id");
        Ok(id)
    }
}

#[async_trait]
impl<A: PlatformApi> StatsResolver for PlatformResolver<A> {
    fn platform(&self) -> Platform {
        self.api.platform()
    }

    async fn resolve_and_fetch(&self, handle: &str) -> Result<ChannelStats> {
        let handle = normalize_handle(handle);
        if handle.is_empty() {
            return Err(Error::invalid_input("channel handle is empty"));
        }
        let id = self.resolve_id(&handle).await?;

        let mut stats = self.api.get_stats(&id).await?.ok_or_else(|| {
            Error::api(self.api.platform(), None, "no statistics returned")
        })?;
        stats.internal_id = id;
        Ok(stats)
    }
}
