//! HTTP clients for the statistics platforms.
//!
//! Each client implements [`PlatformApi`]; [`build_resolvers`] wraps them in
//! cache-aware [`PlatformResolver`]s for the collector.

mod http;
pub mod tiktok;
pub mod youtube;

use std::sync::Arc;

use {
    chanstat_collector::{ChannelStore, PlatformApi, PlatformResolver, Result, StatsResolver},
    chanstat_config::ChanstatConfig,
    tracing::info,
};

pub use {tiktok::TiktokClient, youtube::YoutubeClient};

fn resolver<A: PlatformApi + 'static>(api: A, store: &Arc<dyn ChannelStore>) -> Arc<dyn StatsResolver> {
    info!(platform = %api.platform(), "registered platform resolver");
    Arc::new(PlatformResolver::new(api, Arc::clone(store)))
}

/// One resolver per supported platform.
///
/// Platforms without an API key are still registered; their fetches fail
/// with `Unauthorized` so the cause shows up in sweep reports.
pub fn build_resolvers(
    config: &ChanstatConfig,
    store: &Arc<dyn ChannelStore>,
) -> Result<Vec<Arc<dyn StatsResolver>>> {
    Ok(vec![
        resolver(YoutubeClient::new(&config.youtube)?, store),
        resolver(TiktokClient::new(&config.tiktok)?, store),
    ])
}
