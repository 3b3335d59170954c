//! Collects one channel: resolve with retry, validate, persist.

use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use {
    chanstat_config::{CollectorConfig, FailurePolicy},
    tracing::{error, info, warn},
};

use crate::{
    Error, Result, quota::QuotaGuard, resolver::StatsResolver, retry, store::ChannelStore,
    types::*, validity::is_valid,
};

/// Wall-clock time as epoch milliseconds.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Per-channel collection step. Errors never escape [`ChannelProcessor::process`].
pub struct ChannelProcessor {
    store: Arc<dyn ChannelStore>,
    resolvers: HashMap<Platform, Arc<dyn StatsResolver>>,
    retry: RetryPolicy,
    failure_policy: FailurePolicy,
    quota: QuotaGuard,
}

impl ChannelProcessor {
    pub fn new(store: Arc<dyn ChannelStore>, retry: RetryPolicy) -> Self {
        Self {
            store,
            resolvers: HashMap::new(),
            retry,
            failure_policy: FailurePolicy::default(),
            quota: QuotaGuard::new(Duration::ZERO),
        }
    }

    /// Processor configured from the `[collector]` section.
    pub fn from_config(store: Arc<dyn ChannelStore>, config: &CollectorConfig) -> Self {
        Self::new(store, RetryPolicy::from(&config.retry))
            .with_failure_policy(config.failure_policy)
            .with_quota_cooldown(Duration::from_secs(config.quota_cooldown_secs))
    }

    /// Register the resolver for its platform, replacing any previous one.
    #[must_use]
    pub fn with_resolver(mut self, resolver: Arc<dyn StatsResolver>) -> Self {
        self.resolvers.insert(resolver.platform(), resolver);
        self
    }

    #[must_use]
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    #[must_use]
    pub fn with_quota_cooldown(mut self, cooldown: Duration) -> Self {
        self.quota = QuotaGuard::new(cooldown);
        self
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    pub fn has_resolver(&self, platform: Platform) -> bool {
        self.resolvers.contains_key(&platform)
    }

    /// Resolve and fetch `handle` through the retry executor.
    ///
    /// Fails fast with `QuotaExceeded` while the platform is cooling down, and
    /// trips the cooldown when the platform reports quota exhaustion.
    pub async fn fetch(&self, platform: Platform, handle: &str, label: &str) -> Result<ChannelStats> {
        let resolver = self
            .resolvers
            .get(&platform)
            .ok_or_else(|| Error::message(format!("no resolver registered for {platform}")))?;

        if let Some(remaining) = self.quota.remaining_ms(platform, now_ms()) {
            return Err(Error::QuotaExceeded {
                platform,
                message: format!("cooling down for another {}s", remaining / 1000),
            });
        }

        let result = retry::execute(&self.retry, label, || resolver.resolve_and_fetch(handle)).await;
        if let Err(ref e) = result
            && e.is_quota()
        {
            self.quota.trip(platform, now_ms());
        }
        result
    }

    /// Collect one channel and report what happened.
    pub async fn process(&self, channel: &TrackedChannel) -> ChannelOutcome {
        let platform = channel.platform;
        if self.quota.is_cooling_down(platform, now_ms()) {
            info!(channel = %channel.display_name, %platform, "platform cooling down, skipping");
            return ChannelOutcome::CoolingDown;
        }
        if !self.has_resolver(platform) {
            warn!(channel = %channel.display_name, %platform, "no resolver for platform, skipping");
            return ChannelOutcome::NoResolver;
        }

        let label = format!("{platform} stats for {}", channel.display_name);
        let stats = match self.fetch(platform, &channel.handle, &label).await {
            Ok(stats) => stats,
            Err(e) => return self.fail(channel, &e).await,
        };

        if !is_valid(&stats, platform) {
            warn!(
                channel = %channel.display_name,
                %platform,
                subscribers = stats.subscribers,
                views = stats.views,
                likes = stats.likes,
                "invalid statistics payload, not persisting"
            );
            return ChannelOutcome::Rejected;
        }

        if let Err(e) = self.store.insert_snapshot(channel.id, &stats, now_ms()).await {
            error!(channel = %channel.display_name, error = %e, "failed to store snapshot");
            return ChannelOutcome::Failed {
                error: e.to_string(),
            };
        }

        if !stats.name.is_empty()
            && stats.name != channel.display_name
            && let Err(e) = self.store.update_display_name(channel.id, &stats.name).await
        {
            warn!(channel = %channel.display_name, error = %e, "failed to refresh display name");
        }

        info!(
            channel = %stats.name,
            %platform,
            subscribers = stats.subscribers,
            views = stats.views,
            videos = stats.videos,
            likes = stats.likes,
            "stored statistics snapshot"
        );
        ChannelOutcome::Stored
    }

    async fn fail(&self, channel: &TrackedChannel, e: &Error) -> ChannelOutcome {
        error!(
            channel = %channel.display_name,
            platform = %channel.platform,
            error = %e,
            "failed to collect channel"
        );
        let error = e.to_string();
        if self.failure_policy == FailurePolicy::RecordError
            && let Err(store_err) = self
                .store
                .insert_error_snapshot(channel.id, &error, now_ms())
                .await
        {
            warn!(channel = %channel.display_name, error = %store_err, "failed to record error snapshot");
        }
        ChannelOutcome::Failed { error }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use {
        super::*,
        crate::{
            resolver::{
                PlatformResolver,
                tests::{FakeApi, youtube_stats},
            },
            store_memory::InMemoryStore,
        },
        async_trait::async_trait,
    };

    struct FailingResolver {
        platform: Platform,
        error: fn() -> Error,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl StatsResolver for FailingResolver {
        fn platform(&self) -> Platform {
            self.platform
        }

        async fn resolve_and_fetch(&self, _handle: &str) -> Result<ChannelStats> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err((self.error)())
        }
    }

    fn no_retry() -> RetryPolicy {
        RetryPolicy {
            max_retries: 0,
            ..RetryPolicy::default()
        }
    }

    async fn tracked(store: &InMemoryStore, platform: Platform, handle: &str) -> TrackedChannel {
        store
            .add_channel(&NewChannel {
                platform,
                handle: handle.into(),
                resolved_id: None,
                display_name: handle.into(),
                channel_url: format!("@{handle}"),
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn stores_valid_snapshot_and_refreshes_name() {
        let store = Arc::new(InMemoryStore::new());
        let channel = tracked(&store, Platform::Youtube, "example").await;
        let api = FakeApi::new(Platform::Youtube, "UC1", youtube_stats());
        let processor = ChannelProcessor::new(store.clone(), no_retry())
            .with_resolver(Arc::new(PlatformResolver::new(api, store.clone())));

        assert_eq!(processor.process(&channel).await, ChannelOutcome::Stored);
        let snap = store.latest_snapshot(channel.id).await.unwrap().unwrap();
        assert_eq!((snap.subscribers, snap.total_views, snap.videos), (1000, 50_000, 10));
        let reloaded = store.get_channel(channel.id).await.unwrap().unwrap();
        assert_eq!(reloaded.display_name, "Example");
        assert_eq!(reloaded.resolved_id.as_deref(), Some("UC1"));
    }

    #[tokio::test]
    async fn zero_payload_is_rejected() {
        let store = Arc::new(InMemoryStore::new());
        let channel = tracked(&store, Platform::Tiktok, "hidden").await;
        let api = FakeApi::new(Platform::Tiktok, "42", ChannelStats {
            name: "Hidden".into(),
            ..ChannelStats::default()
        });
        let processor = ChannelProcessor::new(store.clone(), no_retry())
            .with_resolver(Arc::new(PlatformResolver::new(api, store.clone())));

        assert_eq!(processor.process(&channel).await, ChannelOutcome::Rejected);
        assert!(store.latest_snapshot(channel.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn failure_skips_by_default() {
        let store = Arc::new(InMemoryStore::new());
        let channel = tracked(&store, Platform::Youtube, "broken").await;
        let processor = ChannelProcessor::new(store.clone(), no_retry()).with_resolver(Arc::new(
            FailingResolver {
                platform: Platform::Youtube,
                error: || Error::api(Platform::Youtube, Some(500), "boom"),
                calls: AtomicUsize::new(0),
            },
        ));

        let outcome = processor.process(&channel).await;
        assert!(matches!(outcome, ChannelOutcome::Failed { ref error } if error.contains("boom")));
        assert!(store.latest_snapshot(channel.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn record_error_policy_writes_annotated_snapshot() {
        let store = Arc::new(InMemoryStore::new());
        let channel = tracked(&store, Platform::Youtube, "broken").await;
        let processor = ChannelProcessor::new(store.clone(), no_retry())
            .with_failure_policy(FailurePolicy::RecordError)
            .with_resolver(Arc::new(FailingResolver {
                platform: Platform::Youtube,
                error: || Error::api(Platform::Youtube, Some(500), "boom"),
                calls: AtomicUsize::new(0),
            }));

        processor.process(&channel).await;
        let snap = store.latest_snapshot(channel.id).await.unwrap().unwrap();
        assert_eq!(snap.subscribers, 0);
        assert!(snap.error.unwrap().contains("boom"));
    }

    #[tokio::test]
    async fn quota_error_trips_cooldown() {
        let store = Arc::new(InMemoryStore::new());
        let first = tracked(&store, Platform::Youtube, "first").await;
        let second = tracked(&store, Platform::Youtube, "second").await;
        let resolver = Arc::new(FailingResolver {
            platform: Platform::Youtube,
            error: || Error::QuotaExceeded {
                platform: Platform::Youtube,
                message: "daily limit".into(),
            },
            calls: AtomicUsize::new(0),
        });
        let processor = ChannelProcessor::new(store.clone(), RetryPolicy::default())
            .with_quota_cooldown(Duration::from_secs(3600))
            .with_resolver(resolver.clone());

        assert!(matches!(processor.process(&first).await, ChannelOutcome::Failed { .. }));
        assert_eq!(processor.process(&second).await, ChannelOutcome::CoolingDown);
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 1);

        let err = processor
            .fetch(Platform::Youtube, "third", "add")
            .await
            .unwrap_err();
        assert!(err.is_quota());
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn missing_resolver_is_reported() {
        let store = Arc::new(InMemoryStore::new());
        let channel = tracked(&store, Platform::Tiktok, "dancer").await;
        let processor = ChannelProcessor::new(store, no_retry());
        assert_eq!(processor.process(&channel).await, ChannelOutcome::NoResolver);
    }
}
