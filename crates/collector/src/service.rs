//! Collection scheduler: timer loop, sweeps, manual triggers.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use {
    chanstat_config::CollectorConfig,
    tokio::{
        sync::{Mutex, Notify, RwLock},
        task::JoinHandle,
    },
    tracing::{debug, error, info, warn},
};

use crate::{
    Result,
    processor::{ChannelProcessor, now_ms},
    schedule::{CollectionSchedule, compute_next_run},
    store::ChannelStore,
    types::{CollectorStatus, SweepReport, TriggerOutcome},
};

/// Scheduler options that are not part of the schedule itself.
#[derive(Debug, Clone)]
pub struct SchedulerOptions {
    /// Sweep once as soon as the timer loop starts.
    pub run_on_start: bool,
    /// Pause between two channels of one sweep.
    pub inter_channel_delay: Duration,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            run_on_start: true,
            inter_channel_delay: Duration::from_millis(1000),
        }
    }
}

/// Held for the lifetime of one sweep; clears the in-flight flag on drop.
struct SweepGuard {
    flag: Arc<AtomicBool>,
}

impl Drop for SweepGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Drives periodic sweeps over every tracked channel.
pub struct CollectionScheduler {
    store: Arc<dyn ChannelStore>,
    processor: Arc<ChannelProcessor>,
    schedule: CollectionSchedule,
    options: SchedulerOptions,
    timer_handle: Mutex<Option<JoinHandle<()>>>,
    wake_notify: Arc<Notify>,
    running: RwLock<bool>,
    sweeping: Arc<AtomicBool>,
    last_sweep: RwLock<Option<SweepReport>>,
    next_sweep_at_ms: RwLock<Option<u64>>,
}

impl CollectionScheduler {
    pub fn new(
        store: Arc<dyn ChannelStore>,
        processor: Arc<ChannelProcessor>,
        schedule: CollectionSchedule,
        options: SchedulerOptions,
    ) -> Arc<Self> {
        Arc::new(Self {
            store,
            processor,
            schedule,
            options,
            timer_handle: Mutex::new(None),
            wake_notify: Arc::new(Notify::new()),
            running: RwLock::new(false),
            sweeping: Arc::new(AtomicBool::new(false)),
            last_sweep: RwLock::new(None),
            next_sweep_at_ms: RwLock::new(None),
        })
    }

    /// Scheduler configured from the `[collector]` section.
    pub fn from_config(
        store: Arc<dyn ChannelStore>,
        processor: Arc<ChannelProcessor>,
        config: &CollectorConfig,
    ) -> Result<Arc<Self>> {
        let schedule = CollectionSchedule::from_config(config)?;
        let options = SchedulerOptions {
            run_on_start: config.run_on_start,
            inter_channel_delay: Duration::from_millis(config.inter_channel_delay_ms),
        };
        Ok(Self::new(store, processor, schedule, options))
    }

    pub fn processor(&self) -> &Arc<ChannelProcessor> {
        &self.processor
    }

    /// Start the timer loop. No-op if it is already running.
    pub async fn start(self: &Arc<Self>) -> Result<()> {
        self.schedule.validate()?;
        {
            let mut running = self.running.write().await;
            if *running {
                debug!("collection scheduler already running");
                return Ok(());
            }
            *running = true;
        }

        let svc = Arc::clone(self);
        let handle = tokio::spawn(async move {
            svc.timer_loop().await;
        });
        *self.timer_handle.lock().await = Some(handle);
        info!(schedule = ?self.schedule, "collection scheduler started");
        Ok(())
    }

    /// Stop the timer loop. A sweep in flight runs to completion.
    pub async fn stop(&self) {
        *self.running.write().await = false;
        self.wake_notify.notify_one();

        if let Some(h) = self.timer_handle.lock().await.take() {
            h.abort();
        }
        *self.next_sweep_at_ms.write().await = None;
        info!("collection scheduler stopped");
    }

    /// Start an out-of-band sweep on a background task unless one is in flight.
    pub fn trigger_now(self: &Arc<Self>) -> TriggerOutcome {
        self.dispatch_sweep("manual")
    }

    /// Run a sweep inline. `None` when another sweep is already in flight.
    pub async fn sweep(&self) -> Option<SweepReport> {
        let Some(guard) = self.try_begin_sweep() else {
            warn!("sweep already in progress");
            return None;
        };
        Some(self.run_sweep(guard, "inline").await)
    }

    pub fn is_sweeping(&self) -> bool {
        self.sweeping.load(Ordering::SeqCst)
    }

    pub async fn status(&self) -> CollectorStatus {
        let channel_count = match self.store.list_channels().await {
            Ok(channels) => Some(channels.len()),
            Err(e) => {
                warn!(error = %e, "failed to count channels for status");
                None
            },
        };
        CollectorStatus {
            running: *self.running.read().await,
            sweeping: self.is_sweeping(),
            channel_count,
            last_sweep: self.last_sweep.read().await.clone(),
            next_sweep_at_ms: *self.next_sweep_at_ms.read().await,
        }
    }

    // ── Internal ────────────────────────────────────────────────────────

    fn try_begin_sweep(&self) -> Option<SweepGuard> {
        self.sweeping
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| SweepGuard {
                flag: Arc::clone(&self.sweeping),
            })
    }

    fn dispatch_sweep(self: &Arc<Self>, reason: &'static str) -> TriggerOutcome {
        let Some(guard) = self.try_begin_sweep() else {
            warn!(reason, "previous sweep still running, skipping");
            return TriggerOutcome::AlreadyRunning;
        };
        let svc = Arc::clone(self);
        tokio::spawn(async move {
            svc.run_sweep(guard, reason).await;
        });
        TriggerOutcome::Started
    }

    async fn timer_loop(self: &Arc<Self>) {
        if self.options.run_on_start {
            self.dispatch_sweep("startup");
        }

        let mut last_fired_ms = 0;
        loop {
            if !*self.running.read().await {
                break;
            }

            let now = now_ms();
            let next = match compute_next_run(&self.schedule, now.max(last_fired_ms)) {
                Ok(Some(next)) => next,
                Ok(None) => {
                    warn!("schedule has no future runs, timer loop exiting");
                    break;
                },
                Err(e) => {
                    error!(error = %e, "failed to compute next sweep, timer loop exiting");
                    break;
                },
            };
            *self.next_sweep_at_ms.write().await = Some(next);

            let sleep_ms = next.saturating_sub(now);
            if sleep_ms > 0 {
                let notify = Arc::clone(&self.wake_notify);
                tokio::select! {
                    () = tokio::time::sleep(Duration::from_millis(sleep_ms)) => {},
                    () = notify.notified() => {
                        debug!("timer loop woken by notify");
                        continue;
                    },
                }
            }

            if !*self.running.read().await {
                break;
            }
            last_fired_ms = next;
            self.dispatch_sweep("schedule");
        }
        *self.next_sweep_at_ms.write().await = None;
    }

    async fn run_sweep(&self, guard: SweepGuard, reason: &str) -> SweepReport {
        let mut report = SweepReport {
            started_at_ms: now_ms(),
            ..SweepReport::default()
        };
        info!(reason, "collection sweep started");

        match self.store.list_channels().await {
            Ok(channels) => {
                report.channel_count = channels.len();
                for (i, channel) in channels.iter().enumerate() {
                    if i > 0 && !self.options.inter_channel_delay.is_zero() {
                        tokio::time::sleep(self.options.inter_channel_delay).await;
                    }
                    let outcome = self.processor.process(channel).await;
                    report.record(channel, outcome);
                }
            },
            Err(e) => {
                error!(error = %e, "failed to list channels, aborting sweep");
                report.error = Some(e.to_string());
            },
        }

        report.finished_at_ms = now_ms();
        info!(
            reason,
            channels = report.channel_count,
            stored = report.stored,
            rejected = report.rejected,
            failed = report.failed,
            skipped = report.skipped,
            duration_ms = report.finished_at_ms.saturating_sub(report.started_at_ms),
            "collection sweep finished"
        );
        *self.last_sweep.write().await = Some(report.clone());
        drop(guard);
        report
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use {
        super::*,
        crate::{
            Error,
            resolver::{
                PlatformResolver, StatsResolver,
                tests::{FakeApi, youtube_stats},
            },
            store_memory::InMemoryStore,
            types::{ChannelStats, NewChannel, Platform, RetryPolicy, StatsSnapshot, TrackedChannel},
        },
        async_trait::async_trait,
        tokio::sync::Semaphore,
    };

    /// Fails for one handle, succeeds for the rest, counting every call.
    struct FlakyResolver {
        bad_handle: &'static str,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl StatsResolver for FlakyResolver {
        fn platform(&self) -> Platform {
            Platform::Youtube
        }

        async fn resolve_and_fetch(&self, handle: &str) -> Result<ChannelStats> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if handle == self.bad_handle {
                return Err(Error::api(Platform::Youtube, Some(500), "backend error"));
            }
            Ok(ChannelStats {
                internal_id: format!("UC-{handle}"),
                name: handle.to_string(),
                ..youtube_stats()
            })
        }
    }

    /// Blocks every call until a permit is released.
    struct GatedResolver {
        gate: Arc<Semaphore>,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl StatsResolver for GatedResolver {
        fn platform(&self) -> Platform {
            Platform::Youtube
        }

        async fn resolve_and_fetch(&self, _handle: &str) -> Result<ChannelStats> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let _permit = self.gate.acquire().await.map_err(|e| Error::external("gate", e))?;
            Ok(youtube_stats())
        }
    }

    async fn seed(store: &InMemoryStore, handles: &[&str]) {
        for handle in handles {
            store
                .add_channel(&NewChannel {
                    platform: Platform::Youtube,
                    handle: (*handle).into(),
                    resolved_id: None,
                    display_name: (*handle).into(),
                    channel_url: format!("@{handle}"),
                })
                .await
                .unwrap();
        }
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_retries: 2,
            base_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(10),
            backoff_multiplier: 1.0,
        }
    }

    fn scheduler(
        store: Arc<InMemoryStore>,
        resolver: Arc<dyn StatsResolver>,
        options: SchedulerOptions,
    ) -> Arc<CollectionScheduler> {
        let processor =
            Arc::new(ChannelProcessor::new(store.clone(), fast_retry()).with_resolver(resolver));
        CollectionScheduler::new(store, processor, CollectionSchedule::default(), options)
    }

    fn no_start_sweep() -> SchedulerOptions {
        SchedulerOptions {
            run_on_start: false,
            inter_channel_delay: Duration::from_millis(1000),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn failing_channel_does_not_block_the_sweep() {
        let store = Arc::new(InMemoryStore::new());
        seed(&store, &["one", "two", "three", "four", "five"]).await;
        let resolver = Arc::new(FlakyResolver {
            bad_handle: "three",
            calls: AtomicUsize::new(0),
        });
        let svc = scheduler(store.clone(), resolver.clone(), no_start_sweep());

        let report = svc.sweep().await.unwrap();
        assert_eq!(report.channel_count, 5);
        assert_eq!(report.stored, 4);
        assert_eq!(report.failed, 1);
        assert_eq!(report.failures[0].name, "three");
        // 4 healthy calls + 3 attempts for the failing one.
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 7);

        for channel in store.list_channels().await.unwrap() {
            let latest = store.latest_snapshot(channel.id).await.unwrap();
            assert_eq!(latest.is_some(), channel.handle != "three", "{}", channel.handle);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_paces_channels() {
        let store = Arc::new(InMemoryStore::new());
        seed(&store, &["a", "b", "c"]).await;
        let api = FakeApi::new(Platform::Youtube, "UC1", youtube_stats());
        let svc = scheduler(
            store.clone(),
            Arc::new(PlatformResolver::new(api, store.clone())),
            no_start_sweep(),
        );

        let started = tokio::time::Instant::now();
        svc.sweep().await.unwrap();
        assert_eq!(started.elapsed(), Duration::from_millis(2000));
    }

    #[tokio::test(start_paused = true)]
    async fn trigger_twice_never_overlaps() {
        let store = Arc::new(InMemoryStore::new());
        seed(&store, &["only"]).await;
        let gate = Arc::new(Semaphore::new(0));
        let calls = Arc::new(AtomicUsize::new(0));
        let svc = scheduler(
            store.clone(),
            Arc::new(GatedResolver {
                gate: Arc::clone(&gate),
                calls: Arc::clone(&calls),
            }),
            no_start_sweep(),
        );

        assert_eq!(svc.trigger_now(), TriggerOutcome::Started);
        assert_eq!(svc.trigger_now(), TriggerOutcome::AlreadyRunning);
        assert!(svc.sweep().await.is_none());
        assert!(svc.is_sweeping());

        gate.add_permits(1);
        while svc.is_sweeping() {
            tokio::task::yield_now().await;
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(svc.status().await.last_sweep.unwrap().stored, 1);
        assert_eq!(svc.trigger_now(), TriggerOutcome::Started);
    }

    #[tokio::test(start_paused = true)]
    async fn start_runs_initial_sweep_and_schedules_next() {
        let store = Arc::new(InMemoryStore::new());
        seed(&store, &["example"]).await;
        let api = FakeApi::new(Platform::Youtube, "UC1", youtube_stats());
        let svc = scheduler(
            store.clone(),
            Arc::new(PlatformResolver::new(api, store.clone())),
            SchedulerOptions::default(),
        );

        svc.start().await.unwrap();
        for _ in 0..50 {
            if svc.status().await.last_sweep.is_some() {
                break;
            }
            tokio::task::yield_now().await;
        }

        let status = svc.status().await;
        assert!(status.running);
        assert_eq!(status.channel_count, Some(1));
        assert_eq!(status.last_sweep.unwrap().stored, 1);
        assert!(status.next_sweep_at_ms.is_some());

        svc.stop().await;
        let status = svc.status().await;
        assert!(!status.running);
        assert!(status.next_sweep_at_ms.is_none());
    }

    #[tokio::test]
    async fn list_failure_is_recorded_in_report() {
        struct BrokenStore;

        #[async_trait]
        impl ChannelStore for BrokenStore {
            async fn list_channels(&self) -> Result<Vec<TrackedChannel>> {
                Err(Error::message("database is locked"))
            }
            async fn get_channel(&self, _: i64) -> Result<Option<TrackedChannel>> {
                Ok(None)
            }
            async fn find_channel(
                &self,
                _: Platform,
                _: &str,
            ) -> Result<Option<TrackedChannel>> {
                Ok(None)
            }
            async fn add_channel(&self, _: &NewChannel) -> Result<TrackedChannel> {
                Err(Error::message("read-only"))
            }
            async fn delete_channel(&self, id: i64) -> Result<()> {
                Err(Error::ChannelMissing { id })
            }
            async fn get_cached_internal_id(&self, _: Platform, _: &str) -> Result<Option<String>> {
                Ok(None)
            }
            async fn set_cached_internal_id(&self, _: Platform, _: &str, _: &str) -> Result<()> {
                Ok(())
            }
            async fn update_display_name(&self, _: i64, _: &str) -> Result<()> {
                Ok(())
            }
            async fn insert_snapshot(
                &self,
                _: i64,
                _: &ChannelStats,
                _: u64,
            ) -> Result<StatsSnapshot> {
                Err(Error::message("read-only"))
            }
            async fn insert_error_snapshot(
                &self,
                _: i64,
                _: &str,
                _: u64,
            ) -> Result<StatsSnapshot> {
                Err(Error::message("read-only"))
            }
            async fn latest_snapshot(&self, _: i64) -> Result<Option<StatsSnapshot>> {
                Ok(None)
            }
            async fn snapshots_since(
                &self,
                _: i64,
                _: u64,
            ) -> Result<Vec<StatsSnapshot>> {
                Ok(Vec::new())
            }
        }

        let store: Arc<dyn ChannelStore> = Arc::new(BrokenStore);
        let processor = Arc::new(ChannelProcessor::new(Arc::clone(&store), fast_retry()));
        let svc = CollectionScheduler::new(
            store,
            processor,
            CollectionSchedule::default(),
            no_start_sweep(),
        );

        let report = svc.sweep().await.unwrap();
        assert_eq!(report.channel_count, 0);
        assert_eq!(report.error.as_deref(), Some("database is locked"));
        assert!(!svc.is_sweeping());
        assert_eq!(svc.status().await.channel_count, None);
    }
}
