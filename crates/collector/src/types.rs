//! Domain types for tracked channels, snapshots and sweep bookkeeping.

use std::{fmt, str::FromStr, time::Duration};

use {
    chanstat_config::RetryConfig,
    serde::{Deserialize, Serialize},
};

use crate::Error;

// ── Platform ────────────────────────────────────────────────────────────────

/// Statistics platform a channel lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Youtube,
    Tiktok,
}

impl Platform {
    pub const ALL: [Platform; 2] = [Platform::Youtube, Platform::Tiktok];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Youtube => "youtube",
            Self::Tiktok => "tiktok",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "youtube" => Ok(Self::Youtube),
            "tiktok" => Ok(Self::Tiktok),
            other => Err(Error::invalid_input(format!("Invalid platform: {other}"))),
        }
    }
}

// ── Channels ────────────────────────────────────────────────────────────────

/// A channel the collector polls on every sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedChannel {
    pub id: i64,
    pub platform: Platform,
    /// Normalized lookup handle, without a leading `@`.
    pub handle: String,
    /// Platform-internal id, filled on first successful resolution.
    pub resolved_id: Option<String>,
    pub display_name: String,
    pub channel_url: String,
    pub created_at_ms: u64,
}

/// Input for creating a tracked channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewChannel {
    pub platform: Platform,
    pub handle: String,
    pub resolved_id: Option<String>,
    pub display_name: String,
    pub channel_url: String,
}

/// Trim whitespace and a single leading `@` from a handle.
#[must_use]
pub fn normalize_handle(handle: &str) -> String {
    let trimmed = handle.trim();
    trimmed.strip_prefix('@').unwrap_or(trimmed).trim().to_string()
}

// ── Statistics ──────────────────────────────────────────────────────────────

/// Statistics fetched from a platform. Metrics it does not report stay 0.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelStats {
    pub internal_id: String,
    pub name: String,
    pub subscribers: u64,
    pub views: u64,
    pub videos: u64,
    pub likes: u64,
}

/// One persisted time-series point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub id: i64,
    pub channel_id: i64,
    pub subscribers: u64,
    pub total_views: u64,
    pub videos: u64,
    pub likes: u64,
    pub recorded_at_ms: u64,
    /// Set only on snapshots that record a failed collection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Time window for history queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatsPeriod {
    Day,
    #[default]
    Week,
    Month,
    All,
}

impl StatsPeriod {
    /// Parse a query value. Unknown values fall back to a week.
    #[must_use]
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("24h") => Self::Day,
            Some("30d") => Self::Month,
            Some("all") => Self::All,
            _ => Self::Week,
        }
    }

    /// Lower bound (epoch millis) of the window ending at `now_ms`.
    #[must_use]
    pub fn since_ms(self, now_ms: u64) -> u64 {
        const DAY_MS: u64 = 24 * 60 * 60 * 1000;
        match self {
            Self::Day => now_ms.saturating_sub(DAY_MS),
            Self::Week => now_ms.saturating_sub(7 * DAY_MS),
            Self::Month => now_ms.saturating_sub(30 * DAY_MS),
            Self::All => 0,
        }
    }
}

// ── Retry ───────────────────────────────────────────────────────────────────

/// Bounded exponential backoff for one fallible operation.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(cfg: &RetryConfig) -> Self {
        Self {
            max_retries: cfg.max_retries,
            base_delay: Duration::from_millis(cfg.base_delay_ms),
            max_delay: Duration::from_millis(cfg.max_delay_ms),
            backoff_multiplier: cfg.backoff_multiplier,
        }
    }
}

impl RetryPolicy {
    /// Total attempts, the first one included.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay before retry `retry` (1-based): `min(max, base * mult^(retry-1))`.
    #[must_use]
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exponent = i32::try_from(retry.saturating_sub(1)).unwrap_or(i32::MAX);
        let base_ms = self.base_delay.as_millis() as f64;
        let max_ms = self.max_delay.as_millis() as f64;
        let delay_ms = (base_ms * self.backoff_multiplier.powi(exponent)).min(max_ms);
        if delay_ms.is_nan() || delay_ms <= 0.0 {
            return Duration::ZERO;
        }
        Duration::from_millis(delay_ms as u64)
    }
}

// ── Sweep bookkeeping ───────────────────────────────────────────────────────

/// What happened to one channel during a sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ChannelOutcome {
    /// A snapshot was persisted.
    Stored,
    /// The platform answered but the payload failed the validity check.
    Rejected,
    Failed { error: String },
    /// Skipped because the platform is in quota cooldown.
    CoolingDown,
    /// No resolver is registered for the channel's platform.
    NoResolver,
}

/// A failed channel, as listed in a sweep report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelFailure {
    pub channel_id: i64,
    pub name: String,
    pub error: String,
}

/// Summary of one completed sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
    pub started_at_ms: u64,
    pub finished_at_ms: u64,
    pub channel_count: usize,
    pub stored: usize,
    pub rejected: usize,
    pub failed: usize,
    pub skipped: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<ChannelFailure>,
    /// Set when the sweep could not run at all (e.g. listing channels failed).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SweepReport {
    pub(crate) fn record(&mut self, channel: &TrackedChannel, outcome: ChannelOutcome) {
        match outcome {
            ChannelOutcome::Stored => self.stored += 1,
            ChannelOutcome::Rejected => self.rejected += 1,
            ChannelOutcome::CoolingDown | ChannelOutcome::NoResolver => self.skipped += 1,
            ChannelOutcome::Failed { error } => {
                self.failed += 1;
                self.failures.push(ChannelFailure {
                    channel_id: channel.id,
                    name: channel.display_name.clone(),
                    error,
                });
            },
        }
    }
}

/// Scheduler status snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorStatus {
    /// Whether the timer loop is active.
    pub running: bool,
    /// Whether a sweep is in flight right now.
    pub sweeping: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_sweep: Option<SweepReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_sweep_at_ms: Option<u64>,
}

/// Result of asking for an out-of-band sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerOutcome {
    Started,
    AlreadyRunning,
}
