/// Config schema types (server, database, platform APIs, collector).
use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChanstatConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub youtube: PlatformApiConfig,
    pub tiktok: PlatformApiConfig,
    pub collector: CollectorConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to. Defaults to "127.0.0.1".
    pub bind: String,
    /// Port to listen on. Defaults to 5000.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".into(),
            port: 5000,
        }
    }
}

/// SQLite database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// sqlx connection URL.
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://chanstat.db?mode=rwc".into(),
            max_connections: 5,
        }
    }
}

/// Credentials and endpoint for one statistics platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformApiConfig {
    #[serde(
        serialize_with = "serialize_option_secret",
        skip_serializing_if = "Option::is_none"
    )]
    pub api_key: Option<Secret<String>>,
    /// Base URL override (the platform's public endpoint when unset).
    pub base_url: Option<String>,
    /// HTTP request timeout in seconds.
    pub timeout_seconds: u64,
}

impl Default for PlatformApiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            timeout_seconds: 30,
        }
    }
}

impl PlatformApiConfig {
    /// Whether an API key is configured and non-empty.
    pub fn has_api_key(&self) -> bool {
        self.api_key
            .as_ref()
            .is_some_and(|k| !k.expose_secret().trim().is_empty())
    }
}

/// What the collector writes when a channel's collection fails.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Write nothing for the failed channel.
    #[default]
    Skip,
    /// Write a zero-valued snapshot annotated with the error message.
    RecordError,
}

/// Collection scheduler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    /// Whether the background scheduler runs at all. Defaults to true.
    pub enabled: bool,
    /// Cron expression for sweeps (5-field or 6/7-field). Defaults to the top of every hour.
    pub schedule: String,
    /// IANA timezone the schedule is evaluated in. UTC when unset.
    pub timezone: Option<String>,
    /// Fixed sweep interval in seconds, used instead of `schedule` when set.
    pub every_secs: Option<u64>,
    /// Run one sweep immediately when the scheduler starts.
    pub run_on_start: bool,
    /// Pause between two channels of the same sweep.
    pub inter_channel_delay_ms: u64,
    pub failure_policy: FailurePolicy,
    /// How long a platform is skipped after a quota rejection (0 disables).
    pub quota_cooldown_secs: u64,
    pub retry: RetryConfig,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            schedule: "0 * * * *".into(),
            timezone: None,
            every_secs: None,
            run_on_start: true,
            inter_channel_delay_ms: 1000,
            failure_policy: FailurePolicy::Skip,
            quota_cooldown_secs: 3600,
            retry: RetryConfig::default(),
        }
    }
}

/// Exponential backoff settings for platform calls.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1000,
            max_delay_ms: 30_000,
            backoff_multiplier: 2.0,
        }
    }
}

// ── Serde helpers for Secret<String> ────────────────────────────────────────

fn serialize_option_secret<S: serde::Serializer>(
    secret: &Option<Secret<String>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match secret {
        Some(s) => serializer.serialize_some(s.expose_secret()),
        None => serializer.serialize_none(),
    }
}
