use {chanstat_common::FromMessage, thiserror::Error};

use crate::types::Platform;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error(transparent)]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error(transparent)]
    CronParse(#[from] cron::error::Error),

    #[error("unknown timezone: {timezone}")]
    UnknownTimezone { timezone: String },

    /// The platform has no channel for this handle.
    #[error("{platform} channel not found: {handle}")]
    NotFound { platform: Platform, handle: String },

    /// Quota exhausted or request rate rejected by the platform.
    #[error("{platform} quota exceeded: {message}")]
    QuotaExceeded { platform: Platform, message: String },

    #[error("{platform} unauthorized: {message}")]
    Unauthorized { platform: Platform, message: String },

    /// Transport failure or a non-success response.
    #[error("{platform} API error{}: {message}", status_suffix(.status))]
    Api {
        platform: Platform,
        status: Option<u16>,
        message: String,
    },

    #[error("{platform} returned a malformed response: {message}")]
    MalformedResponse { platform: Platform, message: String },

    #[error("channel already tracked: {platform}/{handle}")]
    DuplicateChannel { platform: Platform, handle: String },

    #[error("tracked channel not found: {id}")]
    ChannelMissing { id: i64 },

    #[error("{message}")]
    InvalidInput { message: String },

    #[error("{message}")]
    Message { message: String },

    #[error("{context}: {source}")]
    External {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {s})")).unwrap_or_default()
}

impl Error {
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn external(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::External {
            context: context.into(),
            source: Box::new(source),
        }
    }

    #[must_use]
    pub fn not_found(platform: Platform, handle: impl Into<String>) -> Self {
        Self::NotFound {
            platform,
            handle: handle.into(),
        }
    }

    #[must_use]
    pub fn api(platform: Platform, status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Api {
            platform,
            status,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn malformed(platform: Platform, message: impl Into<String>) -> Self {
        Self::MalformedResponse {
            platform,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn unknown_timezone(timezone: impl Into<String>) -> Self {
        Self::UnknownTimezone {
            timezone: timezone.into(),
        }
    }

    /// Whether this error should put the platform into quota cooldown.
    #[must_use]
    pub fn is_quota(&self) -> bool {
        matches!(self, Self::QuotaExceeded { .. })
    }
}

impl FromMessage for Error {
    fn from_message(message: String) -> Self {
        Self::Message { message }
    }
}

chanstat_common::impl_context!();

pub type Result<T> = std::result::Result<T, Error>;
