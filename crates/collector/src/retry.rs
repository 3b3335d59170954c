//! Bounded exponential-backoff retry around one fallible async operation.

use std::{fmt::Display, future::Future};

use tracing::{debug, error, warn};

use crate::{Error, types::RetryPolicy};

/// Message fragments that mark an opaque error as not worth retrying.
const CRITICAL_PATTERNS: &[&str] = &[
    "quota",
    "rate limit",
    "too many requests",
    "unauthorized",
    "forbidden",
    "invalid api key",
    "api key not valid",
    "not found",
    "http 401",
    "http 403",
];

/// Returns `true` if an error message indicates quota exhaustion, an
/// authorization rejection or a missing resource.
#[must_use]
pub fn is_critical_message(message: &str) -> bool {
    let lower = message.to_lowercase();
    CRITICAL_PATTERNS.iter().any(|p| lower.contains(p))
}

/// Classifies errors for the retry loop.
pub trait RetryClass {
    /// Critical errors abort immediately without further attempts.
    fn is_critical(&self) -> bool;
}

impl RetryClass for Error {
    fn is_critical(&self) -> bool {
        match self {
            Self::NotFound { .. }
            | Self::QuotaExceeded { .. }
            | Self::Unauthorized { .. }
            | Self::InvalidInput { .. }
            | Self::DuplicateChannel { .. }
            | Self::ChannelMissing { .. } => true,
            Self::Api { status, message, .. } => {
                matches!(status, Some(401 | 403 | 404 | 429)) || is_critical_message(message)
            },
            Self::Message { message } => is_critical_message(message),
            Self::External { .. } => is_critical_message(&self.to_string()),
            _ => false,
        }
    }
}

/// Run `operation` up to `policy.max_attempts()` times.
///
/// The delay before retry `k` is [`RetryPolicy::delay_for`]`(k)`. Critical
/// errors are returned at once; otherwise the last error is returned after the
/// final attempt.
pub async fn execute<T, E, F, Fut>(policy: &RetryPolicy, label: &str, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: RetryClass + Display,
{
    let max_attempts = policy.max_attempts();
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(label, attempt, "operation succeeded after retry");
                }
                return Ok(value);
            },
            Err(e) if e.is_critical() => {
                warn!(label, attempt, error = %e, "critical error, not retrying");
                return Err(e);
            },
            Err(e) if attempt >= max_attempts => {
                error!(label, attempts = attempt, error = %e, "retries exhausted");
                return Err(e);
            },
            Err(e) => {
                let delay = policy.delay_for(attempt);
                warn!(
                    label,
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "operation failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            },
        }
    }
}
