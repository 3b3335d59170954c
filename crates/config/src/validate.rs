//! Semantic validation of a loaded configuration.
//!
//! Parsing already guarantees the shape; this catches values that parse but
//! would make the collector misbehave.

use crate::schema::{ChanstatConfig, PlatformApiConfig};

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Category: "retry", "credentials", "database", "schedule", "server"
    pub category: &'static str,
    /// Dotted path, e.g. "collector.retry.max_delay_ms"
    pub path: String,
    pub message: String,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}] {}: {}",
            self.severity, self.category, self.path, self.message
        )
    }
}

/// Result of validating a configuration.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Count diagnostics by severity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    fn push(
        &mut self,
        severity: Severity,
        category: &'static str,
        path: &str,
        message: impl Into<String>,
    ) {
        self.diagnostics.push(Diagnostic {
            severity,
            category,
            path: path.to_string(),
            message: message.into(),
        });
    }
}

/// Validate a configuration, returning every problem found.
pub fn validate(config: &ChanstatConfig) -> ValidationResult {
    let mut result = ValidationResult::default();

    let retry = &config.collector.retry;
    if !retry.backoff_multiplier.is_finite() || retry.backoff_multiplier < 1.0 {
        result.push(
            Severity::Error,
            "retry",
            "collector.retry.backoff_multiplier",
            format!("must be a finite number >= 1.0, got {}", retry.backoff_multiplier),
        );
    }
    if retry.max_delay_ms < retry.base_delay_ms {
        result.push(
            Severity::Error,
            "retry",
            "collector.retry.max_delay_ms",
            format!(
                "max delay ({} ms) is below the base delay ({} ms)",
                retry.max_delay_ms, retry.base_delay_ms
            ),
        );
    }
    if retry.max_retries > 10 {
        result.push(
            Severity::Warning,
            "retry",
            "collector.retry.max_retries",
            format!(
                "{} retries per channel can stall an hourly sweep",
                retry.max_retries
            ),
        );
    }

    if config.collector.every_secs == Some(0) {
        result.push(
            Severity::Error,
            "schedule",
            "collector.every_secs",
            "sweep interval must be at least one second",
        );
    } else if config.collector.every_secs.is_none() && config.collector.schedule.trim().is_empty() {
        result.push(
            Severity::Error,
            "schedule",
            "collector.schedule",
            "schedule expression is empty",
        );
    }
    if config.collector.inter_channel_delay_ms > 60_000 {
        result.push(
            Severity::Warning,
            "schedule",
            "collector.inter_channel_delay_ms",
            "inter-channel delay above one minute",
        );
    }

    check_credentials(&mut result, "youtube", &config.youtube);
    check_credentials(&mut result, "tiktok", &config.tiktok);

    if !config.database.url.starts_with("sqlite:") {
        result.push(
            Severity::Error,
            "database",
            "database.url",
            format!("only sqlite URLs are supported, got {:?}", config.database.url),
        );
    }
    if config.database.max_connections == 0 {
        result.push(
            Severity::Error,
            "database",
            "database.max_connections",
            "must be at least 1",
        );
    }

    if config.server.port == 0 {
        result.push(
            Severity::Info,
            "server",
            "server.port",
            "port 0 binds a random free port",
        );
    }

    result
}

fn check_credentials(result: &mut ValidationResult, section: &str, api: &PlatformApiConfig) {
    if !api.has_api_key() {
        result.push(
            Severity::Warning,
            "credentials",
            &format!("{section}.api_key"),
            format!("no {section} API key configured; {section} channels will fail to collect"),
        );
    }
    if api.timeout_seconds == 0 {
        result.push(
            Severity::Error,
            "credentials",
            &format!("{section}.timeout_seconds"),
            "must be at least 1 second",
        );
    }
}
