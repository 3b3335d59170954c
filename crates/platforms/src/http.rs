//! Shared HTTP plumbing for the platform clients.

use std::time::Duration;

use {
    chanstat_collector::{Error, Result, types::Platform},
    chanstat_config::PlatformApiConfig,
    reqwest::{Client, StatusCode},
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Deserializer},
    tracing::warn,
    url::Url,
};

pub(crate) const USER_AGENT: &str = concat!("chanstat/", env!("CARGO_PKG_VERSION"));

/// Error bodies are cut to this many characters before they reach logs.
const MAX_ERROR_BODY: usize = 200;

/// Connection settings resolved from a `[youtube]` / `[tiktok]` section.
pub(crate) struct Endpoint {
    pub client: Client,
    pub base_url: String,
    pub api_key: Option<Secret<String>>,
}

impl Endpoint {
    pub fn from_config(
        platform: Platform,
        config: &PlatformApiConfig,
        default_base_url: &str,
    ) -> Result<Self> {
        let raw = config.base_url.as_deref().unwrap_or(default_base_url);
        let parsed = Url::parse(raw)
            .map_err(|e| Error::external(format!("invalid {platform} base_url {raw:?}"), e))?;

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_seconds.max(1)))
            .build()
            .map_err(|e| Error::external(format!("failed to build {platform} HTTP client"), e))?;

        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.expose_secret().trim().is_empty());
        if api_key.is_none() {
            warn!(%platform, "no API key configured; {platform} channels cannot be collected");
        }

        Ok(Self {
            client,
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// The configured key, or `Unauthorized` before any request is sent.
    pub fn require_key(&self, platform: Platform) -> Result<&str> {
        self.api_key
            .as_ref()
            .map(|k| k.expose_secret().as_str())
            .ok_or_else(|| Error::Unauthorized {
                platform,
                message: "API key is not configured".into(),
            })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

pub(crate) fn truncate_body(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(MAX_ERROR_BODY) {
        Some((idx, _)) => format!("{}…", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}

/// Map a non-success response to the collector's error taxonomy.
pub(crate) fn status_error(platform: Platform, status: StatusCode, body: &str) -> Error {
    let message = format!("returned HTTP {}: {}", status.as_u16(), truncate_body(body));
    match status {
        StatusCode::UNAUTHORIZED => Error::Unauthorized { platform, message },
        StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS => {
            Error::QuotaExceeded { platform, message }
        },
        _ => Error::api(platform, Some(status.as_u16()), message),
    }
}

pub(crate) fn transport_error(platform: Platform, err: reqwest::Error) -> Error {
    let status = err.status().map(|s| s.as_u16());
    Error::api(platform, status, format!("request failed: {err}"))
}

/// Send a GET and decode the JSON body, mapping failures per platform.
pub(crate) async fn get_json(
    platform: Platform,
    request: reqwest::RequestBuilder,
) -> Result<serde_json::Value> {
    let resp = request
        .header("Accept", "application/json")
        .send()
        .await
        .map_err(|e| transport_error(platform, e))?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(status_error(platform, status, &body));
    }

    resp.json()
        .await
        .map_err(|e| Error::malformed(platform, format!("invalid JSON body: {e}")))
}

/// Counts arrive as JSON numbers or decimal strings; missing or null is 0.
pub(crate) fn count_value(value: Option<&serde_json::Value>) -> u64 {
    match value {
        Some(serde_json::Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .unwrap_or(0),
        Some(serde_json::Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

/// Serde adapter over [`count_value`].
pub(crate) fn de_count<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<u64, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(count_value(value.as_ref()))
}
