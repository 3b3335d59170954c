//! TikTok statistics through the TokInsight API.

use {
    async_trait::async_trait,
    chanstat_collector::{
        Error, PlatformApi, Result,
        retry::is_critical_message,
        types::{ChannelStats, Platform},
    },
    chanstat_config::PlatformApiConfig,
    serde_json::Value,
    tracing::debug,
};

use crate::http::{Endpoint, count_value, get_json, truncate_body};

pub const DEFAULT_BASE_URL: &str = "https://api.tokinsight.com/tok/v1";

const PLATFORM: Platform = Platform::Tiktok;

/// In-band messages that reject the key rather than the request rate.
const AUTH_PATTERNS: &[&str] = &["unauthorized", "invalid api key", "api key not valid", "http 401"];

/// User lookup and profile statistics over TokInsight (bearer auth).
pub struct TiktokClient {
    endpoint: Endpoint,
}

impl TiktokClient {
    pub fn new(config: &PlatformApiConfig) -> Result<Self> {
        Ok(Self {
            endpoint: Endpoint::from_config(PLATFORM, config, DEFAULT_BASE_URL)?,
        })
    }

    async fn call(&self, path: &str, query: &[(&str, &str)]) -> Result<Value> {
        let key = self.endpoint.require_key(PLATFORM)?;
        let request = self
            .endpoint
            .client
            .get(self.endpoint.url(path))
            .bearer_auth(key)
            .query(query);
        let body = get_json(PLATFORM, request).await?;
        check_status(&body)?;
        Ok(body)
    }
}

/// TokInsight reports failures in-band with a non-zero `status_code`.
fn check_status(body: &Value) -> Result<()> {
    let code = body.get("status_code").and_then(Value::as_i64).unwrap_or(0);
    if code == 0 {
        return Ok(());
    }
    let message = truncate_body(
        body.get("status_msg")
            .and_then(Value::as_str)
            .unwrap_or("unknown error"),
    );
    let message = format!("status_code {code}: {message}");
    let lower = message.to_lowercase();
    if AUTH_PATTERNS.iter().any(|p| lower.contains(p)) {
        return Err(Error::Unauthorized {
            platform: PLATFORM,
            message,
        });
    }
    if is_critical_message(&message) && !lower.contains("not found") {
        return Err(Error::QuotaExceeded {
            platform: PLATFORM,
            message,
        });
    }
    Err(Error::api(PLATFORM, None, message))
}

fn id_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// The uid sits at the root, under `user`, or as `data.user_id`.
fn extract_uid(body: &Value) -> Option<String> {
    id_string(body.get("uid"))
        .or_else(|| id_string(body.pointer("/user/uid")))
        .or_else(|| id_string(body.pointer("/data/user_id")))
}

fn profile_stats(body: &Value, uid: &str) -> Option<ChannelStats> {
    let info = body
        .get("user")
        .filter(|v| v.is_object())
        .or_else(|| body.get("data").filter(|v| v.is_object()))
        .unwrap_or(body);

    let has_profile = ["nickname", "display_name", "follower_count", "total_favorited"]
        .iter()
        .any(|k| info.get(k).is_some());
    if !has_profile {
        return None;
    }

    let name = ["nickname", "display_name", "unique_id"]
        .iter()
        .filter_map(|k| info.get(k).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
        .unwrap_or_default()
        .to_string();

    Some(ChannelStats {
        internal_id: uid.to_string(),
        name,
        subscribers: count_value(info.get("follower_count")),
        views: 0,
        videos: 0,
        likes: count_value(info.get("total_favorited")),
    })
}

#[async_trait]
impl PlatformApi for TiktokClient {
    fn platform(&self) -> Platform {
        PLATFORM
    }

    async fn search(&self, handle: &str) -> Result<Option<String>> {
        let body = self.call("user_uniqueid/", &[("unique_id", handle)]).await?;
        let uid = extract_uid(&body);
        debug!(handle, uid = ?uid, "tokinsight user lookup");
        Ok(uid)
    }

    async fn get_stats(&self, internal_id: &str) -> Result<Option<ChannelStats>> {
        let body = self.call("user_profile/", &[("uid", internal_id)]).await?;
        Ok(profile_stats(&body, internal_id))
    }
}
