//! YouTube Data API v3 client.

use {
    async_trait::async_trait,
    chanstat_collector::{
        Error, PlatformApi, Result,
        types::{ChannelStats, Platform},
    },
    chanstat_config::PlatformApiConfig,
    serde::Deserialize,
    tracing::debug,
};

use crate::http::{Endpoint, de_count, get_json};

pub const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";

const PLATFORM: Platform = Platform::Youtube;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: SearchItemId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchItemId {
    channel_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChannelsResponse {
    #[serde(default)]
    items: Vec<ChannelItem>,
}

#[derive(Debug, Deserialize)]
struct ChannelItem {
    id: String,
    #[serde(default)]
    snippet: Snippet,
    #[serde(default)]
    statistics: Statistics,
}

#[derive(Debug, Default, Deserialize)]
struct Snippet {
    #[serde(default)]
    title: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct Statistics {
    #[serde(deserialize_with = "de_count")]
    subscriber_count: u64,
    #[serde(deserialize_with = "de_count")]
    view_count: u64,
    #[serde(deserialize_with = "de_count")]
    video_count: u64,
}

/// Channel search and statistics over the YouTube Data API.
pub struct YoutubeClient {
    endpoint: Endpoint,
}

impl YoutubeClient {
    pub fn new(config: &PlatformApiConfig) -> Result<Self> {
        Ok(Self {
            endpoint: Endpoint::from_config(PLATFORM, config, DEFAULT_BASE_URL)?,
        })
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let key = self.endpoint.require_key(PLATFORM)?;
        let request = self
            .endpoint
            .client
            .get(self.endpoint.url(path))
            .query(query)
            .query(&[("key", key)]);
        let body = get_json(PLATFORM, request).await.map_err(key_rejection)?;
        serde_json::from_value(body).map_err(|e| Error::malformed(PLATFORM, e.to_string()))
    }
}

/// Google answers an invalid key with HTTP 400 rather than 401.
fn key_rejection(err: Error) -> Error {
    match err {
        Error::Api {
            status: Some(400),
            message,
            ..
        } if message.contains("API key not valid") || message.contains("API_KEY_INVALID") => {
            Error::Unauthorized {
                platform: PLATFORM,
                message,
            }
        },
        other => other,
    }
}

#[async_trait]
impl PlatformApi for YoutubeClient {
    fn platform(&self) -> Platform {
        PLATFORM
    }

    async fn search(&self, handle: &str) -> Result<Option<String>> {
        let query = format!("@{handle}");
        let resp: SearchResponse = self
            .get("search", &[("part", "snippet"), ("type", "channel"), ("q", query.as_str())])
            .await?;
        let id = resp.items.into_iter().find_map(|item| item.id.channel_id);
        debug!(handle, channel_id = ?id, "youtube search");
        Ok(id)
    }

    async fn get_stats(&self, internal_id: &str) -> Result<Option<ChannelStats>> {
        let resp: ChannelsResponse = self
            .get("channels", &[("part", "statistics,snippet"), ("id", internal_id)])
            .await?;
        Ok(resp.items.into_iter().next().map(|item| ChannelStats {
            internal_id: item.id,
            name: item.snippet.title,
            subscribers: item.statistics.subscriber_count,
            views: item.statistics.view_count,
            videos: item.statistics.video_count,
            likes: 0,
        }))
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        mockito::Matcher,
        secrecy::Secret,
    };

    fn client(server: &mockito::Server) -> YoutubeClient {
        YoutubeClient::new(&PlatformApiConfig {
            api_key: Some(Secret::new("yt-key".into())),
            base_url: Some(server.url()),
            timeout_seconds: 5,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn search_returns_first_channel_id() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/search")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("q".into(), "@example".into()),
                Matcher::UrlEncoded("type".into(), "channel".into()),
                Matcher::UrlEncoded("key".into(), "yt-key".into()),
            ]))
            .match_header("user-agent", Matcher::Regex("^chanstat/".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"items": [{"id": {"kind": "youtube#channel", "channelId": "UC123"}}]}"#)
            .create_async()
            .await;

        let id = client(&server).search("example").await.unwrap();
        assert_eq!(id.as_deref(), Some("UC123"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn search_without_items_is_none() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/search")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"items": []}"#)
            .create_async()
            .await;

        assert!(client(&server).search("ghost").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn stats_parse_string_counts() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/channels")
            .match_query(Matcher::UrlEncoded("id".into(), "UC123".into()))
            .with_status(200)
            .with_body(
                r#"{"items": [{
                    "id": "UC123",
                    "snippet": {"title": "Example"},
                    "statistics": {"subscriberCount": "1000", "viewCount": "50000", "videoCount": "10"}
                }]}"#,
            )
            .create_async()
            .await;

        let stats = client(&server).get_stats("UC123").await.unwrap().unwrap();
        assert_eq!(stats, ChannelStats {
            internal_id: "UC123".into(),
            name: "Example".into(),
            subscribers: 1000,
            views: 50_000,
            videos: 10,
            likes: 0,
        });
    }

    #[tokio::test]
    async fn hidden_subscriber_count_defaults_to_zero() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/channels")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"items": [{"id": "UC1", "statistics": {"viewCount": "7", "hiddenSubscriberCount": true}}]}"#)
            .create_async()
            .await;

        let stats = client(&server).get_stats("UC1").await.unwrap().unwrap();
        assert_eq!((stats.subscribers, stats.views, stats.videos), (0, 7, 0));
        assert!(stats.name.is_empty());
    }

    #[tokio::test]
    async fn forbidden_is_quota() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/search")
            .match_query(Matcher::Any)
            .with_status(403)
            .with_body(r#"{"error": {"errors": [{"reason": "quotaExceeded"}]}}"#)
            .create_async()
            .await;

        let err = client(&server).search("example").await.unwrap_err();
        assert!(matches!(err, Error::QuotaExceeded { .. }));
    }

    #[tokio::test]
    async fn invalid_key_is_unauthorized() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/channels")
            .match_query(Matcher::Any)
            .with_status(400)
            .with_body(r#"{"error": {"message": "API key not valid. Please pass a valid API key."}}"#)
            .create_async()
            .await;

        let err = client(&server).get_stats("UC1").await.unwrap_err();
        assert!(matches!(err, Error::Unauthorized { .. }));
    }

    #[tokio::test]
    async fn server_error_is_transient_api_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/channels")
            .match_query(Matcher::Any)
            .with_status(503)
            .with_body("backend unavailable")
            .create_async()
            .await;

        let err = client(&server).get_stats("UC1").await.unwrap_err();
        assert!(matches!(err, Error::Api { status: Some(503), .. }));
        assert!(err.to_string().contains("backend unavailable"));
    }

    #[tokio::test]
    async fn missing_key_fails_before_request() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", Matcher::Any)
            .expect(0)
            .create_async()
            .await;
        let client = YoutubeClient::new(&PlatformApiConfig {
            base_url: Some(server.url()),
            ..PlatformApiConfig::default()
        })
        .unwrap();

        let err = client.search("example").await.unwrap_err();
        assert!(matches!(err, Error::Unauthorized { .. }));
        mock.assert_async().await;
    }
}
