use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::FeedItem;

const SAVED_TAG: &str = "global.saved";

#[derive(Debug, Serialize)]
struct TokenRequest<'a> {
    refresh_token: &'a str,
    client_id: &'a str,
    client_secret: &'a str,
    grant_type: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProfileResponse {
    id: Option<String>,
}

/// One page of a stream, newest first.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StreamPage {
    #[serde(default)]
    pub items: Vec<FeedItem>,
    pub continuation: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct StreamQuery {
    pub count: usize,
    pub newest_first: bool,
    pub unread_only: Option<bool>,
    pub continuation: Option<String>,
}

impl StreamQuery {
    pub fn newest(count: usize) -> Self {
        Self {
            count,
            newest_first: true,
            ..Self::default()
        }
    }

    pub fn continuing(mut self, continuation: Option<String>) -> Self {
        self.continuation = continuation;
        self
    }

    fn to_params(&self, stream_id: &str) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("streamId", stream_id.to_string()),
            ("count", self.count.to_string()),
        ];
        if self.newest_first {
            params.push(("ranked", "newest".to_string()));
        }
        if let Some(unread_only) = self.unread_only {
            params.push(("unreadOnly", unread_only.to_string()));
        }
        if let Some(continuation) = &self.continuation {
            params.push(("continuation", continuation.clone()));
        }
        params
    }
}

/// Read side of the read-it-later feed service.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Page through the user's saved-for-later entries.
    async fn fetch_saved(&self, query: StreamQuery) -> Result<StreamPage>;

    /// Page through a user category such as "Music".
    async fn fetch_category(&self, category: &str, query: StreamQuery) -> Result<StreamPage>;
}

pub struct FeedlyClient {
    client: Client,
    base_url: String,
    access_token: String,
    user_id: String,
}

impl FeedlyClient {
    /// Exchange the refresh token for an access token and resolve the user id.
    pub async fn authenticate(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("feed-etl/1.0")
            .build()?;
        let base_url = config.feedly_base_url.trim_end_matches('/').to_string();
        let refresh_token = crate::config::require("feedly_refresh_token", &config.feedly_refresh_token)?;

        let response = client
            .post(format!("{}/v3/auth/token", base_url))
            .json(&TokenRequest {
                refresh_token,
                client_id: &config.feedly_client_id,
                client_secret: &config.feedly_client_secret,
                grant_type: "refresh_token",
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Auth(format!(
                "feedly token refresh returned {}: {}",
                status, error_text
            )));
        }

        let token: TokenResponse = response.json().await?;
        let access_token = token
            .access_token
            .ok_or_else(|| AppError::Auth("feedly token response has no access_token".to_string()))?;

        let mut feedly = Self {
            client,
            base_url,
            access_token,
            user_id: String::new(),
        };
        feedly.user_id = feedly.fetch_user_id().await?;
        tracing::debug!("Authenticated to feedly as {}", feedly.user_id);

        Ok(feedly)
    }

    async fn fetch_user_id(&self) -> Result<String> {
        let response = self
            .client
            .get(format!("{}/v3/profile", self.base_url))
            .header("Authorization", format!("OAuth {}", self.access_token))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Auth(format!(
                "feedly profile returned {}: {}",
                status, error_text
            )));
        }

        let profile: ProfileResponse = response.json().await?;
        profile
            .id
            .ok_or_else(|| AppError::Auth("feedly profile has no id".to_string()))
    }

    pub fn saved_stream_id(&self) -> String {
        format!("user/{}/tag/{}", self.user_id, SAVED_TAG)
    }

    pub fn category_stream_id(&self, category: &str) -> String {
        format!("user/{}/category/{}", self.user_id, category)
    }

    async fn stream_contents(&self, stream_id: &str, query: &StreamQuery) -> Result<StreamPage> {
        let response = self
            .client
            .get(format!("{}/v3/streams/contents", self.base_url))
            .header("Authorization", format!("OAuth {}", self.access_token))
            .query(&query.to_params(stream_id))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::FeedApi(format!(
                "stream {} returned {}: {}",
                stream_id, status, error_text
            )));
        }

        let page: StreamPage = response.json().await?;
        tracing::debug!(
            "Fetched {} items from {} (more: {})",
            page.items.len(),
            stream_id,
            page.continuation.is_some()
        );
        Ok(page)
    }
}

#[async_trait]
impl FeedSource for FeedlyClient {
    async fn fetch_saved(&self, query: StreamQuery) -> Result<StreamPage> {
        self.stream_contents(&self.saved_stream_id(), &query).await
    }

    async fn fetch_category(&self, category: &str, query: StreamQuery) -> Result<StreamPage> {
        self.stream_contents(&self.category_stream_id(category), &query)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{serve, Route};

    fn config_for(base_url: &str) -> Config {
        Config {
            feedly_base_url: base_url.to_string(),
            feedly_refresh_token: Some("refresh".to_string()),
            ..Config::default()
        }
    }

    async fn auth_error(routes: Vec<Route>) -> AppError {
        let base = serve(routes).await;
        FeedlyClient::authenticate(&config_for(&base))
            .await
            .err()
            .expect("authentication should fail")
    }

    #[tokio::test]
    async fn rejected_token_refresh_is_an_auth_error() {
        let err = auth_error(vec![Route::new("/v3/auth/token", 401, r#"{"errorMessage":"bad token"}"#)]).await;
        assert!(matches!(err, AppError::Auth(ref m) if m.contains("401")), "{:?}", err);
    }

    #[tokio::test]
    async fn token_response_without_access_token_is_an_auth_error() {
        let err = auth_error(vec![Route::new("/v3/auth/token", 200, r#"{"expires_in":3600}"#)]).await;
        assert!(matches!(err, AppError::Auth(ref m) if m.contains("access_token")), "{:?}", err);
    }

    #[tokio::test]
    async fn rejected_profile_is_an_auth_error() {
        let err = auth_error(vec![
            Route::new("/v3/auth/token", 200, r#"{"access_token":"tok"}"#),
            Route::new("/v3/profile", 403, "forbidden"),
        ])
        .await;
        assert!(matches!(err, AppError::Auth(ref m) if m.contains("profile")), "{:?}", err);
    }

    #[tokio::test]
    async fn authenticated_client_reads_saved_stream() {
        let base = serve(vec![
            Route::new("/v3/auth/token", 200, r#"{"access_token":"tok"}"#),
            Route::new("/v3/profile", 200, r#"{"id":"u1","email":"x@example.com"}"#),
            Route::new(
                "/v3/streams/contents",
                200,
                r#"{"items":[{"id":"f1","originId":"https://example.com/1"}],"continuation":"next"}"#,
            ),
        ])
        .await;

        let feedly = FeedlyClient::authenticate(&config_for(&base)).await.unwrap();
        assert_eq!(feedly.saved_stream_id(), "user/u1/tag/global.saved");
        assert_eq!(feedly.category_stream_id("Music"), "user/u1/category/Music");

        let page = feedly.fetch_saved(StreamQuery::newest(500)).await.unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].origin_id, "https://example.com/1");
        assert_eq!(page.continuation.as_deref(), Some("next"));
    }

    #[tokio::test]
    async fn stream_failure_is_a_feed_error() {
        let base = serve(vec![
            Route::new("/v3/auth/token", 200, r#"{"access_token":"tok"}"#),
            Route::new("/v3/profile", 200, r#"{"id":"u1"}"#),
            Route::new("/v3/streams/contents", 500, "boom"),
        ])
        .await;

        let feedly = FeedlyClient::authenticate(&config_for(&base)).await.unwrap();
        let err = feedly.fetch_saved(StreamQuery::newest(500)).await.unwrap_err();
        assert!(matches!(err, AppError::FeedApi(_)), "{:?}", err);
    }

    fn param<'a>(params: &'a [(&'static str, String)], key: &str) -> Option<&'a str> {
        params
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn saved_query_params() {
        let query = StreamQuery::newest(500).continuing(Some("cursor-1".to_string()));
        let params = query.to_params("user/u/tag/global.saved");

        assert_eq!(param(&params, "streamId"), Some("user/u/tag/global.saved"));
        assert_eq!(param(&params, "count"), Some("500"));
        assert_eq!(param(&params, "ranked"), Some("newest"));
        assert_eq!(param(&params, "continuation"), Some("cursor-1"));
        assert_eq!(param(&params, "unreadOnly"), None);
    }

    #[test]
    fn first_page_has_no_continuation() {
        let params = StreamQuery::newest(500).continuing(None).to_params("s");
        assert_eq!(param(&params, "continuation"), None);
    }

    #[test]
    fn category_query_params() {
        let query = StreamQuery {
            count: 100,
            unread_only: Some(false),
            ..StreamQuery::default()
        };
        let params = query.to_params("user/u/category/Music");

        assert_eq!(param(&params, "unreadOnly"), Some("false"));
        assert_eq!(param(&params, "ranked"), None);
    }

    #[test]
    fn page_without_continuation_is_last() {
        let page: StreamPage = serde_json::from_str(
            r#"{"id": "user/u/tag/global.saved", "items": [{"id": "e1", "originId": "o/1", "title": "t"}]}"#,
        )
        .unwrap();

        assert_eq!(page.items.len(), 1);
        assert!(page.continuation.is_none());
    }

    #[test]
    fn page_with_continuation() {
        let page: StreamPage =
            serde_json::from_str(r#"{"items": [], "continuation": "abc"}"#).unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.continuation.as_deref(), Some("abc"));
    }
}
