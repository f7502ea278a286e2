//! Core YouTube Data API client functionality, quota accounting, and error classification.

use crate::config::{ApiKey, ScraperConfig};
use crate::error::{Result, ScrapeError};
use crate::quota::{LIST_COST, QuotaTracker, SEARCH_COST};
use crate::retry::RetryPolicy;
use crate::youtube_api::{
    channels::{Channel, ChannelListResponse},
    playlist_items::PlaylistItemListResponse,
    search::SearchListResponse,
    types::PagedStream,
    videos::VideoListResponse,
};
use reqwest::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio_stream::Stream;
use tracing::instrument;

/// Maximum page size (and batch size) accepted by the list endpoints we use.
pub const MAX_RESULTS: usize = 50;

/// Client for interacting with the YouTube Data API v3 using an API key.
///
/// Every call is charged against a shared [`QuotaTracker`] before it is sent, and transient
/// failures (connection problems, 5xx, rate limiting) are retried according to the client's
/// [`RetryPolicy`]. Credential and quota failures are never retried.
///
/// The key travels in the `X-Goog-Api-Key` header rather than the query string so that it
/// never shows up in logged URLs.
#[derive(Debug, Clone)]
pub struct YouTubeClient {
    /// The API key identifying the caller's Google Cloud project
    api_key: ApiKey,
    /// Base URL of the Data API, without trailing slash
    base_url: String,
    /// Quota spent by this client (and its clones)
    quota: Arc<QuotaTracker>,
    /// Policy for transient failures
    retry: RetryPolicy,
    /// HTTP client for API requests
    client: reqwest::Client,
}

impl YouTubeClient {
    /// Creates a client talking to the public Data API with the default quota budget and
    /// retry policy.
    pub fn new(api_key: ApiKey, client: reqwest::Client) -> Self {
        Self {
            api_key,
            base_url: crate::config::DATA_API_BASE.to_string(),
            quota: Arc::new(QuotaTracker::default()),
            retry: RetryPolicy::default(),
            client,
        }
    }

    /// Creates a client configured from a [`ScraperConfig`].
    pub fn from_config(api_key: ApiKey, config: &ScraperConfig) -> Result<Self> {
        Ok(Self::new(api_key, config.data_api_http_client()?)
            .with_base_url(&config.data_api_base)
            .with_quota(Arc::new(QuotaTracker::new(config.quota_budget)))
            .with_retry(config.retry.clone()))
    }

    /// Points the client at a different API root (e.g. a mock server).
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_quota(mut self, quota: Arc<QuotaTracker>) -> Self {
        self.quota = quota;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// The quota tracker this client charges.
    pub fn quota(&self) -> &QuotaTracker {
        &self.quota
    }

    /// Makes a GET request to a Data API list endpoint and parses the JSON response.
    ///
    /// This consolidates the logic shared by all calls:
    /// - quota accounting (charged per attempt, since YouTube charges failed calls too)
    /// - the API key header
    /// - retrying transient failures
    /// - mapping non-success statuses onto [`ScrapeError`]
    #[instrument(skip(self), level = tracing::Level::TRACE)]
    async fn get_json<R: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        cost: u64,
        query_params: &[(&str, &str)],
    ) -> Result<R> {
        let url = format!("{}/{}", self.base_url, endpoint);
        let url = url.as_str();

        let body = self
            .retry
            .run(move || async move {
                self.quota.charge(cost, endpoint).await?;
                self.send_once(url, query_params).await
            })
            .await?;

        serde_json::from_str(&body).map_err(|source| ScrapeError::Decode {
            what: endpoint,
            source,
        })
    }

    async fn send_once(&self, url: &str, query_params: &[(&str, &str)]) -> Result<String> {
        let response = self
            .client
            .get(url)
            .header("X-Goog-Api-Key", self.api_key.secret())
            .query(query_params)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            let e = classify_error(status, &body);
            tracing::debug!(%status, error = %e, "YouTube API request failed");
            return Err(e);
        }
        Ok(body)
    }

    /// Looks up a channel by its `UC…` id, including its uploads playlist.
    ///
    /// Returns `Ok(None)` if no such channel exists.
    ///
    /// # API Cost
    ///
    /// 1 quota unit.
    ///
    /// See: <https://developers.google.com/youtube/v3/docs/channels/list>
    #[instrument(skip(self))]
    pub async fn channel_by_id(&self, channel_id: &str) -> Result<Option<Channel>> {
        self.find_channel(&[("id", channel_id)]).await
    }

    /// Looks up a channel by its handle. The leading `@` is optional.
    ///
    /// # API Cost
    ///
    /// 1 quota unit.
    #[instrument(skip(self))]
    pub async fn channel_by_handle(&self, handle: &str) -> Result<Option<Channel>> {
        let handle = format!("@{}", handle.trim_start_matches('@'));
        self.find_channel(&[("forHandle", handle.as_str())]).await
    }

    /// Looks up a channel by its legacy username (the `/user/<name>` URL form).
    ///
    /// # API Cost
    ///
    /// 1 quota unit.
    #[instrument(skip(self))]
    pub async fn channel_by_username(&self, username: &str) -> Result<Option<Channel>> {
        self.find_channel(&[("forUsername", username)]).await
    }

    async fn find_channel(&self, selector: &[(&str, &str)]) -> Result<Option<Channel>> {
        let mut query_params = vec![("part", "id,snippet,contentDetails")];
        query_params.extend_from_slice(selector);

        let channels: ChannelListResponse = self
            .get_json("channels", LIST_COST, &query_params)
            .await?;

        tracing::debug!(
            total_results = channels.page_info.total_results,
            returned_items = channels.items.len(),
            "fetched channels"
        );

        Ok(channels.items.into_iter().next())
    }

    /// Finds the id of the channel that best matches a free-text query.
    ///
    /// Only used for legacy custom URLs, which have no direct lookup.
    ///
    /// # API Cost
    ///
    /// 100 quota units.
    ///
    /// See: <https://developers.google.com/youtube/v3/docs/search/list>
    #[instrument(skip(self), ret)]
    pub async fn search_channel_id(&self, query: &str) -> Result<Option<String>> {
        let query_params = [
            ("part", "snippet"),
            ("q", query),
            ("type", "channel"),
            ("maxResults", "1"),
        ];

        let results: SearchListResponse = self
            .get_json("search", SEARCH_COST, &query_params)
            .await?;

        Ok(results
            .items
            .into_iter()
            .next()
            .map(|result| result.snippet.channel_id))
    }

    /// Returns a paginated stream of the ids of all videos in a playlist, in playlist order.
    ///
    /// For a channel's uploads playlist that is most recent first. The stream requests
    /// pages lazily, one `playlistItems.list` call (1 quota unit) per 50 items.
    ///
    /// See: <https://developers.google.com/youtube/v3/docs/playlistItems/list>
    #[instrument(skip(self))]
    pub fn list_playlist_video_ids<'a>(
        &'a self,
        playlist_id: &'a str,
    ) -> impl Stream<Item = Result<String>> + 'a {
        PagedStream::new(move |page_token| async move {
            let response = self
                .list_playlist_items_internal(playlist_id, page_token)
                .await?;
            let ids = response
                .items
                .into_iter()
                .map(|item| item.content_details.video_id)
                .collect::<VecDeque<_>>();
            Ok((ids, response.next_page_token))
        })
    }

    /// Gets snippet and statistics for up to [`MAX_RESULTS`] videos in one call.
    ///
    /// Ids that don't refer to an accessible video are simply missing from the response.
    ///
    /// # API Cost
    ///
    /// 1 quota unit.
    ///
    /// See: <https://developers.google.com/youtube/v3/docs/videos/list>
    #[instrument(skip(self, video_ids), fields(count = video_ids.len()))]
    pub async fn list_videos(&self, video_ids: &[String]) -> Result<VideoListResponse> {
        debug_assert!(video_ids.len() <= MAX_RESULTS);
        let ids = video_ids.join(",");
        let query_params = [("part", "snippet,statistics"), ("id", ids.as_str())];

        let videos: VideoListResponse = self
            .get_json("videos", LIST_COST, &query_params)
            .await?;

        tracing::debug!(
            requested = video_ids.len(),
            returned_items = videos.items.len(),
            "fetched video metadata"
        );

        Ok(videos)
    }

    async fn list_playlist_items_internal(
        &self,
        playlist_id: &str,
        page_token: Option<String>,
    ) -> Result<PlaylistItemListResponse> {
        let max_results_string = MAX_RESULTS.to_string();
        let mut query_params = vec![
            ("part", "contentDetails"),
            ("playlistId", playlist_id),
            ("maxResults", max_results_string.as_str()),
        ];

        if let Some(ref token) = page_token {
            query_params.push(("pageToken", token.as_str()));
        }

        let items: PlaylistItemListResponse = self
            .get_json("playlistItems", LIST_COST, &query_params)
            .await?;

        tracing::debug!(
            total_results = items.page_info.total_results,
            returned_items = items.items.len(),
            has_next_page = items.next_page_token.is_some(),
            "fetched playlist items"
        );

        Ok(items)
    }
}

/// Google's JSON error envelope.
///
/// See: <https://developers.google.com/youtube/v3/docs/errors>
#[derive(Debug, Deserialize)]
struct GoogleErrorResponse {
    error: GoogleError,
}

#[derive(Debug, Deserialize)]
struct GoogleError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    errors: Vec<GoogleErrorReason>,
    #[serde(default)]
    details: Vec<GoogleErrorReason>,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorReason {
    #[serde(default)]
    reason: Option<String>,
}

const QUOTA_REASONS: &[&str] = &["quotaExceeded", "dailyLimitExceeded"];
const AUTH_REASONS: &[&str] = &[
    "keyInvalid",
    "keyExpired",
    "accessNotConfigured",
    "ipRefererBlocked",
    "API_KEY_INVALID",
    "API_KEY_SERVICE_BLOCKED",
    "API_KEY_HTTP_REFERRER_BLOCKED",
    "API_KEY_IP_ADDRESS_BLOCKED",
    "API_KEY_ANDROID_APP_BLOCKED",
    "API_KEY_IOS_APP_BLOCKED",
    "SERVICE_DISABLED",
];
const NOT_FOUND_REASONS: &[&str] = &["channelNotFound", "playlistNotFound"];
const TRANSIENT_REASONS: &[&str] = &["rateLimitExceeded", "userRateLimitExceeded", "backendError"];

/// Maps a non-success Data API response onto the error taxonomy.
pub(crate) fn classify_error(status: StatusCode, body: &str) -> ScrapeError {
    let (message, reasons) = match serde_json::from_str::<GoogleErrorResponse>(body) {
        Ok(GoogleErrorResponse { error }) => {
            let reasons: Vec<String> = error
                .errors
                .into_iter()
                .chain(error.details)
                .filter_map(|r| r.reason)
                .collect();
            (error.message, reasons)
        }
        Err(_) => (body.trim().to_string(), Vec::new()),
    };
    let has = |set: &[&str]| reasons.iter().any(|r| set.contains(&r.as_str()));

    if has(QUOTA_REASONS) {
        ScrapeError::QuotaExceeded(message)
    } else if status == StatusCode::UNAUTHORIZED
        || has(AUTH_REASONS)
        || (status == StatusCode::BAD_REQUEST && message.contains("API key"))
    {
        ScrapeError::Auth(message)
    } else if has(NOT_FOUND_REASONS) {
        ScrapeError::Resolution(message)
    } else {
        ScrapeError::Api {
            status: status.as_u16(),
            transient: status.is_server_error()
                || status == StatusCode::TOO_MANY_REQUESTS
                || has(TRANSIENT_REASONS),
            message,
        }
    }
}
