//! Runtime configuration shared by the CLI and the web UI.

use crate::quota::DEFAULT_DAILY_BUDGET;
use crate::retry::RetryPolicy;
use std::fmt;

/// Base URL of the YouTube Data API v3.
pub const DATA_API_BASE: &str = "https://www.googleapis.com/youtube/v3";

/// Base URL of the YouTube site, which serves the caption endpoints.
pub const YOUTUBE_BASE: &str = "https://www.youtube.com";

/// Environment variable the CLI reads the API key from.
pub const API_KEY_ENV: &str = "YOUTUBE_API_KEY";

/// Environment variable the web UI falls back to when the form leaves the key empty.
pub const WEB_API_KEY_ENV: &str = "YouTube_Data_API_v3";

/// Environment variable naming an HTTP(S) proxy for transcript requests.
pub const PROXY_URL_ENV: &str = "PROXY_URL";

/// A YouTube Data API key.
///
/// Never printed: its `Debug` output is redacted so it can't leak through `tracing`.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Wraps a key, returning `None` if it is empty or whitespace.
    pub fn new(key: impl Into<String>) -> Option<Self> {
        let key = key.into().trim().to_string();
        (!key.is_empty()).then_some(Self(key))
    }

    pub(crate) fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}

/// Knobs for one scraper instance.
#[derive(Debug, Clone)]
pub struct ScraperConfig {
    /// Base URL of the Data API (overridable so tests can use a mock server).
    pub data_api_base: String,
    /// Base URL of the site serving caption track lists.
    pub youtube_base: String,
    /// Transcript language codes, most preferred first.
    pub languages: Vec<String>,
    /// Optional proxy for transcript requests.
    pub proxy_url: Option<String>,
    /// Daily quota budget in units.
    pub quota_budget: u64,
    /// Retry policy for transient failures.
    pub retry: RetryPolicy,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            data_api_base: DATA_API_BASE.to_string(),
            youtube_base: YOUTUBE_BASE.to_string(),
            languages: vec!["en".to_string()],
            proxy_url: None,
            quota_budget: DEFAULT_DAILY_BUDGET,
            retry: RetryPolicy::default(),
        }
    }
}

impl ScraperConfig {
    /// Defaults, plus whatever the environment provides.
    pub fn from_env() -> Self {
        let proxy_url = std::env::var(PROXY_URL_ENV)
            .ok()
            .filter(|url| !url.trim().is_empty());
        if proxy_url.is_some() {
            tracing::info!("routing transcript requests through {PROXY_URL_ENV}");
        }
        Self {
            proxy_url,
            ..Self::default()
        }
    }

    /// Builds the HTTP client used for Data API calls.
    pub fn data_api_http_client(&self) -> reqwest::Result<reqwest::Client> {
        reqwest::Client::builder()
            .user_agent(concat!("youtube-channel-scraper/", env!("CARGO_PKG_VERSION")))
            .timeout(std::time::Duration::from_secs(30))
            .build()
    }

    /// Builds the HTTP client used for transcript calls, honoring the proxy setting.
    pub fn transcript_http_client(&self) -> reqwest::Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder().timeout(std::time::Duration::from_secs(30));
        if let Some(proxy) = &self.proxy_url {
            builder = builder.proxy(reqwest::Proxy::all(proxy)?);
        }
        builder.build()
    }
}

/// Looks up the first non-empty API key among the given environment variables.
pub fn api_key_from_env(vars: &[&str]) -> Option<ApiKey> {
    vars.iter()
        .filter_map(|var| std::env::var(var).ok())
        .find_map(ApiKey::new)
}
