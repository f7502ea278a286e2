//! YouTube Search API types, used only to resolve legacy `/c/` custom URLs.

use serde::Deserialize;
use std::collections::VecDeque;

/// Response structure for the `search.list` API call.
///
/// See: <https://developers.google.com/youtube/v3/docs/search/list>
#[derive(Debug, Deserialize)]
pub struct SearchListResponse {
    #[serde(default)]
    pub items: VecDeque<SearchResult>,
}

/// A search result. We only ever search for channels, so only the channel id matters.
///
/// See: <https://developers.google.com/youtube/v3/docs/search#resource>
#[derive(Debug, Deserialize)]
pub struct SearchResult {
    pub snippet: SearchResultSnippet,
}

#[derive(Debug, Deserialize)]
pub struct SearchResultSnippet {
    #[serde(rename = "channelId")]
    pub channel_id: String,
}
