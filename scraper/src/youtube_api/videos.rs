//! YouTube Videos API types.

use crate::youtube_api::types::PageInfo;
use jiff::Timestamp;
use serde::Deserialize;
use std::collections::VecDeque;

/// Response structure for the `videos.list` API call.
///
/// Contains a list of [`Video`] resources that match the request criteria. Ids that don't
/// correspond to an accessible video are silently left out by the API.
///
/// See: <https://developers.google.com/youtube/v3/docs/videos/list>
#[derive(Debug, Deserialize)]
pub struct VideoListResponse {
    /// A list of videos that match the request criteria.
    #[serde(default)]
    pub items: VecDeque<Video>,
    #[serde(rename = "pageInfo", default)]
    pub page_info: PageInfo,
}

/// A `video` resource represents a YouTube video.
///
/// See: <https://developers.google.com/youtube/v3/docs/videos#resource>
#[derive(Debug, Deserialize)]
pub struct Video {
    /// The ID that YouTube uses to uniquely identify the video.
    pub id: String,
    /// Basic details about the video, such as its title.
    pub snippet: Option<VideoSnippet>,
    /// Statistics about the video.
    ///
    /// Absent entirely for some videos; individual counts are absent when the uploader has
    /// hidden them.
    #[serde(default)]
    pub statistics: VideoStatistics,
}

/// Basic details about a video.
///
/// See: <https://developers.google.com/youtube/v3/docs/videos#snippet>
#[derive(Debug, Deserialize)]
pub struct VideoSnippet {
    /// The video's title.
    #[serde(default)]
    pub title: String,
    /// The date and time that the video was published.
    #[serde(rename = "publishedAt")]
    pub published_at: Option<Timestamp>,
}

/// Statistics about the video.
///
/// The API encodes counts as decimal strings.
///
/// See: <https://developers.google.com/youtube/v3/docs/videos#statistics>
#[derive(Debug, Default, Deserialize)]
pub struct VideoStatistics {
    /// The number of times the video has been viewed.
    #[serde(rename = "viewCount")]
    pub view_count: Option<String>,
    /// The number of users who have indicated that they liked the video.
    #[serde(rename = "likeCount")]
    pub like_count: Option<String>,
}
