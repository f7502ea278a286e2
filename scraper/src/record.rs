//! The per-video row assembled by a scrape.

use crate::transcript::Transcript;
use crate::youtube_api::Video;
use jiff::civil::Date;
use jiff::tz::TimeZone;

/// Title, counters, and upload date for one video.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VideoDetails {
    pub title: String,
    /// `None` when YouTube doesn't report a view count.
    pub views: Option<u64>,
    /// `None` when the uploader hid the like count.
    pub likes: Option<u64>,
    /// UTC calendar date of publication.
    pub upload_date: Option<Date>,
}

impl From<Video> for VideoDetails {
    fn from(video: Video) -> Self {
        let (title, published_at) = video
            .snippet
            .map(|s| (s.title, s.published_at))
            .unwrap_or_default();
        Self {
            title,
            views: parse_count(video.statistics.view_count.as_deref()),
            likes: parse_count(video.statistics.like_count.as_deref()),
            upload_date: published_at.map(|ts| ts.to_zoned(TimeZone::UTC).date()),
        }
    }
}

fn parse_count(count: Option<&str>) -> Option<u64> {
    count.and_then(|c| c.parse().ok())
}

/// One exported row. Built once, never modified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoRecord {
    pub video_id: String,
    pub details: VideoDetails,
    pub transcript: Transcript,
}

impl VideoRecord {
    pub fn new(video_id: String, details: VideoDetails, transcript: Transcript) -> Self {
        Self {
            video_id,
            details,
            transcript,
        }
    }
}
