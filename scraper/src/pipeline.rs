//! One channel scrape, end to end: resolve, list, fetch metadata, fetch transcripts.

use crate::channel::{ChannelRef, resolve_channel};
use crate::config::{ApiKey, ScraperConfig};
use crate::error::Result;
use crate::metadata::fetch_video_details;
use crate::record::VideoRecord;
use crate::transcript::TranscriptFetcher;
use crate::youtube_api::YouTubeClient;
use std::collections::HashSet;
use tokio_stream::StreamExt;
use tracing::instrument;

/// Progress notifications emitted while a scrape runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Progress {
    /// The channel input was resolved.
    Resolved { channel_id: String, title: String },
    /// Another page of the uploads playlist arrived.
    Listing { found: usize },
    /// Listing finished; metadata is being fetched next.
    Listed { total: usize },
    /// A video's row is complete. `index` is 1-based.
    Video {
        index: usize,
        total: usize,
        title: String,
        transcript_available: bool,
    },
}

/// Everything a finished scrape produced.
#[derive(Debug)]
pub struct ChannelScrape {
    pub channel: ChannelRef,
    /// One record per listed video, in listing order.
    pub records: Vec<VideoRecord>,
}

/// Runs scrapes with one API key.
#[derive(Debug, Clone)]
pub struct Scraper {
    youtube: YouTubeClient,
    transcripts: TranscriptFetcher,
}

impl Scraper {
    pub fn new(youtube: YouTubeClient, transcripts: TranscriptFetcher) -> Self {
        Self {
            youtube,
            transcripts,
        }
    }

    /// Builds both clients from a configuration.
    pub fn from_config(api_key: ApiKey, config: &ScraperConfig) -> Result<Self> {
        Ok(Self::new(
            YouTubeClient::from_config(api_key, config)?,
            TranscriptFetcher::from_config(config)?,
        ))
    }

    pub fn youtube(&self) -> &YouTubeClient {
        &self.youtube
    }

    /// Lists every video id of a channel, in upload-playlist order, without duplicates.
    ///
    /// A failure on any page fails the whole listing.
    pub async fn list_video_ids(
        &self,
        channel: &ChannelRef,
        on_progress: &mut impl FnMut(Progress),
    ) -> Result<Vec<String>> {
        let stream = self
            .youtube
            .list_playlist_video_ids(&channel.uploads_playlist_id);
        let mut stream = std::pin::pin!(stream);

        let mut seen = HashSet::new();
        let mut ids = Vec::new();
        while let Some(id) = stream.next().await {
            let id = id?;
            if seen.insert(id.clone()) {
                ids.push(id);
                if ids.len() % crate::youtube_api::MAX_RESULTS == 0 {
                    on_progress(Progress::Listing { found: ids.len() });
                }
            } else {
                tracing::debug!(video_id = %id, "skipping duplicate playlist entry");
            }
        }

        tracing::info!(total = ids.len(), "listed channel videos");
        Ok(ids)
    }

    /// Scrapes a channel.
    ///
    /// Credential, quota, resolution, and metadata failures abort the scrape. Missing
    /// transcripts never do.
    #[instrument(skip(self, on_progress))]
    pub async fn scrape(
        &self,
        input: &str,
        mut on_progress: impl FnMut(Progress),
    ) -> Result<ChannelScrape> {
        let channel = resolve_channel(&self.youtube, input).await?;
        on_progress(Progress::Resolved {
            channel_id: channel.id.clone(),
            title: channel.title.clone(),
        });

        let video_ids = self.list_video_ids(&channel, &mut on_progress).await?;
        let total = video_ids.len();
        on_progress(Progress::Listed { total });
        if video_ids.is_empty() {
            return Ok(ChannelScrape {
                channel,
                records: Vec::new(),
            });
        }

        let mut details = fetch_video_details(&self.youtube, &video_ids).await?;

        let mut records = Vec::with_capacity(total);
        let mut with_transcript = 0;
        for (i, video_id) in video_ids.into_iter().enumerate() {
            let details = details.remove(&video_id).unwrap_or_default();
            let transcript = self.transcripts.fetch(&video_id).await;
            if transcript.is_available() {
                with_transcript += 1;
            }

            on_progress(Progress::Video {
                index: i + 1,
                total,
                title: if details.title.is_empty() {
                    video_id.clone()
                } else {
                    details.title.clone()
                },
                transcript_available: transcript.is_available(),
            });
            records.push(VideoRecord::new(video_id, details, transcript));
        }

        let quota_used = self.youtube.quota().used().await;
        tracing::info!(
            channel_id = %channel.id,
            videos = records.len(),
            with_transcript,
            quota_used,
            "scrape complete"
        );
        Ok(ChannelScrape { channel, records })
    }
}
