//! Batch retrieval of video titles, statistics, and upload dates.

use crate::error::Result;
use crate::record::VideoDetails;
use crate::youtube_api::{MAX_RESULTS, YouTubeClient};
use std::collections::HashMap;
use tracing::instrument;

/// Fetches [`VideoDetails`] for the given ids, [`MAX_RESULTS`] ids per call.
///
/// Deleted, private, or otherwise missing videos are absent from the returned map. A
/// credential or quota failure on any batch fails the whole fetch.
#[instrument(skip(client, video_ids), fields(count = video_ids.len()))]
pub async fn fetch_video_details(
    client: &YouTubeClient,
    video_ids: &[String],
) -> Result<HashMap<String, VideoDetails>> {
    let mut details = HashMap::with_capacity(video_ids.len());

    for (batch_no, batch) in video_ids.chunks(MAX_RESULTS).enumerate() {
        let response = client.list_videos(batch).await?;
        for video in response.items {
            details.insert(video.id.clone(), VideoDetails::from(video));
        }
        tracing::debug!(batch = batch_no, fetched = details.len(), "fetched metadata batch");
    }

    let missing = video_ids.len().saturating_sub(details.len());
    if missing > 0 {
        tracing::info!(missing, "some videos returned no metadata");
    }
    Ok(details)
}
