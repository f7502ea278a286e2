//! YouTube Data API v3 client library.
//!
//! This module provides the small, read-only slice of the Data API that a channel scrape
//! needs, authenticated with a plain API key:
//!
//! - `channels.list` to resolve ids, handles, and legacy usernames to a channel and its
//!   uploads playlist
//! - `search.list` to resolve legacy `/c/` custom URLs (expensive: 100 quota units)
//! - `playlistItems.list` to enumerate every upload, page by page
//! - `videos.list` to fetch titles, publish dates, and statistics in batches of 50
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use youtube_channel_scraper::config::ApiKey;
//! use youtube_channel_scraper::youtube_api::YouTubeClient;
//! use tokio_stream::StreamExt;
//!
//! # async fn example() -> youtube_channel_scraper::Result<()> {
//! let key = ApiKey::new("AIza...").expect("non-empty key");
//! let client = YouTubeClient::new(key, reqwest::Client::new());
//!
//! let channel = client.channel_by_handle("@somecreator").await?.expect("channel exists");
//! let uploads = channel.content_details.expect("requested").related_playlists.uploads;
//!
//! let mut ids = std::pin::pin!(client.list_playlist_video_ids(&uploads));
//! while let Some(id) = ids.next().await {
//!     println!("video: {}", id?);
//! }
//! # Ok(())
//! # }
//! ```

pub mod channels;
pub mod client;
pub mod playlist_items;
pub mod search;
pub mod types;
pub mod videos;

pub use client::{MAX_RESULTS, YouTubeClient};
pub use types::{PageInfo, PagedStream};

pub use channels::{Channel, ChannelSnippet};
pub use videos::{Video, VideoStatistics};
