//! Export every video of a YouTube channel to CSV: title, view and like counts, upload
//! date, and transcript.
//!
//! The pieces run in this order:
//! 1. [`channel::resolve_channel`] turns a channel URL or handle into a [`channel::ChannelRef`].
//! 2. [`pipeline::Scraper::list_video_ids`] walks the channel's uploads playlist.
//! 3. [`metadata::fetch_video_details`] fetches titles and statistics in batches.
//! 4. [`transcript::TranscriptFetcher`] fetches captions, one video at a time.
//! 5. [`export`] writes the rows.
//!
//! [`pipeline::Scraper::scrape`] strings the first four together; [`cli`] and [`web`] are
//! the two front-ends.

pub mod channel;
pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod metadata;
pub mod pipeline;
pub mod quota;
pub mod record;
pub mod retry;
pub mod transcript;
pub mod web;
pub mod youtube_api;

pub use error::{Result, ScrapeError};
pub use pipeline::{ChannelScrape, Progress, Scraper};
pub use record::{VideoDetails, VideoRecord};
pub use transcript::Transcript;
