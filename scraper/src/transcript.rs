//! Transcript retrieval from a video's caption tracks.
//!
//! The Data API only lets a video's owner download captions, so transcripts come from the
//! same endpoints the YouTube player uses: the player endpoint lists a video's caption
//! tracks, and each track's `baseUrl` serves the captions themselves, which we request in
//! the `json3` format.
//!
//! A missing transcript is an ordinary outcome, not an error: [`TranscriptFetcher::fetch`]
//! never fails, it returns [`Transcript::unavailable`] instead.

use crate::config::ScraperConfig;
use crate::error::{Result, ScrapeError};
use crate::retry::RetryPolicy;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use tracing::instrument;

/// Client identity presented to the player endpoint. The Android client returns caption
/// URLs that can be fetched without a browser session.
const PLAYER_CLIENT_NAME: &str = "ANDROID";
const PLAYER_CLIENT_VERSION: &str = "20.10.38";

/// The text of a video's captions, if there is any.
///
/// A transcript is available exactly when its text is non-empty; the constructors maintain
/// that.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    text: Option<String>,
}

impl Transcript {
    pub fn unavailable() -> Self {
        Self { text: None }
    }

    /// A transcript with the given text. Blank text yields an unavailable transcript.
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        if text.trim().is_empty() {
            Self::unavailable()
        } else {
            Self { text: Some(text) }
        }
    }

    pub fn is_available(&self) -> bool {
        self.text.is_some()
    }

    /// The transcript text; empty when unavailable.
    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or_default()
    }
}

/// The subset of the player response that describes captions.
#[derive(Debug, Deserialize)]
struct PlayerResponse {
    #[serde(rename = "playabilityStatus")]
    playability_status: Option<PlayabilityStatus>,
    captions: Option<Captions>,
}

#[derive(Debug, Deserialize)]
struct PlayabilityStatus {
    status: String,
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Captions {
    #[serde(rename = "playerCaptionsTracklistRenderer")]
    tracklist: CaptionTrackList,
}

#[derive(Debug, Deserialize)]
struct CaptionTrackList {
    #[serde(rename = "captionTracks", default)]
    caption_tracks: Vec<CaptionTrack>,
}

/// One caption track offered for a video.
#[derive(Debug, Clone, Deserialize)]
pub struct CaptionTrack {
    /// Where to download the captions from.
    #[serde(rename = "baseUrl")]
    pub base_url: String,
    /// BCP-47 language code, e.g. `en` or `en-GB`.
    #[serde(rename = "languageCode")]
    pub language_code: String,
    /// `asr` for automatically generated tracks, absent for uploaded ones.
    pub kind: Option<String>,
}

impl CaptionTrack {
    pub fn is_generated(&self) -> bool {
        self.kind.as_deref() == Some("asr")
    }

    fn matches_language(&self, language: &str) -> bool {
        self.language_code == language
            || self
                .language_code
                .split_once('-')
                .is_some_and(|(base, _)| base == language)
    }
}

/// Picks the track to download.
///
/// Languages are tried in order of preference; within a language an uploaded track beats
/// an automatically generated one.
pub fn select_track<'a>(tracks: &'a [CaptionTrack], languages: &[String]) -> Option<&'a CaptionTrack> {
    languages.iter().find_map(|language| {
        let mut candidates = tracks.iter().filter(|t| t.matches_language(language));
        let first = candidates.next()?;
        if !first.is_generated() {
            return Some(first);
        }
        candidates.find(|t| !t.is_generated()).or(Some(first))
    })
}

/// Captions in YouTube's `json3` timed-text format.
#[derive(Debug, Deserialize)]
struct TimedText {
    #[serde(default)]
    events: Vec<TimedTextEvent>,
}

#[derive(Debug, Deserialize)]
struct TimedTextEvent {
    #[serde(default)]
    segs: Vec<TimedTextSegment>,
}

#[derive(Debug, Deserialize)]
struct TimedTextSegment {
    #[serde(default)]
    utf8: String,
}

impl TimedText {
    /// The caption lines joined with single spaces.
    fn joined(&self) -> String {
        let lines: Vec<String> = self
            .events
            .iter()
            .map(|event| event.segs.iter().map(|s| s.utf8.as_str()).collect::<String>())
            .map(|line| line.trim().to_string())
            .filter(|line| !line.is_empty())
            .collect();
        lines.join(" ")
    }
}

/// Fetches transcripts one video at a time.
#[derive(Debug, Clone)]
pub struct TranscriptFetcher {
    client: reqwest::Client,
    /// Base URL of the YouTube site, without trailing slash
    base_url: String,
    /// Preferred language codes, most preferred first
    languages: Vec<String>,
    retry: RetryPolicy,
}

impl TranscriptFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: crate::config::YOUTUBE_BASE.to_string(),
            languages: vec!["en".to_string()],
            retry: RetryPolicy::default(),
        }
    }

    /// Creates a fetcher configured from a [`ScraperConfig`], including its proxy.
    pub fn from_config(config: &ScraperConfig) -> Result<Self> {
        Ok(Self::new(config.transcript_http_client()?)
            .with_base_url(&config.youtube_base)
            .with_languages(config.languages.clone())
            .with_retry(config.retry.clone()))
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_languages(mut self, languages: Vec<String>) -> Self {
        self.languages = languages;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Fetches the best available transcript for a video.
    ///
    /// Never fails: videos without usable captions, and videos whose captions could not be
    /// retrieved even after retrying, yield [`Transcript::unavailable`].
    #[instrument(skip(self))]
    pub async fn fetch(&self, video_id: &str) -> Transcript {
        match self.try_fetch(video_id).await {
            Ok(transcript) => transcript,
            Err(e) => {
                tracing::warn!(video_id, error = %e, "could not fetch transcript");
                Transcript::unavailable()
            }
        }
    }

    async fn try_fetch(&self, video_id: &str) -> Result<Transcript> {
        let player = self
            .retry
            .run(move || self.player_response(video_id))
            .await?;

        if let Some(status) = &player.playability_status
            && status.status != "OK"
        {
            tracing::debug!(
                video_id,
                status = %status.status,
                reason = ?status.reason,
                "video is not playable, no transcript"
            );
            return Ok(Transcript::unavailable());
        }

        let tracks = player
            .captions
            .map(|c| c.tracklist.caption_tracks)
            .unwrap_or_default();
        if tracks.is_empty() {
            tracing::debug!(video_id, "video has no captions");
            return Ok(Transcript::unavailable());
        }

        let Some(track) = select_track(&tracks, &self.languages) else {
            tracing::debug!(
                video_id,
                available = ?tracks.iter().map(|t| t.language_code.as_str()).collect::<Vec<_>>(),
                wanted = ?self.languages,
                "no captions in a preferred language"
            );
            return Ok(Transcript::unavailable());
        };

        let Some(url) = self.json3_url(&track.base_url) else {
            tracing::warn!(video_id, base_url = %track.base_url, "caption track has an unusable URL");
            return Ok(Transcript::unavailable());
        };

        let body = self
            .retry
            .run(|| self.get_text(url.clone()))
            .await?;
        let timed_text: TimedText =
            serde_json::from_str(&body).map_err(|source| ScrapeError::Decode {
                what: "caption track",
                source,
            })?;

        let transcript = Transcript::from_text(timed_text.joined());
        tracing::debug!(
            video_id,
            language = %track.language_code,
            generated = track.is_generated(),
            chars = transcript.text().len(),
            "fetched transcript"
        );
        Ok(transcript)
    }

    async fn player_response(&self, video_id: &str) -> Result<PlayerResponse> {
        let body = serde_json::json!({
            "context": {
                "client": {
                    "clientName": PLAYER_CLIENT_NAME,
                    "clientVersion": PLAYER_CLIENT_VERSION,
                }
            },
            "videoId": video_id,
        });

        let response = self
            .client
            .post(format!("{}/youtubei/v1/player", self.base_url))
            .query(&[("prettyPrint", "false")])
            .json(&body)
            .send()
            .await?;
        let text = check_status(response).await?;

        serde_json::from_str(&text).map_err(|source| ScrapeError::Decode {
            what: "player response",
            source,
        })
    }

    async fn get_text(&self, url: Url) -> Result<String> {
        let response = self.client.get(url).send().await?;
        check_status(response).await
    }

    /// Rewrites a caption track URL to request the `json3` format.
    fn json3_url(&self, base_url: &str) -> Option<Url> {
        let mut url = Url::parse(&self.base_url).ok()?.join(base_url).ok()?;
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(k, _)| k != "fmt")
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        url.query_pairs_mut()
            .clear()
            .extend_pairs(pairs)
            .append_pair("fmt", "json3");
        Some(url)
    }
}

async fn check_status(response: reqwest::Response) -> Result<String> {
    let status = response.status();
    let body = response.text().await?;
    if status.is_success() {
        return Ok(body);
    }
    Err(ScrapeError::Api {
        status: status.as_u16(),
        transient: status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS,
        message: body.chars().take(200).collect(),
    })
}
