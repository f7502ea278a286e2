//! Resolving user-supplied channel URLs and handles to a channel.

use crate::error::{Result, ScrapeError};
use crate::youtube_api::{Channel, YouTubeClient};
use std::fmt;
use std::str::FromStr;
use tracing::instrument;

/// The ways a user can point at a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelInput {
    /// `youtube.com/channel/UC…` or a bare `UC…` id.
    Id(String),
    /// `youtube.com/@name` or a bare `@name`; stored without the `@`.
    Handle(String),
    /// Legacy `youtube.com/c/name` custom URL.
    CustomUrl(String),
    /// Legacy `youtube.com/user/name` URL.
    Username(String),
}

impl fmt::Display for ChannelInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelInput::Id(id) => write!(f, "channel id {id}"),
            ChannelInput::Handle(handle) => write!(f, "handle @{handle}"),
            ChannelInput::CustomUrl(name) => write!(f, "custom URL {name}"),
            ChannelInput::Username(name) => write!(f, "username {name}"),
        }
    }
}

impl FromStr for ChannelInput {
    type Err = ScrapeError;

    fn from_str(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        let unparseable = || ScrapeError::Resolution(format!("could not parse channel URL: {input}"));

        if let Some(handle) = trimmed.strip_prefix('@') {
            return valid_token(handle, true)
                .map(|h| ChannelInput::Handle(h.to_string()))
                .ok_or_else(unparseable);
        }
        if is_channel_id(trimmed) {
            return Ok(ChannelInput::Id(trimmed.to_string()));
        }

        let rest = trimmed
            .strip_prefix("https://")
            .or_else(|| trimmed.strip_prefix("http://"))
            .unwrap_or(trimmed);
        let rest = rest
            .strip_prefix("www.")
            .or_else(|| rest.strip_prefix("m."))
            .unwrap_or(rest);
        let Some(path) = rest.strip_prefix("youtube.com/") else {
            return Err(unparseable());
        };
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let mut segments = path.split('/').filter(|s| !s.is_empty());

        let parsed = match (segments.next(), segments.next()) {
            (Some(first), _) if first.starts_with('@') => {
                valid_token(&first[1..], true).map(|h| ChannelInput::Handle(h.to_string()))
            }
            (Some("channel"), Some(id)) => {
                valid_token(id, false).map(|id| ChannelInput::Id(id.to_string()))
            }
            (Some("c"), Some(name)) => {
                valid_token(name, false).map(|n| ChannelInput::CustomUrl(n.to_string()))
            }
            (Some("user"), Some(name)) => {
                valid_token(name, false).map(|n| ChannelInput::Username(n.to_string()))
            }
            _ => None,
        };
        parsed.ok_or_else(unparseable)
    }
}

fn valid_token(token: &str, allow_dot: bool) -> Option<&str> {
    let ok = !token.is_empty()
        && token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || (allow_dot && c == '.'));
    ok.then_some(token)
}

fn is_channel_id(s: &str) -> bool {
    s.len() == 24 && s.starts_with("UC") && valid_token(s, false).is_some()
}

/// A resolved channel. Immutable for the rest of the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelRef {
    /// The stable `UC…` id.
    pub id: String,
    /// The playlist holding every public upload.
    pub uploads_playlist_id: String,
    /// Display name, for progress messages.
    pub title: String,
}

impl TryFrom<Channel> for ChannelRef {
    type Error = ScrapeError;

    fn try_from(channel: Channel) -> Result<Self> {
        let Some(details) = channel.content_details else {
            return Err(ScrapeError::Resolution(format!(
                "channel {} has no uploads playlist",
                channel.id
            )));
        };
        Ok(ChannelRef {
            title: channel.snippet.map(|s| s.title).unwrap_or_default(),
            uploads_playlist_id: details.related_playlists.uploads,
            id: channel.id,
        })
    }
}

/// Resolves a channel URL, handle, or id to a [`ChannelRef`].
#[instrument(skip(client))]
pub async fn resolve_channel(client: &YouTubeClient, input: &str) -> Result<ChannelRef> {
    let input: ChannelInput = input.parse()?;

    let channel = match &input {
        ChannelInput::Id(id) => client.channel_by_id(id).await?,
        ChannelInput::Handle(handle) => client.channel_by_handle(handle).await?,
        ChannelInput::Username(name) => client.channel_by_username(name).await?,
        ChannelInput::CustomUrl(name) => match client.search_channel_id(name).await? {
            Some(id) => client.channel_by_id(&id).await?,
            None => None,
        },
    };

    let channel = channel
        .ok_or_else(|| ScrapeError::Resolution(format!("no channel found for {input}")))?;
    let channel = ChannelRef::try_from(channel)?;

    tracing::info!(
        channel_id = %channel.id,
        title = %channel.title,
        "resolved channel"
    );
    Ok(channel)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> ChannelInput {
        s.parse().unwrap()
    }

    #[test]
    fn channel_urls() {
        let id = "UCuAXFkgsw1L7xaCfnd5JJOw";
        assert_eq!(
            parse("https://www.youtube.com/channel/UCuAXFkgsw1L7xaCfnd5JJOw"),
            ChannelInput::Id(id.into())
        );
        assert_eq!(
            parse("youtube.com/channel/UCuAXFkgsw1L7xaCfnd5JJOw/videos"),
            ChannelInput::Id(id.into())
        );
        assert_eq!(parse(id), ChannelInput::Id(id.into()));
    }

    #[test]
    fn handles() {
        assert_eq!(parse("@rick.astley"), ChannelInput::Handle("rick.astley".into()));
        assert_eq!(
            parse("https://www.youtube.com/@LinusTechTips/featured?app=desktop"),
            ChannelInput::Handle("LinusTechTips".into())
        );
        assert_eq!(
            parse("http://m.youtube.com/@some_one-2"),
            ChannelInput::Handle("some_one-2".into())
        );
    }

    #[test]
    fn legacy_urls() {
        assert_eq!(
            parse("https://www.youtube.com/c/Computerphile"),
            ChannelInput::CustomUrl("Computerphile".into())
        );
        assert_eq!(
            parse("https://youtube.com/user/numberphile"),
            ChannelInput::Username("numberphile".into())
        );
    }

    #[test]
    fn garbage_is_a_resolution_error() {
        for input in [
            "",
            "@",
            "hello world",
            "https://vimeo.com/channel/UCuAXFkgsw1L7xaCfnd5JJOw",
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://www.youtube.com/channel/",
            "@bad handle",
        ] {
            let err = input.parse::<ChannelInput>().unwrap_err();
            assert!(
                matches!(err, ScrapeError::Resolution(ref m) if m.contains("could not parse")),
                "{input:?} gave {err:?}"
            );
        }
    }

    #[test]
    fn channel_without_uploads_is_rejected() {
        let channel: Channel = serde_json::from_value(serde_json::json!({
            "id": "UCuAXFkgsw1L7xaCfnd5JJOw",
            "snippet": { "title": "Somebody" }
        }))
        .unwrap();
        assert!(matches!(
            ChannelRef::try_from(channel),
            Err(ScrapeError::Resolution(_))
        ));
    }
}
