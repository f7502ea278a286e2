//! Mock YouTube endpoints shared by the integration tests.
#![allow(dead_code)]

use serde_json::{Value, json};
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};
use youtube_channel_scraper::Scraper;
use youtube_channel_scraper::config::{ApiKey, ScraperConfig};
use youtube_channel_scraper::retry::RetryPolicy;

pub const CHANNEL_ID: &str = "UCabcdefghijklmnopqrstuv";
pub const UPLOADS_ID: &str = "UUabcdefghijklmnopqrstuv";
pub const CHANNEL_TITLE: &str = "Test Channel";

/// A configuration that sends every request to `server` and never retries.
pub fn config(server: &MockServer) -> ScraperConfig {
    ScraperConfig {
        data_api_base: server.uri(),
        youtube_base: server.uri(),
        retry: RetryPolicy::none(),
        ..ScraperConfig::default()
    }
}

pub fn api_key() -> ApiKey {
    ApiKey::new("test-key").unwrap()
}

pub fn scraper(server: &MockServer) -> Scraper {
    Scraper::from_config(api_key(), &config(server)).unwrap()
}

pub fn channel_json() -> Value {
    json!({
        "kind": "youtube#channelListResponse",
        "pageInfo": { "totalResults": 1, "resultsPerPage": 5 },
        "items": [{
            "id": CHANNEL_ID,
            "snippet": { "title": CHANNEL_TITLE, "customUrl": "@testchannel" },
            "contentDetails": { "relatedPlaylists": { "uploads": UPLOADS_ID } }
        }]
    })
}

/// `channels.list?id=CHANNEL_ID`.
pub async fn mount_channel(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/channels"))
        .and(query_param("id", CHANNEL_ID))
        .respond_with(ResponseTemplate::new(200).set_body_json(channel_json()))
        .mount(server)
        .await;
}

/// One page of the uploads playlist. The first page is the one requested without a token.
pub async fn mount_playlist_page(
    server: &MockServer,
    token: Option<&str>,
    video_ids: &[&str],
    next_token: Option<&str>,
) {
    let items: Vec<Value> = video_ids
        .iter()
        .map(|id| json!({ "contentDetails": { "videoId": id } }))
        .collect();
    let mut body = json!({
        "pageInfo": { "totalResults": video_ids.len(), "resultsPerPage": 50 },
        "items": items,
    });
    if let Some(next) = next_token {
        body["nextPageToken"] = json!(next);
    }

    let builder = Mock::given(method("GET"))
        .and(path("/playlistItems"))
        .and(query_param("playlistId", UPLOADS_ID));
    // token pages outrank the tokenless first page, which would match them too
    let mock = match token {
        Some(token) => builder
            .and(query_param("pageToken", token))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .with_priority(1),
        None => builder.respond_with(ResponseTemplate::new(200).set_body_json(body)),
    };
    mock.mount(server).await;
}

/// `videos.list`, answering every request with `videos` as the items.
pub async fn mount_videos(server: &MockServer, videos: Value) {
    Mock::given(method("GET"))
        .and(path("/videos"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": videos })))
        .mount(server)
        .await;
}

/// The player endpoint for one video, offering `tracks` as its caption tracks.
pub async fn mount_player(server: &MockServer, video_id: &str, tracks: Value) {
    let body = json!({
        "playabilityStatus": { "status": "OK" },
        "captions": { "playerCaptionsTracklistRenderer": { "captionTracks": tracks } }
    });
    mount_player_response(server, video_id, ResponseTemplate::new(200).set_body_json(body)).await;
}

pub async fn mount_player_response(server: &MockServer, video_id: &str, response: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path("/youtubei/v1/player"))
        .and(body_partial_json(json!({ "videoId": video_id })))
        .respond_with(response)
        .mount(server)
        .await;
}

/// A caption track entry whose captions are served by [`mount_timedtext`].
pub fn track(server: &MockServer, video_id: &str, language: &str, generated: bool) -> Value {
    let mut track = json!({
        "baseUrl": format!("{}/api/timedtext?v={video_id}&lang={language}", server.uri()),
        "languageCode": language,
    });
    if generated {
        track["kind"] = json!("asr");
    }
    track
}

/// `json3` captions for one video, one event per line.
pub async fn mount_timedtext(server: &MockServer, video_id: &str, lines: &[&str]) {
    let events: Vec<Value> = lines
        .iter()
        .map(|line| json!({ "tStartMs": 0, "segs": [{ "utf8": line }] }))
        .collect();
    Mock::given(method("GET"))
        .and(path("/api/timedtext"))
        .and(query_param("v", video_id))
        .and(query_param("fmt", "json3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "events": events })))
        .mount(server)
        .await;
}

/// A channel with two videos: the first has English captions reading "Hello world", the
/// second has no captions and hides its like count.
pub async fn mount_two_video_channel(server: &MockServer) {
    mount_channel(server).await;
    mount_playlist_page(server, None, &["vid1", "vid2"], None).await;
    mount_videos(
        server,
        json!([
            {
                "id": "vid1",
                "snippet": { "title": "First video", "publishedAt": "2024-01-15T10:00:00Z" },
                "statistics": { "viewCount": "1000", "likeCount": "50", "commentCount": "3" }
            },
            {
                "id": "vid2",
                "snippet": { "title": "Second, with comma", "publishedAt": "2024-02-01T23:59:59Z" },
                "statistics": { "viewCount": "20" }
            }
        ]),
    )
    .await;
    mount_player(server, "vid1", json!([track(server, "vid1", "en", false)])).await;
    mount_timedtext(server, "vid1", &["Hello", "world"]).await;
    mount_player(server, "vid2", json!([])).await;
}

pub const TWO_VIDEO_CSV: &str = "video_id,title,views,likes,upload_date,transcript_available,transcript\r\n\
                                 vid1,First video,1000,50,2024-01-15,True,Hello world\r\n\
                                 vid2,\"Second, with comma\",20,,2024-02-01,False,\r\n";

/// The error body YouTube sends for a bad API key.
pub fn invalid_key_response() -> ResponseTemplate {
    ResponseTemplate::new(400).set_body_json(json!({
        "error": {
            "code": 400,
            "message": "API key not valid. Please pass a valid API key.",
            "errors": [{
                "message": "API key not valid. Please pass a valid API key.",
                "domain": "global",
                "reason": "badRequest"
            }],
            "status": "INVALID_ARGUMENT"
        }
    }))
}
