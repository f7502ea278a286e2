mod common;

use common::*;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};
use youtube_channel_scraper::channel::ChannelRef;
use youtube_channel_scraper::config::ScraperConfig;
use youtube_channel_scraper::export::to_csv_bytes;
use youtube_channel_scraper::metadata::fetch_video_details;
use youtube_channel_scraper::retry::RetryPolicy;
use youtube_channel_scraper::{Progress, ScrapeError, Scraper};

fn channel_ref() -> ChannelRef {
    ChannelRef {
        id: CHANNEL_ID.to_string(),
        uploads_playlist_id: UPLOADS_ID.to_string(),
        title: CHANNEL_TITLE.to_string(),
    }
}

#[tokio::test]
async fn two_video_channel() {
    let server = MockServer::start().await;
    mount_two_video_channel(&server).await;
    let scraper = scraper(&server);

    let mut events = Vec::new();
    let scrape = scraper
        .scrape(
            &format!("https://www.youtube.com/channel/{CHANNEL_ID}"),
            |p| events.push(p),
        )
        .await
        .unwrap();

    assert_eq!(scrape.channel, channel_ref());
    assert_eq!(scrape.records.len(), 2);
    assert!(scrape.records[0].transcript.is_available());
    assert_eq!(scrape.records[0].transcript.text(), "Hello world");
    assert!(!scrape.records[1].transcript.is_available());
    assert_eq!(scrape.records[1].details.likes, None);

    let csv = String::from_utf8(to_csv_bytes(&scrape.records).unwrap()).unwrap();
    assert_eq!(csv, TWO_VIDEO_CSV);

    assert_eq!(
        events,
        vec![
            Progress::Resolved {
                channel_id: CHANNEL_ID.to_string(),
                title: CHANNEL_TITLE.to_string(),
            },
            Progress::Listed { total: 2 },
            Progress::Video {
                index: 1,
                total: 2,
                title: "First video".to_string(),
                transcript_available: true,
            },
            Progress::Video {
                index: 2,
                total: 2,
                title: "Second, with comma".to_string(),
                transcript_available: false,
            },
        ]
    );

    // channels + one playlist page + one videos batch
    assert_eq!(scraper.youtube().quota().used().await, 3);
}

#[tokio::test]
async fn invalid_key_aborts_the_scrape() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/channels"))
        .respond_with(invalid_key_response())
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/playlistItems"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = scraper(&server)
        .scrape(CHANNEL_ID, |_| {})
        .await
        .unwrap_err();
    assert!(matches!(err, ScrapeError::Auth(ref m) if m.contains("API key not valid")));
}

#[tokio::test]
async fn handle_is_looked_up_directly() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/channels"))
        .and(query_param("forHandle", "@testchannel"))
        .respond_with(ResponseTemplate::new(200).set_body_json(channel_json()))
        .expect(1)
        .mount(&server)
        .await;
    mount_playlist_page(&server, None, &[], None).await;

    let scraper = scraper(&server);
    let scrape = scraper
        .scrape("https://www.youtube.com/@testchannel/videos", |_| {})
        .await
        .unwrap();
    assert_eq!(scrape.channel.id, CHANNEL_ID);
    assert!(scrape.records.is_empty());
    assert_eq!(scraper.youtube().quota().used().await, 2);
}

#[tokio::test]
async fn custom_url_goes_through_search() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "TestChannel"))
        .and(query_param("type", "channel"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{ "snippet": { "channelId": CHANNEL_ID, "channelTitle": CHANNEL_TITLE } }]
        })))
        .mount(&server)
        .await;
    mount_channel(&server).await;

    let scraper = scraper(&server);
    let channel = youtube_channel_scraper::channel::resolve_channel(
        scraper.youtube(),
        "https://www.youtube.com/c/TestChannel",
    )
    .await
    .unwrap();
    assert_eq!(channel, channel_ref());
    assert_eq!(scraper.youtube().quota().used().await, 101);
}

#[tokio::test]
async fn unknown_channel_is_a_resolution_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/channels"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "kind": "youtube#channelListResponse",
            "pageInfo": { "totalResults": 0, "resultsPerPage": 5 }
        })))
        .mount(&server)
        .await;

    let err = scraper(&server)
        .scrape("@nobody", |_| {})
        .await
        .unwrap_err();
    assert!(matches!(err, ScrapeError::Resolution(_)));
}

#[tokio::test]
async fn pagination_is_followed_without_duplicates() {
    let server = MockServer::start().await;
    mount_playlist_page(&server, None, &["a", "b"], Some("p2")).await;
    mount_playlist_page(&server, Some("p2"), &["c", "a"], Some("p3")).await;
    mount_playlist_page(&server, Some("p3"), &["d"], None).await;

    let scraper = scraper(&server);
    let ids = scraper
        .list_video_ids(&channel_ref(), &mut |_| {})
        .await
        .unwrap();
    assert_eq!(ids, vec!["a", "b", "c", "d"]);
    assert_eq!(scraper.youtube().quota().used().await, 3);
}

#[tokio::test]
async fn failure_on_a_later_page_is_not_a_partial_list() {
    let server = MockServer::start().await;
    mount_playlist_page(&server, None, &["a", "b"], Some("p2")).await;
    Mock::given(method("GET"))
        .and(path("/playlistItems"))
        .and(query_param("pageToken", "p2"))
        .respond_with(ResponseTemplate::new(500).set_body_string("backend exploded"))
        .with_priority(1)
        .mount(&server)
        .await;

    let err = scraper(&server)
        .list_video_ids(&channel_ref(), &mut |_| {})
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ScrapeError::Api {
            status: 500,
            transient: true,
            ..
        }
    ));
}

#[tokio::test]
async fn missing_videos_are_left_out_of_metadata() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/videos"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{
                "id": "v0",
                "snippet": { "title": "Still here", "publishedAt": "2023-05-06T07:08:09Z" },
                "statistics": { "viewCount": "1" }
            }]
        })))
        .expect(2)
        .mount(&server)
        .await;

    let ids: Vec<String> = (0..51).map(|i| format!("v{i}")).collect();
    let scraper = scraper(&server);
    let details = fetch_video_details(scraper.youtube(), &ids).await.unwrap();
    assert_eq!(details.len(), 1);
    assert_eq!(details["v0"].title, "Still here");
    assert!(!details.contains_key("v50"));
}

#[tokio::test]
async fn quota_budget_is_checked_before_sending() {
    let server = MockServer::start().await;
    let config = ScraperConfig {
        quota_budget: 0,
        ..config(&server)
    };
    let scraper = Scraper::from_config(api_key(), &config).unwrap();

    let err = scraper.scrape("@testchannel", |_| {}).await.unwrap_err();
    assert!(matches!(err, ScrapeError::QuotaExceeded(_)));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn upstream_quota_exhaustion_aborts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/channels"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": {
                "code": 403,
                "message": "The request cannot be completed because you have exceeded your quota.",
                "errors": [{ "reason": "quotaExceeded", "domain": "youtube.quota" }]
            }
        })))
        .mount(&server)
        .await;

    let err = scraper(&server)
        .scrape(CHANNEL_ID, |_| {})
        .await
        .unwrap_err();
    assert!(matches!(err, ScrapeError::QuotaExceeded(_)));
}

#[tokio::test]
async fn transient_failures_are_retried_and_charged() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/channels"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    mount_channel(&server).await;

    let config = ScraperConfig {
        retry: RetryPolicy {
            max_retries: 2,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            backoff_multiplier: 2.0,
            jitter: false,
        },
        ..config(&server)
    };
    let scraper = Scraper::from_config(api_key(), &config).unwrap();
    let channel = youtube_channel_scraper::channel::resolve_channel(scraper.youtube(), CHANNEL_ID)
        .await
        .unwrap();
    assert_eq!(channel.uploads_playlist_id, UPLOADS_ID);
    assert_eq!(scraper.youtube().quota().used().await, 2);
}

#[tokio::test]
async fn api_key_is_sent_as_a_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/channels"))
        .and(wiremock::matchers::header("X-Goog-Api-Key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(channel_json()))
        .expect(1)
        .mount(&server)
        .await;

    let scraper = scraper(&server);
    youtube_channel_scraper::channel::resolve_channel(scraper.youtube(), CHANNEL_ID)
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    assert!(!requests[0].url.as_str().contains("test-key"));
}
