use mockito::{Matcher, Server};
use reqwest::Client;
use serde_json::json;

use dashboard_sync_core::config::{ProviderConfig, RetrySettings, SyncSettings};
use dashboard_sync_core::discogs::DiscogsClient;
use dashboard_sync_core::flickr::FlickrClient;
use dashboard_sync_core::github::GithubClient;
use dashboard_sync_core::http::RetryPolicy;
use dashboard_sync_core::range::{DateSpan, SummaryWindow};
use dashboard_sync_core::spotify::SpotifyClient;
use dashboard_sync_core::wakatime::{stats_pending, WakaTimeClient};

fn fast_retry() -> RetrySettings {
    RetrySettings {
        attempts: 3,
        delay_ms: 0,
    }
}

#[tokio::test]
async fn test_wakatime_stats_sends_basic_auth_and_returns_data() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/users/current/stats/last_7_days")
        .match_header("authorization", "Basic dG9r")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"data": {"status": "ok", "total_seconds": 3600}}"#)
        .expect(1)
        .create_async()
        .await;

    let client = WakaTimeClient::new(Client::new(), server.url(), Some("tok".to_string()));
    let policy = RetryPolicy::while_pending(&fast_retry(), stats_pending);
    let data = client.fetch_stats("last_7_days", &policy).await.unwrap();

    assert_eq!(data, json!({"status": "ok", "total_seconds": 3600}));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_wakatime_stats_retries_while_pending() {
    let mut server = Server::new_async().await;
    let pending = server
        .mock("GET", "/users/current/stats/last_year")
        .with_status(202)
        .with_header("content-type", "application/json")
        .with_body(r#"{"data": {"status": "pending_update"}}"#)
        .expect(1)
        .create_async()
        .await;
    let ready = server
        .mock("GET", "/users/current/stats/last_year")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"data": {"status": "ok", "days_including_holidays": 365}}"#)
        .expect(1)
        .create_async()
        .await;

    let client = WakaTimeClient::new(Client::new(), server.url(), Some("tok".to_string()));
    let policy = RetryPolicy::while_pending(&fast_retry(), stats_pending);
    let data = client.fetch_stats("last_year", &policy).await.unwrap();

    assert_eq!(data["status"], "ok");
    pending.assert_async().await;
    ready.assert_async().await;
}

#[tokio::test]
async fn test_wakatime_gives_up_after_configured_attempts() {
    let mut server = Server::new_async().await;
    let failing = server
        .mock("GET", "/users/current/stats/last_30_days")
        .with_status(503)
        .expect(3)
        .create_async()
        .await;

    let client = WakaTimeClient::new(Client::new(), server.url(), Some("tok".to_string()));
    let policy = RetryPolicy::on_error(&fast_retry());
    let err = client
        .fetch_stats("last_30_days", &policy)
        .await
        .unwrap_err();

    assert!(err.to_string().contains("503"), "got: {err}");
    failing.assert_async().await;
}

#[tokio::test]
async fn test_wakatime_missing_token_is_a_hard_error() {
    let client = WakaTimeClient::new(Client::new(), "http://127.0.0.1:9", None);
    let err = client
        .fetch_stats("last_7_days", &RetryPolicy::none())
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Missing required environment variable: WAKATIME_ACCESS_TOKEN"
    );
}

#[tokio::test]
async fn test_wakatime_summaries_use_explicit_dates() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/users/current/summaries")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("start".into(), "2024-03-09".into()),
            Matcher::UrlEncoded("end".into(), "2024-03-09".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"data": [{"grand_total": {"total_seconds": 120}}]}"#)
        .create_async()
        .await;

    let client = WakaTimeClient::new(Client::new(), server.url(), Some("tok".to_string()));
    let day = chrono::NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
    let summaries = client
        .fetch_summaries(&SummaryWindow::Dates(DateSpan::single(day)), &RetryPolicy::none())
        .await
        .unwrap();

    assert_eq!(summaries.len(), 1);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_discogs_missing_key_message() {
    let client = DiscogsClient::new(Client::new(), "http://127.0.0.1:9", None);
    let err = client.fetch_release(249504).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "Missing required environment variable: DISCOGS_API_KEY"
    );
}

#[tokio::test]
async fn test_discogs_appends_token_and_soft_fails_on_404() {
    let mut server = Server::new_async().await;
    let found = server
        .mock("GET", "/releases/1")
        .match_query(Matcher::UrlEncoded("token".into(), "k".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "id": 1,
                "title": "Stockholm",
                "artists": [{"name": "The Persuader"}],
                "uri": "https://www.discogs.com/release/1",
                "images": [{"uri": "https://i.discogs.com/1.jpg"}],
                "year": 1999
            })
            .to_string(),
        )
        .create_async()
        .await;
    let missing = server
        .mock("GET", "/releases/2")
        .match_query(Matcher::Any)
        .with_status(404)
        .create_async()
        .await;

    let client = DiscogsClient::new(Client::new(), server.url(), Some("k".to_string()));
    let item = client.fetch_release_item(1).await.unwrap().unwrap();
    assert_eq!(item.title, "Stockholm");
    assert_eq!(item.artists, vec!["The Persuader".to_string()]);
    assert_eq!(item.year, Some(1999));

    assert!(client.fetch_release(2).await.unwrap().is_none());
    found.assert_async().await;
    missing.assert_async().await;
}

#[tokio::test]
async fn test_flickr_without_photo_array_is_invalid() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/services/rest/")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"stat": "fail", "code": 100, "message": "Invalid API Key"}"#)
        .create_async()
        .await;

    let client = FlickrClient::new(
        Client::new(),
        server.url(),
        Some("key".to_string()),
        Some("123@N01".to_string()),
    );
    let err = client
        .fetch_photos(30, &RetryPolicy::none())
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Invalid response from Flickr API");
}

#[tokio::test]
async fn test_flickr_photos_become_cards() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/services/rest/")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("method".into(), "flickr.people.getPhotos".into()),
            Matcher::UrlEncoded("user_id".into(), "123@N01".into()),
            Matcher::UrlEncoded("nojsoncallback".into(), "1".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({"photos": {"photo": [
                {"id": "9", "title": "Dune", "description": {"_content": "sand"},
                 "url_q": "https://live.staticflickr.com/q.jpg",
                 "url_l": "https://live.staticflickr.com/l.jpg"},
                {"id": "10", "title": "No description"}
            ]}})
            .to_string(),
        )
        .create_async()
        .await;

    let client = FlickrClient::new(
        Client::new(),
        server.url(),
        Some("key".to_string()),
        Some("123@N01".to_string()),
    );
    let photos = client.fetch_photos(30, &RetryPolicy::none()).await.unwrap();

    assert_eq!(photos.len(), 2);
    assert_eq!(photos[0].description, "sand");
    assert_eq!(photos[0].image_url, "https://live.staticflickr.com/l.jpg");
    assert_eq!(photos[0].url, "https://www.flickr.com/photos/123@N01/9");
    assert_eq!(photos[1].description, "");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_flickr_requires_user_id() {
    let client = FlickrClient::new(
        Client::new(),
        "http://127.0.0.1:9",
        Some("key".to_string()),
        None,
    );
    let err = client
        .fetch_photos(30, &RetryPolicy::none())
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Missing required environment variable: FLICKR_USER_ID"
    );
}

#[tokio::test]
async fn test_github_flattens_counts() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/graphql")
        .match_header("authorization", "Bearer ghp_test")
        .match_body(Matcher::PartialJson(json!({"variables": {"login": "octo", "count": 6}})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({"data": {"user": {"repositories": {"nodes": [{
                "name": "dashboard",
                "description": null,
                "url": "https://github.com/octo/dashboard",
                "homepageUrl": "",
                "createdAt": "2023-01-01T00:00:00Z",
                "updatedAt": "2024-01-01T00:00:00Z",
                "primaryLanguage": {"name": "Rust", "color": "#dea584"},
                "stargazers": {"totalCount": 12},
                "forks": {"totalCount": 3}
            }]}}}})
            .to_string(),
        )
        .create_async()
        .await;

    let client = GithubClient::new(
        Client::new(),
        server.url(),
        Some("ghp_test".to_string()),
        Some("octo".to_string()),
    );
    let repos = client
        .fetch_repositories(6, &RetryPolicy::none())
        .await
        .unwrap();

    assert_eq!(repos.len(), 1);
    assert_eq!(repos[0].stargazers, 12);
    assert_eq!(repos[0].forks, 3);
    assert_eq!(repos[0].description, "");
    assert_eq!(repos[0].language.as_deref(), Some("Rust"));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_spotify_refreshes_token_then_fetches_top_tracks() {
    let mut server = Server::new_async().await;
    let token = server
        .mock("POST", "/api/token")
        // base64("id:secret")
        .match_header("authorization", "Basic aWQ6c2VjcmV0")
        .match_body(Matcher::AllOf(vec![
            Matcher::UrlEncoded("grant_type".into(), "refresh_token".into()),
            Matcher::UrlEncoded("refresh_token".into(), "refresh".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"access_token": "access", "token_type": "Bearer", "expires_in": 3600}"#)
        .create_async()
        .await;
    let tracks = server
        .mock("GET", "/me/top/tracks")
        .match_header("authorization", "Bearer access")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("time_range".into(), "short_term".into()),
            Matcher::UrlEncoded("limit".into(), "2".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({"items": [
                {"id": "t1", "name": "Windowlicker", "artists": [{"name": "Aphex Twin"}],
                 "album": {"name": "Windowlicker", "images": [{"url": "https://i.scdn.co/a.jpg"}], "release_date": "1999-03-22"},
                 "external_urls": {"spotify": "https://open.spotify.com/track/t1"}},
                {"id": "t2", "name": "Bare"}
            ]})
            .to_string(),
        )
        .create_async()
        .await;

    let mut settings = SyncSettings::default();
    settings.endpoints.spotify_api = server.url();
    settings.endpoints.spotify_accounts = server.url();
    let config = ProviderConfig::default()
        .with("spotify.client_id", "id")
        .with("spotify.client_secret", "secret")
        .with("spotify.refresh_token", "refresh");
    let client = SpotifyClient::from_config(Client::new(), &config, &settings);

    let items = client
        .fetch_top_tracks("short_term", 2, &RetryPolicy::none())
        .await
        .unwrap();

    assert_eq!(items.len(), 2);
    assert_eq!(items[0].artists, vec!["Aphex Twin".to_string()]);
    assert_eq!(items[0].images, vec!["https://i.scdn.co/a.jpg".to_string()]);
    assert!(items[1].images.is_empty());
    token.assert_async().await;
    tracks.assert_async().await;
}

#[tokio::test]
async fn test_spotify_missing_refresh_token() {
    let config = ProviderConfig::default()
        .with("spotify.client_id", "id")
        .with("spotify.client_secret", "secret");
    let client = SpotifyClient::from_config(Client::new(), &config, &SyncSettings::default());
    let err = client.refresh_access_token().await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "Missing required environment variable: SPOTIFY_REFRESH_TOKEN"
    );
}
