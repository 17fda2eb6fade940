//! EpornerClient Tests
//!
//! Runs the live client against a local server serving canned API and HTML
//! responses.

use axum::{
    extract::Query,
    http::StatusCode,
    response::Html,
    routing::get,
    Json, Router,
};
use eporner_bot::{EpornerClient, ListingHints, ProviderGateway, SearchSort};
use serde_json::{json, Value};
use std::collections::HashMap;

fn api_video(id: &str) -> Value {
    json!({
        "id": id,
        "title": format!("Video {}", id),
        "keywords": "one, two, three",
        "views": 42,
        "rate": "3.50",
        "url": format!("https://www.eporner.com/video-{}/x/", id),
        "added": "2021-05-06 07:08:09",
        "length_sec": 600,
        "default_thumb": {"src": format!("https://cdn.example/{}.jpg", id)}
    })
}

async fn video_by_id(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
    match params.get("id").map(String::as_str) {
        Some("missing") | None => Json(json!([])),
        Some(id) => Json(api_video(id)),
    }
}

async fn search(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
    // Echo the query so the test can check parameters
    let query = params.get("query").cloned().unwrap_or_default();
    if query == "nothing" {
        return Json(json!({"count": 0, "videos": []}));
    }
    assert_eq!(params.get("order").map(String::as_str), Some("latest"));
    assert_eq!(params.get("gay").map(String::as_str), Some("0"));
    assert_eq!(params.get("lq").map(String::as_str), Some("0"));
    let per_page: usize = params
        .get("per_page")
        .and_then(|v| v.parse().ok())
        .unwrap_or(30);
    let videos: Vec<Value> = (0..per_page).map(|i| api_video(&format!("{}{}", query, i))).collect();
    Json(json!({"count": per_page, "page": 1, "videos": videos}))
}

async fn category_page() -> Html<&'static str> {
    Html(
        r#"<div id="vidresults">
            <div class="mb"><a href="/video-c1/one/"><img></a><a href="/video-c1/one/">One</a></div>
            <div class="mb"><a href="/video-c2/two/">Two</a></div>
            <div class="mb"><a href="/video-c3/three/">Three</a></div>
            <div class="mb"><a href="/video-c4/four/">Four</a></div>
        </div>"#,
    )
}

async fn performer_page() -> Html<&'static str> {
    Html(
        r#"<html><head><meta property="og:image" content="https://cdn.example/jane.jpg"></head>
        <body><h1>Jane Doe</h1>
        <div><span>Subscribers:</span> 1,234</div>
        <div><span>Ethnicity:</span> Latin</div>
        </body></html>"#,
    )
}

async fn spawn_site() -> String {
    let app = Router::new()
        .route("/api/v2/video/id/", get(video_by_id))
        .route("/api/v2/video/search/", get(search))
        .route("/cat/big-cats/", get(category_page))
        .route("/cat/unknown/", get(|| async { StatusCode::NOT_FOUND }))
        .route("/pornstar/jane-doe", get(performer_page));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn client(base: &str) -> EpornerClient {
    EpornerClient::with_base_url(reqwest::Client::new(), base)
}

#[tokio::test]
async fn test_resolve_video() {
    let base = spawn_site().await;
    let video = client(&base)
        .resolve_video(&format!("{}/video-abc123/", base))
        .await
        .unwrap();

    assert_eq!(video.video_id, "abc123");
    assert_eq!(video.views, 42);
    assert_eq!(video.length_minutes, 10);
    assert_eq!(video.tags, vec!["one", "two", "three"]);
    assert_eq!(video.thumbnail.as_deref(), Some("https://cdn.example/abc123.jpg"));
}

#[tokio::test]
async fn test_resolve_missing_video() {
    let base = spawn_site().await;
    let err = client(&base)
        .resolve_video("https://www.eporner.com/video-missing/")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("not found"));
}

#[tokio::test]
async fn test_resolve_video_rejects_url_without_id() {
    let base = spawn_site().await;
    assert!(client(&base).resolve_video("https://example.com/").await.is_err());
}

#[tokio::test]
async fn test_search() {
    let base = spawn_site().await;
    let videos = client(&base)
        .search("cat", 1, 5, SearchSort::default())
        .await
        .unwrap();

    assert_eq!(videos.len(), 5);
    assert_eq!(videos[0].video_id, "cat0");
    assert_eq!(videos[4].video_id, "cat4");

    let none = client(&base)
        .search("nothing", 1, 5, SearchSort::default())
        .await
        .unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn test_list_category_respects_limit_and_order() {
    let base = spawn_site().await;
    let hints = ListingHints {
        limit: 3,
        ..ListingHints::default()
    };
    let videos = client(&base).list_category("Big Cats", hints).await.unwrap();

    let ids: Vec<&str> = videos.iter().map(|v| v.video_id.as_str()).collect();
    assert_eq!(ids, vec!["c1", "c2", "c3"]);
}

#[tokio::test]
async fn test_list_unknown_category_fails() {
    let base = spawn_site().await;
    let result = client(&base)
        .list_category("unknown", ListingHints::default())
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_resolve_performer() {
    let base = spawn_site().await;
    let performer = client(&base)
        .resolve_performer(&format!("{}/pornstar/jane-doe", base))
        .await
        .unwrap();

    assert_eq!(performer.name, "Jane Doe");
    assert_eq!(performer.subscribers.as_deref(), Some("1,234"));
    assert_eq!(performer.ethnicity.as_deref(), Some("Latin"));
    assert_eq!(performer.picture.as_deref(), Some("https://cdn.example/jane.jpg"));
    assert!(performer.age.is_none());
}

#[tokio::test]
async fn test_resolve_performer_reads_from_base_host_only() {
    let base = spawn_site().await;
    let performer = client(&base)
        .resolve_performer("http://internal.invalid/pornstar/jane-doe")
        .await
        .unwrap();
    assert_eq!(performer.name, "Jane Doe");

    let err = client(&base)
        .resolve_performer(&format!("{}/internal/secret", base))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("no pornstar id"));
}
