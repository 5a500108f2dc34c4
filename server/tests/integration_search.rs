use axum::body::{Body, Bytes};
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use std::fs;
use std::sync::Arc;
use tempfile::tempdir;
use tower::ServiceExt;
use wordex_core::{InvertedIndex, QueryHandler, WordIndex};

fn tiny_handler() -> QueryHandler {
    let index = InvertedIndex::new();
    index.merge(WordIndex::from_document("https://site.test/rust", "Rust is great. Rust systems programming."));
    index.merge(WordIndex::from_document("https://site.test/learn", "Learning rust and go"));
    QueryHandler::new(Arc::new(index), false)
}

async fn call(app: Router, uri: &str) -> (StatusCode, Bytes) {
    let req = Request::get(uri).body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    (status, body)
}

#[tokio::test]
async fn search_returns_ranked_results() {
    let app = wordex_server::build_app(tiny_handler());
    let (status, body) = call(app, "/api/search?query=RUST").await;
    assert_eq!(status, StatusCode::OK);

    let json: Value = serde_json::from_slice(&body).unwrap();
    let arr = json.as_array().unwrap();
    assert_eq!(arr.len(), 2);
    // 2 of 6 words beats 1 of 4
    assert_eq!(arr[0]["where"], "https://site.test/rust");
    assert_eq!(arr[0]["count"], 2);
    assert_eq!(arr[0]["score"].as_f64().unwrap(), 0.33333333);
    assert_eq!(arr[1]["where"], "https://site.test/learn");
}

#[tokio::test]
async fn serves_cached_batch_results() {
    let handler = tiny_handler();
    handler.handle_line("learning");
    let app = wordex_server::build_app(handler.clone());
    let (status, body) = call(app, "/api/search?query=learn").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json.as_array().unwrap().len(), 1);
    // the API does not add entries to the batch cache
    assert_eq!(handler.query_lines(), vec!["learn".to_string()]);
}

#[tokio::test]
async fn missing_query_is_bad_request() {
    let (status, _) = call(wordex_server::build_app(tiny_handler()), "/api/search").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn blank_query_gives_an_empty_list() {
    for uri in ["/api/search?query=", "/api/search?query=%20%20"] {
        let (status, body) = call(wordex_server::build_app(tiny_handler()), uri).await;
        assert_eq!(status, StatusCode::OK, "{uri}");
        assert_eq!(&body[..], b"[]", "{uri}");
    }
}

#[tokio::test]
async fn unknown_words_give_an_empty_list() {
    let (status, body) = call(wordex_server::build_app(tiny_handler()), "/api/search?query=zebra").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(&body[..], b"[]");
}

#[tokio::test]
async fn health_and_stats() {
    let app = wordex_server::build_app(tiny_handler());
    let (status, body) = call(app.clone(), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(&body[..], b"ok");

    let (status, body) = call(app, "/api/stats").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["locations"], 2);
    assert!(json["words"].as_u64().unwrap() >= 6);
}

#[tokio::test]
async fn stats_follow_later_merges() {
    let handler = tiny_handler();
    handler.index().merge(WordIndex::from_document("https://site.test/new", "zebra crossing"));
    let (_, body) = call(wordex_server::build_app(handler.clone()), "/api/stats").await;
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["locations"], 3);
    assert_eq!(json["words"].as_u64().unwrap() as usize, handler.index().num_words());
}

#[tokio::test]
async fn static_dir_serves_files_and_falls_back_to_index() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("index.html"), "<html>wordex ui</html>").unwrap();
    fs::write(dir.path().join("app.js"), "console.log('hi');").unwrap();
    let app = wordex_server::build_app_with_static(tiny_handler(), dir.path());

    let (status, body) = call(app.clone(), "/app.js").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(&body[..], b"console.log('hi');");

    let (status, body) = call(app.clone(), "/results/rust").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(&body[..], b"<html>wordex ui</html>");

    // API routes still win over the static tree
    let (status, body) = call(app, "/api/search?query=learn").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn without_static_dir_unknown_paths_are_not_found() {
    let (status, _) = call(wordex_server::build_app(tiny_handler()), "/app.js").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
