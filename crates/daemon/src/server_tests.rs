// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use axum::body::{to_bytes, Body};
use axum::http::{Method, Request};
use serde_json::{json, Value};
use spr_adapters::{FakeChannel, TableRef};
use spr_engine::EngineConfig;
use tempfile::TempDir;
use tower::ServiceExt;

async fn setup(channel: FakeChannel) -> (TempDir, Arc<WalEngine<FakeChannel>>, Router) {
    let dir = TempDir::new().unwrap();
    let engine = WalEngine::open(EngineConfig::new(dir.path()), channel)
        .await
        .unwrap();
    let engine = Arc::new(engine);
    let app = router(Arc::clone(&engine), Instant::now());
    (dir, engine, app)
}

async fn send(app: Router, method: Method, uri: &str, body: &str) -> (StatusCode, String) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

#[tokio::test]
async fn hello_returns_greeting() {
    let (_dir, _engine, app) = setup(FakeChannel::new()).await;

    let (status, body) = send(app, Method::GET, "/snowpipe/hello", "").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Hello, there.");
}

#[tokio::test]
async fn insert_reports_outcome() {
    let channel = FakeChannel::new();
    channel.reject_rows_where("a", json!("bad"), "Numeric value 'bad' is not recognized");
    let (_dir, _engine, app) = setup(channel).await;

    let (status, body) = send(
        app,
        Method::PUT,
        "/snowpipe/insert",
        r#"[{"a":1}, {"a":"bad"}]"#,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let value: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(
        value,
        json!({
            "inserts_attempted": 2,
            "inserts_succeeded": 1,
            "insert_errors": 1,
            "error_rows": [{
                "row_index": 1,
                "input": "{\"a\":\"bad\"}",
                "error": "Numeric value 'bad' is not recognized",
            }],
        })
    );
}

#[tokio::test]
async fn empty_insert_succeeds() {
    let (_dir, _engine, app) = setup(FakeChannel::new()).await;

    let (status, body) = send(app, Method::PUT, "/snowpipe/insert", "[]").await;

    assert_eq!(status, StatusCode::OK);
    let value: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(value["inserts_attempted"], 0);
}

#[tokio::test]
async fn malformed_body_is_bad_request() {
    let channel = FakeChannel::new();
    let (_dir, _engine, app) = setup(channel.clone()).await;

    let (status, body) = send(app, Method::PUT, "/snowpipe/insert", "{not json").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.starts_with("Unable to parse body as a list of JSON objects"));
    assert!(channel.inserts().is_empty());
}

#[tokio::test]
async fn insert_after_close_is_unavailable() {
    let (_dir, engine, app) = setup(FakeChannel::new()).await;
    engine.close().await.unwrap();

    let (status, _) = send(app, Method::PUT, "/snowpipe/insert", r#"[{"a":1}]"#).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn wal_failure_is_service_unavailable() {
    let dir = TempDir::new().unwrap();
    let channel = FakeChannel::new();
    let mut config = EngineConfig::new(dir.path());
    config.writer.rows_per_segment = 2;
    let engine = WalEngine::open(config, channel.clone()).await.unwrap();
    let app = router(Arc::new(engine), Instant::now());
    // Rotating into segment 1 fails while a directory holds its name
    std::fs::create_dir(dir.path().join("file_0000000001")).unwrap();

    let (status, body) = send(
        app,
        Method::PUT,
        "/snowpipe/insert",
        r#"[{"a":1},{"a":2}]"#,
    )
    .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body.starts_with("WAL write failed"));
    assert!(channel.inserts().is_empty());
}

#[tokio::test]
async fn sink_failure_is_bad_gateway() {
    let channel = FakeChannel::new();
    channel.fail_inserts(Some("connection reset"));
    let (_dir, _engine, app) = setup(channel).await;

    let (status, body) = send(app, Method::PUT, "/snowpipe/insert", r#"[{"a":1}]"#).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body.contains("connection reset"));
}

#[test]
fn table_not_found_maps_to_not_found() {
    let error = ApiError::from(InsertError::Sink(SinkError::TableNotFound(TableRef::new(
        "db", "s", "t",
    ))));

    assert_eq!(error.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn status_reports_engine_stats() {
    let (_dir, _engine, app) = setup(FakeChannel::new()).await;

    send(
        app.clone(),
        Method::PUT,
        "/snowpipe/insert",
        r#"[{"a":1},{"a":2}]"#,
    )
    .await;
    let (status, body) = send(app, Method::GET, "/snowpipe/status", "").await;

    assert_eq!(status, StatusCode::OK);
    let value: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(value["inserts"], 1);
    assert_eq!(value["wal_enabled"], true);
    assert_eq!(value["active_segment"], "file_0000000000");
    assert_eq!(value["last_token"], "file_0000000000:1");
    assert!(value["uptime_secs"].is_u64());
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let (_dir, _engine, app) = setup(FakeChannel::new()).await;

    let (status, _) = send(app, Method::GET, "/snowpipe/nope", "").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}
