//! # Integration Tests for evhub-api
//!
//! Drives the full router with `tower::ServiceExt::oneshot`: event
//! creation with uploads, listing, updates, attaching and detaching files,
//! static assets, health probes, and the OpenAPI document. Every test gets
//! its own temporary data and public directories.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use evhub_api::state::{AppConfig, AppState};

const BOUNDARY: &str = "evhub-integration-boundary";
const DIGEST_1234_PATH: &str =
    "03a/c67/4216f3e15c761ee1a5e255f067953623c8b388b4459e13f978d7c846f4.jpg";

struct TestApp {
    router: Router,
    state: AppState,
    _dir: TempDir,
}

/// Helper: build the app over a fresh temporary data root.
fn test_app() -> TestApp {
    test_app_with(|_| {})
}

fn test_app_with(tweak: impl FnOnce(&mut AppConfig)) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let public = dir.path().join("public");
    std::fs::create_dir_all(&public).unwrap();
    std::fs::write(public.join("index.html"), "<h1>evhub</h1>").unwrap();
    std::fs::write(public.join("app.js"), "console.log('evhub');").unwrap();

    let mut config = AppConfig {
        data_dir: dir.path().join("data"),
        public_dir: public,
        ..AppConfig::default()
    };
    tweak(&mut config);
    let state = AppState::open(config, None).unwrap();
    TestApp {
        router: evhub_api::app(state.clone()),
        state,
        _dir: dir,
    }
}

enum Part<'a> {
    Text(&'a str, &'a str),
    File(&'a str, &'a str, &'a [u8]),
}

fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File(name, filename, content) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(content);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn multipart_request(method: &str, uri: &str, parts: &[Part<'_>]) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(app: &TestApp, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, bytes.to_vec())
}

async fn send_json(app: &TestApp, request: Request<Body>) -> (StatusCode, Value) {
    let (status, bytes) = send(app, request).await;
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn create_event(app: &TestApp, title: &str, files: &[(&str, &[u8])]) -> Value {
    let mut parts = vec![Part::Text("title", title), Part::Text("description", "desc")];
    for (name, content) in files {
        parts.push(Part::File("files", name, content));
    }
    let (status, body) = send_json(app, multipart_request("POST", "/events", &parts)).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body
}

// -- Events -------------------------------------------------------------------

#[tokio::test]
async fn create_event_stores_file_at_content_path() {
    let app = test_app();
    let body = create_event(&app, "Launch", &[("file.jpg", &b"1234"[..])]).await;

    assert_eq!(body["title"], "Launch");
    assert_eq!(body["description"], "desc");
    let files = body["files"].as_array().unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0]["name"], "file.jpg");
    assert_eq!(files[0]["storage_path"], DIGEST_1234_PATH);

    let on_disk = app.state.file_store.root().join(DIGEST_1234_PATH);
    assert_eq!(std::fs::read(on_disk).unwrap(), b"1234");
}

#[tokio::test]
async fn create_event_skips_empty_file_inputs() {
    let app = test_app();
    let parts = [
        Part::Text("title", "No files"),
        Part::File("files", "", b""),
    ];
    let (status, body) = send_json(&app, multipart_request("POST", "/events", &parts)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["files"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn same_bytes_twice_share_one_path() {
    let app = test_app();
    let files = [("a.jpg", &b"1234"[..]), ("b.jpg", &b"1234"[..])];
    let body = create_event(&app, "Dup", &files).await;
    let files = body["files"].as_array().unwrap();
    assert_eq!(files.len(), 2);
    assert_eq!(files[0]["storage_path"], files[1]["storage_path"]);
    assert_ne!(files[0]["id"], files[1]["id"]);
    assert_eq!(app.state.metrics.snapshot().files_stored, 2);
}

#[tokio::test]
async fn create_event_rejects_trailing_dot_filename() {
    let app = test_app();
    let parts = [Part::Text("title", "Bad"), Part::File("files", "trailing.", b"x")];
    let (status, body) = send_json(&app, multipart_request("POST", "/events", &parts)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert!(app.state.events.is_empty());
}

#[tokio::test]
async fn list_events_returns_ten_newest_first() {
    let app = test_app();
    for i in 1..=12 {
        create_event(&app, &format!("event {i}"), &[]).await;
    }
    let (status, body) = send_json(&app, get("/events")).await;
    assert_eq!(status, StatusCode::OK);
    let events = body["events"].as_array().unwrap();
    assert_eq!(events.len(), 10);
    assert_eq!(events[0]["title"], "event 12");
    assert_eq!(events[9]["title"], "event 3");
}

#[tokio::test]
async fn list_limit_is_configurable() {
    let app = test_app_with(|c| c.list_limit = 2);
    for i in 1..=3 {
        create_event(&app, &format!("event {i}"), &[]).await;
    }
    let (_, body) = send_json(&app, get("/events")).await;
    assert_eq!(body["events"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn get_event_includes_files() {
    let app = test_app();
    let created = create_event(&app, "Show", &[("notes.txt", &b"hello"[..])]).await;
    let id = created["id"].as_i64().unwrap();

    let (status, body) = send_json(&app, get(&format!("/events/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], id);
    assert_eq!(body["files"][0]["name"], "notes.txt");
}

#[tokio::test]
async fn get_missing_event_is_404() {
    let app = test_app();
    let (status, body) = send_json(&app, get("/events/999")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn get_event_with_bad_id_is_422() {
    let app = test_app();
    let (status, _) = send_json(&app, get("/events/abc")).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let (status, _) = send_json(&app, get("/events/0")).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn update_event_overwrites_fields() {
    let app = test_app();
    let created = create_event(&app, "Old", &[]).await;
    let id = created["id"].as_i64().unwrap();

    let request = Request::builder()
        .method("PUT")
        .uri(format!("/events/{id}"))
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("title=New&description=Changed"))
        .unwrap();
    let (status, body) = send_json(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, serde_json::json!({"result": "ok"}));

    let (_, body) = send_json(&app, get(&format!("/events/{id}"))).await;
    assert_eq!(body["title"], "New");
    assert_eq!(body["description"], "Changed");
}

#[tokio::test]
async fn update_missing_event_is_404() {
    let app = test_app();
    let request = multipart_request("PUT", "/events/7", &[Part::Text("title", "x")]);
    let (status, _) = send_json(&app, request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// -- Files --------------------------------------------------------------------

#[tokio::test]
async fn add_file_attaches_to_event() {
    let app = test_app();
    let created = create_event(&app, "Attach", &[]).await;
    let id = created["id"].as_i64().unwrap();

    let request = multipart_request(
        "POST",
        &format!("/events/{id}/files"),
        &[Part::File("file", "photo.jpg", b"1234")],
    );
    let (status, body) = send_json(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], "ok");
    assert_eq!(body["file"]["event_id"], id);
    assert_eq!(body["file"]["storage_path"], DIGEST_1234_PATH);

    let (_, event) = send_json(&app, get(&format!("/events/{id}"))).await;
    assert_eq!(event["files"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn add_file_to_missing_event_is_404() {
    let app = test_app();
    let request = multipart_request(
        "POST",
        "/events/42/files",
        &[Part::File("file", "photo.jpg", b"1234")],
    );
    let (status, _) = send_json(&app, request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(!app.state.file_store.root().join("03a").exists());
}

#[tokio::test]
async fn add_file_without_file_part_is_422() {
    let app = test_app();
    let created = create_event(&app, "Empty", &[]).await;
    let id = created["id"].as_i64().unwrap();
    let request = multipart_request(
        "POST",
        &format!("/events/{id}/files"),
        &[Part::Text("note", "no file here")],
    );
    let (status, _) = send_json(&app, request).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn delete_file_removes_record_but_keeps_bytes() {
    let app = test_app();
    let created = create_event(&app, "Detach", &[("file.jpg", &b"1234"[..])]).await;
    let id = created["id"].as_i64().unwrap();
    let file_id = created["files"][0]["id"].as_i64().unwrap();

    let request = Request::builder()
        .method("DELETE")
        .uri(format!("/events/{id}/files/{file_id}"))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send_json(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], "ok");

    let (_, event) = send_json(&app, get(&format!("/events/{id}"))).await;
    assert!(event["files"].as_array().unwrap().is_empty());
    assert!(app.state.file_store.root().join(DIGEST_1234_PATH).is_file());
}

#[tokio::test]
async fn delete_file_validates_ids() {
    let app = test_app();
    let created = create_event(&app, "Ids", &[("file.jpg", &b"1234"[..])]).await;
    let id = created["id"].as_i64().unwrap();

    for (uri, expected) in [
        (format!("/events/{id}/files/0"), StatusCode::UNPROCESSABLE_ENTITY),
        (format!("/events/{id}/files/-3"), StatusCode::UNPROCESSABLE_ENTITY),
        (format!("/events/{id}/files/999"), StatusCode::NOT_FOUND),
        (format!("/events/{}/files/1", id + 1), StatusCode::NOT_FOUND),
    ] {
        let request = Request::builder()
            .method("DELETE")
            .uri(&uri)
            .body(Body::empty())
            .unwrap();
        let (status, _) = send_json(&app, request).await;
        assert_eq!(status, expected, "{uri}");
    }
}

// -- Static assets --------------------------------------------------------------

#[tokio::test]
async fn root_serves_index_html() {
    let app = test_app();
    let (status, body) = send(&app, get("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"<h1>evhub</h1>");
}

#[tokio::test]
async fn assets_are_served_from_public_dir() {
    let app = test_app();
    let (status, body) = send(&app, get("/assets/app.js")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"console.log('evhub');");
    let (status, _) = send(&app, get("/assets/missing.css")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// -- Health / metrics / OpenAPI ------------------------------------------------

#[tokio::test]
async fn health_probes() {
    let app = test_app();
    let (status, body) = send(&app, get("/health/liveness")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"ok");
    let (status, body) = send(&app, get("/health/readiness")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"ready");
}

#[tokio::test]
async fn metrics_count_requests_and_uploads() {
    let app = test_app();
    create_event(&app, "Counted", &[("file.jpg", &b"1234"[..])]).await;
    send_json(&app, get("/events/999")).await;

    let (status, body) = send_json(&app, get("/health/metrics")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["requests"], 2);
    assert_eq!(body["errors"], 1);
    assert_eq!(body["files_stored"], 1);
    assert_eq!(body["bytes_stored"], 4);
}

#[tokio::test]
async fn openapi_document_is_served() {
    let app = test_app();
    let (status, body) = send_json(&app, get("/openapi.json")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/events"].is_object());
    assert!(body["paths"]["/events/{id}/files/{file_id}"].is_object());
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let app = test_app_with(|c| c.max_upload_bytes = 16);
    let big = vec![b'x'; 1024];
    let request = multipart_request(
        "POST",
        "/events",
        &[Part::Text("title", "Big"), Part::File("files", "big.bin", &big)],
    );
    let (status, _) = send_json(&app, request).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert!(app.state.events.is_empty());
}
