use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use futures::StreamExt;
use tempfile::TempDir;
use tower::ServiceExt;

use ephemera_blob::{
    AssetId, BlobStore, FsBlobStore, ReaperBuilder, ReaperConfig, ReaperMetrics,
};
use ephemera_server::api::AppState;
use ephemera_server::render::HtmlRenderer;

const BOUNDARY: &str = "----ephemera-test-boundary";
const HOUR: Duration = Duration::from_secs(3600);

// -- Helpers --------------------------------------------------------------

struct TestApp {
    _dir: TempDir,
    store: Arc<FsBlobStore>,
    router: Router,
}

async fn setup(max_upload_bytes: u64) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(
        FsBlobStore::open(dir.path(), max_upload_bytes)
            .await
            .unwrap(),
    );
    let renderer = HtmlRenderer::new("http://localhost:3000", HOUR).unwrap();
    let state = AppState::new(store.clone(), HOUR, Arc::new(renderer))
        .with_reaper_metrics(Arc::new(ReaperMetrics::default()));
    TestApp {
        _dir: dir,
        store,
        router: ephemera_server::api::router(state),
    }
}

struct Part<'a> {
    name: &'a str,
    file_name: Option<&'a str>,
    content_type: Option<&'a str>,
    data: &'a [u8],
}

impl<'a> Part<'a> {
    fn video(file_name: &'a str, content_type: &'a str, data: &'a [u8]) -> Self {
        Self {
            name: "video",
            file_name: Some(file_name),
            content_type: Some(content_type),
            data,
        }
    }

    fn text(name: &'a str, value: &'a str) -> Self {
        Self {
            name,
            file_name: None,
            content_type: None,
            data: value.as_bytes(),
        }
    }
}

fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        let mut disposition = format!("Content-Disposition: form-data; name=\"{}\"", part.name);
        if let Some(file_name) = part.file_name {
            disposition.push_str(&format!("; filename=\"{file_name}\""));
        }
        body.extend_from_slice(disposition.as_bytes());
        body.extend_from_slice(b"\r\n");
        if let Some(ct) = part.content_type {
            body.extend_from_slice(format!("Content-Type: {ct}\r\n").as_bytes());
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(part.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn upload_request(parts: &[Part<'_>]) -> Request<Body> {
    let body = multipart_body(parts);
    Request::builder()
        .method(Method::POST)
        .uri("/api/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .header(header::CONTENT_LENGTH, body.len())
        .body(Body::from(body))
        .unwrap()
}

/// Same body as [`upload_request`], streamed in small chunks with no
/// `Content-Length`.
fn chunked_upload_request(parts: &[Part<'_>]) -> Request<Body> {
    let chunks: Vec<Result<axum::body::Bytes, std::io::Error>> = multipart_body(parts)
        .chunks(1024)
        .map(|chunk| Ok(axum::body::Bytes::copy_from_slice(chunk)))
        .collect();
    Request::builder()
        .method(Method::POST)
        .uri("/api/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from_stream(futures::stream::iter(chunks)))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(router: &Router, req: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let resp = router.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let headers = resp.headers().clone();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, headers, bytes.to_vec())
}

async fn send_json(router: &Router, req: Request<Body>) -> (StatusCode, serde_json::Value) {
    let (status, _, body) = send(router, req).await;
    (status, serde_json::from_slice(&body).unwrap())
}

/// Upload `data` and return `(id, filename)`.
async fn upload(router: &Router, file_name: &str, content_type: &str, data: &[u8]) -> (String, String) {
    let (status, body) =
        send_json(router, upload_request(&[Part::video(file_name, content_type, data)])).await;
    assert_eq!(status, StatusCode::OK, "upload failed: {body}");
    let url = body["url"].as_str().unwrap();
    let id = url.strip_prefix("/v/").unwrap().to_owned();
    (id, body["filename"].as_str().unwrap().to_owned())
}

async fn stored_count(store: &FsBlobStore) -> usize {
    store.list_all().count().await
}

fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

// -- Upload, view, download -------------------------------------------------

#[tokio::test]
async fn upload_then_view_and_download() {
    let app = setup(20 * 1024 * 1024).await;
    let data = pattern(10 * 1024 * 1024);

    let (status, body) =
        send_json(&app.router, upload_request(&[Part::video("holiday.mp4", "video/mp4", &data)]))
            .await;
    assert_eq!(status, StatusCode::OK);
    let url = body["url"].as_str().unwrap();
    let id = url.strip_prefix("/v/").unwrap();
    assert!(id.len() >= 36);
    assert!(AssetId::parse(id).is_ok());
    assert_eq!(body["filename"], format!("{id}.mp4"));
    assert_eq!(body["size_bytes"], data.len());

    let (status, headers, page) = send(&app.router, get(url)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(
        headers[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/html")
    );
    let page = String::from_utf8(page).unwrap();
    assert!(page.contains(&format!("src=\"/uploads/{id}.mp4\"")));
    assert!(page.contains(&format!("http://localhost:3000/v/{id}")));
    assert!(!page.contains("&#x2f;"));

    let (status, headers, bytes) = send(&app.router, get(&format!("/uploads/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "video/mp4");
    assert_eq!(bytes.len(), data.len());
    assert!(bytes == data);
}

#[tokio::test]
async fn original_file_name_never_leaks() {
    let app = setup(1024).await;
    let (id, filename) = upload(&app.router, "../../secret name.webm", "video/webm", b"webm").await;
    assert_eq!(filename, format!("{id}.webm"));

    let (_, _, page) = send(&app.router, get(&format!("/v/{id}"))).await;
    assert!(!String::from_utf8(page).unwrap().contains("secret name"));
}

#[tokio::test]
async fn extension_follows_name_then_media_type_then_fallback() {
    let app = setup(1024).await;

    let (id, filename) = upload(&app.router, "clip.WEBM", "video/webm", b"a").await;
    assert_eq!(filename, format!("{id}.webm"));

    let (id, filename) = upload(&app.router, "clip", "video/quicktime", b"b").await;
    assert_eq!(filename, format!("{id}.mov"));

    let (id, filename) = upload(&app.router, "clip.bin", "video/x-unknown", b"c").await;
    assert_eq!(filename, format!("{id}.mp4"));
}

#[tokio::test]
async fn text_fields_are_ignored() {
    let app = setup(1024).await;
    let req = upload_request(&[
        Part::text("title", "my clip"),
        Part::video("clip.mp4", "video/mp4", b"frames"),
        Part::text("note", "ignored too"),
    ]);
    let (status, _) = send_json(&app.router, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stored_count(&app.store).await, 1);
}

// -- Upload rejections ------------------------------------------------------

#[tokio::test]
async fn oversized_upload_is_rejected_and_leaves_nothing() {
    let app = setup(1024).await;
    let data = pattern(4096);

    let (status, body) =
        send_json(&app.router, upload_request(&[Part::video("big.mp4", "video/mp4", &data)]))
            .await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert!(body["error"].as_str().unwrap().contains("1024"));
    assert_eq!(stored_count(&app.store).await, 0);

    let staging = app.store.root().join(ephemera_blob::fs::STAGING_DIR);
    assert_eq!(std::fs::read_dir(staging).unwrap().count(), 0);
}

#[tokio::test]
async fn chunked_request_with_huge_form_field_is_rejected() {
    let app = setup(1024).await;
    let filler = "x".repeat(8 * 1024 * 1024);

    let (status, body) = send_json(
        &app.router,
        chunked_upload_request(&[
            Part::text("note", &filler),
            Part::video("tiny.mp4", "video/mp4", b"moov!!"),
        ]),
    )
    .await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert!(body["error"].as_str().unwrap().contains("1024"));
    assert_eq!(stored_count(&app.store).await, 0);
}

#[tokio::test]
async fn body_limit_reached_inside_file_is_too_large() {
    let app = setup(1024).await;
    let filler = "x".repeat(66_000);
    let data = pattern(1000);

    let (status, _) = send_json(
        &app.router,
        chunked_upload_request(&[
            Part::text("note", &filler),
            Part::video("clip.mp4", "video/mp4", &data),
        ]),
    )
    .await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(stored_count(&app.store).await, 0);

    let staging = app.store.root().join(ephemera_blob::fs::STAGING_DIR);
    assert_eq!(std::fs::read_dir(staging).unwrap().count(), 0);
}

#[tokio::test]
async fn chunked_request_within_limits_is_accepted() {
    let app = setup(1024).await;
    let (status, body) = send_json(
        &app.router,
        chunked_upload_request(&[
            Part::text("note", "hello"),
            Part::video("clip.webm", "video/webm", b"webm bytes"),
        ]),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["size_bytes"], 10);
}

#[tokio::test]
async fn declared_length_over_ceiling_is_rejected_early() {
    let app = setup(1024).await;
    let data = pattern(256 * 1024);

    let (status, body) =
        send_json(&app.router, upload_request(&[Part::video("big.mp4", "video/mp4", &data)]))
            .await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert!(body["error"].is_string());
    assert_eq!(stored_count(&app.store).await, 0);
}

#[tokio::test]
async fn upload_at_exact_ceiling_is_accepted() {
    let app = setup(1024).await;
    let data = pattern(1024);
    let (id, _) = upload(&app.router, "edge.mp4", "video/mp4", &data).await;
    let (_, _, bytes) = send(&app.router, get(&format!("/uploads/{id}"))).await;
    assert_eq!(bytes.len(), 1024);
}

#[tokio::test]
async fn missing_file_is_bad_request() {
    let app = setup(1024).await;
    let (status, body) =
        send_json(&app.router, upload_request(&[Part::text("title", "no file")])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("no file"));

    let (status, _) = send_json(&app.router, upload_request(&[])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn non_video_media_type_is_rejected() {
    let app = setup(1024).await;
    let req = upload_request(&[Part::video("notes.txt", "text/plain", b"hello")]);
    let (status, body) = send_json(&app.router, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("video"));
    assert_eq!(stored_count(&app.store).await, 0);
}

#[tokio::test]
async fn file_under_another_field_name_is_rejected() {
    let app = setup(1024).await;
    let req = upload_request(&[Part {
        name: "file",
        file_name: Some("clip.mp4"),
        content_type: Some("video/mp4"),
        data: b"frames",
    }]);
    let (status, _) = send_json(&app.router, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(stored_count(&app.store).await, 0);
}

#[tokio::test]
async fn second_file_discards_the_first() {
    let app = setup(1024).await;
    let req = upload_request(&[
        Part::video("a.mp4", "video/mp4", b"first"),
        Part::video("b.mp4", "video/mp4", b"second"),
    ]);
    let (status, body) = send_json(&app.router, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("one file"));
    assert_eq!(stored_count(&app.store).await, 0);
}

#[tokio::test]
async fn non_multipart_body_is_bad_request() {
    let app = setup(1024).await;
    let req = Request::builder()
        .method(Method::POST)
        .uri("/api/upload")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"video": "nope"}"#))
        .unwrap();
    let (status, body) = send_json(&app.router, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn truncated_multipart_is_bad_request() {
    let app = setup(1024).await;
    let mut body = multipart_body(&[Part::video("a.mp4", "video/mp4", b"frames")]);
    body.truncate(body.len() - 20);
    let req = Request::builder()
        .method(Method::POST)
        .uri("/api/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap();
    let (status, _) = send_json(&app.router, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(stored_count(&app.store).await, 0);
}

// -- Concurrency ------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn parallel_uploads_get_distinct_ids() {
    let app = setup(64 * 1024).await;

    let uploads = (0..16u8).map(|i| {
        let router = app.router.clone();
        tokio::spawn(async move {
            let data = vec![i; 32 * 1024];
            let req = upload_request(&[Part::video("same-name.mp4", "video/mp4", &data)]);
            let resp = router.oneshot(req).await.unwrap();
            assert_eq!(resp.status(), StatusCode::OK);
            let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
                .await
                .unwrap();
            let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
            (i, body["filename"].as_str().unwrap().to_owned())
        })
    });
    let results = futures::future::join_all(uploads).await;

    let mut names = HashSet::new();
    for result in results {
        let (i, filename) = result.unwrap();
        let (_, _, bytes) = send(&app.router, get(&format!("/uploads/{filename}"))).await;
        assert!(bytes.iter().all(|b| *b == i), "upload {i} was mixed up");
        assert!(names.insert(filename));
    }
    assert_eq!(names.len(), 16);
    assert_eq!(stored_count(&app.store).await, 16);
}

// -- Expiry -----------------------------------------------------------------

#[tokio::test]
async fn reaped_asset_reports_expired() {
    let app = setup(1024).await;
    let (id, filename) = upload(&app.router, "clip.mp4", "video/mp4", b"frames").await;

    let (status, _, _) = send(&app.router, get(&format!("/v/{id}"))).await;
    assert_eq!(status, StatusCode::OK);

    let (reaper, _shutdown) = ReaperBuilder::new()
        .config(ReaperConfig {
            sweep_interval: Duration::from_secs(60),
            ttl: Duration::ZERO,
        })
        .store(app.store.clone())
        .build()
        .unwrap();
    let report = reaper.sweep().await;
    assert_eq!(report.deleted, 1);

    let (status, headers, page) = send(&app.router, get(&format!("/v/{id}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(
        headers[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/html")
    );
    assert!(!String::from_utf8(page).unwrap().contains("<video"));

    let (status, body) = send_json(&app.router, get(&format!("/uploads/{filename}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn expired_but_unreaped_asset_is_not_served() {
    let app = setup(1024).await;
    let (id, _) = upload(&app.router, "clip.mp4", "video/mp4", b"frames").await;

    let info = app
        .store
        .stat(&AssetId::parse(&id).unwrap())
        .await
        .unwrap()
        .unwrap();
    std::fs::File::options()
        .write(true)
        .open(&info.path)
        .unwrap()
        .set_modified(SystemTime::now() - 2 * HOUR)
        .unwrap();

    let (status, _, _) = send(&app.router, get(&format!("/v/{id}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _, _) = send(&app.router, get(&format!("/uploads/{id}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn expired_and_never_issued_look_the_same() {
    let app = setup(1024).await;
    let never = AssetId::generate();
    let (s1, _, never_page) = send(&app.router, get(&format!("/v/{never}"))).await;
    let (s2, _, garbage_page) = send(&app.router, get("/v/not-an-id")).await;
    assert_eq!(s1, StatusCode::NOT_FOUND);
    assert_eq!(s2, StatusCode::NOT_FOUND);
    assert_eq!(never_page, garbage_page);
}

// -- Raw route --------------------------------------------------------------

#[tokio::test]
async fn range_requests_are_honoured() {
    let app = setup(1024).await;
    let (_, filename) = upload(&app.router, "clip.webm", "video/webm", b"0123456789").await;

    let req = Request::builder()
        .uri(format!("/uploads/{filename}"))
        .header(header::RANGE, "bytes=2-5")
        .body(Body::empty())
        .unwrap();
    let (status, headers, bytes) = send(&app.router, req).await;
    assert_eq!(status, StatusCode::PARTIAL_CONTENT);
    assert_eq!(bytes, b"2345");
    assert_eq!(headers[header::CONTENT_RANGE], "bytes 2-5/10");
    assert_eq!(headers[header::CONTENT_TYPE], "video/webm");
}

#[tokio::test]
async fn download_flag_sets_attachment() {
    let app = setup(1024).await;
    let (_, filename) = upload(&app.router, "clip.mp4", "video/mp4", b"frames").await;

    let (_, headers, _) = send(&app.router, get(&format!("/uploads/{filename}"))).await;
    assert!(headers.get(header::CONTENT_DISPOSITION).is_none());

    let (status, headers, _) =
        send(&app.router, get(&format!("/uploads/{filename}?download=1"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        headers[header::CONTENT_DISPOSITION],
        format!("attachment; filename=\"{filename}\"")
    );
}

#[tokio::test]
async fn head_reports_length_without_body() {
    let app = setup(1024).await;
    let (_, filename) = upload(&app.router, "clip.mp4", "video/mp4", b"frames").await;

    let req = Request::builder()
        .method(Method::HEAD)
        .uri(format!("/uploads/{filename}"))
        .body(Body::empty())
        .unwrap();
    let (status, headers, bytes) = send(&app.router, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_LENGTH], "6");
    assert!(bytes.is_empty());
}

#[tokio::test]
async fn wrong_extension_is_not_found() {
    let app = setup(1024).await;
    let (id, _) = upload(&app.router, "clip.mp4", "video/mp4", b"frames").await;
    let (status, _, _) = send(&app.router, get(&format!("/uploads/{id}.webm"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn traversal_attempts_are_not_found() {
    let app = setup(1024).await;
    upload(&app.router, "clip.mp4", "video/mp4", b"frames").await;

    for uri in [
        "/uploads/..%2F..%2Fetc%2Fpasswd",
        "/uploads/.staging",
        "/uploads/%2e%2e",
        "/uploads/..",
        "/v/..%2F..%2Fetc%2Fpasswd",
    ] {
        let (status, _, _) = send(&app.router, get(uri)).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
    }
}

// -- Operational routes -----------------------------------------------------

#[tokio::test]
async fn health_reports_counters() {
    let app = setup(1024).await;
    upload(&app.router, "clip.mp4", "video/mp4", b"frames").await;
    send(&app.router, get("/v/not-an-id")).await;

    let (status, body) = send_json(&app.router, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["ttl_seconds"], 3600);
    assert_eq!(body["reaper"]["enabled"], true);
    assert_eq!(body["reaper"]["phase"], "idle");
    assert_eq!(body["metrics"]["uploads_accepted"], 1);
    assert_eq!(body["metrics"]["bytes_uploaded"], 6);
    assert_eq!(body["metrics"]["lookups_absent"], 1);
}

#[tokio::test]
async fn openapi_document_is_served() {
    let app = setup(1024).await;
    let (status, body) = send_json(&app.router, get("/api-doc/openapi.json")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/api/upload"].is_object());
}

#[tokio::test]
async fn config_snapshot_is_served() {
    let app = setup(1024).await;
    let (status, body) = send_json(&app.router, get("/admin/config")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["storage"].get("upload_dir").is_none());
}
