// End-to-end router tests with an in-memory origin

use std::path::Path as FsPath;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use parking_lot::Mutex;
use tower::ServiceExt;

use vodgate_api::{create_router, AppState};
use vodgate_core::cache::DiskCache;
use vodgate_core::catalog::{CatalogLister, MediaProber};
use vodgate_core::remote::{CommandOutput, RemoteExecutor};
use vodgate_core::store::{CatalogRecord, CatalogStore, MemoryCatalogStore};
use vodgate_core::transfer::Downloader;
use vodgate_core::{Config, Error, Result, VideoId};
use vodgate_proxy::OriginGateway;

const VIDEO_PATH: &str = "/srv/media/alice/clips/trip.mp4";
const VIDEO_BYTES: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Fake origin server behind the RemoteExecutor seam.
struct FakeOrigin {
    fetches: AtomicUsize,
    commands: Mutex<Vec<Vec<String>>>,
    listing: String,
    payload: Vec<u8>,
}

impl FakeOrigin {
    fn new() -> Self {
        Self {
            fetches: AtomicUsize::new(0),
            commands: Mutex::new(Vec::new()),
            listing: format!("644|{}|{}\n", VIDEO_BYTES.len(), VIDEO_PATH),
            payload: VIDEO_BYTES.to_vec(),
        }
    }

    fn remote_calls(&self) -> usize {
        self.commands.lock().len() + self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteExecutor for FakeOrigin {
    async fn run(&self, _server: &str, command: &[&str]) -> Result<CommandOutput> {
        self.commands
            .lock()
            .push(command.iter().map(ToString::to_string).collect());
        let (status, stdout) = match command.first().copied() {
            Some("find") => (0, self.listing.clone()),
            Some("ffprobe") => (0, "12.5\n".to_string()),
            Some("rm" | "mv") => (0, String::new()),
            _ => (127, String::new()),
        };
        Ok(CommandOutput {
            status,
            stdout,
            stderr: String::new(),
        })
    }

    async fn transfer_in(&self, _server: &str, _remote: &str, local: &FsPath) -> Result<u64> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        tokio::fs::write(local, &self.payload).await?;
        Ok(self.payload.len() as u64)
    }

    async fn transfer_out(&self, _server: &str, _local: &FsPath, _remote: &str) -> Result<u64> {
        Err(Error::TransferFailed("uploads not supported in tests".to_string()))
    }
}

struct TestApp {
    router: axum::Router,
    origin: Arc<FakeOrigin>,
    store: Arc<MemoryCatalogStore>,
    cache: Arc<DiskCache>,
    _cache_dir: tempfile::TempDir,
}

fn test_app() -> TestApp {
    test_app_with(|_| {})
}

fn test_app_with(adjust: impl FnOnce(&mut Config)) -> TestApp {
    let cache_dir = tempfile::TempDir::new().expect("tempdir");
    let mut config = Config::default();
    config.cache.dir = cache_dir.path().to_string_lossy().into_owned();
    config.remote.video_root = "/srv/media".to_string();
    adjust(&mut config);
    let config = Arc::new(config);

    let origin = Arc::new(FakeOrigin::new());
    let executor: Arc<dyn RemoteExecutor> = origin.clone();
    let cache = Arc::new(DiskCache::new(&config.cache).expect("cache"));
    let prober = Arc::new(MediaProber::new(executor.clone()));
    let lister = Arc::new(CatalogLister::new(
        executor.clone(),
        prober.clone(),
        config.remote.video_root.clone(),
    ));
    let downloader = Arc::new(Downloader::new(
        cache.clone(),
        executor.clone(),
        config.cache.freshness(),
    ));
    let store = Arc::new(MemoryCatalogStore::new());
    let gateway = Arc::new(OriginGateway::new(&config.origin).expect("gateway"));

    let state = AppState {
        config,
        executor,
        lister,
        prober,
        cache: cache.clone(),
        downloader,
        store: store.clone(),
        gateway,
    };

    TestApp {
        router: create_router(state),
        origin,
        store,
        cache,
        _cache_dir: cache_dir,
    }
}

fn request(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("x-vodgate-user", "alice")
        .body(Body::empty())
        .expect("request")
}

async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .expect("collect")
        .to_bytes()
        .to_vec()
}

fn video_id() -> VideoId {
    VideoId::from_path(VIDEO_PATH)
}

#[tokio::test]
async fn missing_identity_is_unauthorized() {
    let app = test_app();
    let response = app
        .router
        .oneshot(
            Request::builder()
                .uri("/videos")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn listing_returns_caller_videos() {
    let app = test_app();
    let response = app
        .router
        .oneshot(request("/videos?folder=clips"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let body: serde_json::Value =
        serde_json::from_slice(&body_bytes(response).await).expect("json");
    let records = body.as_array().expect("array");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["name"], "trip");
    assert_eq!(records[0]["owner"], "alice");
    assert_eq!(records[0]["size"], VIDEO_BYTES.len() as u64);
    assert_eq!(records[0]["duration_secs"], 12.5);
}

#[tokio::test]
async fn stream_without_range_returns_full_content() {
    let app = test_app();
    let uri = format!("/videos/stream/{}", video_id());
    let response = app.router.oneshot(request(&uri)).await.expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(header::ACCEPT_RANGES)
            .and_then(|v| v.to_str().ok()),
        Some("bytes")
    );
    assert_eq!(
        response
            .headers()
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok()),
        Some(VIDEO_BYTES.len().to_string().as_str())
    );
    assert_eq!(body_bytes(response).await, VIDEO_BYTES);
}

#[tokio::test]
async fn stream_with_range_returns_partial_content() {
    let app = test_app();
    let uri = format!("/videos/stream/{}", video_id());
    let mut req = request(&uri);
    req.headers_mut()
        .insert(header::RANGE, "bytes=10-19".parse().expect("header"));

    let response = app.router.oneshot(req).await.expect("response");
    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(
        response
            .headers()
            .get(header::CONTENT_RANGE)
            .and_then(|v| v.to_str().ok()),
        Some(format!("bytes 10-19/{}", VIDEO_BYTES.len()).as_str())
    );
    assert_eq!(body_bytes(response).await, &VIDEO_BYTES[10..=19]);
}

#[tokio::test]
async fn malformed_range_falls_back_to_full_content() {
    let app = test_app();
    let uri = format!("/videos/stream/{}", video_id());
    let mut req = request(&uri);
    req.headers_mut()
        .insert(header::RANGE, "bytes=nonsense".parse().expect("header"));

    let response = app.router.oneshot(req).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, VIDEO_BYTES);
}

#[tokio::test]
async fn concurrent_streams_share_one_transfer() {
    let app = test_app();
    let uri = format!("/videos/stream/{}", video_id());

    let mut handles = Vec::new();
    for _ in 0..3 {
        let router = app.router.clone();
        let uri = uri.clone();
        handles.push(tokio::spawn(async move {
            router.oneshot(request(&uri)).await.expect("response")
        }));
    }
    for handle in handles {
        let response = handle.await.expect("join");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_bytes(response).await, VIDEO_BYTES);
    }

    assert_eq!(app.origin.fetches.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn second_request_hits_cache_without_remote_io() {
    let app = test_app();
    let uri = format!("/videos/stream/{}", video_id());

    let response = app
        .router
        .clone()
        .oneshot(request(&uri))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(app.origin.fetches.load(Ordering::SeqCst), 1);

    let response = app.router.oneshot(request(&uri)).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(app.origin.fetches.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn ownership_mismatch_is_rejected_without_remote_io() {
    let app = test_app();
    let bob_video = VideoId::from_path("/srv/media/bob/clips/private.mp4");
    let uri = format!("/videos/stream/{bob_video}");

    let response = app.router.oneshot(request(&uri)).await.expect("response");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(app.origin.remote_calls(), 0);
}

#[tokio::test]
async fn bogus_identifier_is_not_found() {
    let app = test_app();
    let response = app
        .router
        .oneshot(request("/videos/stream/%21%21garbage"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn info_returns_probe_defaults_on_failure() {
    let app = test_app();
    // FakeOrigin answers ffprobe with a bare duration line, which the full
    // probe cannot parse as JSON, so defaults come back.
    let uri = format!("/videos/info/{}", video_id());
    let response = app.router.oneshot(request(&uri)).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let body: serde_json::Value =
        serde_json::from_slice(&body_bytes(response).await).expect("json");
    assert_eq!(body["name"], "trip");
    assert_eq!(body["codec"], "unknown");
    assert_eq!(body["width"], 0);
}

#[tokio::test]
async fn delete_removes_remote_file_and_cache_entry() {
    let app = test_app();
    let id = video_id();

    // Prime the cache
    let uri = format!("/videos/stream/{id}");
    app.router
        .clone()
        .oneshot(request(&uri))
        .await
        .expect("response");
    assert!(app.cache.entry(&id).is_some());

    let req = Request::builder()
        .method("DELETE")
        .uri(format!("/videos/{id}"))
        .header("x-vodgate-user", "alice")
        .body(Body::empty())
        .expect("request");
    let response = app.router.oneshot(req).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let body: serde_json::Value =
        serde_json::from_slice(&body_bytes(response).await).expect("json");
    assert_eq!(body["removed"], true);
    assert_eq!(body["cache_entry_removed"], true);
    assert!(app.cache.entry(&id).is_none());
    assert!(app
        .origin
        .commands
        .lock()
        .iter()
        .any(|c| c.first().map(String::as_str) == Some("rm")));
}

#[tokio::test]
async fn rename_preserves_extension_and_updates_store() {
    let app = test_app();
    app.store.insert(CatalogRecord {
        name: "trip".to_string(),
        path: VIDEO_PATH.to_string(),
    });

    let req = Request::builder()
        .method("PUT")
        .uri(format!("/videos/{}/rename", video_id()))
        .header("x-vodgate-user", "alice")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"name":"holiday"}"#))
        .expect("request");
    let response = app.router.oneshot(req).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let body: serde_json::Value =
        serde_json::from_slice(&body_bytes(response).await).expect("json");
    assert_eq!(body["name"], "holiday");
    let new_id = VideoId::from_encoded(body["id"].as_str().expect("id"));
    assert_eq!(
        new_id.to_path().expect("decode"),
        "/srv/media/alice/clips/holiday.mp4"
    );

    let record = app
        .store
        .find_by_path("/srv/media/alice/clips/holiday.mp4")
        .await
        .expect("find")
        .expect("record");
    assert_eq!(record.name, "holiday");
    assert!(app
        .origin
        .commands
        .lock()
        .iter()
        .any(|c| c.first().map(String::as_str) == Some("mv")));
}

#[tokio::test]
async fn cache_status_and_clear_round_trip() {
    let app = test_app();
    let uri = format!("/videos/stream/{}", video_id());
    app.router
        .clone()
        .oneshot(request(&uri))
        .await
        .expect("response");

    let response = app
        .router
        .clone()
        .oneshot(request("/videos/cache/status"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let status: serde_json::Value =
        serde_json::from_slice(&body_bytes(response).await).expect("json");
    assert_eq!(status["total_files"], 1);
    assert_eq!(status["total_size"], VIDEO_BYTES.len() as u64);

    let req = Request::builder()
        .method("POST")
        .uri("/videos/cache/clear")
        .header("x-vodgate-user", "alice")
        .body(Body::empty())
        .expect("request");
    let response = app
        .router
        .clone()
        .oneshot(req)
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let cleared: serde_json::Value =
        serde_json::from_slice(&body_bytes(response).await).expect("json");
    assert_eq!(cleared["removed"], 1);

    // Clearing again finds nothing
    let req = Request::builder()
        .method("POST")
        .uri("/videos/cache/clear")
        .header("x-vodgate-user", "alice")
        .body(Body::empty())
        .expect("request");
    let response = app.router.oneshot(req).await.expect("response");
    let cleared: serde_json::Value =
        serde_json::from_slice(&body_bytes(response).await).expect("json");
    assert_eq!(cleared["removed"], 0);
}

#[tokio::test]
async fn content_passthrough_streams_from_origin() {
    let mock = wiremock::MockServer::start().await;
    wiremock::Mock::given(wiremock::matchers::method("GET"))
        .and(wiremock::matchers::path("/alice/clips/trip.mp4"))
        .respond_with(wiremock::ResponseTemplate::new(200).set_body_bytes(b"originbytes".to_vec()))
        .mount(&mock)
        .await;

    let address = *mock.address();
    let app = test_app_with(move |config| {
        config.origin.scheme = "http".to_string();
        config.origin.host = address.ip().to_string();
        config.origin.streaming_port = address.port();
        config.origin.content_port = address.port();
    });

    let response = app
        .router
        .oneshot(request("/content/alice/clips/trip.mp4"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, b"originbytes");
}
