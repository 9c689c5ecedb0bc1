// Origin gateway integration tests against a mock origin server

use axum::http::HeaderMap;
use http_body_util::BodyExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use vodgate_core::config::OriginConfig;
use vodgate_proxy::OriginGateway;

fn origin_config(mock: &MockServer) -> OriginConfig {
    let address = mock.address();
    OriginConfig {
        scheme: "http".to_string(),
        host: address.ip().to_string(),
        streaming_port: address.port(),
        content_port: address.port(),
        username: "svc".to_string(),
        password: "secret".to_string(),
        streaming_timeout_secs: 5,
        content_timeout_secs: 10,
    }
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("collect body")
        .to_bytes();
    String::from_utf8_lossy(&bytes).into_owned()
}

#[tokio::test]
async fn streams_successful_upstream_response() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/alice/clips/trip.mp4"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(b"mp4bytes".to_vec())
                .insert_header("content-type", "video/mp4"),
        )
        .mount(&mock)
        .await;

    let gateway = OriginGateway::new(&origin_config(&mock)).expect("gateway");
    let response = gateway
        .forward("alice/clips/trip.mp4", &HeaderMap::new())
        .await;

    assert_eq!(response.status(), 200);
    assert_eq!(
        response
            .headers()
            .get("cache-control")
            .and_then(|v| v.to_str().ok()),
        Some("public, max-age=3600")
    );
    assert_eq!(body_string(response).await, "mp4bytes");
}

#[tokio::test]
async fn forwards_range_header_to_origin() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/alice/clips/trip.mp4"))
        .and(wiremock::matchers::header("range", "bytes=0-99"))
        .respond_with(ResponseTemplate::new(206).set_body_bytes(vec![0u8; 100]))
        .mount(&mock)
        .await;

    let gateway = OriginGateway::new(&origin_config(&mock)).expect("gateway");
    let mut headers = HeaderMap::new();
    headers.insert("range", "bytes=0-99".parse().expect("header"));

    let response = gateway.forward("alice/clips/trip.mp4", &headers).await;
    assert_eq!(response.status(), 206);
}

#[tokio::test]
async fn streaming_class_gets_no_cache_headers() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/live/stream.m3u8"))
        .respond_with(ResponseTemplate::new(200).set_body_string("#EXTM3U"))
        .mount(&mock)
        .await;

    let gateway = OriginGateway::new(&origin_config(&mock)).expect("gateway");
    let response = gateway.forward("live/stream.m3u8", &HeaderMap::new()).await;

    assert_eq!(response.status(), 200);
    assert_eq!(
        response
            .headers()
            .get("cache-control")
            .and_then(|v| v.to_str().ok()),
        Some("no-cache")
    );
}

#[tokio::test]
async fn rejected_credentials_are_retried_exactly_once() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/alice/clips/locked.mp4"))
        .respond_with(ResponseTemplate::new(403))
        .expect(2) // initial attempt plus one header-auth retry
        .mount(&mock)
        .await;

    let gateway = OriginGateway::new(&origin_config(&mock)).expect("gateway");
    let response = gateway
        .forward("alice/clips/locked.mp4", &HeaderMap::new())
        .await;

    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn upstream_failure_maps_to_sanitized_404() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/alice/clips/gone.mp4"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock)
        .await;

    let gateway = OriginGateway::new(&origin_config(&mock)).expect("gateway");
    let response = gateway
        .forward("alice/clips/gone.mp4", &HeaderMap::new())
        .await;

    assert_eq!(response.status(), 404);
    let body = body_string(response).await;
    assert!(body.contains("alice/clips/gone.mp4"));
    assert!(body.contains("503"));
    // Credentials must never leak into diagnostics
    assert!(!body.contains("secret"));
    assert!(!body.contains("svc:"));
}

#[tokio::test]
async fn streaming_failures_are_not_retried() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/live/stream.m3u8"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&mock)
        .await;

    let gateway = OriginGateway::new(&origin_config(&mock)).expect("gateway");
    let response = gateway.forward("live/stream.m3u8", &HeaderMap::new()).await;
    assert_eq!(response.status(), 404);
}
