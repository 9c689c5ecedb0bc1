// Module: http
// HTTP/JSON REST API for the video gateway

pub mod cache_admin;
pub mod content;
pub mod error;
pub mod health;
pub mod middleware;
pub mod videos;

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use vodgate_core::cache::DiskCache;
use vodgate_core::catalog::{CatalogLister, MediaProber};
use vodgate_core::remote::RemoteExecutor;
use vodgate_core::store::CatalogStore;
use vodgate_core::transfer::Downloader;
use vodgate_core::Config;
use vodgate_proxy::OriginGateway;

pub use error::{AppError, AppResult};
pub use middleware::CallerIdentity;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub executor: Arc<dyn RemoteExecutor>,
    pub lister: Arc<CatalogLister>,
    pub prober: Arc<MediaProber>,
    pub cache: Arc<DiskCache>,
    pub downloader: Arc<Downloader>,
    pub store: Arc<dyn CatalogStore>,
    pub gateway: Arc<OriginGateway>,
}

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        // Catalog and streaming
        .route("/videos", get(videos::list_videos))
        .route("/videos/stream/{id}", get(videos::stream_video))
        .route("/videos/info/{id}", get(videos::video_info))
        .route("/videos/{id}", delete(videos::delete_video))
        .route("/videos/{id}/rename", put(videos::rename_video))
        // Cache administration
        .route("/videos/cache/status", get(cache_admin::cache_status))
        .route("/videos/cache/clear", post(cache_admin::cache_clear))
        // Path-based passthrough
        .route("/content/{*path}", get(content::proxy_content))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
