//! Service wiring and lifecycle

use anyhow::Result;
use std::sync::Arc;
use tracing::{error, info};

use vodgate_api::{create_router, AppState};
use vodgate_core::cache::DiskCache;
use vodgate_core::catalog::{CatalogLister, MediaProber};
use vodgate_core::remote::{RemoteExecutor, SshExecutor};
use vodgate_core::store::MemoryCatalogStore;
use vodgate_core::transfer::Downloader;
use vodgate_core::Config;
use vodgate_proxy::OriginGateway;

pub async fn run(config: Config) -> Result<()> {
    let config = Arc::new(config);

    let executor: Arc<dyn RemoteExecutor> =
        Arc::new(SshExecutor::new(config.remote.clone())?);
    let cache = Arc::new(DiskCache::new(&config.cache)?);
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
    let gateway = Arc::new(OriginGateway::new(&config.origin)?);

    spawn_sweep_loop(cache.clone(), config.cache.sweep_interval_secs);

    let state = AppState {
        config: config.clone(),
        executor,
        lister,
        prober,
        cache,
        downloader,
        store,
        gateway,
    };

    let router = create_router(state);
    let address = config.http_address();
    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!(%address, "vodgate listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("vodgate stopped");
    Ok(())
}

/// Periodic TTL eviction, independent of request handling.
fn spawn_sweep_loop(cache: Arc<DiskCache>, interval_secs: u64) {
    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(std::time::Duration::from_secs(interval_secs.max(1)));
        // The immediate first tick would sweep at startup; skip it
        interval.tick().await;
        loop {
            interval.tick().await;
            match tokio::task::spawn_blocking({
                let cache = cache.clone();
                move || cache.sweep()
            })
            .await
            {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => error!(error = %e, "cache sweep failed"),
                Err(e) => error!(error = %e, "cache sweep task panicked"),
            }
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
    }
    info!("shutdown signal received");
}
