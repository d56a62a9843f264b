//! offer-gateway entry point

use anyhow::{Context, Result};
use offer_gateway::{
    cache::MemoryCache,
    config,
    images::ImageUrls,
    monitor::AdmissionMonitor,
    network::HttpClient,
    providers::ProviderLoader,
    search::{Aggregator, OfferService},
    web::{create_router, AppState},
    workers::WorkerPool,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    info!("Starting offer-gateway v{}", offer_gateway::VERSION);

    let settings = Arc::new(config::load()?);
    info!("Loaded configuration for instance: {}", settings.general.instance_name);

    let client = HttpClient::with_settings(&settings.outgoing)?;
    let images = ImageUrls::new(settings.images.clone());

    let registry = ProviderLoader::load(&settings, &client, &images)?;
    info!("Loaded {} providers", registry.len());

    let monitor = AdmissionMonitor::from_settings(&settings);
    info!("Admission monitor gates {} upstreams", monitor.len());
    let pool = Arc::new(WorkerPool::new(settings.pool.effective_workers()));
    info!("Started {} workers", pool.size());

    let timeout = Duration::try_from_secs_f64(settings.outgoing.request_timeout)
        .context("outgoing.request_timeout must be a non-negative number of seconds")?;
    let engine = Aggregator::new(Arc::new(registry), Arc::new(monitor), pool.clone())
        .with_timeout(timeout)
        .with_capacity(settings.search.offer_list_capacity);

    let cache = Arc::new(MemoryCache::new(settings.cache.max_capacity));
    let service = OfferService::new(Arc::new(engine), cache, &settings.cache);

    let app = create_router(AppState::new(settings.clone(), Arc::new(service)));

    let addr = SocketAddr::new(settings.server.bind_address.parse()?, settings.server.port);
    info!("Starting server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.stop().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
