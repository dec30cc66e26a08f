// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod infrastructure;
mod presentation;

use axum::{
    Router,
    routing::{get, post, put},
};
use std::{net::SocketAddr, sync::Arc};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::application::request_parameters::RequestParameterBuilder;
use crate::application::sample_processor::SampleProcessor;
use crate::application::tracking_service::TrackingLifecycleManager;
use crate::infrastructure::config::load_relay_config;
use crate::infrastructure::configured_availability::ConfiguredAvailabilityGate;
use crate::infrastructure::http_pusher::HttpLocationPusher;
use crate::infrastructure::ingest_provider::IngestLocationProvider;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    health_check, ingest_samples, remove_updates, request_updates, start_tracking, stop_tracking,
    tracking_status, update_availability,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let config = load_relay_config()?;

    // Create adapters (infrastructure layer)
    let pusher = Arc::new(HttpLocationPusher::new(&config.collector)?);
    tracing::info!("Pushing locations to {}", pusher.endpoint());
    let provider = Arc::new(IngestLocationProvider::new(config.provider.event_capacity));
    let gate = Arc::new(ConfiguredAvailabilityGate::new(&config.provider));

    // Create services (application layer)
    let processor = Arc::new(SampleProcessor::new(pusher));
    let tracking = Arc::new(TrackingLifecycleManager::new(
        gate,
        provider.clone(),
        processor,
        RequestParameterBuilder::new(config.tracking.parameter_policy),
        config.device.clone(),
    ));

    // Create application state
    let state = Arc::new(AppState { tracking, provider });

    // Build router (presentation layer)
    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/tracking", get(tracking_status))
        .route("/tracking/start", post(start_tracking))
        .route("/tracking/stop", post(stop_tracking))
        .route("/tracking/updates", post(request_updates).delete(remove_updates))
        .route("/samples", post(ingest_samples))
        .route("/provider/availability", put(update_availability))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr: SocketAddr = config.server.bind_addr.parse()?;
    tracing::info!("Starting location-relay service on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}
