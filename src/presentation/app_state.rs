// Application state for HTTP handlers
use crate::application::tracking_service::TrackingLifecycleManager;
use crate::infrastructure::ingest_provider::IngestLocationProvider;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub tracking: Arc<TrackingLifecycleManager>,
    pub provider: Arc<IngestLocationProvider>,
}
