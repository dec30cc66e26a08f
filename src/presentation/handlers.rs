// HTTP request handlers
use crate::application::errors::TrackingError;
use crate::application::tracking_service::TrackingStatus;
use crate::domain::location::RawLocationSample;
use crate::domain::tracking::TrackingConfiguration;
use crate::presentation::app_state::AppState;
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

#[derive(Deserialize)]
pub struct AvailabilityUpdate {
    pub available: bool,
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

pub async fn tracking_status(State(state): State<Arc<AppState>>) -> Json<TrackingStatus> {
    Json(state.tracking.status().await)
}

pub async fn start_tracking(
    State(state): State<Arc<AppState>>,
    Json(config): Json<TrackingConfiguration>,
) -> Response {
    match state.tracking.start(config).await {
        Ok(status) => Json(status).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn stop_tracking(State(state): State<Arc<AppState>>) -> Json<TrackingStatus> {
    Json(state.tracking.stop().await)
}

pub async fn request_updates(State(state): State<Arc<AppState>>) -> Response {
    match state.tracking.request_updates().await {
        Ok(status) => Json(status).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn remove_updates(State(state): State<Arc<AppState>>) -> Response {
    match state.tracking.remove_updates().await {
        Ok(status) => Json(status).into_response(),
        Err(e) => error_response(e),
    }
}

/// Accept a batch of samples from the device and hand it to the provider
pub async fn ingest_samples(
    State(state): State<Arc<AppState>>,
    Json(batch): Json<Vec<RawLocationSample>>,
) -> impl IntoResponse {
    let delivered = state.provider.ingest(batch);
    (StatusCode::ACCEPTED, Json(json!({ "deliveredTo": delivered })))
}

pub async fn update_availability(
    State(state): State<Arc<AppState>>,
    Json(update): Json<AvailabilityUpdate>,
) -> StatusCode {
    state.provider.report_availability(update.available);
    StatusCode::NO_CONTENT
}

fn error_response(err: TrackingError) -> Response {
    let status = match &err {
        TrackingError::CapabilityUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        TrackingError::NotStarted => StatusCode::CONFLICT,
        TrackingError::Provider(_) => StatusCode::BAD_GATEWAY,
    };
    (status, Json(json!({ "error": err.to_string() }))).into_response()
}
