// Error taxonomy for the location-update pipeline
use thiserror::Error;

/// Errors surfaced by the tracking lifecycle operations.
#[derive(Debug, Error)]
pub enum TrackingError {
    /// The platform location capability cannot be used. Never retried.
    #[error("location capability unavailable (code: {code:?}, reason: {description:?})")]
    CapabilityUnavailable {
        code: Option<i32>,
        description: Option<String>,
    },

    #[error("tracking session is not started")]
    NotStarted,

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("unknown subscription {0}")]
    UnknownSubscription(u64),
}

/// Forwarding a single telemetry record to the collector failed.
#[derive(Debug, Error)]
pub enum PushError {
    #[error("collector request failed: {0}")]
    Transport(String),

    #[error("collector responded with status {status}: {body}")]
    Status { status: u16, body: String },
}

/// A sample could not be turned into a telemetry record. Aborts the rest
/// of its batch.
#[derive(Debug, Error, PartialEq)]
pub enum ProcessingError {
    #[error("sample {index} has invalid coordinates ({latitude}, {longitude})")]
    InvalidCoordinates {
        index: usize,
        latitude: f64,
        longitude: f64,
    },

    #[error("sample {index} has an unrepresentable timestamp {timestamp_ms}")]
    UnrepresentableTimestamp { index: usize, timestamp_ms: i64 },
}
