// Location sample and telemetry record domain models
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Mean Earth radius in metres (IUGG).
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// A single position fix as delivered by the location provider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLocationSample {
    pub latitude: f64,
    pub longitude: f64,
    /// Horizontal accuracy radius in metres.
    pub accuracy: f32,
    /// Capture time, milliseconds since the Unix epoch.
    pub timestamp_ms: i64,
}

impl RawLocationSample {
    pub fn new(latitude: f64, longitude: f64, accuracy: f32, timestamp_ms: i64) -> Self {
        Self {
            latitude,
            longitude,
            accuracy,
            timestamp_ms,
        }
    }

    pub fn has_valid_coordinates(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    /// Great-circle distance to another sample, in metres.
    pub fn distance_to(&self, other: &RawLocationSample) -> f64 {
        great_circle_distance(
            (self.latitude, self.longitude),
            (other.latitude, other.longitude),
        )
    }

    /// Capture time converted to the local timezone, if representable.
    pub fn reported_time(&self) -> Option<DateTime<Local>> {
        DateTime::from_timestamp_millis(self.timestamp_ms).map(|utc| utc.with_timezone(&Local))
    }
}

/// Normalized, delta-augmented observation forwarded to the collector.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryRecord {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: f32,
    pub distance_from_previous: f64,
    pub elapsed_seconds_from_previous: i64,
    pub device_reported_time: DateTime<Local>,
}

/// Great-circle distance between two (latitude, longitude) positions in
/// degrees, using the haversine formula. Returns metres.
pub fn great_circle_distance(from: (f64, f64), to: (f64, f64)) -> f64 {
    let (lat1, lon1) = from;
    let (lat2, lon2) = to;

    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().min(1.0).asin();

    EARTH_RADIUS_M * c
}
