// Tracking configuration domain models
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_INTERVAL_SECONDS: u32 = 20;
pub const DEFAULT_FASTEST_INTERVAL_SECONDS: u32 = 10;

/// Requested power/precision trade-off, as supplied by the caller.
///
/// Deserializes from the raw strings callers send. Values outside the known
/// set are kept verbatim so the builder can log them before falling back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Priority {
    High,
    Medium,
    Low,
    NoPower,
    Unrecognized(String),
}

impl From<String> for Priority {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "HIGH" => Priority::High,
            "MEDIUM" => Priority::Medium,
            "LOW" => Priority::Low,
            "NOPOWER" | "NO_POWER" => Priority::NoPower,
            _ => Priority::Unrecognized(raw),
        }
    }
}

impl From<&str> for Priority {
    fn from(raw: &str) -> Self {
        Priority::from(raw.to_string())
    }
}

impl From<Priority> for String {
    fn from(priority: Priority) -> Self {
        priority.to_string()
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::High => write!(f, "HIGH"),
            Priority::Medium => write!(f, "MEDIUM"),
            Priority::Low => write!(f, "LOW"),
            Priority::NoPower => write!(f, "NOPOWER"),
            Priority::Unrecognized(raw) => write!(f, "{}", raw),
        }
    }
}

/// Coarse accuracy setting handed to the location provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccuracyTier {
    #[default]
    HighAccuracy,
    BalancedPowerAccuracy,
    LowPower,
    NoPower,
}

impl fmt::Display for AccuracyTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccuracyTier::HighAccuracy => write!(f, "high-accuracy"),
            AccuracyTier::BalancedPowerAccuracy => write!(f, "balanced-power-accuracy"),
            AccuracyTier::LowPower => write!(f, "low-power"),
            AccuracyTier::NoPower => write!(f, "no-power"),
        }
    }
}

/// Caller-supplied tracking settings. Unset fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrackingConfiguration {
    pub priority: Option<Priority>,
    pub smallest_displacement_meters: f32,
    pub max_wait_seconds: u32,
    pub interval_seconds: u32,
    pub fastest_interval_seconds: u32,
}

impl Default for TrackingConfiguration {
    fn default() -> Self {
        Self {
            priority: None,
            smallest_displacement_meters: 0.0,
            max_wait_seconds: 0,
            interval_seconds: DEFAULT_INTERVAL_SECONDS,
            fastest_interval_seconds: DEFAULT_FASTEST_INTERVAL_SECONDS,
        }
    }
}

impl TrackingConfiguration {
    pub fn with_priority(priority: impl Into<Priority>) -> Self {
        Self {
            priority: Some(priority.into()),
            ..Self::default()
        }
    }
}

/// Provider request derived from a [`TrackingConfiguration`].
///
/// `None` means the field is omitted from the provider request entirely,
/// which is what happens to every value that resolved to zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedRequestParameters {
    pub tier: AccuracyTier,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fastest_interval_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_wait_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smallest_displacement_meters: Option<f32>,
}

impl fmt::Display for ResolvedRequestParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn field<T: fmt::Display>(value: Option<T>) -> String {
            value.map(|v| v.to_string()).unwrap_or_else(|| "unset".to_string())
        }

        write!(
            f,
            "Priority: {}; SmallestDisplacement: {}; MaxWaitTime: {}; Interval: {}; FastestInterval: {}",
            self.tier,
            field(self.smallest_displacement_meters),
            field(self.max_wait_ms),
            field(self.interval_ms),
            field(self.fastest_interval_ms),
        )
    }
}
