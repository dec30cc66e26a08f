// Request parameter builder - maps caller configuration to provider parameters
use crate::domain::tracking::{
    AccuracyTier, DEFAULT_FASTEST_INTERVAL_SECONDS, DEFAULT_INTERVAL_SECONDS, Priority,
    ResolvedRequestParameters, TrackingConfiguration,
};
use serde::Deserialize;

/// How caller-supplied timing values are treated on resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterPolicy {
    /// Ignore the caller's timing values and apply the fixed defensive profile.
    #[default]
    Defensive,
    /// Honour the caller's timing values, flooring unset intervals to defaults.
    CallerSupplied,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct TimingProfile {
    interval_seconds: u32,
    fastest_interval_seconds: u32,
    max_wait_seconds: u32,
    smallest_displacement_meters: f32,
}

const DEFENSIVE_PROFILE: TimingProfile = TimingProfile {
    interval_seconds: DEFAULT_INTERVAL_SECONDS,
    fastest_interval_seconds: DEFAULT_FASTEST_INTERVAL_SECONDS,
    max_wait_seconds: 0,
    smallest_displacement_meters: 0.0,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct RequestParameterBuilder {
    policy: ParameterPolicy,
}

impl RequestParameterBuilder {
    pub fn new(policy: ParameterPolicy) -> Self {
        Self { policy }
    }

    /// Resolve a configuration into provider parameters.
    ///
    /// Deterministic; the only side effect is the audit trail written to the
    /// log for every value applied or skipped.
    pub fn resolve(&self, config: &TrackingConfiguration) -> ResolvedRequestParameters {
        let tier = accuracy_tier(config.priority.as_ref());
        tracing::info!("Config set by USER ==> Priority: {}", tier);

        let profile = match self.policy {
            ParameterPolicy::Defensive => DEFENSIVE_PROFILE,
            ParameterPolicy::CallerSupplied => TimingProfile {
                interval_seconds: floor_to_default(config.interval_seconds, DEFAULT_INTERVAL_SECONDS),
                fastest_interval_seconds: floor_to_default(
                    config.fastest_interval_seconds,
                    DEFAULT_FASTEST_INTERVAL_SECONDS,
                ),
                max_wait_seconds: config.max_wait_seconds,
                smallest_displacement_meters: config.smallest_displacement_meters,
            },
        };

        let smallest_displacement_meters = positive_meters(profile.smallest_displacement_meters);
        log_field("SmallestDisplacement", smallest_displacement_meters);

        let max_wait_ms = positive_millis(profile.max_wait_seconds);
        log_field("MaxWaitTime", max_wait_ms);

        let interval_ms = positive_millis(profile.interval_seconds);
        log_field("Interval", interval_ms);

        let fastest_interval_ms = positive_millis(profile.fastest_interval_seconds);
        log_field("FastestInterval", fastest_interval_ms);

        let parameters = ResolvedRequestParameters {
            tier,
            interval_ms,
            fastest_interval_ms,
            max_wait_ms,
            smallest_displacement_meters,
        };

        tracing::info!(policy = ?self.policy, "Config set by SYSTEM ==> {}", parameters);
        parameters
    }
}

/// Map a requested priority to an accuracy tier. Unknown or unset
/// priorities fall back to high accuracy.
pub fn accuracy_tier(priority: Option<&Priority>) -> AccuracyTier {
    match priority {
        Some(Priority::High) => AccuracyTier::HighAccuracy,
        Some(Priority::Medium) => AccuracyTier::BalancedPowerAccuracy,
        Some(Priority::Low) => AccuracyTier::LowPower,
        Some(Priority::NoPower) => AccuracyTier::NoPower,
        Some(Priority::Unrecognized(raw)) => {
            tracing::warn!(
                "Invalid configuration: unrecognized priority '{}', using {}",
                raw,
                AccuracyTier::HighAccuracy
            );
            AccuracyTier::HighAccuracy
        }
        None => AccuracyTier::HighAccuracy,
    }
}

fn floor_to_default(seconds: u32, default: u32) -> u32 {
    if seconds == 0 { default } else { seconds }
}

fn positive_millis(seconds: u32) -> Option<u64> {
    (seconds > 0).then(|| u64::from(seconds) * 1000)
}

fn positive_meters(meters: f32) -> Option<f32> {
    (meters.is_finite() && meters > 0.0).then_some(meters)
}

fn log_field<T: std::fmt::Display>(name: &str, value: Option<T>) {
    match value {
        Some(v) => tracing::info!("Config set by USER ==> {}: {}", name, v),
        None => tracing::info!("Config set by USER ==> {}: skipped", name),
    }
}
