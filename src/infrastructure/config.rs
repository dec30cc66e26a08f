use crate::application::request_parameters::ParameterPolicy;
use crate::domain::device::DeviceInfo;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct RelayConfig {
    #[serde(default)]
    pub server: ServerSettings,
    pub collector: CollectorSettings,
    #[serde(default)]
    pub provider: ProviderSettings,
    #[serde(default)]
    pub device: DeviceInfo,
    #[serde(default)]
    pub tracking: TrackingSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct CollectorSettings {
    pub endpoint: String,
    pub token: Option<String>,
    /// Per-request timeout. Unset means pushes may take as long as they take.
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProviderSettings {
    #[serde(default = "default_available")]
    pub available: bool,
    pub unavailable_code: Option<i32>,
    #[serde(default)]
    pub user_resolvable: bool,
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            available: default_available(),
            unavailable_code: None,
            user_resolvable: false,
            event_capacity: default_event_capacity(),
        }
    }
}

fn default_available() -> bool {
    true
}

fn default_event_capacity() -> usize {
    16
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct TrackingSettings {
    #[serde(default)]
    pub parameter_policy: ParameterPolicy,
}

pub fn load_relay_config() -> anyhow::Result<RelayConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/relay"))
        .build()?;

    Ok(settings.try_deserialize()?)
}

/// Parse relay settings from TOML text.
pub fn parse_relay_config(toml: &str) -> anyhow::Result<RelayConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::from_str(toml, config::FileFormat::Toml))
        .build()?;

    Ok(settings.try_deserialize()?)
}
