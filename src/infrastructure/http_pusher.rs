// Collector client - pushes locations to the remote collector over HTTP
use crate::application::errors::PushError;
use crate::application::location_ports::LocationPusher;
use crate::infrastructure::config::CollectorSettings;
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct LocationPayload {
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Clone)]
pub struct HttpLocationPusher {
    client: reqwest::Client,
    endpoint: String,
    token: Option<String>,
}

impl HttpLocationPusher {
    pub fn new(settings: &CollectorSettings) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = settings.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            client: builder.build()?,
            endpoint: settings.endpoint.trim_end_matches('/').to_string(),
            token: settings.token.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl LocationPusher for HttpLocationPusher {
    async fn push(&self, latitude: f64, longitude: f64) -> Result<(), PushError> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .header("Accept", "application/json")
            .json(&LocationPayload {
                latitude,
                longitude,
            });
        if let Some(token) = &self.token {
            request = request.header("Authorization", format!("Token {}", token));
        }

        let response = request
            .send()
            .await
            .map_err(|e| PushError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(PushError::Status { status, body });
        }

        Ok(())
    }
}
