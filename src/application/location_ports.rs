// Traits for the collaborators the tracking pipeline consumes
use crate::application::errors::{ProviderError, PushError};
use crate::domain::location::RawLocationSample;
use crate::domain::tracking::ResolvedRequestParameters;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Invoked by the provider with each ordered batch of samples.
pub type BatchCallback = Arc<dyn Fn(Vec<RawLocationSample>) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SubscriptionHandle(pub u64);

/// Notifications published by the provider outside the sample stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderEvent {
    Connected,
    LocationAvailability(bool),
}

#[async_trait]
pub trait LocationProvider: Send + Sync {
    /// Start delivering sample batches to `on_batch` using `parameters`.
    async fn subscribe(
        &self,
        parameters: ResolvedRequestParameters,
        on_batch: BatchCallback,
    ) -> Result<SubscriptionHandle, ProviderError>;

    async fn unsubscribe(&self, handle: SubscriptionHandle) -> Result<(), ProviderError>;

    /// Subscribe to connection and availability notifications.
    fn events(&self) -> broadcast::Receiver<ProviderEvent>;
}

/// Reports whether the platform location capability is usable.
pub trait AvailabilityGate: Send + Sync {
    fn is_available(&self) -> bool;

    /// Platform error code behind the last unavailable answer, if any.
    fn unavailable_code(&self) -> Option<i32> {
        None
    }

    fn is_user_resolvable(&self, _code: i32) -> bool {
        false
    }

    fn describe_error(&self, code: i32) -> String {
        format!("error code {}", code)
    }
}

#[async_trait]
pub trait LocationPusher: Send + Sync {
    async fn push(&self, latitude: f64, longitude: f64) -> Result<(), PushError>;
}
