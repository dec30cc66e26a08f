// Tracking lifecycle - start/stop state machine around the provider subscription
use crate::application::errors::TrackingError;
use crate::application::location_ports::{
    AvailabilityGate, BatchCallback, LocationProvider, ProviderEvent, SubscriptionHandle,
};
use crate::application::request_parameters::RequestParameterBuilder;
use crate::application::sample_processor::SampleProcessor;
use crate::domain::device::DeviceInfo;
use crate::domain::location::RawLocationSample;
use crate::domain::tracking::{ResolvedRequestParameters, TrackingConfiguration};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{Mutex, broadcast};
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingState {
    Idle,
    Starting,
    Active,
    Stopping,
}

impl fmt::Display for TrackingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackingState::Idle => write!(f, "Idle"),
            TrackingState::Starting => write!(f, "Starting"),
            TrackingState::Active => write!(f, "Active"),
            TrackingState::Stopping => write!(f, "Stopping"),
        }
    }
}

/// Point-in-time view of the tracking session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingStatus {
    pub state: TrackingState,
    pub updates_started: bool,
    pub subscription: Option<SubscriptionHandle>,
    pub parameters: Option<ResolvedRequestParameters>,
    pub configuration: Option<TrackingConfiguration>,
}

struct Lifecycle {
    state: TrackingState,
    configuration: Option<TrackingConfiguration>,
    parameters: Option<ResolvedRequestParameters>,
    on_batch: Option<BatchCallback>,
    updates_started: bool,
    subscription: Option<SubscriptionHandle>,
    event_listener: Option<JoinHandle<()>>,
}

impl Lifecycle {
    fn idle() -> Self {
        Self {
            state: TrackingState::Idle,
            configuration: None,
            parameters: None,
            on_batch: None,
            updates_started: false,
            subscription: None,
            event_listener: None,
        }
    }

    fn status(&self) -> TrackingStatus {
        TrackingStatus {
            state: self.state,
            updates_started: self.updates_started,
            subscription: self.subscription,
            parameters: self.parameters,
            configuration: self.configuration.clone(),
        }
    }

    fn transition(&mut self, trigger: &str, next: TrackingState) {
        tracing::info!(
            trigger,
            from = %self.state,
            to = %next,
            "Tracking state transition"
        );
        self.state = next;
    }
}

/// Owns the single tracking session for this process.
pub struct TrackingLifecycleManager {
    gate: Arc<dyn AvailabilityGate>,
    provider: Arc<dyn LocationProvider>,
    processor: Arc<SampleProcessor>,
    builder: RequestParameterBuilder,
    device: DeviceInfo,
    lifecycle: Mutex<Lifecycle>,
}

impl TrackingLifecycleManager {
    pub fn new(
        gate: Arc<dyn AvailabilityGate>,
        provider: Arc<dyn LocationProvider>,
        processor: Arc<SampleProcessor>,
        builder: RequestParameterBuilder,
        device: DeviceInfo,
    ) -> Self {
        Self {
            gate,
            provider,
            processor,
            builder,
            device,
            lifecycle: Mutex::new(Lifecycle::idle()),
        }
    }

    pub async fn status(&self) -> TrackingStatus {
        self.lifecycle.lock().await.status()
    }

    /// Start a tracking session.
    ///
    /// A no-op while a session is starting or active. Fails only when the
    /// location capability is unavailable, in which case nothing is resolved
    /// or subscribed and the caller has to invoke `start` again.
    pub async fn start(
        &self,
        config: TrackingConfiguration,
    ) -> Result<TrackingStatus, TrackingError> {
        let mut lifecycle = self.lifecycle.lock().await;
        if lifecycle.state != TrackingState::Idle {
            tracing::info!("Start ignored, session already {}", lifecycle.state);
            return Ok(lifecycle.status());
        }

        if !self.gate.is_available() {
            let code = self.gate.unavailable_code();
            let description = code
                .filter(|c| self.gate.is_user_resolvable(*c))
                .map(|c| self.gate.describe_error(c));
            tracing::error!(
                "There is a problem with the location capability on this device: {:?} - {:?}",
                code,
                description
            );
            lifecycle.transition("capability_unavailable", TrackingState::Idle);
            return Err(TrackingError::CapabilityUnavailable { code, description });
        }
        tracing::info!("Location capability is available on this device");

        lifecycle.transition("start", TrackingState::Starting);

        if lifecycle.parameters.is_none() {
            tracing::info!("DEVICEINFO==> {}", self.device);
            lifecycle.parameters = Some(self.builder.resolve(&config));
        }
        lifecycle.configuration = Some(config);

        let session = self.processor.begin_session();
        let processor = self.processor.clone();
        let on_batch: BatchCallback = Arc::new(move |batch: Vec<RawLocationSample>| {
            processor.on_batch(session, &batch);
        });
        lifecycle.on_batch = Some(on_batch);

        lifecycle.event_listener = Some(spawn_event_listener(self.provider.events()));

        lifecycle.transition("provider_bound", TrackingState::Active);
        Ok(lifecycle.status())
    }

    /// Subscribe the sample processor to the provider. Idempotent: once
    /// updates have been requested in a session this returns immediately.
    pub async fn request_updates(&self) -> Result<TrackingStatus, TrackingError> {
        let mut lifecycle = self.lifecycle.lock().await;
        if !matches!(
            lifecycle.state,
            TrackingState::Starting | TrackingState::Active
        ) {
            tracing::warn!("Request updates rejected in state {}", lifecycle.state);
            return Err(TrackingError::NotStarted);
        }

        if lifecycle.updates_started {
            tracing::info!("Location updates already started");
            return Ok(lifecycle.status());
        }

        let (Some(parameters), Some(on_batch)) = (lifecycle.parameters, lifecycle.on_batch.clone())
        else {
            return Err(TrackingError::NotStarted);
        };

        let handle = self.provider.subscribe(parameters, on_batch).await?;
        lifecycle.subscription = Some(handle);
        lifecycle.updates_started = true;
        tracing::info!(subscription = handle.0, "Location updates requested");

        Ok(lifecycle.status())
    }

    /// Unsubscribe from the provider. Leaves the cached parameters and the
    /// updates-started flag as they are; only `stop` clears those.
    pub async fn remove_updates(&self) -> Result<TrackingStatus, TrackingError> {
        let mut lifecycle = self.lifecycle.lock().await;
        if lifecycle.state != TrackingState::Active {
            tracing::warn!("Remove updates rejected in state {}", lifecycle.state);
            return Err(TrackingError::NotStarted);
        }

        match lifecycle.subscription.take() {
            Some(handle) => {
                if let Err(e) = self.provider.unsubscribe(handle).await {
                    lifecycle.subscription = Some(handle);
                    return Err(e.into());
                }
                tracing::info!(subscription = handle.0, "Location updates removed");
            }
            None => tracing::info!("No location subscription to remove"),
        }

        Ok(lifecycle.status())
    }

    /// Tear the session down. Safe to call when idle.
    pub async fn stop(&self) -> TrackingStatus {
        let mut lifecycle = self.lifecycle.lock().await;
        if lifecycle.state == TrackingState::Idle {
            tracing::info!("Stop ignored, no active session");
            return lifecycle.status();
        }

        lifecycle.transition("stop", TrackingState::Stopping);

        if let Some(handle) = lifecycle.subscription.take() {
            if let Err(e) = self.provider.unsubscribe(handle).await {
                tracing::error!(
                    subscription = handle.0,
                    "Failed to unsubscribe while stopping: {}",
                    e
                );
            }
        }
        if let Some(listener) = lifecycle.event_listener.take() {
            listener.abort();
        }
        self.processor.end_session();

        *lifecycle = Lifecycle {
            state: TrackingState::Stopping,
            ..Lifecycle::idle()
        };
        lifecycle.transition("stopped", TrackingState::Idle);
        lifecycle.status()
    }
}

fn spawn_event_listener(mut events: broadcast::Receiver<ProviderEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(ProviderEvent::Connected) => {
                    tracing::info!("Location provider connected");
                }
                Ok(ProviderEvent::LocationAvailability(available)) => {
                    tracing::info!("IsLocationAvailable: {}", available);
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::debug!("Location provider event channel closed");
                    break;
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Location provider event listener lagged");
                }
            }
        }
    })
}
