// Hand-written fakes for the pipeline's collaborator traits
use crate::application::errors::{ProviderError, PushError};
use crate::application::location_ports::{
    AvailabilityGate, BatchCallback, LocationProvider, LocationPusher, ProviderEvent,
    SubscriptionHandle,
};
use crate::domain::location::RawLocationSample;
use crate::domain::tracking::ResolvedRequestParameters;
use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::broadcast;

/// Records every push; fails pushes whose latitude matches `fail_latitude`.
#[derive(Default)]
pub struct RecordingPusher {
    pub pushed: Mutex<Vec<(f64, f64)>>,
    pub fail_latitude: Option<f64>,
}

impl RecordingPusher {
    pub fn failing_at(latitude: f64) -> Self {
        Self {
            pushed: Mutex::new(Vec::new()),
            fail_latitude: Some(latitude),
        }
    }

    pub fn pushed(&self) -> Vec<(f64, f64)> {
        self.pushed.lock().unwrap().clone()
    }
}

#[async_trait]
impl LocationPusher for RecordingPusher {
    async fn push(&self, latitude: f64, longitude: f64) -> Result<(), PushError> {
        if self.fail_latitude == Some(latitude) {
            return Err(PushError::Transport("connection reset".to_string()));
        }
        self.pushed.lock().unwrap().push((latitude, longitude));
        Ok(())
    }
}

/// Pusher whose pushes never complete. Counts how many were started.
#[derive(Default)]
pub struct StalledPusher {
    pub started: AtomicUsize,
}

#[async_trait]
impl LocationPusher for StalledPusher {
    async fn push(&self, _latitude: f64, _longitude: f64) -> Result<(), PushError> {
        self.started.fetch_add(1, Ordering::SeqCst);
        std::future::pending::<()>().await;
        Ok(())
    }
}

pub struct FakeGate {
    pub available: AtomicBool,
    pub checks: AtomicUsize,
}

impl FakeGate {
    pub fn new(available: bool) -> Self {
        Self {
            available: AtomicBool::new(available),
            checks: AtomicUsize::new(0),
        }
    }
}

impl AvailabilityGate for FakeGate {
    fn is_available(&self) -> bool {
        self.checks.fetch_add(1, Ordering::SeqCst);
        self.available.load(Ordering::SeqCst)
    }

    fn unavailable_code(&self) -> Option<i32> {
        (!self.available.load(Ordering::SeqCst)).then_some(2)
    }

    fn is_user_resolvable(&self, code: i32) -> bool {
        code == 2
    }

    fn describe_error(&self, _code: i32) -> String {
        "update required".to_string()
    }
}

/// Provider that keeps the latest subscription so tests can deliver batches.
pub struct FakeProvider {
    pub subscribes: AtomicUsize,
    pub unsubscribes: AtomicUsize,
    pub callback: Mutex<Option<BatchCallback>>,
    pub parameters: Mutex<Option<ResolvedRequestParameters>>,
    events: broadcast::Sender<ProviderEvent>,
}

impl FakeProvider {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(8);
        Self {
            subscribes: AtomicUsize::new(0),
            unsubscribes: AtomicUsize::new(0),
            callback: Mutex::new(None),
            parameters: Mutex::new(None),
            events,
        }
    }

    pub fn subscribe_count(&self) -> usize {
        self.subscribes.load(Ordering::SeqCst)
    }

    pub fn unsubscribe_count(&self) -> usize {
        self.unsubscribes.load(Ordering::SeqCst)
    }

    /// Deliver a batch to the registered callback, if any.
    pub fn deliver(&self, batch: Vec<RawLocationSample>) -> bool {
        let callback = self.callback.lock().unwrap().clone();
        match callback {
            Some(callback) => {
                callback(batch);
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl LocationProvider for FakeProvider {
    async fn subscribe(
        &self,
        parameters: ResolvedRequestParameters,
        on_batch: BatchCallback,
    ) -> Result<SubscriptionHandle, ProviderError> {
        let id = self.subscribes.fetch_add(1, Ordering::SeqCst) as u64 + 1;
        *self.callback.lock().unwrap() = Some(on_batch);
        *self.parameters.lock().unwrap() = Some(parameters);
        let _ = self.events.send(ProviderEvent::Connected);
        Ok(SubscriptionHandle(id))
    }

    async fn unsubscribe(&self, _handle: SubscriptionHandle) -> Result<(), ProviderError> {
        self.unsubscribes.fetch_add(1, Ordering::SeqCst);
        *self.callback.lock().unwrap() = None;
        Ok(())
    }

    fn events(&self) -> broadcast::Receiver<ProviderEvent> {
        self.events.subscribe()
    }
}

pub fn sample(latitude: f64, longitude: f64, timestamp_ms: i64) -> RawLocationSample {
    RawLocationSample::new(latitude, longitude, 5.0, timestamp_ms)
}
