// In-process location provider fed by sample batches posted to the relay
use crate::application::errors::ProviderError;
use crate::application::location_ports::{
    BatchCallback, LocationProvider, ProviderEvent, SubscriptionHandle,
};
use crate::domain::location::RawLocationSample;
use crate::domain::tracking::ResolvedRequestParameters;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;

struct Subscription {
    parameters: ResolvedRequestParameters,
    on_batch: BatchCallback,
}

/// Fans each ingested batch out to every active subscription.
///
/// Parameters are recorded per subscription but not enforced; pacing and
/// filtering are the device's job before it posts samples.
pub struct IngestLocationProvider {
    subscriptions: RwLock<HashMap<u64, Subscription>>,
    next_id: AtomicU64,
    events: broadcast::Sender<ProviderEvent>,
}

impl IngestLocationProvider {
    pub fn new(event_capacity: usize) -> Self {
        let (events, _) = broadcast::channel(event_capacity.max(1));
        Self {
            subscriptions: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            events,
        }
    }

    /// Deliver a batch to all subscriptions. Returns how many received it.
    pub fn ingest(&self, batch: Vec<RawLocationSample>) -> usize {
        // Callbacks run outside the lock so they may re-enter the provider.
        let callbacks: Vec<BatchCallback> = self
            .subscriptions
            .read()
            .unwrap()
            .values()
            .map(|s| s.on_batch.clone())
            .collect();

        if callbacks.is_empty() {
            tracing::debug!(
                samples = batch.len(),
                "Ingested batch has no subscribers, discarding"
            );
            return 0;
        }

        for callback in &callbacks {
            callback(batch.clone());
        }
        callbacks.len()
    }

    /// Publish a location availability change to event listeners.
    pub fn report_availability(&self, available: bool) {
        let _ = self.events.send(ProviderEvent::LocationAvailability(available));
    }

    pub fn active_parameters(&self) -> Vec<ResolvedRequestParameters> {
        self.subscriptions
            .read()
            .unwrap()
            .values()
            .map(|s| s.parameters)
            .collect()
    }
}

#[async_trait]
impl LocationProvider for IngestLocationProvider {
    async fn subscribe(
        &self,
        parameters: ResolvedRequestParameters,
        on_batch: BatchCallback,
    ) -> Result<SubscriptionHandle, ProviderError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let first = {
            let mut subscriptions = self.subscriptions.write().unwrap();
            subscriptions.insert(
                id,
                Subscription {
                    parameters,
                    on_batch,
                },
            );
            subscriptions.len() == 1
        };

        tracing::info!(subscription = id, "Registered location subscription: {}", parameters);
        if first {
            let _ = self.events.send(ProviderEvent::Connected);
        }
        Ok(SubscriptionHandle(id))
    }

    async fn unsubscribe(&self, handle: SubscriptionHandle) -> Result<(), ProviderError> {
        let removed = self.subscriptions.write().unwrap().remove(&handle.0);
        match removed {
            Some(_) => {
                tracing::info!(subscription = handle.0, "Removed location subscription");
                Ok(())
            }
            None => Err(ProviderError::UnknownSubscription(handle.0)),
        }
    }

    fn events(&self) -> broadcast::Receiver<ProviderEvent> {
        self.events.subscribe()
    }
}
