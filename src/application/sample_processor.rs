// Sample processor - turns raw provider batches into telemetry records
use crate::application::errors::ProcessingError;
use crate::application::location_ports::LocationPusher;
use crate::domain::location::{RawLocationSample, TelemetryRecord};
use chrono::Local;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;

/// Per-session delta state. Only ever touched under the processor's lock.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub is_started: bool,
    /// Bumped by every `begin_session` and kept across `end_session`.
    pub generation: u64,
    pub last_sample: Option<RawLocationSample>,
    pub last_timestamp: Option<i64>,
}

/// Outcome of one batch.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub records: Vec<TelemetryRecord>,
    pub failure: Option<ProcessingError>,
    /// Detached push tasks, one per record. Empty for `process`. Nothing
    /// waits on them in production; tests await them to observe pushes.
    pub pushes: Vec<JoinHandle<()>>,
}

pub struct SampleProcessor {
    state: Mutex<SessionState>,
    pusher: Arc<dyn LocationPusher>,
}

impl SampleProcessor {
    pub fn new(pusher: Arc<dyn LocationPusher>) -> Self {
        Self {
            state: Mutex::new(SessionState::default()),
            pusher,
        }
    }

    /// Open a new session with no previous sample and return its
    /// generation. Batches must carry this number to be accepted.
    pub fn begin_session(&self) -> u64 {
        let mut state = self.state.lock().unwrap();
        let generation = state.generation + 1;
        *state = SessionState {
            is_started: true,
            generation,
            ..SessionState::default()
        };
        generation
    }

    /// Close the session. Batches arriving afterwards are dropped.
    pub fn end_session(&self) {
        let mut state = self.state.lock().unwrap();
        *state = SessionState {
            generation: state.generation,
            ..SessionState::default()
        };
    }

    pub fn session_state(&self) -> SessionState {
        self.state.lock().unwrap().clone()
    }

    /// Compute telemetry records for a batch delivered to `session`,
    /// advancing the session state. Nothing is pushed.
    ///
    /// A processing failure stops the rest of the batch; the records
    /// produced before it are returned alongside the error.
    pub fn process(&self, session: u64, batch: &[RawLocationSample]) -> BatchReport {
        if batch.is_empty() {
            tracing::info!("LOCATIONSERVICE==> batch contained no samples");
            return BatchReport::default();
        }

        tracing::info!("Location Array Length: {}", batch.len());

        let mut records = Vec::with_capacity(batch.len());
        let failure = self.compute(session, batch, &mut records).err();
        if let Some(err) = &failure {
            tracing::error!("Unexpected failure while processing location batch: {}", err);
        }

        BatchReport {
            records,
            failure,
            pushes: Vec::new(),
        }
    }

    /// Provider callback entry point: `process` the batch, then forward each
    /// record to the collector as a detached task. Never fails.
    pub fn on_batch(&self, session: u64, batch: &[RawLocationSample]) -> BatchReport {
        let mut report = self.process(session, batch);
        if batch.is_empty() {
            return report;
        }

        report.pushes = report.records.iter().map(|r| self.forward(r)).collect();

        tracing::info!(
            samples = batch.len(),
            records = report.records.len(),
            pushes = report.pushes.len(),
            failed = report.failure.is_some(),
            "Processed location batch"
        );
        report
    }

    fn compute(
        &self,
        session: u64,
        batch: &[RawLocationSample],
        records: &mut Vec<TelemetryRecord>,
    ) -> Result<(), ProcessingError> {
        let mut state = self.state.lock().unwrap();
        if !state.is_started {
            tracing::info!(
                samples = batch.len(),
                "Dropping location batch delivered outside an active session"
            );
            return Ok(());
        }
        if state.generation != session {
            tracing::info!(
                samples = batch.len(),
                batch_session = session,
                current_session = state.generation,
                "Dropping location batch from a previous session"
            );
            return Ok(());
        }

        for (index, sample) in batch.iter().enumerate() {
            if !sample.has_valid_coordinates() {
                return Err(ProcessingError::InvalidCoordinates {
                    index,
                    latitude: sample.latitude,
                    longitude: sample.longitude,
                });
            }
            let reported_time =
                sample
                    .reported_time()
                    .ok_or(ProcessingError::UnrepresentableTimestamp {
                        index,
                        timestamp_ms: sample.timestamp_ms,
                    })?;

            let elapsed = state
                .last_timestamp
                .map(|last| (sample.timestamp_ms - last) / 1000)
                .unwrap_or(0);
            let distance = state
                .last_sample
                .as_ref()
                .map(|last| sample.distance_to(last))
                .unwrap_or(0.0);

            state.last_timestamp = Some(sample.timestamp_ms);
            state.last_sample = Some(*sample);

            tracing::info!(
                "LOCATIONSERVICE==> Time: {}; Distance travelled: {:.2}m; Accuracy: {}; ElapsedTime: {}; LastDateTime: {}; The location is: {} - {}",
                Local::now(),
                distance,
                sample.accuracy,
                elapsed,
                reported_time,
                sample.latitude,
                sample.longitude
            );

            records.push(TelemetryRecord {
                latitude: sample.latitude,
                longitude: sample.longitude,
                accuracy: sample.accuracy,
                distance_from_previous: distance,
                elapsed_seconds_from_previous: elapsed,
                device_reported_time: reported_time,
            });
        }

        Ok(())
    }

    fn forward(&self, record: &TelemetryRecord) -> JoinHandle<()> {
        let pusher = self.pusher.clone();
        let (latitude, longitude) = (record.latitude, record.longitude);

        tokio::spawn(async move {
            match pusher.push(latitude, longitude).await {
                Ok(()) => tracing::debug!("Pushed location {} - {}", latitude, longitude),
                Err(e) => tracing::error!(
                    "Failed to push location {} - {}: {}",
                    latitude,
                    longitude,
                    e
                ),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::test_support::{RecordingPusher, StalledPusher, sample};
    use crate::domain::location::great_circle_distance;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    fn started_processor(pusher: Arc<dyn LocationPusher>) -> (SampleProcessor, u64) {
        let processor = SampleProcessor::new(pusher);
        let session = processor.begin_session();
        (processor, session)
    }

    async fn settle(report: BatchReport) -> Vec<TelemetryRecord> {
        for push in report.pushes {
            push.await.unwrap();
        }
        report.records
    }

    #[test]
    fn test_deltas_are_relative_to_previous_sample() {
        let (processor, session) = started_processor(Arc::new(RecordingPusher::default()));
        let a = sample(10.0, 20.0, 1_000_000);
        let b = sample(10.01, 20.0, 1_030_500);
        let c = sample(10.01, 20.02, 1_095_999);

        let report = processor.process(session, &[a, b, c]);
        assert!(report.failure.is_none());
        assert!(report.pushes.is_empty());
        let records = report.records;
        assert_eq!(records.len(), 3);

        assert_eq!(records[0].distance_from_previous, 0.0);
        assert_eq!(records[0].elapsed_seconds_from_previous, 0);

        let ab = great_circle_distance((10.0, 20.0), (10.01, 20.0));
        assert!((records[1].distance_from_previous - ab).abs() < 1e-9);
        assert_eq!(records[1].elapsed_seconds_from_previous, 30);

        let bc = great_circle_distance((10.01, 20.0), (10.01, 20.02));
        assert!((records[2].distance_from_previous - bc).abs() < 1e-9);
        // 65.499s truncates
        assert_eq!(records[2].elapsed_seconds_from_previous, 65);
    }

    #[test]
    fn test_state_carries_across_batches() {
        let (processor, session) = started_processor(Arc::new(RecordingPusher::default()));
        processor.process(session, &[sample(1.0, 1.0, 10_000)]);
        let records = processor.process(session, &[sample(1.0, 1.0, 25_000)]).records;

        assert_eq!(records[0].elapsed_seconds_from_previous, 15);
        assert_eq!(records[0].distance_from_previous, 0.0);

        let state = processor.session_state();
        assert_eq!(state.last_timestamp, Some(25_000));
        assert_eq!(state.last_sample, Some(sample(1.0, 1.0, 25_000)));
    }

    #[test]
    fn test_backwards_timestamp_truncates_toward_zero() {
        let (processor, session) = started_processor(Arc::new(RecordingPusher::default()));
        let records = processor
            .process(session, &[sample(0.0, 0.0, 10_000), sample(0.0, 0.0, 8_500)])
            .records;
        assert_eq!(records[1].elapsed_seconds_from_previous, -1);
    }

    #[tokio::test]
    async fn test_empty_batch_emits_nothing_and_keeps_state() {
        let pusher = Arc::new(RecordingPusher::default());
        let (processor, session) = started_processor(pusher.clone());
        settle(processor.on_batch(session, &[sample(5.0, 5.0, 1_000)])).await;
        let before = processor.session_state();

        let report = processor.on_batch(session, &[]);
        assert!(report.records.is_empty());
        assert!(report.pushes.is_empty());
        assert!(report.failure.is_none());
        assert_eq!(processor.session_state(), before);
        assert_eq!(pusher.pushed(), vec![(5.0, 5.0)]);
    }

    #[tokio::test]
    async fn test_push_failure_does_not_stop_later_records() {
        let pusher = Arc::new(RecordingPusher::failing_at(2.0));
        let (processor, session) = started_processor(pusher.clone());

        let report = processor.on_batch(
            session,
            &[
                sample(1.0, 1.0, 1_000),
                sample(2.0, 2.0, 2_000),
                sample(3.0, 3.0, 3_000),
            ],
        );
        let records = settle(report).await;

        assert_eq!(records.len(), 3);
        assert_eq!(pusher.pushed(), vec![(1.0, 1.0), (3.0, 3.0)]);
    }

    #[tokio::test]
    async fn test_hung_push_does_not_block_later_batches() {
        let pusher = Arc::new(StalledPusher::default());
        let (processor, session) = started_processor(pusher.clone());

        let first = processor.on_batch(session, &[sample(1.0, 1.0, 1_000)]);
        tokio::time::timeout(Duration::from_secs(1), async {
            while pusher.started.load(Ordering::SeqCst) < 1 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();

        let second = processor.on_batch(
            session,
            &[sample(1.0, 1.01, 31_000), sample(1.0, 1.02, 46_000)],
        );
        assert!(second.failure.is_none());
        assert_eq!(second.records.len(), 2);
        assert_eq!(second.pushes.len(), 2);

        let expected = great_circle_distance((1.0, 1.0), (1.0, 1.01));
        assert!((second.records[0].distance_from_previous - expected).abs() < 1e-9);
        assert_eq!(second.records[0].elapsed_seconds_from_previous, 30);
        assert_eq!(second.records[1].elapsed_seconds_from_previous, 15);
        assert_eq!(processor.session_state().last_timestamp, Some(46_000));

        // The first push is still stuck while the later ones get dispatched.
        assert!(!first.pushes[0].is_finished());
        tokio::time::timeout(Duration::from_secs(1), async {
            while pusher.started.load(Ordering::SeqCst) < 3 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
        assert!(!first.pushes[0].is_finished());

        for push in first.pushes.iter().chain(&second.pushes) {
            push.abort();
        }
    }

    #[tokio::test]
    async fn test_invalid_sample_aborts_rest_of_batch() {
        let pusher = Arc::new(RecordingPusher::default());
        let (processor, session) = started_processor(pusher.clone());

        let report = processor.on_batch(
            session,
            &[
                sample(1.0, 1.0, 1_000),
                sample(f64::NAN, 1.0, 2_000),
                sample(3.0, 3.0, 3_000),
            ],
        );

        assert!(matches!(
            report.failure,
            Some(ProcessingError::InvalidCoordinates { index: 1, .. })
        ));
        let records = settle(report).await;
        assert_eq!(records.len(), 1);
        assert_eq!(pusher.pushed(), vec![(1.0, 1.0)]);

        // Session survives; the next batch is measured from the last good sample.
        let records = processor.process(session, &[sample(1.0, 1.0, 4_000)]).records;
        assert_eq!(records[0].elapsed_seconds_from_previous, 3);
        assert!(processor.session_state().is_started);
    }

    #[test]
    fn test_process_keeps_records_before_failure() {
        let (processor, session) = started_processor(Arc::new(RecordingPusher::default()));
        let report = processor.process(
            session,
            &[
                sample(0.0, 0.0, 1_000),
                sample(0.0, 0.0, 6_000),
                sample(0.0, 0.0, i64::MAX),
            ],
        );

        assert_eq!(
            report.failure,
            Some(ProcessingError::UnrepresentableTimestamp {
                index: 2,
                timestamp_ms: i64::MAX
            })
        );
        assert_eq!(report.records.len(), 2);
        assert_eq!(report.records[1].elapsed_seconds_from_previous, 5);
        assert_eq!(processor.session_state().last_timestamp, Some(6_000));
    }

    #[tokio::test]
    async fn test_batches_outside_session_are_dropped() {
        let pusher = Arc::new(RecordingPusher::default());
        let processor = SampleProcessor::new(pusher.clone());

        let report = processor.on_batch(0, &[sample(1.0, 1.0, 1_000)]);
        assert!(report.records.is_empty());
        assert!(report.pushes.is_empty());
        assert_eq!(processor.session_state(), SessionState::default());

        let session = processor.begin_session();
        processor.process(session, &[sample(1.0, 1.0, 1_000)]);
        processor.end_session();

        let report = processor.on_batch(session, &[sample(2.0, 2.0, 2_000)]);
        assert!(report.records.is_empty());
        let state = processor.session_state();
        assert!(!state.is_started);
        assert!(state.last_sample.is_none());
        assert!(state.last_timestamp.is_none());
        assert!(pusher.pushed().is_empty());
    }

    #[test]
    fn test_begin_session_resets_deltas() {
        let (processor, first) = started_processor(Arc::new(RecordingPusher::default()));
        processor.process(first, &[sample(1.0, 1.0, 1_000)]);

        let second = processor.begin_session();
        assert_ne!(first, second);
        let records = processor.process(second, &[sample(2.0, 2.0, 9_000)]).records;
        assert_eq!(records[0].distance_from_previous, 0.0);
        assert_eq!(records[0].elapsed_seconds_from_previous, 0);
    }

    #[tokio::test]
    async fn test_batch_from_previous_session_is_dropped() {
        let pusher = Arc::new(RecordingPusher::default());
        let (processor, first) = started_processor(pusher.clone());
        processor.process(first, &[sample(1.0, 1.0, 1_000)]);
        processor.end_session();
        let second = processor.begin_session();

        let report = processor.on_batch(first, &[sample(10.0, 10.0, 1_000)]);
        assert!(report.records.is_empty());
        assert!(report.pushes.is_empty());
        let state = processor.session_state();
        assert!(state.is_started);
        assert_eq!(state.generation, second);
        assert!(state.last_sample.is_none());

        let records = settle(processor.on_batch(second, &[sample(2.0, 2.0, 61_000)])).await;
        assert_eq!(records[0].distance_from_previous, 0.0);
        assert_eq!(records[0].elapsed_seconds_from_previous, 0);
        assert_eq!(pusher.pushed(), vec![(2.0, 2.0)]);
    }

    #[tokio::test]
    async fn test_concurrent_batches_are_serialized() {
        let (processor, session) = started_processor(Arc::new(RecordingPusher::default()));
        let processor = Arc::new(processor);

        let mut tasks = Vec::new();
        for worker in 0..4i64 {
            let processor = processor.clone();
            tasks.push(tokio::spawn(async move {
                let batch: Vec<RawLocationSample> = (0..25)
                    .map(|i| sample(0.0, 0.0, worker * 100_000 + i * 1_000))
                    .collect();
                settle(processor.on_batch(session, &batch)).await
            }));
        }

        let mut total = 0;
        for task in tasks {
            let records = task.await.unwrap();
            // Within a batch every sample after the first is exactly 1s apart.
            for record in records.iter().skip(1) {
                assert_eq!(record.elapsed_seconds_from_previous, 1);
            }
            total += records.len();
        }
        assert_eq!(total, 100);
    }
}
