//! Metering session lifecycle
//!
//! A session owns the meter state for one recording and drives a periodic
//! sampler task that polls a [`LevelSource`] on a fixed cadence. Readers
//! take snapshots at whatever frequency they redraw; only the sampler task
//! mutates the state, and stopping the session is synchronous.

use crate::meter::{HISTORY_CAPACITY, HistoryRing, normalize_db};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Cadence at which the sampler polls the level source.
pub const METER_INTERVAL: Duration = Duration::from_millis(50);

/// Source of raw power readings for an active recording.
pub trait LevelSource: Send + Sync {
    /// Instantaneous input power in dBFS.
    fn power_db(&self) -> f32;

    /// Whether the source is currently capturing. The sampler never touches
    /// the history while this is false.
    fn is_recording(&self) -> bool;
}

/// Consistent view of the meter state at one point in time.
#[derive(Debug, Clone)]
pub struct MeterSnapshot {
    /// Latest normalized intensity.
    pub level: f32,
    /// Recent intensity history, oldest first.
    pub history: Vec<f32>,
}

struct MeterState {
    level: f32,
    history: HistoryRing,
    stopped: bool,
}

impl MeterState {
    fn sample(&mut self, db: f32) {
        let intensity = normalize_db(db);
        self.level = intensity;
        self.history.push(intensity);
    }

    fn reset(&mut self) {
        self.level = 0.0;
        self.history.clear();
    }
}

/// One metering session, spanning a recording start to its stop.
pub struct MeterSession {
    state: Arc<Mutex<MeterState>>,
    task: Option<JoinHandle<()>>,
}

impl MeterSession {
    /// Start a fresh session polling `source` every `interval`.
    pub fn start(source: Arc<dyn LevelSource>, interval: Duration) -> Self {
        let state = Arc::new(Mutex::new(MeterState {
            level: 0.0,
            history: HistoryRing::new(HISTORY_CAPACITY),
            stopped: false,
        }));

        let task_state = Arc::clone(&state);
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // A stalled runtime must not deliver a burst of catch-up samples.
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;

                if !source.is_recording() {
                    continue;
                }
                let db = source.power_db();

                // The stop flag is checked under the same lock that guards
                // mutation, so no sample lands after stop() returns.
                let mut stopped = true;
                if let Ok(mut state) = task_state.lock() {
                    stopped = state.stopped;
                    if !stopped {
                        state.sample(db);
                    }
                }
                if stopped {
                    break;
                }
            }
        });

        Self {
            state,
            task: Some(task),
        }
    }

    /// Stop the session. When this returns the level reads 0, the history
    /// is empty, and no further sample will be applied.
    pub fn stop(&mut self) {
        if let Ok(mut state) = self.state.lock() {
            state.stopped = true;
            state.reset();
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    /// Latest normalized intensity.
    pub fn level(&self) -> f32 {
        self.state.lock().map(|state| state.level).unwrap_or(0.0)
    }

    /// Consistent (level, history) snapshot.
    pub fn snapshot(&self) -> MeterSnapshot {
        match self.state.lock() {
            Ok(state) => MeterSnapshot {
                level: state.level,
                history: state.history.to_vec(),
            },
            Err(_) => MeterSnapshot {
                level: 0.0,
                history: Vec::new(),
            },
        }
    }
}

impl Drop for MeterSession {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meter::aggregate;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

    struct FakeSource {
        db: AtomicU32,
        recording: AtomicBool,
    }

    impl FakeSource {
        fn new(db: f32, recording: bool) -> Arc<Self> {
            Arc::new(Self {
                db: AtomicU32::new(db.to_bits()),
                recording: AtomicBool::new(recording),
            })
        }

        fn set_db(&self, db: f32) {
            self.db.store(db.to_bits(), Ordering::Release);
        }
    }

    impl LevelSource for FakeSource {
        fn power_db(&self) -> f32 {
            f32::from_bits(self.db.load(Ordering::Acquire))
        }

        fn is_recording(&self) -> bool {
            self.recording.load(Ordering::Acquire)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_sampler_fills_ring_to_capacity() {
        let source = FakeSource::new(0.0, true);
        let session = MeterSession::start(source.clone(), METER_INTERVAL);

        tokio::time::sleep(METER_INTERVAL * 200).await;

        let snapshot = session.snapshot();
        assert_eq!(snapshot.history.len(), HISTORY_CAPACITY);
        assert_eq!(snapshot.level, 1.0);
        assert!(snapshot.history.iter().all(|&v| v == 1.0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_guard_skips_sampling_when_not_recording() {
        let source = FakeSource::new(-10.0, false);
        let session = MeterSession::start(source.clone(), METER_INTERVAL);

        tokio::time::sleep(METER_INTERVAL * 20).await;

        let snapshot = session.snapshot();
        assert!(snapshot.history.is_empty());
        assert_eq!(snapshot.level, 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_clears_state_synchronously() {
        let source = FakeSource::new(-30.0, true);
        let mut session = MeterSession::start(source.clone(), METER_INTERVAL);

        tokio::time::sleep(METER_INTERVAL * 10).await;
        assert!(!session.snapshot().history.is_empty());

        session.stop();

        let snapshot = session.snapshot();
        assert_eq!(snapshot.level, 0.0);
        assert!(snapshot.history.is_empty());
        assert_eq!(aggregate(&snapshot.history, 5), vec![0.0; 5]);

        // No sample may land after stop() has returned.
        tokio::time::sleep(METER_INTERVAL * 10).await;
        assert!(session.snapshot().history.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_samples_are_normalized_in_order() {
        let source = FakeSource::new(-60.0, true);
        let session = MeterSession::start(source.clone(), METER_INTERVAL);

        tokio::time::sleep(METER_INTERVAL * 5).await;
        source.set_db(-30.0);
        tokio::time::sleep(METER_INTERVAL * 5).await;

        let snapshot = session.snapshot();
        assert!(snapshot.history.len() >= 8);
        // Earlier samples sit at the floor, later ones at the midpoint.
        assert_eq!(snapshot.history[0], 0.0);
        assert_eq!(*snapshot.history.last().unwrap(), 0.5);
        assert_eq!(session.level(), 0.5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_finite_reading_never_reaches_the_ring() {
        let source = FakeSource::new(f32::NAN, true);
        let session = MeterSession::start(source.clone(), METER_INTERVAL);

        tokio::time::sleep(METER_INTERVAL * 10).await;

        let snapshot = session.snapshot();
        assert!(!snapshot.history.is_empty());
        assert!(snapshot.history.iter().all(|&v| v == 0.0));
    }
}
