//! The public control surface: `StartRun`, `StopRun`, `SubscribeLive`, `GetResults`.
//!
//! Mirrors the teacher's `start_engine`/`EngineHandle` shape: validate up
//! front, spawn the engine as its own task, and hand back a cheap, cloneable
//! handle for the rest of the run's lifetime.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::config::{SchedulerKind, SimulationConfig};
use crate::engine::{EngineEvent, EngineInner, SimulationEngine};
use crate::error::SimError;
use crate::snapshot::{RunResults, Snapshot};
use crate::stream::SnapshotStream;

const EVENT_CHANNEL_CAPACITY: usize = 256;
const SNAPSHOT_CHANNEL_CAPACITY: usize = 256;

/// Handle to a running (or finished) simulation. Cloning is cheap; all
/// clones observe the same underlying run.
#[derive(Clone)]
pub struct RunHandle {
    inner: Arc<EngineInner>,
    events_tx: broadcast::Sender<EngineEvent>,
    snapshot_tx: broadcast::Sender<Snapshot>,
    join: Arc<tokio::sync::Mutex<Option<JoinHandle<RunResults>>>>,
}

impl RunHandle {
    /// Requests cooperative shutdown. Idempotent; safe to call more than once
    /// and safe to call after the run has already finished.
    pub fn stop(&self) {
        self.inner.request_stop();
    }

    /// Subscribes to lifecycle events (arrivals, starts, preemptions,
    /// completions, warnings).
    pub fn events(&self) -> broadcast::Receiver<EngineEvent> {
        self.events_tx.subscribe()
    }

    /// Subscribes to the live snapshot stream. Only runs started with
    /// [`start_run_live`] publish snapshots; a handle from [`start_run`]
    /// yields a stream that never produces anything.
    pub fn subscribe_live(&self) -> SnapshotStream {
        SnapshotStream::new(self.snapshot_tx.subscribe())
    }

    /// Awaits the run's completion and returns its final results. Safe to
    /// call from multiple clones or after [`RunHandle::stop`].
    pub async fn results(&self) -> RunResults {
        let mut guard = self.join.lock().await;
        if let Some(handle) = guard.take() {
            let results = handle.await.unwrap_or_default();
            *guard = None;
            results
        } else {
            RunResults::default()
        }
    }
}

fn validate_and_build(mut config: SimulationConfig) -> Result<SimulationConfig, SimError> {
    config.validate()?;
    if matches!(config.scheduler_choice, SchedulerKind::Rl) {
        return Err(SimError::SchedulerUnknown("rl".to_string()));
    }
    Ok(config)
}

/// Starts a run without live snapshots.
pub fn start_run(config: SimulationConfig) -> Result<RunHandle, SimError> {
    let config = validate_and_build(config)?;
    let inner = Arc::new(EngineInner::default());
    let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
    let (snapshot_tx, _) = broadcast::channel(SNAPSHOT_CHANNEL_CAPACITY);

    let engine = SimulationEngine::new(config, inner.clone(), events_tx.clone());
    let join = tokio::spawn(engine.run());

    Ok(RunHandle {
        inner,
        events_tx,
        snapshot_tx,
        join: Arc::new(tokio::sync::Mutex::new(Some(join))),
    })
}

/// Starts a run that additionally publishes a snapshot on every tick where
/// the computed state differs from the previous one.
pub fn start_run_live(config: SimulationConfig) -> Result<RunHandle, SimError> {
    let config = validate_and_build(config)?;
    let inner = Arc::new(EngineInner::default());
    let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
    let (snapshot_tx, _) = broadcast::channel(SNAPSHOT_CHANNEL_CAPACITY);

    let engine = SimulationEngine::new(config, inner.clone(), events_tx.clone());
    let snapshot_tx_for_engine = snapshot_tx.clone();
    let join = tokio::spawn(engine.run_live(snapshot_tx_for_engine));

    Ok(RunHandle {
        inner,
        events_tx,
        snapshot_tx,
        join: Arc::new(tokio::sync::Mutex::new(Some(join))),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ArrivalModel, NodeSpec};
    use std::collections::HashMap;

    fn test_config() -> SimulationConfig {
        SimulationConfig {
            runtime_seconds: 0.2,
            arrival_rate: 600.0,
            arrival_model: ArrivalModel::Fixed,
            duration_range: (0.01, 0.02),
            cpu_range: (1, 1),
            ram_range_mb: (128, 128),
            gpu_range: (0, 0),
            priority_distribution: HashMap::from([("low".to_string(), 1.0)]),
            tenants: vec!["t1".to_string()],
            nodes: vec![NodeSpec {
                id: "n0".to_string(),
                cpu_capacity: 4,
                ram_capacity_mb: 4096,
                gpu_capacity: 0,
            }],
            scheduler_choice: SchedulerKind::Fifo,
            preemption_enabled: true,
            seed: Some(42),
        }
    }

    #[tokio::test]
    async fn rejects_rl_scheduler() {
        let mut cfg = test_config();
        cfg.scheduler_choice = SchedulerKind::Rl;
        let result = start_run(cfg);
        assert!(matches!(result, Err(SimError::SchedulerUnknown(_))));
    }

    #[tokio::test]
    async fn runs_and_returns_results() {
        let handle = start_run(test_config()).expect("valid config");
        let results = handle.results().await;
        assert!(results.fairness >= 0.0);
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let handle = start_run(test_config()).expect("valid config");
        handle.stop();
        handle.stop();
        let _ = handle.results().await;
    }
}
