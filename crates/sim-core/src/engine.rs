//! The simulation engine: a single cooperative task that ingests generated
//! jobs, dispatches them through a scheduler, advances running jobs, and
//! (in the live variant) emits snapshots as state changes.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc, Notify};

use crate::config::SimulationConfig;
use crate::event::EventKind;
use crate::event_queue::EventQueue;
use crate::generator::JobGenerator;
use crate::model::{Cluster, Job, JobHandle, JobState, Node, Tenant, TenantId};
use crate::running_heap::RunningHeap;
use crate::scheduler::{FifoScheduler, Scheduler, SrtfScheduler};
use crate::snapshot::{RunResults, RunningJobView, Snapshot};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EngineEvent {
    Started,
    JobArrived { job_id: String },
    JobStarted { job_id: String, node_id: String },
    JobPreempted { job_id: String },
    JobCompleted { job_id: String },
    Warning(String),
    Stopped,
}

/// Shared cancellation state between a `RunHandle` and its engine task,
/// mirroring the teacher's stop-flag-plus-notify pattern.
#[derive(Debug, Default)]
pub struct EngineInner {
    stop_requested: AtomicBool,
    notify: Notify,
}

impl EngineInner {
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn should_stop(&self) -> bool {
        self.stop_requested.load(Ordering::SeqCst)
    }
}

const SNAPSHOT_TICK: std::time::Duration = std::time::Duration::from_millis(50);
const INGEST_CHANNEL_CAPACITY: usize = 256;

pub struct SimulationEngine {
    config: SimulationConfig,
    cluster: Cluster,
    tenants: HashMap<TenantId, Tenant>,
    jobs_by_id: HashMap<String, JobHandle>,
    ready_queue: Vec<JobHandle>,
    running: RunningHeap,
    event_queue: EventQueue,
    scheduler: Box<dyn Scheduler>,
    job_rx: mpsc::Receiver<Job>,
    generator: JobGenerator,
    inner: Arc<EngineInner>,
    events_tx: broadcast::Sender<EngineEvent>,
    started_at: Instant,
}

impl SimulationEngine {
    pub fn new(
        config: SimulationConfig,
        inner: Arc<EngineInner>,
        events_tx: broadcast::Sender<EngineEvent>,
    ) -> Self {
        let cluster = Cluster::new(
            config
                .nodes
                .iter()
                .map(|n| Node::new(n.id.clone(), n.cpu_capacity, n.ram_capacity_mb, n.gpu_capacity))
                .collect(),
        );
        let tenants = config
            .tenants
            .iter()
            .map(|t| (t.clone(), Tenant::new(t.clone())))
            .collect();
        let scheduler: Box<dyn Scheduler> = match config.scheduler_choice {
            crate::config::SchedulerKind::Fifo => Box::new(FifoScheduler),
            crate::config::SchedulerKind::Stf => Box::new(SrtfScheduler),
            crate::config::SchedulerKind::Rl => unreachable!("validated before construction"),
        };

        let (tx, job_rx) = mpsc::channel(INGEST_CHANNEL_CAPACITY);
        let generator = JobGenerator::start(config.clone(), tx);

        SimulationEngine {
            config,
            cluster,
            tenants,
            jobs_by_id: HashMap::new(),
            ready_queue: Vec::new(),
            running: RunningHeap::new(),
            event_queue: EventQueue::new(),
            scheduler,
            job_rx,
            generator,
            inner,
            events_tx,
            started_at: Instant::now(),
        }
    }

    /// Real elapsed seconds since the run started. Job `duration`/
    /// `remaining_time` and `runtime_seconds` are both plain seconds on this
    /// same clock, so they compare directly without conversion.
    fn now(&self) -> f64 {
        self.started_at.elapsed().as_secs_f64()
    }

    fn emit(&self, event: EngineEvent) {
        let _ = self.events_tx.send(event);
    }

    fn ingest_new_jobs(&mut self) {
        while let Ok(mut job) = self.job_rx.try_recv() {
            let now = self.now();
            job.arrival_time = now;
            let tenant_id = job.tenant_id.clone();
            let job_id = job.id.clone();
            let handle: JobHandle = Rc::new(RefCell::new(job));
            self.jobs_by_id.insert(job_id.clone(), handle);
            if let Some(tenant) = self.tenants.get_mut(&tenant_id) {
                tenant.submitted_jobs.push(job_id.clone());
            }
            self.event_queue.push(now, EventKind::Arrival, Some(job_id.clone()));
            self.emit(EngineEvent::JobArrived { job_id });
        }
    }

    fn dispatch_ready_events(&mut self) {
        let now = self.now();
        while let Some(event) = self.event_queue.peek() {
            if event.time > now {
                break;
            }
            let event = self.event_queue.pop().expect("just peeked");
            match event.kind {
                EventKind::Arrival => {
                    if let Some(job_id) = event.job_id {
                        if let Some(handle) = self.jobs_by_id.get(&job_id) {
                            self.ready_queue.push(handle.clone());
                        }
                        self.event_queue.push(now, EventKind::Scheduling, None);
                    }
                }
                EventKind::Scheduling => {
                    self.scheduler.schedule(
                        &mut self.cluster,
                        &mut self.ready_queue,
                        &mut self.running,
                        &mut self.tenants,
                        now,
                    );
                }
                EventKind::Preemption | EventKind::Completion => {
                    // Preemption requeues the victim synchronously inside
                    // `Scheduler::schedule`; completion is detected in
                    // `advance_and_complete`. Neither is re-dispatched here.
                }
            }
        }
    }

    fn advance_and_complete(&mut self) {
        let now = self.now();
        let mut completed_jobs = Vec::new();
        while let Some(entry) = self.running.peek_earliest() {
            if entry.finish_time > now {
                break;
            }
            let entry = self.running.pop_earliest().expect("just peeked");
            {
                let mut job = entry.job.borrow_mut();
                job.end_time = Some(now);
                job.remaining_time = 0.0;
                job.state = JobState::Completed;
                job.node_id = None;
                if let Some(node) = self.cluster.node_mut(&entry.node_id) {
                    node.release(&job);
                }
                if let Some(tenant) = self.tenants.get_mut(&job.tenant_id) {
                    tenant.completed_jobs.push(job.id.clone());
                }
                completed_jobs.push(job.id.clone());
            }
        }
        for job_id in completed_jobs {
            self.emit(EngineEvent::JobCompleted { job_id });
        }
    }

    fn tick(&mut self) {
        self.ingest_new_jobs();
        self.dispatch_ready_events();
        self.advance_and_complete();
    }

    fn build_snapshot(&self) -> Snapshot {
        let now = self.now();
        let running_jobs = self
            .running
            .iter()
            .map(|entry| {
                let job = entry.job.borrow();
                RunningJobView {
                    id: job.id.clone(),
                    tenant_id: job.tenant_id.clone(),
                    cpu: job.cpu,
                    start_time: job.start_time,
                }
            })
            .collect();
        let completed_jobs = self
            .jobs_by_id
            .values()
            .filter(|j| j.borrow().state == JobState::Completed)
            .count();
        Snapshot {
            time: now,
            queue_len: self.ready_queue.len(),
            running_jobs,
            completed_jobs,
            cpu_util: self.cluster.cpu_util_percent(),
        }
    }

    fn collect_results(&self) -> RunResults {
        let mut throughput = HashMap::new();
        let mut avg_wait = HashMap::new();
        for (id, tenant) in &self.tenants {
            throughput.insert(id.clone(), tenant.throughput());
            avg_wait.insert(id.clone(), tenant.avg_wait_time(&self.jobs_by_id));
        }
        let fairness = crate::metrics::fairness_from_wait_times(&avg_wait);
        RunResults {
            utilization: HashMap::new(),
            throughput,
            avg_wait,
            fairness,
        }
    }

    /// Runs to completion without emitting snapshots. Stops early if the
    /// engine's stop flag is raised.
    pub async fn run(mut self) -> RunResults {
        self.emit(EngineEvent::Started);
        let mut ticker = tokio::time::interval(SNAPSHOT_TICK);
        loop {
            if self.inner.should_stop() {
                break;
            }
            tokio::select! {
                _ = ticker.tick() => {}
                _ = self.inner.notify.notified() => {
                    if self.inner.should_stop() {
                        break;
                    }
                }
            }
            self.tick();
            if self.now() >= self.config.runtime_seconds {
                break;
            }
        }
        self.generator.stop().await;
        self.emit(EngineEvent::Stopped);
        self.collect_results()
    }

    /// Runs to completion, emitting a snapshot on `snapshot_tx` every tick
    /// where the computed snapshot differs from the last one emitted.
    pub async fn run_live(mut self, snapshot_tx: broadcast::Sender<Snapshot>) -> RunResults {
        self.emit(EngineEvent::Started);
        let mut ticker = tokio::time::interval(SNAPSHOT_TICK);
        let mut last_snapshot: Option<Snapshot> = None;
        loop {
            if self.inner.should_stop() {
                break;
            }
            tokio::select! {
                _ = ticker.tick() => {}
                _ = self.inner.notify.notified() => {
                    if self.inner.should_stop() {
                        break;
                    }
                }
            }
            self.tick();

            let snapshot = self.build_snapshot();
            if last_snapshot.as_ref() != Some(&snapshot) {
                if snapshot_tx.send(snapshot.clone()).is_err() {
                    tracing::warn!("snapshot stream has no subscribers");
                }
                last_snapshot = Some(snapshot);
            }

            if self.now() >= self.config.runtime_seconds {
                break;
            }
        }
        self.generator.stop().await;
        self.emit(EngineEvent::Stopped);
        self.collect_results()
    }
}
