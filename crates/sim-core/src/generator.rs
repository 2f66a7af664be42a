//! Stochastic job generator: runs as its own task, sampling arrivals and
//! handing finished `Job` values to the engine over a bounded channel.

use rand::distributions::{Distribution, WeightedIndex};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::Exp;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::{ArrivalModel, SimulationConfig};
use crate::model::{Job, Priority};

pub struct JobGenerator {
    handle: Option<JoinHandle<()>>,
    stop_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl JobGenerator {
    /// Spawns the sampling loop. Jobs are sent to `tx`; a full channel
    /// backpressures the generator, per the engine's ingest contract.
    pub fn start(config: SimulationConfig, tx: mpsc::Sender<Job>) -> Self {
        let (stop_tx, mut stop_rx) = tokio::sync::oneshot::channel();
        let handle = tokio::spawn(async move {
            let mut rng = match config.seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            let priorities: Vec<Priority> = config
                .priority_distribution
                .keys()
                .filter_map(|k| Priority::parse(k))
                .collect();
            let weights: Vec<f64> = priorities
                .iter()
                .map(|p| {
                    let key = match p {
                        Priority::Low => "low",
                        Priority::Med => "med",
                        Priority::High => "high",
                    };
                    *config.priority_distribution.get(key).unwrap_or(&0.0)
                })
                .collect();
            let weighted = WeightedIndex::new(&weights).ok();

            let started = std::time::Instant::now();
            let mut job_seq: u64 = 0;

            loop {
                let interval_minutes = match config.arrival_model {
                    ArrivalModel::Fixed => 1.0 / config.arrival_rate,
                    ArrivalModel::Poisson => {
                        let exp = Exp::new(config.arrival_rate).expect("arrival_rate > 0");
                        exp.sample(&mut rng)
                    }
                };
                let sleep_secs = interval_minutes * 60.0;

                tokio::select! {
                    _ = &mut stop_rx => {
                        tracing::info!("job generator stopping");
                        return;
                    }
                    _ = tokio::time::sleep(std::time::Duration::from_secs_f64(sleep_secs.max(0.0))) => {}
                }

                if started.elapsed().as_secs_f64() >= config.runtime_seconds {
                    tracing::info!("job generator reached runtime_seconds, stopping");
                    return;
                }

                let duration = rng.gen_range(config.duration_range.0..=config.duration_range.1);
                let cpu = rng.gen_range(config.cpu_range.0..=config.cpu_range.1);
                let ram_mb = rng.gen_range(config.ram_range_mb.0..=config.ram_range_mb.1);
                let gpus = rng.gen_range(config.gpu_range.0..=config.gpu_range.1);
                let tenant_id = config
                    .tenants
                    .choose(&mut rng)
                    .cloned()
                    .unwrap_or_else(|| "unknown".to_string());
                let priority = weighted.as_ref().map(|w| priorities[w.sample(&mut rng)]);

                job_seq += 1;
                let job = Job::new(
                    format!("job-{job_seq}"),
                    tenant_id,
                    priority,
                    cpu,
                    ram_mb,
                    gpus,
                    duration,
                    0.0, // arrival_time stamped by the engine on ingest
                );

                tracing::debug!(job_id = %job.id, tenant_id = %job.tenant_id, "generated job");
                if tx.send(job).await.is_err() {
                    tracing::info!("job generator channel closed, stopping");
                    return;
                }
            }
        });

        JobGenerator {
            handle: Some(handle),
            stop_tx: Some(stop_tx),
        }
    }

    /// Signals the generator to stop and waits for the task to finish.
    /// Idempotent: a second call is a no-op.
    pub async fn stop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn test_config() -> SimulationConfig {
        SimulationConfig {
            runtime_seconds: 1.0,
            arrival_rate: 600.0,
            arrival_model: ArrivalModel::Fixed,
            duration_range: (1.0, 2.0),
            cpu_range: (1, 2),
            ram_range_mb: (128, 256),
            gpu_range: (0, 0),
            priority_distribution: HashMap::from([("low".to_string(), 1.0)]),
            tenants: vec!["t1".to_string()],
            nodes: vec![],
            scheduler_choice: crate::config::SchedulerKind::Fifo,
            preemption_enabled: true,
            seed: Some(7),
        }
    }

    #[tokio::test]
    async fn generates_and_can_be_stopped() {
        let (tx, mut rx) = mpsc::channel(16);
        let mut gen = JobGenerator::start(test_config(), tx);

        let job = tokio::time::timeout(std::time::Duration::from_secs(2), rx.recv())
            .await
            .expect("generator produced a job within timeout")
            .expect("channel open");
        assert_eq!(job.tenant_id, "t1");

        gen.stop().await;
    }
}
