//! Preemptive scheduling policies: FIFO-with-priority and shortest-remaining-time-first.
//!
//! Both policies share the same dispatch shape: order the ready queue, try a
//! first-fit placement for each job in order, and if none exists look for a
//! running job to preempt. A job that can neither be placed nor preempt
//! anyone stays in the ready queue for the next scheduling pass.

use std::collections::HashMap;

use crate::config::SchedulerKind;
use crate::model::{Cluster, JobHandle, JobState, Node, NodeId, Tenant, TenantId};
use crate::running_heap::{RunningEntry, RunningHeap};

pub trait Scheduler {
    fn kind(&self) -> SchedulerKind;

    fn schedule(
        &self,
        cluster: &mut Cluster,
        ready_queue: &mut Vec<JobHandle>,
        running: &mut RunningHeap,
        tenants: &mut HashMap<TenantId, Tenant>,
        now: f64,
    ) {
        let mut ordered = std::mem::take(ready_queue);
        self.order(&mut ordered, now);

        for job in ordered {
            let fit = {
                let borrowed = job.borrow();
                cluster.find_fit(&borrowed)
            };

            if let Some(node_id) = fit {
                allocate_job(&job, cluster.node_mut(&node_id).expect("node exists"), running, now);
                continue;
            }

            match self.find_victim(&job, cluster, running, now) {
                Some((victim, node_id)) => {
                    preempt_and_allocate(&victim, &node_id, &job, cluster, running, ready_queue, tenants, now);
                }
                None => ready_queue.push(job),
            }
        }
    }

    /// Orders `jobs` in place: highest-priority dispatch attempt first.
    fn order(&self, jobs: &mut [JobHandle], now: f64);

    /// Finds a running job whose resources could be freed for `incoming`,
    /// returning the victim entry and the node it occupies.
    fn find_victim(
        &self,
        incoming: &JobHandle,
        cluster: &Cluster,
        running: &RunningHeap,
        now: f64,
    ) -> Option<(RunningEntry, NodeId)>;
}

fn swap_feasible(node: &Node, victim: &RunningEntry, incoming: &JobHandle) -> bool {
    let victim_job = victim.job.borrow();
    let incoming_job = incoming.borrow();
    let free_cpu = node.cpu_capacity - node.cpu_used + victim_job.cpu;
    let free_ram = node.ram_capacity_mb - node.ram_used_mb + victim_job.ram_mb;
    let free_gpu = node.gpu_capacity - node.gpu_used + victim_job.gpus;
    incoming_job.cpu <= free_cpu && incoming_job.ram_mb <= free_ram && incoming_job.gpus <= free_gpu
}

fn allocate_job(job: &JobHandle, node: &mut Node, running: &mut RunningHeap, now: f64) {
    {
        let mut j = job.borrow_mut();
        node.allocate(&j).expect("caller already checked can_allocate");
        if j.start_time.is_none() {
            j.start_time = Some(now);
            j.wait_time += now - j.arrival_time;
        } else {
            let since = j.preemption_time.unwrap_or(now);
            j.wait_time += now - since;
        }
        j.last_start_time = Some(now);
        j.state = JobState::Running;
        j.node_id = Some(node.id.clone());
    }
    let finish_time = now + job.borrow().remaining_time;
    running.push(RunningEntry {
        finish_time,
        job: job.clone(),
        node_id: node.id.clone(),
    });
}

#[allow(clippy::too_many_arguments)]
fn preempt_and_allocate(
    victim: &RunningEntry,
    node_id: &NodeId,
    incoming: &JobHandle,
    cluster: &mut Cluster,
    running: &mut RunningHeap,
    ready_queue: &mut Vec<JobHandle>,
    tenants: &mut HashMap<TenantId, Tenant>,
    now: f64,
) {
    running.remove_job(&victim.job.borrow().id);
    let node = cluster.node_mut(node_id).expect("victim's node exists");
    {
        let mut v = victim.job.borrow_mut();
        node.release(&v);
        let elapsed = now - v.last_start_time.unwrap_or(now);
        v.remaining_time = (v.remaining_time - elapsed).max(0.0);
        v.state = JobState::Preempted;
        v.preemption_time = Some(now);
        v.node_id = None;
        if let Some(tenant) = tenants.get_mut(&v.tenant_id) {
            tenant.preempted_jobs.push(v.id.clone());
        }
    }
    ready_queue.push(victim.job.clone());
    allocate_job(incoming, node, running, now);
}

pub struct FifoScheduler;

impl Scheduler for FifoScheduler {
    fn kind(&self) -> SchedulerKind {
        SchedulerKind::Fifo
    }

    fn order(&self, jobs: &mut [JobHandle], _now: f64) {
        jobs.sort_by(|a, b| {
            let a = a.borrow();
            let b = b.borrow();
            b.priority_value()
                .cmp(&a.priority_value())
                .then_with(|| a.arrival_time.partial_cmp(&b.arrival_time).unwrap_or(std::cmp::Ordering::Equal))
        });
    }

    fn find_victim(
        &self,
        incoming: &JobHandle,
        cluster: &Cluster,
        running: &RunningHeap,
        _now: f64,
    ) -> Option<(RunningEntry, NodeId)> {
        let incoming_priority = incoming.borrow().priority_value();
        running
            .iter()
            .find(|entry| {
                let victim_priority = entry.job.borrow().priority_value();
                victim_priority < incoming_priority
                    && cluster
                        .node(&entry.node_id)
                        .is_some_and(|node| swap_feasible(node, entry, incoming))
            })
            .map(|entry| (entry.clone(), entry.node_id.clone()))
    }
}

pub struct SrtfScheduler;

impl Scheduler for SrtfScheduler {
    fn kind(&self) -> SchedulerKind {
        SchedulerKind::Stf
    }

    fn order(&self, jobs: &mut [JobHandle], _now: f64) {
        jobs.sort_by(|a, b| {
            let a = a.borrow();
            let b = b.borrow();
            a.remaining_time
                .partial_cmp(&b.remaining_time)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.priority_value().cmp(&a.priority_value()))
        });
    }

    fn find_victim(
        &self,
        incoming: &JobHandle,
        cluster: &Cluster,
        running: &RunningHeap,
        _now: f64,
    ) -> Option<(RunningEntry, NodeId)> {
        let incoming_job = incoming.borrow();
        running
            .iter()
            .find(|entry| {
                let victim = entry.job.borrow();
                let wins = incoming_job.remaining_time < victim.remaining_time
                    || (incoming_job.remaining_time == victim.remaining_time
                        && incoming_job.priority_value() > victim.priority_value());
                wins
                    && cluster
                        .node(&entry.node_id)
                        .is_some_and(|node| swap_feasible(node, entry, incoming))
            })
            .map(|entry| (entry.clone(), entry.node_id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Job, Node, Priority};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn job(id: &str, priority: Priority, cpu: u32, duration: f64, arrival: f64) -> JobHandle {
        Rc::new(RefCell::new(Job::new(
            id.to_string(),
            "t1".to_string(),
            Some(priority),
            cpu,
            0,
            0,
            duration,
            arrival,
        )))
    }

    #[test]
    fn fifo_preempts_lower_priority() {
        let mut cluster = Cluster::new(vec![Node::new("n0".to_string(), 4, 4096, 0)]);
        let mut ready = Vec::new();
        let mut running = RunningHeap::new();
        let mut tenants = HashMap::from([("t1".to_string(), Tenant::new("t1".to_string()))]);

        let low = job("low", Priority::Low, 4, 10.0, 0.0);
        ready.push(low.clone());
        FifoScheduler.schedule(&mut cluster, &mut ready, &mut running, &mut tenants, 0.0);
        assert_eq!(low.borrow().state, JobState::Running);

        let high = job("high", Priority::High, 4, 5.0, 1.0);
        ready.push(high.clone());
        FifoScheduler.schedule(&mut cluster, &mut ready, &mut running, &mut tenants, 1.0);

        assert_eq!(high.borrow().state, JobState::Running);
        assert_eq!(low.borrow().state, JobState::Preempted);
        assert!(ready.iter().any(|j| j.borrow().id == "low"));
    }

    #[test]
    fn srtf_prefers_shorter_job_as_victim_target() {
        let mut cluster = Cluster::new(vec![Node::new("n0".to_string(), 4, 4096, 0)]);
        let mut ready = Vec::new();
        let mut running = RunningHeap::new();
        let mut tenants = HashMap::from([("t1".to_string(), Tenant::new("t1".to_string()))]);

        let long = job("long", Priority::Med, 4, 100.0, 0.0);
        ready.push(long.clone());
        SrtfScheduler.schedule(&mut cluster, &mut ready, &mut running, &mut tenants, 0.0);

        let short = job("short", Priority::Med, 4, 1.0, 1.0);
        ready.push(short.clone());
        SrtfScheduler.schedule(&mut cluster, &mut ready, &mut running, &mut tenants, 1.0);

        assert_eq!(short.borrow().state, JobState::Running);
        assert_eq!(long.borrow().state, JobState::Preempted);
    }

    #[test]
    fn job_with_no_fit_and_no_victim_stays_ready() {
        let mut cluster = Cluster::new(vec![Node::new("n0".to_string(), 2, 2048, 0)]);
        let mut ready = Vec::new();
        let mut running = RunningHeap::new();
        let mut tenants = HashMap::from([("t1".to_string(), Tenant::new("t1".to_string()))]);

        let a = job("a", Priority::High, 2, 10.0, 0.0);
        ready.push(a.clone());
        FifoScheduler.schedule(&mut cluster, &mut ready, &mut running, &mut tenants, 0.0);

        let b = job("b", Priority::High, 2, 5.0, 1.0);
        ready.push(b.clone());
        FifoScheduler.schedule(&mut cluster, &mut ready, &mut running, &mut tenants, 1.0);

        assert_eq!(b.borrow().state, JobState::Queued);
        assert!(ready.iter().any(|j| j.borrow().id == "b"));
    }
}
