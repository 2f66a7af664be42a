//! Core data model: jobs, nodes, tenants, and the resources they contend over.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

/// A job's priority class. Unrecognized priority strings from configuration
/// parse to `None`; callers treat an unrecognized priority as value `0`,
/// ranking below every known class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Med,
    High,
}

impl Priority {
    /// Ordinal used for comparisons and victim selection. Higher outranks lower.
    pub fn priority_value(self) -> i32 {
        match self {
            Priority::Low => 1,
            Priority::Med => 2,
            Priority::High => 3,
        }
    }

    pub fn parse(s: &str) -> Option<Priority> {
        match s {
            "low" => Some(Priority::Low),
            "med" => Some(Priority::Med),
            "high" => Some(Priority::High),
            _ => None,
        }
    }
}

/// Ordinal for an optional priority, where an unrecognized or absent value
/// ranks at `0`, below every known class.
pub fn priority_value(p: Option<Priority>) -> i32 {
    p.map(Priority::priority_value).unwrap_or(0)
}

pub type JobId = String;
pub type TenantId = String;
pub type NodeId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobState {
    Queued,
    Running,
    Preempted,
    Completed,
}

/// A unit of work submitted by a tenant.
///
/// `remaining_time` is consumed as the job runs and is the quantity schedulers
/// compare against (SRTF) or drain to zero (completion). `wait_time` accrues
/// across every period the job spends ready-but-not-running, including after
/// a preemption.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub tenant_id: TenantId,
    pub priority: Option<Priority>,
    pub cpu: u32,
    pub ram_mb: u32,
    pub gpus: u32,
    pub duration: f64,
    pub remaining_time: f64,
    pub arrival_time: f64,
    pub start_time: Option<f64>,
    pub end_time: Option<f64>,
    pub wait_time: f64,
    pub last_start_time: Option<f64>,
    pub preemption_time: Option<f64>,
    pub state: JobState,
    pub node_id: Option<NodeId>,
}

impl Job {
    pub fn new(
        id: JobId,
        tenant_id: TenantId,
        priority: Option<Priority>,
        cpu: u32,
        ram_mb: u32,
        gpus: u32,
        duration: f64,
        arrival_time: f64,
    ) -> Self {
        Job {
            id,
            tenant_id,
            priority,
            cpu,
            ram_mb,
            gpus,
            duration,
            remaining_time: duration,
            arrival_time,
            start_time: None,
            end_time: None,
            wait_time: 0.0,
            last_start_time: None,
            preemption_time: None,
            state: JobState::Queued,
            node_id: None,
        }
    }

    pub fn priority_value(&self) -> i32 {
        priority_value(self.priority)
    }
}

/// Shared handle used by the engine's internal queues (ready queue, running
/// heap, per-node running set) so all of them observe the same mutable job.
pub type JobHandle = Rc<RefCell<Job>>;

/// A compute node with fixed multi-resource capacity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub cpu_capacity: u32,
    pub ram_capacity_mb: u32,
    pub gpu_capacity: u32,
    pub cpu_used: u32,
    pub ram_used_mb: u32,
    pub gpu_used: u32,
    #[serde(skip)]
    pub running_jobs: Vec<JobId>,
}

impl Node {
    pub fn new(id: NodeId, cpu_capacity: u32, ram_capacity_mb: u32, gpu_capacity: u32) -> Self {
        Node {
            id,
            cpu_capacity,
            ram_capacity_mb,
            gpu_capacity,
            cpu_used: 0,
            ram_used_mb: 0,
            gpu_used: 0,
            running_jobs: Vec::new(),
        }
    }

    pub fn can_allocate(&self, job: &Job) -> bool {
        self.cpu_used + job.cpu <= self.cpu_capacity
            && self.ram_used_mb + job.ram_mb <= self.ram_capacity_mb
            && self.gpu_used + job.gpus <= self.gpu_capacity
    }

    /// Reserves resources for `job`. Callers must have checked
    /// [`Node::can_allocate`] first; violating that precondition is a
    /// programming error, reported as [`crate::error::SimError::ResourceExhausted`].
    pub fn allocate(&mut self, job: &Job) -> Result<(), crate::error::SimError> {
        if !self.can_allocate(job) {
            return Err(crate::error::SimError::ResourceExhausted {
                node: self.id.clone(),
                job: job.id.clone(),
            });
        }
        self.cpu_used += job.cpu;
        self.ram_used_mb += job.ram_mb;
        self.gpu_used += job.gpus;
        self.running_jobs.push(job.id.clone());
        Ok(())
    }

    /// Releases resources held by `job_id`. A no-op if the job is not
    /// currently tracked on this node.
    pub fn release(&mut self, job: &Job) {
        if let Some(pos) = self.running_jobs.iter().position(|id| id == &job.id) {
            self.running_jobs.remove(pos);
            self.cpu_used = self.cpu_used.saturating_sub(job.cpu);
            self.ram_used_mb = self.ram_used_mb.saturating_sub(job.ram_mb);
            self.gpu_used = self.gpu_used.saturating_sub(job.gpus);
        }
    }

    /// Fraction of CPU capacity currently reserved, in `[0, 100]`.
    pub fn cpu_util_percent(&self) -> f64 {
        if self.cpu_capacity == 0 {
            0.0
        } else {
            100.0 * self.cpu_used as f64 / self.cpu_capacity as f64
        }
    }
}

/// The fixed set of nodes in the simulated cluster. Placement is first-fit in
/// node-id order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cluster {
    pub nodes: Vec<Node>,
}

impl Cluster {
    pub fn new(nodes: Vec<Node>) -> Self {
        Cluster { nodes }
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// First node (in declared order) with enough free capacity for `job`.
    pub fn find_fit(&self, job: &Job) -> Option<NodeId> {
        self.nodes
            .iter()
            .find(|n| n.can_allocate(job))
            .map(|n| n.id.clone())
    }

    /// Average CPU utilization across all nodes, in `[0, 100]`.
    pub fn cpu_util_percent(&self) -> f64 {
        if self.nodes.is_empty() {
            0.0
        } else {
            self.nodes.iter().map(Node::cpu_util_percent).sum::<f64>() / self.nodes.len() as f64
        }
    }
}

/// A tenant submitting jobs into the simulated cluster. Tracks lifecycle
/// lists used to compute per-tenant fairness and throughput metrics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Tenant {
    pub id: TenantId,
    pub submitted_jobs: Vec<JobId>,
    pub completed_jobs: Vec<JobId>,
    pub preempted_jobs: Vec<JobId>,
}

impl Tenant {
    pub fn new(id: TenantId) -> Self {
        Tenant {
            id,
            submitted_jobs: Vec::new(),
            completed_jobs: Vec::new(),
            preempted_jobs: Vec::new(),
        }
    }

    pub fn total_jobs(&self) -> usize {
        self.submitted_jobs.len()
    }

    /// Count of jobs this tenant has seen through to completion.
    pub fn throughput(&self) -> u64 {
        self.completed_jobs.len() as u64
    }

    /// Average wait time across completed jobs, keyed by looking them up in
    /// `jobs_by_id`. Returns `0.0` if no completed job can be found.
    pub fn avg_wait_time(&self, jobs_by_id: &HashMap<JobId, JobHandle>) -> f64 {
        let waits: Vec<f64> = self
            .completed_jobs
            .iter()
            .filter_map(|id| jobs_by_id.get(id))
            .map(|job| job.borrow().wait_time)
            .collect();
        if waits.is_empty() {
            0.0
        } else {
            waits.iter().sum::<f64>() / waits.len() as f64
        }
    }
}
