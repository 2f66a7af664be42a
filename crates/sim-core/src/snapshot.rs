//! Wire shapes emitted by a live run and returned at its end.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunningJobView {
    pub id: String,
    pub tenant_id: String,
    pub cpu: u32,
    pub start_time: Option<f64>,
}

/// A point-in-time view of the running simulation. The live stream emits one
/// of these only when it differs from the previous snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub time: f64,
    pub queue_len: usize,
    pub running_jobs: Vec<RunningJobView>,
    pub completed_jobs: usize,
    pub cpu_util: f64,
}

/// Final results once a run stops or completes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunResults {
    /// Reserved for a collaborator to populate; the kernel does not compute
    /// per-resource-type utilization windows.
    pub utilization: HashMap<String, f64>,
    pub throughput: HashMap<String, u64>,
    pub avg_wait: HashMap<String, f64>,
    pub fairness: f64,
}
