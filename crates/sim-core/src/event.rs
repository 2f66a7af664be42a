//! Simulation events and the ordering used to dispatch them in time order.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    Arrival,
    Completion,
    Preemption,
    Scheduling,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub time: f64,
    pub seq: u64,
    pub kind: EventKind,
    pub job_id: Option<String>,
}

impl Event {
    pub fn new(time: f64, seq: u64, kind: EventKind, job_id: Option<String>) -> Self {
        Event {
            time,
            seq,
            kind,
            job_id,
        }
    }
}

impl Eq for Event {}

// `BinaryHeap` is a max-heap; flipping the comparison here makes `pop()`
// return the earliest event (lowest time, then lowest seq) instead.
impl Ord for Event {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        other
            .time
            .partial_cmp(&self.time)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
