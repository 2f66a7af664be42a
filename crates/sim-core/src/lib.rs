#![forbid(unsafe_code)]
#![deny(unreachable_pub)]

//! Discrete-event simulation kernel for a multi-tenant compute cluster
//! scheduler: job generation, preemptive scheduling policies, and a live
//! snapshot stream over the running simulation.

pub mod config;
pub mod control;
pub mod engine;
pub mod error;
pub mod event;
pub mod event_queue;
pub mod generator;
pub mod metrics;
pub mod model;
pub mod running_heap;
pub mod scheduler;
pub mod snapshot;
pub mod stream;

pub use config::{ArrivalModel, NodeSpec, SchedulerKind, SimulationConfig};
pub use control::{start_run, start_run_live, RunHandle};
pub use engine::EngineEvent;
pub use error::SimError;
pub use snapshot::{RunResults, RunningJobView, Snapshot};
pub use stream::SnapshotStream;
