//! Error types for the simulation kernel.

use thiserror::Error;

use crate::model::{JobId, NodeId};

#[derive(Error, Debug)]
pub enum SimError {
    /// Configuration failed validation before a run was started.
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    /// The configured scheduler choice has no implementation.
    #[error("unknown scheduler: {0}")]
    SchedulerUnknown(String),

    /// `Node::allocate` was called without a prior `can_allocate` check.
    #[error("node {node} cannot accommodate job {job}")]
    ResourceExhausted { node: NodeId, job: JobId },
}
