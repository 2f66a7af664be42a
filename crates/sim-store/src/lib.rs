#![forbid(unsafe_code)]
#![deny(unreachable_pub)]

//! Persistence boundary for simulation runs: a `RunStore` trait and a
//! JSON-file reference implementation. An external KV-backed `RunStore`
//! (Redis or similar, including TTL policy) is a collaborator's concern.

mod error;
mod store;

pub use error::StoreError;
pub use store::{FileRunStore, RunStore};
