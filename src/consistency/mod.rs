//! Read-after-write consistency tracking
//!
//! The write path records durable-append watermarks, mints tokens from
//! them, and readers wait until the read-side tracker has caught up to a
//! token before serving.

mod token;
mod tracker;

pub use token::{ConsistencyCoordinate, ConsistencyToken, CONSISTENCY_TOKEN_VERSION};
pub use tracker::{ConsistencyError, ConsistencyTracker};
