//! Background Tasks Module
//!
//! Contains background tasks that run periodically during server operation.
//!
//! # Tasks
//! - Artifact cleanup: removes TTL-expired artifacts every cleanup interval

mod cleanup;

pub use cleanup::spawn_cleanup_task;
