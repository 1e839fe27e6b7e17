//! Process-level concerns: single instance and graceful shutdown.

pub mod instance_lock;
pub mod shutdown;
