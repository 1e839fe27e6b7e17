//! Copy progress accounting.

pub mod progress;
