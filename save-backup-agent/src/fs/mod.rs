//! File system helpers: tree walking and timestamp probes.

pub mod metadata;
pub mod walker;
