//! Save Backup Agent Library
//!
//! Keeps a bounded, rotating set of incremental backups next to each game
//! save, detects changes by modification time, and resumes or rolls forward
//! backups interrupted by a crash.

pub mod config;
pub mod daemon;
pub mod discovery;
pub mod executor;
pub mod fs;
pub mod models;
pub mod store;
pub mod transfer;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use executor::{BackupEngine, PassSummary};
pub use models::{BackupSet, SaveKey};
pub use store::MetadataStore;
pub use utils::errors::AgentError;
pub type Result<T> = std::result::Result<T, AgentError>;
