//! Custom error types for the save backup agent.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Metadata error: {0}")]
    Metadata(String),

    #[error("Save {0} was modified while backing up, all files need to be checked again")]
    SourceModified(String),

    #[error("Save folder not found: {}", .0.display())]
    SourceMissing(PathBuf),

    #[error("Another instance is already running (lock held on {})", .0.display())]
    InstanceLocked(PathBuf),
}

pub type Result<T> = std::result::Result<T, AgentError>;
