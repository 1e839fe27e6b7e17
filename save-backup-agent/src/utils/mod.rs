//! Utility modules for the save backup agent.

pub mod errors;
pub mod logger;

pub use errors::{AgentError, Result};
