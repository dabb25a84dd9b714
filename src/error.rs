//! Error types for vm-warden.

use thiserror::Error;

/// Warden error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// VM-management API error.
    #[error("Management API error: {0}")]
    Management(String),

    /// Transport launch error.
    #[error("Launch failed: {0}")]
    Launch(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for vm-warden.
pub type Result<T, E = Error> = std::result::Result<T, E>;
