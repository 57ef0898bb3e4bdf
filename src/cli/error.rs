//! CLI error types and conversions

use crate::client::ClientError;
use crate::manager::ManagerError;

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Job API client error
    #[error("client error: {0}")]
    ClientError(#[from] ClientError),

    /// Manager construction error
    #[error("manager error: {0}")]
    ManagerError(#[from] ManagerError),

    /// Invalid command-line argument
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Failed to read the criteria payload file
    #[error("failed to read payload file: {0}")]
    PayloadIo(#[from] std::io::Error),

    /// Criteria payload file is not valid JSON
    #[error("failed to parse payload file: {0}")]
    PayloadJson(#[from] serde_json::Error),
}
