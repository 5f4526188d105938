//! CLI error type.

use shopstate_core::{CanonicalIdError, IdentityError};
use shopstate_engine::{ConfigError, StorageError};
use thiserror::Error;

/// Errors surfaced to the user before exiting with status 1.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Invalid product: {0}")]
    Identity(#[from] IdentityError),

    #[error("Invalid id: {0}")]
    Id(#[from] CanonicalIdError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
