//! CLI error types.

use specrepo_config::ConfigError;
use specrepo_core::SpecError;
use specrepo_storage::StorageError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Storage(#[from] StorageError),

    #[error("{0}")]
    Spec(#[from] SpecError),

    #[error("{0}")]
    Server(String),
}
