//! Storage error types.

use std::path::{Path, PathBuf};

/// Error raised while reading or writing spec files.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Filesystem failure on read, write, list or delete.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        /// File or directory being accessed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Malformed document text.
    #[error("Can not parse OpenAPI file {}: {message}", path.display())]
    Parse {
        /// File being parsed (empty for in-memory text).
        path: PathBuf,
        /// Parser message.
        message: String,
    },

    /// Two fragment files decode to the same object key.
    #[error("{key} definition already exists in {}", dir.display())]
    DuplicateKey {
        /// Decoded object key.
        key: String,
        /// Fragment directory.
        dir: PathBuf,
    },

    /// Document could not be serialized.
    #[error("Failed to serialize {}: {message}", path.display())]
    Serialize {
        /// Target file.
        path: PathBuf,
        /// Serializer message.
        message: String,
    },

    /// Invalid glob pattern.
    #[error("Invalid glob pattern: {0}")]
    Pattern(#[from] glob::PatternError),
}

impl StorageError {
    /// Create an I/O error with path context.
    #[must_use]
    pub fn io(source: std::io::Error, path: impl Into<PathBuf>) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a parse error with path context.
    #[must_use]
    pub fn parse(path: &Path, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }

    /// Check whether the error is a missing file.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound)
    }
}
