//! Error types for document operations.

use std::path::PathBuf;

use specrepo_plugins::PluginError;
use specrepo_storage::StorageError;

/// Error raised by bundle, split and sync operations.
///
/// Every variant is fatal for the operation that raised it. Nothing is retried,
/// and files written before the failure stay as they are.
#[derive(Debug, thiserror::Error)]
pub enum SpecError {
    /// Filesystem, parse or duplicate-key failure.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Entity declared both inline and in a fragment directory.
    #[error("All {entity} should be defined inside {}", dir.display())]
    Conflict {
        /// Inline entity name (`paths`, `definitions`, `components.schemas`, ...).
        entity: String,
        /// Fragment directory that also declares it.
        dir: PathBuf,
    },

    /// Code sample for an operation missing from `paths`.
    #[error("Code sample for non-existing operation: \"{path}\",{verb} ({lang})")]
    DanglingSample {
        path: String,
        verb: String,
        lang: String,
    },

    /// Operation already declares `x-code-samples` inline.
    #[error("All code samples for \"{path}\",{verb} should be defined inside {}", dir.display())]
    DuplicateSampleField {
        path: String,
        verb: String,
        dir: PathBuf,
    },

    /// Header reference without a target.
    #[error("Unresolved header reference {reference}")]
    UnresolvedHeader { reference: String },

    /// Plugin discovery or execution failure.
    #[error(transparent)]
    Plugin(#[from] PluginError),

    /// Child root wired before its parent was mounted.
    #[error("No mounted parent for child mount {mount}")]
    UnmountedParent { mount: String },

    /// Document root is not a mapping.
    #[error("Invalid document in {}: {message}", path.display())]
    InvalidDocument { path: PathBuf, message: String },
}
