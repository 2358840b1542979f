//! Plugin error types.

use std::path::PathBuf;

use specrepo_storage::StorageError;

/// Error raised while loading or running plugins.
#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    /// Malformed node query expression.
    #[error("Invalid path expression {expression:?}: {message}")]
    Query {
        /// The offending expression.
        expression: String,
        /// What went wrong and where.
        message: String,
    },

    /// Plugin file could not be interpreted.
    #[error("Failed to load plugin {}: {message}", path.display())]
    Load {
        /// Plugin file.
        path: PathBuf,
        /// Loader message.
        message: String,
    },

    /// A plugin hook failed.
    #[error("Plugin {plugin} failed: {message}")]
    Action {
        /// Plugin name.
        plugin: String,
        /// Hook message.
        message: String,
    },

    /// Plugin directory or file could not be read.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl PluginError {
    /// Create a hook failure for the named plugin.
    #[must_use]
    pub fn action(plugin: &str, message: impl Into<String>) -> Self {
        Self::Action {
            plugin: plugin.to_owned(),
            message: message.into(),
        }
    }
}
