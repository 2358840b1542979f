//! Application state.
//!
//! Shared state for all request handlers.

use std::sync::Mutex;

use specrepo_core::{BundleOptions, MountRegistry};
use specrepo_plugins::PluginPipeline;

/// Application state shared across all handlers.
pub(crate) struct AppState {
    /// Spec roots by mount path, extended by syncs that create child roots.
    pub(crate) registry: MountRegistry,
    /// Plugins applied on bundle and sync.
    pub(crate) pipeline: PluginPipeline,
    /// Steps applied when bundling for `openapi.json` and `openapi.yaml`.
    pub(crate) bundle_options: BundleOptions,
    /// Application version for cache invalidation.
    pub(crate) version: String,
    /// Serializes syncs; concurrent writers would race on the same files.
    pub(crate) sync_lock: Mutex<()>,
}
