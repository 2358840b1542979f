//! CLI command implementations.

pub(crate) mod bundle;
pub(crate) mod serve;
pub(crate) mod sync;

pub(crate) use bundle::BundleArgs;
pub(crate) use serve::ServeArgs;
pub(crate) use sync::SyncArgs;
