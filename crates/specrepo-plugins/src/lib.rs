//! Document transformation plugins.
//!
//! A plugin unit selects nodes with a path expression and rewrites them in
//! place. Units run in sequence over one mutable document, so each unit sees
//! the result of all units before it. See [`PluginPipeline`] for discovery
//! order and [`query`] for the supported expression syntax.

mod declarative;
mod error;
mod pipeline;
mod plugin;
pub mod query;

pub use declarative::{DeclarativePlugin, DocumentAction, NodeAction};
pub use error::PluginError;
pub use pipeline::{PluginFactory, PluginPipeline};
pub use plugin::{NodeMatch, PipelineAction, Plugin, PluginContext};
