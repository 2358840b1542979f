//! Plugin discovery and sequential execution.

use std::fmt;
use std::path::{Path, PathBuf};

use serde_json::Value;
use specrepo_storage::fragments::{FRAGMENT_EXTENSIONS, glob_paths};

use crate::declarative::DeclarativePlugin;
use crate::error::PluginError;
use crate::plugin::{NodeMatch, Plugin, PluginContext};
use crate::query::Query;

/// Constructor for a compiled plugin unit.
///
/// Units are created fresh for every run so state never leaks between runs.
pub type PluginFactory = fn() -> Box<dyn Plugin>;

/// Ordered set of plugin units applied to a document.
///
/// Compiled units registered with [`with_plugin`](Self::with_plugin) run first,
/// in registration order, followed by plugin files found in the plugin
/// directory in filename order. A missing plugin directory contributes nothing.
#[derive(Clone, Default)]
pub struct PluginPipeline {
    plugins_dir: Option<PathBuf>,
    builtins: Vec<PluginFactory>,
}

impl fmt::Debug for PluginPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginPipeline")
            .field("plugins_dir", &self.plugins_dir)
            .field("builtins", &self.builtins.len())
            .finish()
    }
}

impl PluginPipeline {
    /// Create a pipeline reading plugin files from `plugins_dir`.
    pub fn new(plugins_dir: Option<PathBuf>) -> Self {
        Self {
            plugins_dir,
            builtins: Vec::new(),
        }
    }

    /// Register a compiled plugin unit.
    #[must_use]
    pub fn with_plugin(mut self, factory: PluginFactory) -> Self {
        self.builtins.push(factory);
        self
    }

    pub fn plugins_dir(&self) -> Option<&Path> {
        self.plugins_dir.as_deref()
    }

    /// Instantiate every plugin unit in execution order.
    ///
    /// # Errors
    ///
    /// Returns an error if a plugin file can't be read or interpreted.
    pub fn discover(&self) -> Result<Vec<Box<dyn Plugin>>, PluginError> {
        let mut plugins: Vec<Box<dyn Plugin>> =
            self.builtins.iter().map(|factory| factory()).collect();

        if let Some(dir) = &self.plugins_dir {
            for path in glob_paths(dir, "*")? {
                let is_plugin_file = path
                    .extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| FRAGMENT_EXTENSIONS.contains(&e));
                if !is_plugin_file {
                    continue;
                }
                plugins.push(Box::new(DeclarativePlugin::load(&path)?));
            }
        }

        Ok(plugins)
    }

    /// Apply every plugin unit to `document`.
    ///
    /// # Errors
    ///
    /// Returns the first discovery, query or hook error; later plugins don't run.
    pub fn run(&self, document: &mut Value, context: &PluginContext) -> Result<(), PluginError> {
        let plugins = self.discover()?;
        if plugins.is_empty() {
            return Ok(());
        }
        tracing::debug!(count = plugins.len(), action = ?context.action, "Running plugins");

        for mut plugin in plugins {
            if !plugin.applies_to(context.action) {
                tracing::debug!(plugin = plugin.name(), "Plugin skipped for action");
                continue;
            }
            run_plugin(plugin.as_mut(), document, context)?;
        }

        Ok(())
    }
}

fn run_plugin(
    plugin: &mut dyn Plugin,
    document: &mut Value,
    context: &PluginContext,
) -> Result<(), PluginError> {
    plugin.init(document, context)?;

    let query = Query::parse(plugin.path_expression())?;
    let matches = query.evaluate(document);
    tracing::debug!(
        plugin = plugin.name(),
        expression = query.expression(),
        matches = matches.len(),
        "Processing plugin matches"
    );

    for path in &matches {
        plugin.process(&mut NodeMatch::new(document, path))?;
    }

    plugin.finish(document)
}
