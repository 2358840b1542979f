//! Reconcile an incoming document with an existing spec root.

use std::fs;
use std::path::{Component, Path};

use serde_json::{Map, Value};
use specrepo_plugins::{PipelineAction, PluginContext, PluginPipeline};
use specrepo_storage::{SpecRoot, StorageError, is_child_name, parse};

use crate::bundle::{BundleOptions, CHILDREN_KEY, as_spec_mut, bundle_children};
use crate::error::SpecError;
use crate::mounts::MountRegistry;
use crate::split::split;

/// Document replacing the externally visible copy of a root.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncInput {
    /// Raw document text, written verbatim to flat roots.
    Text(String),
    /// Already parsed document.
    Document(Value),
}

impl From<String> for SyncInput {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Value> for SyncInput {
    fn from(document: Value) -> Self {
        Self::Document(document)
    }
}

/// Collaborators of [`sync`].
#[derive(Debug, Clone, Copy)]
pub struct SyncContext<'a> {
    pub pipeline: &'a PluginPipeline,
    /// Registry receiving mounts for child roots (none outside the server).
    pub registry: Option<&'a MountRegistry>,
    /// Skip existing-children merging and plugins.
    pub skip_plugins: bool,
}

impl<'a> SyncContext<'a> {
    pub fn new(pipeline: &'a PluginPipeline) -> Self {
        Self {
            pipeline,
            registry: None,
            skip_plugins: false,
        }
    }

    #[must_use]
    pub fn with_registry(mut self, registry: &'a MountRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    #[must_use]
    pub fn skip_plugins(mut self, skip: bool) -> Self {
        self.skip_plugins = skip;
        self
    }
}

/// Write `input` back into `root`.
///
/// Text sent to a flat root (no `paths/`, `components/` or `definitions/`) is
/// written to the main file verbatim. Otherwise the document is parsed, the
/// root's existing children are bundled and merged under `children` (incoming
/// children win), plugins run with the [`PipelineAction::Sync`] action, every
/// child is split into its own root and mounted, and the rest is split into
/// `root`. Children never end up in a main file.
///
/// # Errors
///
/// Returns the first parse, plugin, storage or mount error. Files written
/// before the error are kept.
pub fn sync(
    input: SyncInput,
    root: &SpecRoot,
    context: &SyncContext<'_>,
) -> Result<(), SpecError> {
    let mut document = match input {
        SyncInput::Text(text) if !root.is_fragmented() => return write_flat(root, &text),
        SyncInput::Text(text) => parse(&text)?,
        SyncInput::Document(document) => document,
    };

    if !context.skip_plugins {
        merge_existing_children(&mut document, root, context.pipeline)?;
        let plugin_context = PluginContext::new(root.basedir(), PipelineAction::Sync);
        context.pipeline.run(&mut document, &plugin_context)?;
    }

    let children = as_spec_mut(&mut document, root)?.shift_remove(CHILDREN_KEY);
    match children {
        Some(Value::Object(children)) => {
            split_children(lowercase_keys(children, root)?, root, context)?;
        }
        Some(Value::Null) | None => {}
        Some(_) => {
            return Err(SpecError::InvalidDocument {
                path: root.main_file(),
                message: format!("`{CHILDREN_KEY}` must be a mapping"),
            });
        }
    }

    split(document, root)?;
    Ok(())
}

fn write_flat(root: &SpecRoot, text: &str) -> Result<(), SpecError> {
    let basedir = root.basedir();
    fs::create_dir_all(basedir).map_err(|e| StorageError::io(e, basedir))?;
    let main_file = root.main_file();
    fs::write(&main_file, text).map_err(|e| StorageError::io(e, &main_file))?;
    tracing::debug!(path = %main_file.display(), "Wrote flat spec");
    Ok(())
}

/// Attach the root's current children under `children`, keeping incoming ones.
fn merge_existing_children(
    document: &mut Value,
    root: &SpecRoot,
    pipeline: &PluginPipeline,
) -> Result<(), SpecError> {
    let options = BundleOptions {
        skip_plugins: true,
        ..BundleOptions::editable()
    };
    let existing = bundle_children(root, &options, pipeline)?.unwrap_or_default();

    let spec = as_spec_mut(document, root)?;
    let mut children = match spec.shift_remove(CHILDREN_KEY) {
        Some(Value::Object(incoming)) => lowercase_keys(incoming, root)?,
        _ => Map::new(),
    };
    for (key, child) in existing {
        children.entry(key).or_insert(child);
    }
    if !children.is_empty() {
        spec.insert(CHILDREN_KEY.to_owned(), Value::Object(children));
    }
    Ok(())
}

/// Child keys are lowercase; two incoming keys differing only in case collide.
fn lowercase_keys(
    children: Map<String, Value>,
    root: &SpecRoot,
) -> Result<Map<String, Value>, SpecError> {
    let mut lowercased = Map::new();
    for (key, child) in children {
        let key = key.to_lowercase();
        if lowercased.contains_key(&key) {
            return Err(StorageError::DuplicateKey {
                key,
                dir: root.basedir().to_path_buf(),
            }
            .into());
        }
        lowercased.insert(key, child);
    }
    Ok(lowercased)
}

fn split_children(
    children: Map<String, Value>,
    parent: &SpecRoot,
    context: &SyncContext<'_>,
) -> Result<(), SpecError> {
    for (key, mut child) in children {
        let dir_name = child_dir_name(parent, &key)?;
        let child_root = parent.child(&dir_name);

        let grandchildren = as_spec_mut(&mut child, &child_root)?.shift_remove(CHILDREN_KEY);
        let created = split(child, &child_root)?;
        if created {
            tracing::info!(
                child = %key,
                basedir = %child_root.basedir().display(),
                "Created child spec root"
            );
        }

        if let Some(registry) = context.registry {
            registry.mount_child(parent, &child_root)?;
        }

        if let Some(Value::Object(grandchildren)) = grandchildren {
            split_children(grandchildren, &child_root, context)?;
        }
    }
    Ok(())
}

/// Directory for the child keyed `key`: an existing child directory matching it
/// case-insensitively, or `key` itself.
fn child_dir_name(parent: &SpecRoot, key: &str) -> Result<String, SpecError> {
    let mut components = Path::new(key).components();
    let is_single_dir = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    );
    if !is_single_dir || !is_child_name(key) {
        return Err(SpecError::InvalidDocument {
            path: parent.main_file(),
            message: format!("invalid child name {key:?}"),
        });
    }

    let existing = parent
        .children()?
        .unwrap_or_default()
        .into_iter()
        .find(|c| c.name.eq_ignore_ascii_case(key))
        .map(|c| c.name);
    Ok(existing.unwrap_or_else(|| key.to_owned()))
}
