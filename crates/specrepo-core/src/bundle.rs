//! Assemble one document from a spec root's main file and fragments.

use serde_json::{Map, Value};
use specrepo_plugins::{PipelineAction, PluginContext, PluginPipeline};
use specrepo_storage::codec::filename_to_path;
use specrepo_storage::document::read_document;
use specrepo_storage::fragments::read_fragments;
use specrepo_storage::{OPENAPI3_COMPONENTS, SpecRoot, StorageError};

use crate::error::SpecError;
use crate::headers::inline_headers;
use crate::samples::attach_code_samples;

/// Key holding bundled child documents.
pub const CHILDREN_KEY: &str = "children";

/// Steps of [`bundle`] that can be skipped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BundleOptions {
    pub skip_code_samples: bool,
    pub skip_headers_inlining: bool,
    pub skip_plugins: bool,
    /// Don't attach child roots under `children`.
    pub skip_children: bool,
}

impl BundleOptions {
    /// Options producing a document that can be split back without changes:
    /// no code samples, no header inlining.
    pub fn editable() -> Self {
        Self {
            skip_code_samples: true,
            skip_headers_inlining: true,
            ..Self::default()
        }
    }
}

/// Assemble the full document of `root`.
///
/// Steps, in order: read the main file, add `paths` from `paths/`, add
/// `components` (OpenAPI 3) or `definitions` (Swagger 2) from their fragment
/// directories, attach code samples, inline header references, run plugins,
/// attach bundled child roots under `children` (omitted when there are none).
/// Children are bundled with the same options except that plugins never run
/// on them.
///
/// # Errors
///
/// Returns [`SpecError::Conflict`] if an entity is declared both inline and in
/// a fragment directory, plus any storage, sample, header or plugin error.
pub fn bundle(
    root: &SpecRoot,
    options: &BundleOptions,
    pipeline: &PluginPipeline,
) -> Result<Value, SpecError> {
    tracing::debug!(basedir = %root.basedir().display(), "Bundling spec");
    let mut document = read_main(root)?;

    let spec = as_spec_mut(&mut document, root)?;
    add_paths(spec, root)?;
    if is_openapi3(spec) {
        add_components(spec, root)?;
    } else {
        add_definitions(spec, root)?;
    }

    let code_samples_dir = root.code_samples_dir();
    if !options.skip_code_samples && code_samples_dir.is_dir() {
        tracing::debug!("Adding code samples to spec");
        attach_code_samples(&mut document, &code_samples_dir)?;
    }

    if !options.skip_headers_inlining {
        inline_headers(&mut document)?;
    }

    if !options.skip_plugins {
        let context = PluginContext::new(root.basedir(), PipelineAction::Bundle);
        pipeline.run(&mut document, &context)?;
    }

    if !options.skip_children {
        let child_options = BundleOptions {
            skip_plugins: true,
            ..*options
        };
        let children = bundle_children(root, &child_options, pipeline)?;
        if let Some(children) = children.filter(|c| !c.is_empty()) {
            as_spec_mut(&mut document, root)?
                .insert(CHILDREN_KEY.to_owned(), Value::Object(children));
        }
    }

    Ok(document)
}

/// Bundle every child root of `root`, keyed by lowercased directory name.
///
/// Returns `None` if `root` does not exist. Child directories without a main
/// file are skipped.
pub(crate) fn bundle_children(
    root: &SpecRoot,
    options: &BundleOptions,
    pipeline: &PluginPipeline,
) -> Result<Option<Map<String, Value>>, SpecError> {
    let Some(children) = root.children()? else {
        return Ok(None);
    };

    let mut bundled = Map::new();
    for child in children {
        if !child.root.main_file().is_file() {
            tracing::debug!(
                dir = %child.root.basedir().display(),
                "Skipping directory without main file"
            );
            continue;
        }
        let key = child.key();
        if bundled.contains_key(&key) {
            return Err(StorageError::DuplicateKey {
                key,
                dir: root.basedir().to_path_buf(),
            }
            .into());
        }
        bundled.insert(key, bundle(&child.root, options, pipeline)?);
    }

    Ok(Some(bundled))
}

/// Whether the document uses the OpenAPI 3 `components` layout.
pub(crate) fn is_openapi3(spec: &Map<String, Value>) -> bool {
    is_declared(spec.get("openapi"))
}

/// Whether an optional member counts as declared (present, not null or false).
pub(crate) fn is_declared(value: Option<&Value>) -> bool {
    value.is_some_and(|v| !matches!(v, Value::Null | Value::Bool(false)))
}

fn read_main(root: &SpecRoot) -> Result<Value, SpecError> {
    Ok(read_document(&root.main_file())?)
}

pub(crate) fn as_spec_mut<'a>(
    document: &'a mut Value,
    root: &SpecRoot,
) -> Result<&'a mut Map<String, Value>, SpecError> {
    document.as_object_mut().ok_or_else(|| SpecError::InvalidDocument {
        path: root.main_file(),
        message: "document root must be a mapping".to_owned(),
    })
}

fn add_paths(spec: &mut Map<String, Value>, root: &SpecRoot) -> Result<(), SpecError> {
    let paths_dir = root.paths_dir();
    if !paths_dir.is_dir() {
        return Ok(());
    }
    if is_declared(spec.get("paths")) {
        return Err(SpecError::Conflict {
            entity: "paths".to_owned(),
            dir: paths_dir,
        });
    }

    tracing::debug!("Adding paths to spec");
    let paths = read_fragments(&paths_dir, filename_to_path)?;
    spec.insert("paths".to_owned(), Value::Object(paths));
    Ok(())
}

fn add_components(spec: &mut Map<String, Value>, root: &SpecRoot) -> Result<(), SpecError> {
    let components_dir = root.components_dir();
    if !components_dir.is_dir() {
        return Ok(());
    }

    let inline = spec.get("components").and_then(Value::as_object);
    let mut categories = Vec::new();
    for category in OPENAPI3_COMPONENTS {
        let dir = components_dir.join(category);
        if !dir.is_dir() {
            continue;
        }
        if inline.is_some_and(|c| is_declared(c.get(category))) {
            return Err(SpecError::Conflict {
                entity: format!("components.{category}"),
                dir,
            });
        }
        tracing::debug!(category, "Adding components to spec");
        categories.push((category, read_fragments(&dir, str::to_owned)?));
    }
    if categories.is_empty() {
        return Ok(());
    }

    let components = spec
        .entry("components")
        .or_insert_with(|| Value::Object(Map::new()));
    if !components.is_object() {
        *components = Value::Object(Map::new());
    }
    if let Value::Object(components) = components {
        for (category, fragments) in categories {
            components.insert(category.to_owned(), Value::Object(fragments));
        }
    }
    Ok(())
}

fn add_definitions(spec: &mut Map<String, Value>, root: &SpecRoot) -> Result<(), SpecError> {
    let definitions_dir = root.definitions_dir();
    if !definitions_dir.is_dir() {
        return Ok(());
    }
    if is_declared(spec.get("definitions")) {
        return Err(SpecError::Conflict {
            entity: "definitions".to_owned(),
            dir: definitions_dir,
        });
    }

    tracing::debug!("Adding definitions to spec");
    let definitions = read_fragments(&definitions_dir, str::to_owned)?;
    spec.insert("definitions".to_owned(), Value::Object(definitions));
    Ok(())
}
