//! Decompose a document back into a spec root's fragment files.

use std::fs;

use serde_json::{Map, Value};
use specrepo_storage::codec::path_to_filename;
use specrepo_storage::document::write_if_changed;
use specrepo_storage::fragments::{WriteReport, write_fragments};
use specrepo_storage::{OPENAPI3_COMPONENTS, SpecRoot, StorageError};

use crate::bundle::{as_spec_mut, is_openapi3};
use crate::error::SpecError;

/// Write `document` into `root` and return whether the root was created.
///
/// A missing root is created together with its `paths/` and `components/`
/// directories. `paths`, the OpenAPI 3 component categories and Swagger 2
/// `definitions` move to their fragment directories when those directories
/// exist; everything else stays in the main file. Every write is diff-aware and
/// files of removed entities are deleted. `children` is not handled here.
///
/// # Errors
///
/// Returns [`SpecError::InvalidDocument`] if the document is not a mapping and
/// storage errors for failed writes.
pub fn split(mut document: Value, root: &SpecRoot) -> Result<bool, SpecError> {
    let spec = as_spec_mut(&mut document, root)?;

    let created = !root.exists();
    if created {
        for dir in [root.basedir().to_path_buf(), root.paths_dir(), root.components_dir()] {
            fs::create_dir_all(&dir).map_err(|e| StorageError::io(e, &dir))?;
        }
        tracing::info!(basedir = %root.basedir().display(), "Created spec root");
    }

    split_paths(spec, root)?;
    if is_openapi3(spec) {
        split_components(spec, root)?;
    } else {
        split_definitions(spec, root)?;
    }

    write_if_changed(&root.main_file(), &document)?;
    Ok(created)
}

fn split_paths(spec: &mut Map<String, Value>, root: &SpecRoot) -> Result<(), SpecError> {
    let paths_dir = root.paths_dir();
    if !paths_dir.is_dir() {
        return Ok(());
    }
    let Some(Value::Object(paths)) = spec.get("paths") else {
        return Ok(());
    };

    let mut encoded = Map::new();
    for (path, item) in paths {
        let stem = path_to_filename(path);
        if encoded.contains_key(&stem) {
            return Err(StorageError::DuplicateKey {
                key: stem,
                dir: paths_dir,
            }
            .into());
        }
        encoded.insert(stem, item.clone());
    }
    log_report("paths", &write_fragments(&paths_dir, &encoded)?);
    spec.shift_remove("paths");
    Ok(())
}

fn split_components(spec: &mut Map<String, Value>, root: &SpecRoot) -> Result<(), SpecError> {
    let components_dir = root.components_dir();
    if !components_dir.is_dir() {
        return Ok(());
    }
    let Some(Value::Object(components)) = spec.get_mut("components") else {
        return Ok(());
    };

    for category in OPENAPI3_COMPONENTS {
        let Some(Value::Object(fragments)) = components.get(category) else {
            continue;
        };
        let dir = components_dir.join(category);
        fs::create_dir_all(&dir).map_err(|e| StorageError::io(e, &dir))?;
        log_report(category, &write_fragments(&dir, fragments)?);
        components.shift_remove(category);
    }

    if components.is_empty() {
        spec.shift_remove("components");
    }
    Ok(())
}

fn split_definitions(spec: &mut Map<String, Value>, root: &SpecRoot) -> Result<(), SpecError> {
    let definitions_dir = root.definitions_dir();
    if !definitions_dir.is_dir() {
        return Ok(());
    }
    let Some(Value::Object(definitions)) = spec.get("definitions") else {
        return Ok(());
    };

    log_report("definitions", &write_fragments(&definitions_dir, definitions)?);
    spec.shift_remove("definitions");
    Ok(())
}

fn log_report(entity: &str, report: &WriteReport) {
    tracing::debug!(
        entity,
        written = report.written.len(),
        unchanged = report.unchanged.len(),
        removed = report.removed.len(),
        "Split fragments"
    );
}
