//! Code samples stored as `code_samples/<lang>/<path>/<verb>` files.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Value, json};
use specrepo_storage::StorageError;
use specrepo_storage::codec::{base_name, filename_to_path};
use specrepo_storage::fragments::glob_files;

use crate::error::SpecError;

/// Operation field receiving the attached samples.
pub const CODE_SAMPLES_FIELD: &str = "x-code-samples";

/// Location of one sample file.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct SampleKey {
    path: String,
    verb: String,
    lang: String,
}

impl SampleKey {
    /// Decode `<lang>/<encoded path>/<verb>[.ext]` relative to the samples dir.
    fn from_relative(rel_path: &Path) -> Self {
        let dirs = rel_path.parent().unwrap_or(Path::new(""));
        let lang = dirs
            .parent()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default();
        let path = dirs
            .file_name()
            .map(|n| filename_to_path(&n.to_string_lossy()))
            .unwrap_or_default();

        Self {
            path,
            verb: base_name(rel_path),
            lang,
        }
    }
}

impl fmt::Display for SampleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\",{} ({})", self.path, self.verb, self.lang)
    }
}

/// Attach every sample under `dir` to its operation as `{lang, source}` entries.
///
/// Samples for one operation are ordered by language.
///
/// # Errors
///
/// Returns [`SpecError::DanglingSample`] if a sample's operation is not in
/// `paths`, [`SpecError::DuplicateSampleField`] if the operation already has
/// inline samples, and storage errors for unreadable files.
pub fn attach_code_samples(document: &mut Value, dir: &Path) -> Result<(), SpecError> {
    let files = glob_files(dir, "*/*/*", SampleKey::from_relative)?;

    let mut operations: BTreeMap<(String, String), Vec<(String, PathBuf)>> = BTreeMap::new();
    for (key, file) in files {
        operations
            .entry((key.path, key.verb))
            .or_default()
            .push((key.lang, file));
    }

    for ((path, verb), samples) in operations {
        let Some(operation) = document
            .get_mut("paths")
            .and_then(|paths| paths.get_mut(&path))
            .and_then(|item| item.get_mut(&verb))
            .and_then(Value::as_object_mut)
        else {
            let lang = samples.into_iter().next().map(|(lang, _)| lang).unwrap_or_default();
            return Err(SpecError::DanglingSample { path, verb, lang });
        };

        if operation.contains_key(CODE_SAMPLES_FIELD) {
            return Err(SpecError::DuplicateSampleField {
                path,
                verb,
                dir: dir.to_path_buf(),
            });
        }

        let entries = samples
            .into_iter()
            .map(|(lang, file)| {
                let source = fs::read_to_string(&file).map_err(|e| StorageError::io(e, &file))?;
                Ok(json!({"lang": lang, "source": source}))
            })
            .collect::<Result<Vec<_>, SpecError>>()?;
        tracing::debug!(path, verb, count = entries.len(), "Attached code samples");
        operation.insert(CODE_SAMPLES_FIELD.to_owned(), Value::Array(entries));
    }

    Ok(())
}
