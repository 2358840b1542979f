//! Glob-based fragment directories.
//!
//! A fragment directory stores one entity per file. Reading builds a keyed
//! mapping from decoded filenames; writing reconciles the directory against a
//! mapping, touching only files whose parsed contents changed and deleting files
//! whose keys disappeared.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::codec::base_name;
use crate::document::{read_document, write_if_changed};
use crate::error::StorageError;

/// Extensions recognized as fragment files.
pub const FRAGMENT_EXTENSIONS: [&str; 3] = ["yaml", "yml", "json"];

/// Outcome of [`write_fragments`].
#[derive(Debug, Default, PartialEq, Eq)]
pub struct WriteReport {
    /// Files created or rewritten.
    pub written: Vec<PathBuf>,
    /// Files left untouched because their contents were equal.
    pub unchanged: Vec<PathBuf>,
    /// Orphan files deleted.
    pub removed: Vec<PathBuf>,
}

impl WriteReport {
    /// Whether the directory was modified at all.
    pub fn is_noop(&self) -> bool {
        self.written.is_empty() && self.removed.is_empty()
    }
}

/// List regular files under `dir` matching `pattern`, in glob order.
///
/// Wildcards don't match a leading `.`, so hidden files such as `.DS_Store`
/// are skipped. Returns an empty list if `dir` does not exist.
///
/// # Errors
///
/// Returns an error if the pattern is invalid or an entry can't be read.
pub fn glob_paths(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>, StorageError> {
    let full_pattern = Path::new(&glob::Pattern::escape(&dir.to_string_lossy())).join(pattern);
    let options = glob::MatchOptions {
        require_literal_leading_dot: true,
        ..glob::MatchOptions::new()
    };
    let mut paths = Vec::new();

    for entry in glob::glob_with(&full_pattern.to_string_lossy(), options)? {
        let path = entry.map_err(|e| {
            let path = e.path().to_path_buf();
            StorageError::io(e.into_error(), path)
        })?;
        if path.is_file() {
            paths.push(path);
        }
    }

    Ok(paths)
}

/// Glob files under `dir` and key each one by `key_fn(relative_path)`.
///
/// # Errors
///
/// Returns [`StorageError::DuplicateKey`] if two files map to the same key.
pub fn glob_files<K, F>(
    dir: &Path,
    pattern: &str,
    mut key_fn: F,
) -> Result<BTreeMap<K, PathBuf>, StorageError>
where
    K: Ord + fmt::Display,
    F: FnMut(&Path) -> K,
{
    let mut result = BTreeMap::new();
    for path in glob_paths(dir, pattern)? {
        let rel_path = path.strip_prefix(dir).unwrap_or(&path);
        let key = key_fn(rel_path);
        if result.contains_key(&key) {
            return Err(StorageError::DuplicateKey {
                key: key.to_string(),
                dir: dir.to_path_buf(),
            });
        }
        result.insert(key, path);
    }
    Ok(result)
}

/// Map fragment files (`*.yaml`, `*.yml`, `*.json`) in `dir` to their paths.
///
/// Each file is keyed by `key_fn(file_stem)`.
///
/// # Errors
///
/// Returns [`StorageError::DuplicateKey`] on key collisions.
pub fn fragment_files<F>(
    dir: &Path,
    mut key_fn: F,
) -> Result<BTreeMap<String, PathBuf>, StorageError>
where
    F: FnMut(&str) -> String,
{
    let fragments = glob_paths(dir, "*")?
        .into_iter()
        .filter(|p| is_fragment_file(p))
        .collect::<Vec<_>>();

    let mut result = BTreeMap::new();
    for path in fragments {
        let key = key_fn(&base_name(&path));
        if result.contains_key(&key) {
            return Err(StorageError::DuplicateKey {
                key,
                dir: dir.to_path_buf(),
            });
        }
        result.insert(key, path);
    }
    Ok(result)
}

/// Read and parse every fragment file in `dir` into a keyed mapping.
///
/// # Errors
///
/// Returns an error on key collisions, unreadable files or malformed contents.
pub fn read_fragments<F>(dir: &Path, key_fn: F) -> Result<Map<String, Value>, StorageError>
where
    F: FnMut(&str) -> String,
{
    fragment_files(dir, key_fn)?
        .into_iter()
        .map(|(key, path)| Ok((key, read_document(&path)?)))
        .collect()
}

/// Reconcile `dir` with `object`.
///
/// Each key is written to the file already known for it (preserving the
/// author's filename and extension) or to `<key>.yaml`. Files are only written
/// when their parsed contents differ. Files whose keys are absent from `object`
/// are deleted.
///
/// # Errors
///
/// Returns an error if listing, writing or deleting fails.
pub fn write_fragments(
    dir: &Path,
    object: &Map<String, Value>,
) -> Result<WriteReport, StorageError> {
    let mut known = fragment_files(dir, str::to_owned)?;
    let mut report = WriteReport::default();

    for (key, value) in object {
        let path = known
            .remove(key)
            .unwrap_or_else(|| dir.join(format!("{key}.yaml")));
        if write_if_changed(&path, value)? {
            report.written.push(path);
        } else {
            report.unchanged.push(path);
        }
    }

    for path in known.into_values() {
        fs::remove_file(&path).map_err(|e| StorageError::io(e, &path))?;
        tracing::info!(path = %path.display(), "Removed orphan fragment");
        report.removed.push(path);
    }

    Ok(report)
}

fn is_fragment_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| FRAGMENT_EXTENSIONS.contains(&e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::filename_to_path;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_fragment_files_missing_dir() {
        let files = fragment_files(Path::new("/nonexistent/paths"), str::to_owned).unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn test_fragment_files_filters_extensions() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(temp_dir.path().join("Pet.yaml"), "type: object").unwrap();
        fs::write(temp_dir.path().join("Tag.json"), "{}").unwrap();
        fs::write(temp_dir.path().join("User.yml"), "{}").unwrap();
        fs::write(temp_dir.path().join("README.md"), "# notes").unwrap();
        fs::create_dir(temp_dir.path().join("nested.yaml")).unwrap();

        let files = fragment_files(temp_dir.path(), str::to_owned).unwrap();

        let keys: Vec<_> = files.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["Pet", "Tag", "User"]);
    }

    #[test]
    fn test_glob_paths_skips_hidden_files() {
        let temp_dir = tempfile::tempdir().unwrap();
        let dir = temp_dir.path().join("python/pets");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("get"), "print(1)").unwrap();
        fs::write(dir.join(".DS_Store"), "").unwrap();
        fs::create_dir_all(temp_dir.path().join(".git/objects")).unwrap();
        fs::write(temp_dir.path().join(".git/objects/pack"), "").unwrap();

        let paths = glob_paths(temp_dir.path(), "*/*/*").unwrap();

        assert_eq!(paths, vec![dir.join("get")]);
    }

    #[test]
    fn test_write_fragments_keeps_hidden_files() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(temp_dir.path().join(".gitkeep.yaml"), "").unwrap();

        let report = write_fragments(temp_dir.path(), &Map::new()).unwrap();

        assert!(report.removed.is_empty());
        assert!(temp_dir.path().join(".gitkeep.yaml").exists());
    }

    #[test]
    fn test_fragment_files_duplicate_key() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(temp_dir.path().join("Pet.yaml"), "type: object").unwrap();
        fs::write(temp_dir.path().join("Pet.json"), "{}").unwrap();

        let err = fragment_files(temp_dir.path(), str::to_owned).unwrap_err();

        assert!(matches!(err, StorageError::DuplicateKey { ref key, .. } if key == "Pet"));
    }

    #[test]
    fn test_read_fragments_with_path_keys() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(temp_dir.path().join("pets.yaml"), "get:\n  summary: List").unwrap();
        fs::write(temp_dir.path().join("pets@{id}.yaml"), "get:\n  summary: Show").unwrap();

        let paths = read_fragments(temp_dir.path(), filename_to_path).unwrap();

        assert_eq!(
            Value::Object(paths),
            json!({
                "/pets": {"get": {"summary": "List"}},
                "/pets/{id}": {"get": {"summary": "Show"}}
            })
        );
    }

    #[test]
    fn test_read_fragments_malformed_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(temp_dir.path().join("Pet.yaml"), "type: [object").unwrap();

        let err = read_fragments(temp_dir.path(), str::to_owned).unwrap_err();

        assert!(matches!(err, StorageError::Parse { .. }));
    }

    #[test]
    fn test_glob_files_escapes_directory() {
        let temp_dir = tempfile::tempdir().unwrap();
        let dir = temp_dir.path().join("[weird]");
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join("a.yaml"), "{}").unwrap();

        let files = fragment_files(&dir, str::to_owned).unwrap();

        assert_eq!(files.len(), 1);
    }

    #[test]
    fn test_write_fragments_creates_files() {
        let temp_dir = tempfile::tempdir().unwrap();
        let dir = temp_dir.path().join("schemas");

        let report = write_fragments(&dir, &object(json!({"Pet": {"type": "object"}}))).unwrap();

        assert_eq!(report.written, vec![dir.join("Pet.yaml")]);
        assert_eq!(read_document(&dir.join("Pet.yaml")).unwrap(), json!({"type": "object"}));
    }

    #[test]
    fn test_write_fragments_reuses_known_filename() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(temp_dir.path().join("Pet.json"), r#"{"type": "string"}"#).unwrap();

        let report =
            write_fragments(temp_dir.path(), &object(json!({"Pet": {"type": "object"}}))).unwrap();

        assert_eq!(report.written, vec![temp_dir.path().join("Pet.json")]);
        assert!(!temp_dir.path().join("Pet.yaml").exists());
        assert_eq!(
            read_document(&temp_dir.path().join("Pet.json")).unwrap(),
            json!({"type": "object"})
        );
    }

    #[test]
    fn test_write_fragments_removes_orphans() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(temp_dir.path().join("A.yaml"), "type: object\n").unwrap();
        fs::write(temp_dir.path().join("B.yaml"), "type: string\n").unwrap();

        let report =
            write_fragments(temp_dir.path(), &object(json!({"A": {"type": "object"}}))).unwrap();

        assert!(report.written.is_empty());
        assert_eq!(report.unchanged, vec![temp_dir.path().join("A.yaml")]);
        assert_eq!(report.removed, vec![temp_dir.path().join("B.yaml")]);
        assert!(!temp_dir.path().join("B.yaml").exists());
        assert_eq!(
            fs::read_to_string(temp_dir.path().join("A.yaml")).unwrap(),
            "type: object\n"
        );
    }

    #[test]
    fn test_write_fragments_twice_is_noop() {
        let temp_dir = tempfile::tempdir().unwrap();
        let data = object(json!({"A": {"type": "object"}, "B": {"enum": [1, 2]}}));

        assert!(!write_fragments(temp_dir.path(), &data).unwrap().is_noop());
        assert!(write_fragments(temp_dir.path(), &data).unwrap().is_noop());
    }
}
