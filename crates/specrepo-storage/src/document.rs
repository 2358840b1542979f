//! Document text codec and diff-aware file writes.
//!
//! Documents are held as [`serde_json::Value`] trees. YAML is the storage
//! format; JSON input is accepted because it parses as YAML.

use std::fs;
use std::path::Path;

use serde_json::Value;

use crate::error::StorageError;

/// Serialization format for a document or fragment file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// YAML (default for fragments and the main file).
    Yaml,
    /// Pretty-printed JSON with a trailing newline.
    Json,
}

impl Format {
    /// Pick the format from a file extension (`.json` -> JSON, anything else -> YAML).
    pub fn from_path(path: &Path) -> Self {
        if path.extension().is_some_and(|e| e.eq_ignore_ascii_case("json")) {
            Self::Json
        } else {
            Self::Yaml
        }
    }
}

/// Parse document text (YAML or JSON).
///
/// Empty or whitespace-only text parses to `null`.
///
/// # Errors
///
/// Returns [`StorageError::Parse`] if the text is malformed.
pub fn parse(text: &str) -> Result<Value, StorageError> {
    parse_at(text, Path::new(""))
}

fn parse_at(text: &str, path: &Path) -> Result<Value, StorageError> {
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_yaml::from_str(text).map_err(|e| StorageError::parse(path, e.to_string()))
}

/// Serialize a document.
///
/// # Errors
///
/// Returns [`StorageError::Serialize`] if the value cannot be represented.
pub fn stringify(value: &Value, format: Format) -> Result<String, StorageError> {
    let serialize_error = |message: String| StorageError::Serialize {
        path: Path::new("").to_path_buf(),
        message,
    };
    match format {
        Format::Yaml => serde_yaml::to_string(value).map_err(|e| serialize_error(e.to_string())),
        Format::Json => serde_json::to_string_pretty(value)
            .map(|s| s + "\n")
            .map_err(|e| serialize_error(e.to_string())),
    }
}

/// Read and parse a document file.
///
/// # Errors
///
/// Returns [`StorageError::Io`] if the file can't be read and
/// [`StorageError::Parse`] if its contents are malformed.
pub fn read_document(path: &Path) -> Result<Value, StorageError> {
    let text = fs::read_to_string(path).map_err(|e| StorageError::io(e, path))?;
    parse_at(&text, path)
}

/// Write `value` to `path` only if it differs from the file's parsed contents.
///
/// Unreadable or malformed existing files count as different. Parent
/// directories are created as needed. Returns `true` if the file was written.
///
/// # Errors
///
/// Returns an error if serialization or the write fails.
pub fn write_if_changed(path: &Path, value: &Value) -> Result<bool, StorageError> {
    if read_document(path).is_ok_and(|current| current == *value) {
        return Ok(false);
    }

    let text = stringify(value, Format::from_path(path)).map_err(|e| match e {
        StorageError::Serialize { message, .. } => StorageError::Serialize {
            path: path.to_path_buf(),
            message,
        },
        other => other,
    })?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| StorageError::io(e, parent))?;
    }
    fs::write(path, text).map_err(|e| StorageError::io(e, path))?;
    tracing::debug!(path = %path.display(), "Wrote document file");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_parse_yaml() {
        let doc = parse("openapi: 3.0.0\ninfo:\n  title: Pets\n").unwrap();
        assert_eq!(doc, json!({"openapi": "3.0.0", "info": {"title": "Pets"}}));
    }

    #[test]
    fn test_parse_json() {
        let doc = parse(r#"{"swagger": "2.0", "paths": {}}"#).unwrap();
        assert_eq!(doc, json!({"swagger": "2.0", "paths": {}}));
    }

    #[test]
    fn test_parse_numeric_keys_become_strings() {
        let doc = parse("responses:\n  200:\n    description: OK\n").unwrap();
        assert_eq!(doc["responses"]["200"]["description"], "OK");
    }

    #[test]
    fn test_parse_empty_is_null() {
        assert_eq!(parse("").unwrap(), Value::Null);
        assert_eq!(parse("  \n").unwrap(), Value::Null);
    }

    #[test]
    fn test_parse_malformed() {
        let err = parse("openapi: [3.0.0").unwrap_err();
        assert!(matches!(err, StorageError::Parse { .. }));
        assert!(err.to_string().contains("Can not parse OpenAPI file"));
    }

    #[test]
    fn test_stringify_json_has_trailing_newline() {
        let text = stringify(&json!({"a": 1}), Format::Json).unwrap();
        assert_eq!(text, "{\n  \"a\": 1\n}\n");
    }

    #[test]
    fn test_stringify_yaml_preserves_key_order() {
        let doc = parse("openapi: 3.0.0\ninfo: {}\npaths: {}\n").unwrap();
        let text = stringify(&doc, Format::Yaml).unwrap();
        let openapi = text.find("openapi").unwrap();
        let info = text.find("info").unwrap();
        let paths = text.find("paths").unwrap();
        assert!(openapi < info && info < paths);
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(Format::from_path(Path::new("a/b.json")), Format::Json);
        assert_eq!(Format::from_path(Path::new("a/b.yaml")), Format::Yaml);
        assert_eq!(Format::from_path(Path::new("a/b.yml")), Format::Yaml);
    }

    #[test]
    fn test_write_if_changed_skips_equal_content() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("pets.yaml");
        // Formatting differs from what the serializer would produce
        fs::write(&path, "# comment kept\ntype:   object\n").unwrap();

        let written = write_if_changed(&path, &json!({"type": "object"})).unwrap();

        assert!(!written);
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "# comment kept\ntype:   object\n"
        );
    }

    #[test]
    fn test_write_if_changed_writes_new_content() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("nested/dir/pets.yaml");

        assert!(write_if_changed(&path, &json!({"type": "object"})).unwrap());
        assert_eq!(read_document(&path).unwrap(), json!({"type": "object"}));
        assert!(!write_if_changed(&path, &json!({"type": "object"})).unwrap());
        assert!(write_if_changed(&path, &json!({"type": "string"})).unwrap());
    }

    #[test]
    fn test_write_if_changed_json_extension() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("pet.json");

        write_if_changed(&path, &json!({"type": "object"})).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with('{'));
    }

    #[test]
    fn test_read_document_missing_file() {
        let err = read_document(Path::new("/nonexistent/openapi.yaml")).unwrap_err();
        assert!(err.is_not_found());
    }
}
