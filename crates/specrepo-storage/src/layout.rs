//! Canonical directory layout of a spec root.
//!
//! ```text
//! spec/
//! ├── openapi.yaml            main document
//! ├── paths/                  one file per URL path template
//! ├── components/<category>/  one file per component (OpenAPI 3)
//! ├── definitions/            one file per schema (Swagger 2)
//! ├── code_samples/<lang>/<path>/<verb>
//! └── v2/                     child spec root, same layout
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::StorageError;

/// Default spec root directory.
pub const DEFAULT_BASEDIR: &str = "spec";

/// Default main document filename.
pub const DEFAULT_MAIN_FILE: &str = "openapi.yaml";

/// Paths fragment directory name.
pub const PATHS_DIR: &str = "paths";

/// Definitions fragment directory name (Swagger 2).
pub const DEFINITIONS_DIR: &str = "definitions";

/// Components fragment directory name (OpenAPI 3).
pub const COMPONENTS_DIR: &str = "components";

/// Code samples directory name.
pub const CODE_SAMPLES_DIR: &str = "code_samples";

/// OpenAPI 3 component categories, each stored in `components/<category>/`.
pub const OPENAPI3_COMPONENTS: [&str; 9] = [
    "schemas",
    "responses",
    "parameters",
    "examples",
    "headers",
    "requestBodies",
    "links",
    "callbacks",
    "securitySchemes",
];

/// Directory names that never become child roots.
const RESERVED_DIRS: [&str; 3] = [DEFINITIONS_DIR, CODE_SAMPLES_DIR, "plugins"];

/// A directory holding one logical API document, flat or fragmented.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecRoot {
    basedir: PathBuf,
    main_file_name: String,
}

/// A nested spec root discovered under its parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildRoot {
    /// Directory name relative to the parent root.
    pub name: String,
    /// The child's own root.
    pub root: SpecRoot,
}

impl ChildRoot {
    /// Key under which the child appears in the parent's `children` map.
    pub fn key(&self) -> String {
        self.name.to_lowercase()
    }
}

/// Resolved sub-paths and children of a spec root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub main_file: PathBuf,
    pub paths_dir: PathBuf,
    pub definitions_dir: PathBuf,
    pub components_dir: PathBuf,
    pub code_samples_dir: PathBuf,
    /// `None` if the root directory does not exist.
    pub children: Option<Vec<ChildRoot>>,
}

impl Default for SpecRoot {
    fn default() -> Self {
        Self::new(DEFAULT_BASEDIR)
    }
}

impl SpecRoot {
    /// Create a spec root using the default main filename.
    pub fn new(basedir: impl Into<PathBuf>) -> Self {
        Self {
            basedir: basedir.into(),
            main_file_name: DEFAULT_MAIN_FILE.to_owned(),
        }
    }

    /// Use a custom main document filename (inherited by children).
    #[must_use]
    pub fn with_main_file(mut self, name: impl Into<String>) -> Self {
        self.main_file_name = name.into();
        self
    }

    pub fn basedir(&self) -> &Path {
        &self.basedir
    }

    pub fn main_file_name(&self) -> &str {
        &self.main_file_name
    }

    pub fn main_file(&self) -> PathBuf {
        self.basedir.join(&self.main_file_name)
    }

    pub fn paths_dir(&self) -> PathBuf {
        self.basedir.join(PATHS_DIR)
    }

    pub fn definitions_dir(&self) -> PathBuf {
        self.basedir.join(DEFINITIONS_DIR)
    }

    pub fn components_dir(&self) -> PathBuf {
        self.basedir.join(COMPONENTS_DIR)
    }

    pub fn code_samples_dir(&self) -> PathBuf {
        self.basedir.join(CODE_SAMPLES_DIR)
    }

    /// Whether the root directory exists.
    pub fn exists(&self) -> bool {
        self.basedir.is_dir()
    }

    /// Whether any fragment directory exists (a non-flat root).
    pub fn is_fragmented(&self) -> bool {
        self.paths_dir().is_dir()
            || self.components_dir().is_dir()
            || self.definitions_dir().is_dir()
    }

    /// Root of a child with the given relative directory name.
    pub fn child(&self, name: &str) -> SpecRoot {
        Self {
            basedir: self.basedir.join(name),
            main_file_name: self.main_file_name.clone(),
        }
    }

    /// Compute the canonical sub-paths and discover children.
    ///
    /// # Errors
    ///
    /// Returns an error if the root exists but can't be listed.
    pub fn layout(&self) -> Result<Layout, StorageError> {
        Ok(Layout {
            main_file: self.main_file(),
            paths_dir: self.paths_dir(),
            definitions_dir: self.definitions_dir(),
            components_dir: self.components_dir(),
            code_samples_dir: self.code_samples_dir(),
            children: self.children()?,
        })
    }

    /// Discover immediate child roots, sorted by name.
    ///
    /// Returns `None` if the root directory does not exist and an empty list if it
    /// exists without children. Fragment directories (any name ending in `paths`
    /// or `components`, plus `definitions`, `code_samples` and `plugins`) and hidden
    /// directories are never children.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory can't be listed.
    pub fn children(&self) -> Result<Option<Vec<ChildRoot>>, StorageError> {
        if !self.exists() {
            return Ok(None);
        }

        let entries = fs::read_dir(&self.basedir).map_err(|e| StorageError::io(e, &self.basedir))?;

        let mut children: Vec<ChildRoot> = entries
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_ok_and(|t| t.is_dir()))
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|name| is_child_name(name))
            .map(|name| ChildRoot {
                root: self.child(&name),
                name,
            })
            .collect();
        children.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(Some(children))
    }
}

/// Whether a directory with this name can be a child root.
pub fn is_child_name(name: &str) -> bool {
    !(name.starts_with('.')
        || name.ends_with(PATHS_DIR)
        || name.ends_with(COMPONENTS_DIR)
        || RESERVED_DIRS.contains(&name))
}
