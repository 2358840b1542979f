//! Filesystem storage for split OpenAPI/Swagger documents.
//!
//! This crate knows where things live and how to read and write them:
//!
//! - [`SpecRoot`] resolves the canonical layout of a spec directory and
//!   discovers nested child roots
//! - [`codec`] maps URL path templates to flat filenames and back
//! - [`fragments`] reads a directory of same-format files into a keyed mapping
//!   and reconciles it back with diff-aware writes and orphan cleanup
//! - [`document`] parses and serializes document text
//!
//! # Example
//!
//! ```ignore
//! use specrepo_storage::{SpecRoot, fragments, codec};
//!
//! let root = SpecRoot::new("spec");
//! let paths = fragments::read_fragments(&root.paths_dir(), codec::filename_to_path)?;
//! ```

pub mod codec;
pub mod document;
mod error;
pub mod fragments;
mod layout;

pub use document::{Format, parse, stringify};
pub use error::StorageError;
pub use layout::{
    CODE_SAMPLES_DIR, COMPONENTS_DIR, ChildRoot, DEFAULT_BASEDIR, DEFAULT_MAIN_FILE,
    DEFINITIONS_DIR, Layout, OPENAPI3_COMPONENTS, PATHS_DIR, SpecRoot, is_child_name,
};
