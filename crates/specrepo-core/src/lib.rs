//! Bundle, split and sync operations for split OpenAPI/Swagger documents.
//!
//! A spec root stores one API document either as a single main file or spread
//! over fragment directories. This crate converts between the two:
//!
//! - [`bundle`] assembles the full document from a root
//! - [`split`] writes a document back into a root with diff-aware writes
//! - [`sync`] reconciles an incoming document, including nested child roots
//! - [`MountRegistry`] tracks which root is served under which URL prefix
//!
//! # Example
//!
//! ```ignore
//! use specrepo_core::{BundleOptions, SyncContext, SyncInput, bundle, sync};
//! use specrepo_plugins::PluginPipeline;
//! use specrepo_storage::SpecRoot;
//!
//! let root = SpecRoot::new("spec");
//! let pipeline = PluginPipeline::new(Some("spec/plugins".into()));
//!
//! let document = bundle(&root, &BundleOptions::default(), &pipeline)?;
//! sync(SyncInput::Document(document), &root, &SyncContext::new(&pipeline))?;
//! ```

mod bundle;
mod editor;
mod error;
mod headers;
mod mounts;
mod samples;
mod split;
mod sync;

pub use bundle::{BundleOptions, CHILDREN_KEY, bundle};
pub use editor::{MULTI_FILE_NOTICE, editable_text};
pub use error::SpecError;
pub use headers::inline_headers;
pub use mounts::{Mount, MountRegistry, ROOT_MOUNT};
pub use samples::{CODE_SAMPLES_FIELD, attach_code_samples};
pub use split::split;
pub use sync::{SyncContext, SyncInput, sync};
