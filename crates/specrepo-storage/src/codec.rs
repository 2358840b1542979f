//! Mapping between URL path templates and flat filenames.
//!
//! A path template such as `/pets/{id}` is stored as `pets@{id}.yaml`
//! inside the `paths/` directory.

use std::path::Path;

/// Separator substituted for `/` in fragment filenames.
const SEPARATOR: char = '@';

/// Stem of the file holding the `/` path item.
const ROOT_PATH_STEM: &str = "@";

/// Encode a URL path template as a filename stem.
///
/// - `/pets` -> `pets`
/// - `/pets/{id}` -> `pets@{id}`
/// - `/` -> `@`
pub fn path_to_filename(path: &str) -> String {
    let encoded = path.replace('/', "@");
    match encoded.strip_prefix(SEPARATOR) {
        Some("") => ROOT_PATH_STEM.to_owned(),
        Some(stripped) => stripped.to_owned(),
        None => encoded,
    }
}

/// Decode a filename stem back into a URL path template.
///
/// Inverse of [`path_to_filename`] for templates without a literal `@`.
pub fn filename_to_path(filename: &str) -> String {
    if filename == ROOT_PATH_STEM {
        return "/".to_owned();
    }
    format!("/{}", filename.replace(SEPARATOR, "/"))
}

/// File stem of a path (`pets@{id}.yaml` -> `pets@{id}`).
pub fn base_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}
