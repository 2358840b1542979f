//! Text of a spec root as presented to a document editor.

use std::fs;

use specrepo_plugins::PluginPipeline;
use specrepo_storage::{Format, SpecRoot, StorageError, parse, stringify};

use crate::bundle::{BundleOptions, bundle};
use crate::error::SpecError;

/// Prefix of editable text rendered from several files.
pub const MULTI_FILE_NOTICE: &str = "# Note: This spec is defined in multiple files.\n\
# All comments and formating were lost during the bundle process.\n\
# Existing files formatting may be not preserved on save.\n";

/// Document text to offer for editing.
///
/// The root is bundled without code samples, header inlining or children. If
/// the result equals the main file, the main file is returned verbatim so
/// comments and formatting survive. Otherwise the bundle is rendered as YAML
/// after [`MULTI_FILE_NOTICE`].
///
/// # Errors
///
/// Returns any bundle error, or an I/O error if the main file can't be read.
pub fn editable_text(root: &SpecRoot, pipeline: &PluginPipeline) -> Result<String, SpecError> {
    let options = BundleOptions {
        skip_children: true,
        ..BundleOptions::editable()
    };
    let bundled = bundle(root, &options, pipeline)?;

    let main_file = root.main_file();
    let main_text = fs::read_to_string(&main_file).map_err(|e| StorageError::io(e, &main_file))?;
    if parse(&main_text)? == bundled {
        return Ok(main_text);
    }

    Ok(format!("{MULTI_FILE_NOTICE}{}", stringify(&bundled, Format::Yaml)?))
}
