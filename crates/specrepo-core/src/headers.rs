//! One-shot inlining of references into the top-level `headers` section.

use serde_json::{Value, json};
use specrepo_plugins::query::Query;

use crate::error::SpecError;

const HEADERS_KEY: &str = "headers";
const HEADER_REF_PREFIX: &str = "#/headers";
const REFERENCE_QUERY: &str = "$..[?(@.$ref)]";

/// Replace every `{"$ref": "#/headers/..."}` object with its target and drop
/// the `headers` section.
///
/// Other references are left alone. Substituted values are not scanned again.
/// Does nothing if the document has no `headers` section.
///
/// # Errors
///
/// Returns [`SpecError::UnresolvedHeader`] for a reference with no target.
pub fn inline_headers(document: &mut Value) -> Result<(), SpecError> {
    let Some(headers) = document
        .as_object_mut()
        .and_then(|spec| spec.shift_remove(HEADERS_KEY))
    else {
        return Ok(());
    };
    let targets = json!({ HEADERS_KEY: headers });

    let query = Query::parse(REFERENCE_QUERY)?;
    // Innermost first, so nested references resolve before their containers
    for path in query.evaluate(document).into_iter().rev() {
        let Some(node) = path.resolve_mut(document) else {
            continue;
        };
        let Some(reference) = node
            .get("$ref")
            .and_then(Value::as_str)
            .filter(|r| r.starts_with(HEADER_REF_PREFIX))
            .map(str::to_owned)
        else {
            continue;
        };

        let target = reference
            .strip_prefix('#')
            .and_then(|pointer| targets.pointer(pointer))
            .ok_or_else(|| SpecError::UnresolvedHeader {
                reference: reference.clone(),
            })?;
        *node = target.clone();
    }

    tracing::debug!("Inlined header references");
    Ok(())
}
