//! Plugin units described by YAML or JSON files.
//!
//! ```yaml
//! # spec/plugins/internal.yaml
//! pathExpression: "$.paths.*[?(@['x-internal'] == true)]"
//! on: [bundle]
//! init:
//!   - set: { pointer: /info/x-filtered, value: true }
//! process:
//!   - drop
//! finish:
//!   - remove: { pointer: /x-draft }
//! ```
//!
//! Document actions (`init`, `finish`) address nodes by JSON pointer. Node
//! actions (`process`) apply to each matched node in order:
//!
//! - `set: { field, value }` sets a member of the matched object
//! - `unset: { field }` removes a member of the matched object
//! - `merge: { ... }` shallow-merges members into the matched object
//! - `replace: value` replaces the matched node
//! - `drop` removes the matched node from its parent

use std::path::Path;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::PluginError;
use crate::plugin::{NodeMatch, PipelineAction, Plugin, PluginContext};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct PluginFile {
    path_expression: String,
    #[serde(default)]
    on: Option<Vec<PipelineAction>>,
    #[serde(default)]
    init: Vec<DocumentAction>,
    #[serde(default)]
    process: Vec<NodeAction>,
    #[serde(default)]
    finish: Vec<DocumentAction>,
}

/// Action applied to the whole document by `init` or `finish`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DocumentAction {
    /// Set the node at `pointer`, creating intermediate objects.
    Set { pointer: String, value: Value },
    /// Remove the node at `pointer` if present.
    Remove { pointer: String },
}

/// Action applied to each matched node.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeAction {
    Set { field: String, value: Value },
    Unset { field: String },
    Merge(Map<String, Value>),
    Replace(Value),
    Drop,
}

/// A plugin unit loaded from a file.
#[derive(Debug)]
pub struct DeclarativePlugin {
    name: String,
    path_expression: String,
    on: Option<Vec<PipelineAction>>,
    init: Vec<DocumentAction>,
    process: Vec<NodeAction>,
    finish: Vec<DocumentAction>,
}

impl DeclarativePlugin {
    /// Build a plugin from a parsed plugin file.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Load`] if the value does not describe a plugin.
    pub fn from_value(path: &Path, value: Value) -> Result<Self, PluginError> {
        let file: PluginFile = serde_json::from_value(value).map_err(|e| PluginError::Load {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        Ok(Self {
            name: path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default(),
            path_expression: file.path_expression,
            on: file.on,
            init: file.init,
            process: file.process,
            finish: file.finish,
        })
    }

    /// Read and build a plugin from a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file can't be read, parsed or interpreted.
    pub fn load(path: &Path) -> Result<Self, PluginError> {
        let value = specrepo_storage::document::read_document(path)?;
        Self::from_value(path, value)
    }

    fn apply_document_actions(
        &self,
        actions: &[DocumentAction],
        document: &mut Value,
    ) -> Result<(), PluginError> {
        for action in actions {
            match action {
                DocumentAction::Set { pointer, value } => {
                    pointer_set(document, pointer, value.clone())
                        .map_err(|message| PluginError::action(&self.name, message))?;
                }
                DocumentAction::Remove { pointer } => {
                    pointer_remove(document, pointer)
                        .map_err(|message| PluginError::action(&self.name, message))?;
                }
            }
        }
        Ok(())
    }
}

impl Plugin for DeclarativePlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn applies_to(&self, action: PipelineAction) -> bool {
        self.on.as_ref().is_none_or(|on| on.contains(&action))
    }

    fn init(&mut self, document: &mut Value, _context: &PluginContext) -> Result<(), PluginError> {
        self.apply_document_actions(&self.init, document)
    }

    fn path_expression(&self) -> &str {
        &self.path_expression
    }

    fn process(&mut self, node: &mut NodeMatch<'_>) -> Result<(), PluginError> {
        for action in &self.process {
            match action {
                NodeAction::Set { field, value } => {
                    matched_object(node, &self.name)?.insert(field.clone(), value.clone());
                }
                NodeAction::Unset { field } => {
                    matched_object(node, &self.name)?.shift_remove(field);
                }
                NodeAction::Merge(members) => {
                    let object = matched_object(node, &self.name)?;
                    for (key, value) in members {
                        object.insert(key.clone(), value.clone());
                    }
                }
                NodeAction::Replace(value) => {
                    node.replace(value.clone());
                }
                NodeAction::Drop => {
                    node.remove();
                    // Nothing left to act on
                    break;
                }
            }
        }
        Ok(())
    }

    fn finish(&mut self, document: &mut Value) -> Result<(), PluginError> {
        self.apply_document_actions(&self.finish, document)
    }
}

fn matched_object<'n>(
    node: &'n mut NodeMatch<'_>,
    plugin: &str,
) -> Result<&'n mut Map<String, Value>, PluginError> {
    let location = node.path().to_string();
    node.value_mut()
        .and_then(Value::as_object_mut)
        .ok_or_else(|| PluginError::action(plugin, format!("{location} is not an object")))
}

/// Split a JSON pointer into unescaped reference tokens.
fn pointer_tokens(pointer: &str) -> Result<Vec<String>, String> {
    if pointer.is_empty() {
        return Ok(Vec::new());
    }
    let rest = pointer
        .strip_prefix('/')
        .ok_or_else(|| format!("JSON pointer {pointer:?} must start with '/'"))?;
    Ok(rest
        .split('/')
        .map(|t| t.replace("~1", "/").replace("~0", "~"))
        .collect())
}

/// Set the value at `pointer`, creating intermediate objects.
pub(crate) fn pointer_set(document: &mut Value, pointer: &str, value: Value) -> Result<(), String> {
    let tokens = pointer_tokens(pointer)?;
    let Some((last, parents)) = tokens.split_last() else {
        *document = value;
        return Ok(());
    };

    let mut current = document;
    for token in parents {
        current = match current {
            Value::Object(map) => map
                .entry(token.clone())
                .or_insert_with(|| Value::Object(Map::new())),
            Value::Array(items) => token
                .parse::<usize>()
                .ok()
                .and_then(|i| items.get_mut(i))
                .ok_or_else(|| format!("{pointer}: no array element {token}"))?,
            _ => return Err(format!("{pointer}: cannot descend into a scalar")),
        };
    }

    match current {
        Value::Object(map) => {
            map.insert(last.clone(), value);
            Ok(())
        }
        Value::Array(items) if last == "-" => {
            items.push(value);
            Ok(())
        }
        Value::Array(items) => {
            let slot = last
                .parse::<usize>()
                .ok()
                .and_then(|i| items.get_mut(i))
                .ok_or_else(|| format!("{pointer}: no array element {last}"))?;
            *slot = value;
            Ok(())
        }
        _ => Err(format!("{pointer}: cannot set a member of a scalar")),
    }
}

/// Remove the value at `pointer`; a missing target is not an error.
pub(crate) fn pointer_remove(document: &mut Value, pointer: &str) -> Result<(), String> {
    let tokens = pointer_tokens(pointer)?;
    let Some((last, parents)) = tokens.split_last() else {
        return Err("cannot remove the document root".to_owned());
    };

    let parent_pointer: String = parents
        .iter()
        .map(|t| format!("/{}", t.replace('~', "~0").replace('/', "~1")))
        .collect();
    match document.pointer_mut(&parent_pointer) {
        Some(Value::Object(map)) => {
            map.shift_remove(last);
        }
        Some(Value::Array(items)) => {
            if let Some(index) = last.parse::<usize>().ok().filter(|i| *i < items.len()) {
                items.remove(index);
            }
        }
        _ => {}
    }
    Ok(())
}
