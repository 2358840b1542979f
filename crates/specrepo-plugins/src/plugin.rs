//! The plugin unit contract.

use std::path::PathBuf;

use serde::Deserialize;
use serde_json::Value;

use crate::error::PluginError;
use crate::query::{NodePath, Segment};

/// Operation that triggered a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineAction {
    /// A bundled document is being read.
    Bundle,
    /// An incoming document is being written back.
    Sync,
}

/// Options passed to [`Plugin::init`].
#[derive(Debug, Clone)]
pub struct PluginContext {
    /// Spec root directory the document belongs to.
    pub basedir: PathBuf,
    /// Operation that triggered the run.
    pub action: PipelineAction,
}

impl PluginContext {
    pub fn new(basedir: impl Into<PathBuf>, action: PipelineAction) -> Self {
        Self {
            basedir: basedir.into(),
            action,
        }
    }
}

/// A document transformation unit.
///
/// For each run the pipeline calls [`init`](Self::init), evaluates
/// [`path_expression`](Self::path_expression) against the current document,
/// calls [`process`](Self::process) once per match in document order, then
/// calls [`finish`](Self::finish). Mutations are visible to every later call,
/// including later plugins.
pub trait Plugin {
    /// Name used in logs and errors.
    fn name(&self) -> &str;

    /// Whether the plugin takes part in a run triggered by `action`.
    fn applies_to(&self, _action: PipelineAction) -> bool {
        true
    }

    /// Called once before matching.
    fn init(&mut self, _document: &mut Value, _context: &PluginContext) -> Result<(), PluginError> {
        Ok(())
    }

    /// Node query selecting the locations to process.
    fn path_expression(&self) -> &str;

    /// Called once per matched location.
    fn process(&mut self, node: &mut NodeMatch<'_>) -> Result<(), PluginError>;

    /// Called once after all matches were processed.
    fn finish(&mut self, _document: &mut Value) -> Result<(), PluginError> {
        Ok(())
    }
}

/// A matched location together with mutable access to the whole document.
pub struct NodeMatch<'a> {
    document: &'a mut Value,
    path: &'a NodePath,
}

impl<'a> NodeMatch<'a> {
    pub fn new(document: &'a mut Value, path: &'a NodePath) -> Self {
        Self { document, path }
    }

    /// Full location of the matched node.
    pub fn path(&self) -> &NodePath {
        self.path
    }

    /// Key of the matched node within its parent (`None` for the root).
    pub fn key(&self) -> Option<&Segment> {
        self.path.key()
    }

    /// Current value of the matched node, if it still exists.
    pub fn value(&self) -> Option<&Value> {
        self.path.resolve(&*self.document)
    }

    pub fn value_mut(&mut self) -> Option<&mut Value> {
        self.path.resolve_mut(&mut *self.document)
    }

    /// Parent node of the match, if both still exist.
    pub fn parent_mut(&mut self) -> Option<&mut Value> {
        self.path.parent()?.resolve_mut(&mut *self.document)
    }

    pub fn document(&self) -> &Value {
        &*self.document
    }

    pub fn document_mut(&mut self) -> &mut Value {
        &mut *self.document
    }

    /// Replace the matched node in its parent. Returns `false` if it no longer exists.
    pub fn replace(&mut self, value: Value) -> bool {
        match self.value_mut() {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Remove the matched node from its parent and return it.
    pub fn remove(&mut self) -> Option<Value> {
        let key = self.path.key()?.clone();
        match (self.parent_mut()?, key) {
            (Value::Object(map), Segment::Key(key)) => map.shift_remove(&key),
            (Value::Array(items), Segment::Index(index)) if index < items.len() => {
                Some(items.remove(index))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn location(keys: &[&str]) -> NodePath {
        keys.iter()
            .fold(NodePath::root(), |p, k| p.child(Segment::Key((*k).to_owned())))
    }

    #[test]
    fn test_node_match_parent_and_key() {
        let mut doc = json!({"paths": {"/pets": {"get": {}}}});
        let path = location(&["paths", "/pets", "get"]);
        let mut node = NodeMatch::new(&mut doc, &path);

        assert_eq!(node.key(), Some(&Segment::Key("get".to_owned())));
        node.parent_mut()
            .unwrap()
            .as_object_mut()
            .unwrap()
            .insert("post".to_owned(), json!({}));

        assert_eq!(doc, json!({"paths": {"/pets": {"get": {}, "post": {}}}}));
    }

    #[test]
    fn test_node_match_remove_preserves_order() {
        let mut doc = json!({"a": 1, "b": 2, "c": 3});
        let path = location(&["b"]);
        let mut node = NodeMatch::new(&mut doc, &path);

        assert_eq!(node.remove(), Some(json!(2)));
        let keys: Vec<_> = doc.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["a", "c"]);
    }

    #[test]
    fn test_node_match_remove_array_element() {
        let mut doc = json!({"tags": ["a", "b"]});
        let path = NodePath::root()
            .child(Segment::Key("tags".to_owned()))
            .child(Segment::Index(0));

        assert_eq!(NodeMatch::new(&mut doc, &path).remove(), Some(json!("a")));
        assert_eq!(doc, json!({"tags": ["b"]}));
    }

    #[test]
    fn test_node_match_stale_location() {
        let mut doc = json!({"a": 1});
        let path = location(&["missing", "child"]);
        let mut node = NodeMatch::new(&mut doc, &path);

        assert!(node.value().is_none());
        assert!(node.parent_mut().is_none());
        assert!(!node.replace(json!(0)));
        assert!(node.remove().is_none());
    }
}
