//! Node queries over document trees.
//!
//! Supports the JSONPath subset used by plugins:
//!
//! | Syntax | Meaning |
//! |--------|---------|
//! | `$` | document root |
//! | `.name`, `['name']`, `['a','b']` | child by key |
//! | `[n]`, `[-n]` | array element |
//! | `.*`, `[*]` | every child |
//! | `..` | recursive descent (the node and all descendants) |
//! | `[?(@.field)]` | children whose `field` is present and not `null`/`false` |
//! | `[?(@.field == 'v')]`, `!=` | children whose `field` compares to a literal |
//!
//! Evaluation yields [`NodePath`]s in document order: pre-order, with object
//! members in key order and array elements by index.

use std::fmt;

use serde_json::Value;

use crate::error::PluginError;

/// One step of a node location.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// Object member.
    Key(String),
    /// Array element.
    Index(usize),
}

impl Segment {
    fn get<'a>(&self, value: &'a Value) -> Option<&'a Value> {
        match (self, value) {
            (Self::Key(key), Value::Object(map)) => map.get(key),
            (Self::Index(index), Value::Array(items)) => items.get(*index),
            _ => None,
        }
    }

    fn get_mut<'a>(&self, value: &'a mut Value) -> Option<&'a mut Value> {
        match (self, value) {
            (Self::Key(key), Value::Object(map)) => map.get_mut(key),
            (Self::Index(index), Value::Array(items)) => items.get_mut(*index),
            _ => None,
        }
    }

    /// Key as a string (indices are rendered in decimal).
    pub fn as_key(&self) -> String {
        match self {
            Self::Key(key) => key.clone(),
            Self::Index(index) => index.to_string(),
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => write!(f, "['{}']", key.replace('\\', "\\\\").replace('\'', "\\'")),
            Self::Index(index) => write!(f, "[{index}]"),
        }
    }
}

/// Absolute location of a node inside a document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct NodePath(Vec<Segment>);

impl NodePath {
    /// The document root (`$`).
    pub fn root() -> Self {
        Self::default()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Key of the node within its parent (`None` for the root).
    pub fn key(&self) -> Option<&Segment> {
        self.0.last()
    }

    /// Location of the parent node (`None` for the root).
    pub fn parent(&self) -> Option<NodePath> {
        let (_, parent) = self.0.split_last()?;
        Some(Self(parent.to_vec()))
    }

    /// Location of a child node.
    #[must_use]
    pub fn child(&self, segment: Segment) -> NodePath {
        let mut segments = self.0.clone();
        segments.push(segment);
        Self(segments)
    }

    /// Look the node up in `document`.
    pub fn resolve<'a>(&self, document: &'a Value) -> Option<&'a Value> {
        self.0.iter().try_fold(document, |value, segment| segment.get(value))
    }

    /// Look the node up in `document` for mutation.
    pub fn resolve_mut<'a>(&self, document: &'a mut Value) -> Option<&'a mut Value> {
        self.0
            .iter()
            .try_fold(document, |value, segment| segment.get_mut(value))
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("$")?;
        for segment in &self.0 {
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Selector {
    Keys(Vec<String>),
    Index(i64),
    Wildcard,
    Filter(Filter),
}

#[derive(Debug, Clone, PartialEq)]
struct Filter {
    field: Vec<String>,
    comparison: Option<(Comparison, Value)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Comparison {
    Eq,
    Ne,
}

impl Filter {
    fn matches(&self, value: &Value) -> bool {
        let found = self
            .field
            .iter()
            .try_fold(value, |v, key| v.as_object().and_then(|m| m.get(key)));
        match (&self.comparison, found) {
            (None, Some(v)) => !matches!(v, Value::Null | Value::Bool(false)),
            (None, None) => false,
            (Some((Comparison::Eq, literal)), found) => found == Some(literal),
            (Some((Comparison::Ne, literal)), found) => found != Some(literal),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Step {
    descendant: bool,
    selector: Selector,
}

/// A parsed node query.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    expression: String,
    steps: Vec<Step>,
}

impl Query {
    /// Parse a query expression.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Query`] describing the first syntax error.
    pub fn parse(expression: &str) -> Result<Self, PluginError> {
        let steps = Parser::new(expression).parse()?;
        Ok(Self {
            expression: expression.to_owned(),
            steps,
        })
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Evaluate against `document`, returning matched locations in document order.
    pub fn evaluate(&self, document: &Value) -> Vec<NodePath> {
        let mut current = vec![NodePath::root()];

        for step in &self.steps {
            let mut next = Vec::new();
            for path in &current {
                let Some(value) = path.resolve(document) else {
                    continue;
                };
                if step.descendant {
                    let mut nodes = Vec::new();
                    collect_descendants(value, path, &mut nodes);
                    for (node_path, node) in nodes {
                        select(&step.selector, node, &node_path, &mut next);
                    }
                } else {
                    select(&step.selector, value, path, &mut next);
                }
            }
            current = next;
        }

        current
    }
}

fn collect_descendants<'a>(
    value: &'a Value,
    path: &NodePath,
    out: &mut Vec<(NodePath, &'a Value)>,
) {
    out.push((path.clone(), value));
    for (segment, child) in children(value) {
        collect_descendants(child, &path.child(segment), out);
    }
}

fn children(value: &Value) -> Vec<(Segment, &Value)> {
    match value {
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| (Segment::Key(k.clone()), v))
            .collect(),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, v)| (Segment::Index(i), v))
            .collect(),
        _ => Vec::new(),
    }
}

fn select(selector: &Selector, value: &Value, path: &NodePath, out: &mut Vec<NodePath>) {
    match selector {
        Selector::Keys(keys) => {
            if let Value::Object(map) = value {
                out.extend(
                    keys.iter()
                        .filter(|k| map.contains_key(k.as_str()))
                        .map(|k| path.child(Segment::Key(k.clone()))),
                );
            }
        }
        Selector::Index(index) => {
            if let Value::Array(items) = value {
                let resolved = if *index < 0 {
                    i64::try_from(items.len()).ok().map(|len| len + index)
                } else {
                    Some(*index)
                };
                if let Some(i) = resolved
                    .and_then(|i| usize::try_from(i).ok())
                    .filter(|i| *i < items.len())
                {
                    out.push(path.child(Segment::Index(i)));
                }
            }
        }
        Selector::Wildcard => {
            out.extend(children(value).into_iter().map(|(s, _)| path.child(s)));
        }
        Selector::Filter(filter) => {
            out.extend(
                children(value)
                    .into_iter()
                    .filter(|(_, child)| filter.matches(child))
                    .map(|(s, _)| path.child(s)),
            );
        }
    }
}

/// Recursive-descent parser over the expression characters.
struct Parser<'a> {
    expression: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(expression: &'a str) -> Self {
        Self {
            expression,
            chars: expression.trim().chars().collect(),
            pos: 0,
        }
    }

    fn error(&self, message: impl fmt::Display) -> PluginError {
        PluginError::Query {
            expression: self.expression.to_owned(),
            message: format!("{message} at position {}", self.pos),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn starts_with(&self, s: &str) -> bool {
        s.chars()
            .enumerate()
            .all(|(i, c)| self.chars.get(self.pos + i) == Some(&c))
    }

    fn expect(&mut self, c: char) -> Result<(), PluginError> {
        if self.peek() == Some(c) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(format_args!("expected '{c}'")))
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn parse(mut self) -> Result<Vec<Step>, PluginError> {
        self.expect('$')?;
        let mut steps = Vec::new();

        while let Some(c) = self.peek() {
            let step = if self.starts_with("..") {
                self.pos += 2;
                let selector = match self.peek() {
                    Some('[') => self.parse_bracket()?,
                    _ => self.parse_dot_member()?,
                };
                Step {
                    descendant: true,
                    selector,
                }
            } else if c == '.' {
                self.pos += 1;
                Step {
                    descendant: false,
                    selector: self.parse_dot_member()?,
                }
            } else if c == '[' {
                Step {
                    descendant: false,
                    selector: self.parse_bracket()?,
                }
            } else {
                return Err(self.error(format_args!("unexpected '{c}'")));
            };
            steps.push(step);
        }

        Ok(steps)
    }

    fn parse_dot_member(&mut self) -> Result<Selector, PluginError> {
        if self.peek() == Some('*') {
            self.pos += 1;
            return Ok(Selector::Wildcard);
        }
        let name = self.take_while(|c| !matches!(c, '.' | '[' | ']'));
        if name.is_empty() {
            return Err(self.error("expected member name"));
        }
        Ok(Selector::Keys(vec![name]))
    }

    fn parse_bracket(&mut self) -> Result<Selector, PluginError> {
        self.expect('[')?;
        self.skip_whitespace();

        let selector = match self.peek() {
            Some('*') => {
                self.pos += 1;
                Selector::Wildcard
            }
            Some('?') => {
                self.pos += 1;
                self.expect('(')?;
                let filter = self.parse_filter()?;
                self.expect(')')?;
                Selector::Filter(filter)
            }
            Some('\'' | '"') => {
                let mut keys = vec![self.parse_quoted()?];
                self.skip_whitespace();
                while self.peek() == Some(',') {
                    self.pos += 1;
                    self.skip_whitespace();
                    keys.push(self.parse_quoted()?);
                    self.skip_whitespace();
                }
                Selector::Keys(keys)
            }
            Some(c) if c == '-' || c.is_ascii_digit() => {
                let text = self.take_while(|c| c == '-' || c.is_ascii_digit());
                let index = text
                    .parse()
                    .map_err(|_| self.error(format_args!("invalid index '{text}'")))?;
                Selector::Index(index)
            }
            _ => return Err(self.error("expected selector")),
        };

        self.skip_whitespace();
        self.expect(']')?;
        Ok(selector)
    }

    fn parse_filter(&mut self) -> Result<Filter, PluginError> {
        self.skip_whitespace();
        self.expect('@')?;

        let mut field = Vec::new();
        loop {
            match self.peek() {
                Some('.') => {
                    self.pos += 1;
                    let name = self.take_while(|c| {
                        !(c.is_whitespace() || matches!(c, '.' | '[' | ')' | '=' | '!'))
                    });
                    if name.is_empty() {
                        return Err(self.error("expected field name"));
                    }
                    field.push(name);
                }
                Some('[') => {
                    self.pos += 1;
                    field.push(self.parse_quoted()?);
                    self.expect(']')?;
                }
                _ => break,
            }
        }
        if field.is_empty() {
            return Err(self.error("filter must reference a field of '@'"));
        }

        self.skip_whitespace();
        let comparison = if self.starts_with("==") || self.starts_with("!=") {
            let op = if self.starts_with("==") {
                Comparison::Eq
            } else {
                Comparison::Ne
            };
            self.pos += 2;
            self.skip_whitespace();
            let literal = self.parse_literal()?;
            self.skip_whitespace();
            Some((op, literal))
        } else {
            None
        };

        Ok(Filter { field, comparison })
    }

    fn parse_literal(&mut self) -> Result<Value, PluginError> {
        if matches!(self.peek(), Some('\'' | '"')) {
            return self.parse_quoted().map(Value::String);
        }
        let text = self.take_while(|c| !(c.is_whitespace() || c == ')'));
        match text.as_str() {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            "null" => Ok(Value::Null),
            _ => serde_json::from_str::<serde_json::Number>(&text)
                .map(Value::Number)
                .map_err(|_| self.error(format_args!("invalid literal '{text}'"))),
        }
    }

    fn parse_quoted(&mut self) -> Result<String, PluginError> {
        let quote = match self.peek() {
            Some(q @ ('\'' | '"')) => q,
            _ => return Err(self.error("expected quoted string")),
        };
        self.pos += 1;

        let mut result = String::new();
        loop {
            match self.peek() {
                None => return Err(self.error("unterminated string")),
                Some('\\') => {
                    self.pos += 1;
                    let escaped = self.peek().ok_or_else(|| self.error("unterminated string"))?;
                    result.push(escaped);
                    self.pos += 1;
                }
                Some(c) if c == quote => {
                    self.pos += 1;
                    return Ok(result);
                }
                Some(c) => {
                    result.push(c);
                    self.pos += 1;
                }
            }
        }
    }

    fn take_while(&mut self, predicate: impl Fn(char) -> bool) -> String {
        let start = self.pos;
        while self.peek().is_some_and(&predicate) {
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }
}
