//! Core types shared by the resolver, composer and source map.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Key holding a reference pointer.
pub const REF_KEY: &str = "$ref";

/// Declared name of the shared parameter lifted in Azure mode.
pub const API_VERSION_PARAM: &str = "api-version";

/// Top-level containers holding path items.
pub const PATH_CONTAINERS: &[&str] = &["paths", "x-ms-paths"];

/// Path item members that are operations.
pub const HTTP_METHODS: &[&str] = &["get", "put", "post", "delete", "options", "head", "patch"];

/// Document-level defaults flattened onto operations in Azure mode.
pub const OPERATION_DEFAULTS: &[&str] = &["produces", "consumes"];

/// Returns the JSON type name for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// One step of a [`JsonPath`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathComponent {
    Key(String),
    Index(usize),
}

impl From<&str> for PathComponent {
    fn from(key: &str) -> Self {
        PathComponent::Key(key.to_string())
    }
}

impl From<String> for PathComponent {
    fn from(key: String) -> Self {
        PathComponent::Key(key)
    }
}

impl From<usize> for PathComponent {
    fn from(index: usize) -> Self {
        PathComponent::Index(index)
    }
}

/// Location of a node inside a document tree, from the root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JsonPath(Vec<PathComponent>);

impl JsonPath {
    /// The empty path addressing the document root.
    pub fn root() -> Self {
        Self::default()
    }

    pub fn components(&self) -> &[PathComponent] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns a new path with `component` appended.
    pub fn child(&self, component: impl Into<PathComponent>) -> Self {
        let mut components = self.0.clone();
        components.push(component.into());
        Self(components)
    }

    /// Returns a new path with every component of `suffix` appended.
    pub fn join(&self, suffix: &[PathComponent]) -> Self {
        let mut components = self.0.clone();
        components.extend_from_slice(suffix);
        Self(components)
    }

    pub fn starts_with(&self, prefix: &JsonPath) -> bool {
        self.0.starts_with(&prefix.0)
    }

    /// The key at `index` counted from the end (0 = last), if that step is a key.
    pub fn key_from_end(&self, index: usize) -> Option<&str> {
        let position = self.0.len().checked_sub(index + 1)?;
        match &self.0[position] {
            PathComponent::Key(key) => Some(key),
            PathComponent::Index(_) => None,
        }
    }

    /// Render as an RFC 6901 JSON Pointer (`""` for the root).
    pub fn to_pointer(&self) -> String {
        let mut pointer = String::new();
        for component in &self.0 {
            pointer.push('/');
            match component {
                PathComponent::Key(key) => {
                    pointer.push_str(&key.replace('~', "~0").replace('/', "~1"))
                }
                PathComponent::Index(index) => pointer.push_str(&index.to_string()),
            }
        }
        pointer
    }

    /// Parse an RFC 6901 JSON Pointer, with or without a leading `#`.
    ///
    /// Numeric segments become indices; use [`JsonPath::locate`] when a
    /// numeric object key is possible.
    pub fn from_pointer(pointer: &str) -> Self {
        let trimmed = pointer.trim_start_matches('#');
        if trimmed.is_empty() {
            return Self::root();
        }
        let components = trimmed
            .trim_start_matches('/')
            .split('/')
            .map(|part| {
                let key = part.replace("~1", "/").replace("~0", "~");
                match key.parse::<usize>() {
                    Ok(index) => PathComponent::Index(index),
                    Err(_) => PathComponent::Key(key),
                }
            })
            .collect();
        Self(components)
    }

    /// Parse `pointer` against `value`, typing each segment after the node it
    /// actually addresses. Returns `None` when the pointer leads nowhere.
    pub fn locate(pointer: &str, value: &Value) -> Option<Self> {
        let mut components = Vec::new();
        let mut current = value;
        for component in Self::from_pointer(pointer).0 {
            let key = match component {
                PathComponent::Key(key) => key,
                PathComponent::Index(index) => index.to_string(),
            };
            current = match current {
                Value::Object(map) => {
                    let child = map.get(&key)?;
                    components.push(PathComponent::Key(key));
                    child
                }
                Value::Array(items) => {
                    let index = key.parse::<usize>().ok()?;
                    components.push(PathComponent::Index(index));
                    items.get(index)?
                }
                _ => return None,
            };
        }
        Some(Self(components))
    }

    /// Look up the node addressed by this path.
    pub fn resolve_in<'a>(&self, value: &'a Value) -> Option<&'a Value> {
        let mut current = value;
        for component in &self.0 {
            current = match (component, current) {
                (PathComponent::Key(key), Value::Object(map)) => map.get(key)?,
                (PathComponent::Index(index), Value::Array(items)) => items.get(*index)?,
                (PathComponent::Index(index), Value::Object(map)) => map.get(&index.to_string())?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Mutable lookup of the node addressed by this path.
    pub fn resolve_in_mut<'a>(&self, value: &'a mut Value) -> Option<&'a mut Value> {
        let mut current = value;
        for component in &self.0 {
            current = match (component, current) {
                (PathComponent::Key(key), Value::Object(map)) => map.get_mut(key)?,
                (PathComponent::Index(index), Value::Array(items)) => items.get_mut(*index)?,
                (PathComponent::Index(index), Value::Object(map)) => {
                    map.get_mut(&index.to_string())?
                }
                _ => return None,
            };
        }
        Some(current)
    }
}

impl fmt::Display for JsonPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "/");
        }
        write!(f, "{}", self.to_pointer())
    }
}

impl<C: Into<PathComponent>> FromIterator<C> for JsonPath {
    fn from_iter<I: IntoIterator<Item = C>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Collect every node of `value` in pre-order, paths prefixed with `base`.
pub fn descendants<'a>(value: &'a Value, base: &JsonPath) -> Vec<(JsonPath, &'a Value)> {
    let mut nodes = Vec::new();
    collect_descendants(value, base.clone(), &mut nodes);
    nodes
}

fn collect_descendants<'a>(value: &'a Value, path: JsonPath, out: &mut Vec<(JsonPath, &'a Value)>) {
    match value {
        Value::Object(map) => {
            out.push((path.clone(), value));
            for (key, child) in map {
                collect_descendants(child, path.child(key.as_str()), out);
            }
        }
        Value::Array(items) => {
            out.push((path.clone(), value));
            for (index, child) in items.iter().enumerate() {
                collect_descendants(child, path.child(index), out);
            }
        }
        _ => out.push((path, value)),
    }
}

/// A `$ref` node found while descending a tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceNode {
    /// Path of the `$ref` member itself.
    pub path: JsonPath,
    pub value: String,
}

/// Collect every string-valued `$ref` member under `value`.
pub fn reference_nodes(value: &Value, base: &JsonPath) -> Vec<ReferenceNode> {
    descendants(value, base)
        .into_iter()
        .filter(|(path, _)| path.key_from_end(0) == Some(REF_KEY))
        .filter_map(|(path, node)| {
            node.as_str().map(|pointer| ReferenceNode {
                path,
                value: pointer.to_string(),
            })
        })
        .collect()
}

/// 1-based line and column of a node in its original file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

/// Node path to position, for one parsed document.
pub type PositionIndex = HashMap<JsonPath, Position>;

/// One end of a [`Mapping`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MappingPoint {
    pub path: JsonPath,
}

/// Provenance record: the node at `generated.path` was derived from the
/// node at `original.path` in document `source`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Mapping {
    /// Short reason shown in diagnostics (e.g. "inlining produces").
    pub name: String,
    /// Store key of the document the value came from.
    pub source: String,
    pub original: MappingPoint,
    pub generated: MappingPoint,
}

impl Mapping {
    pub fn new(
        name: impl Into<String>,
        source: impl Into<String>,
        original: JsonPath,
        generated: JsonPath,
    ) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            original: MappingPoint { path: original },
            generated: MappingPoint { path: generated },
        }
    }
}

/// A node located in an original, user-authored document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceLocation {
    /// Origin URI of the document, or its store key when it was not loaded from a file.
    pub document: String,
    pub path: JsonPath,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.position {
            Some(position) => write!(
                f,
                "{}:{}:{} ({})",
                self.document, position.line, position.column, self.path
            ),
            None => write!(f, "{} ({})", self.document, self.path),
        }
    }
}
