//! Append-only, scoped storage of document revisions.
//!
//! Every intermediate document the pipeline produces is written here once
//! and never modified. A write returns a [`DocumentHandle`], a cheap
//! reference to that exact snapshot together with the mapping records that
//! tie it to the documents it was derived from.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock};

use serde_json::Value;

use crate::error::StoreError;
use crate::source_map;
use crate::types::{JsonPath, Mapping, PositionIndex, SourceLocation};

/// Contents of an artifact about to be written.
#[derive(Debug, Clone, Default)]
pub struct NewArtifact {
    value: Value,
    origin: Option<String>,
    positions: PositionIndex,
    mappings: Vec<Mapping>,
    inputs: Vec<DocumentHandle>,
}

impl NewArtifact {
    /// A document derived from other artifacts.
    pub fn derived(value: Value) -> Self {
        Self {
            value,
            ..Self::default()
        }
    }

    /// A document loaded from `origin`, with node positions in that file.
    pub fn loaded(value: Value, origin: impl Into<String>, positions: PositionIndex) -> Self {
        Self {
            value,
            origin: Some(origin.into()),
            positions,
            ..Self::default()
        }
    }

    pub fn with_mappings(mut self, mappings: Vec<Mapping>) -> Self {
        self.mappings = mappings;
        self
    }

    pub fn with_inputs(mut self, inputs: Vec<DocumentHandle>) -> Self {
        self.inputs = inputs;
        self
    }
}

#[derive(Debug)]
struct Artifact {
    key: String,
    origin: Option<String>,
    value: Value,
    positions: PositionIndex,
    mappings: Vec<Mapping>,
    inputs: Vec<DocumentHandle>,
}

/// Immutable reference to one stored revision.
#[derive(Debug, Clone)]
pub struct DocumentHandle(Arc<Artifact>);

impl DocumentHandle {
    /// Store key (scope path and name) identifying this revision.
    pub fn key(&self) -> &str {
        &self.0.key
    }

    /// URI the document was loaded from, for documents read from an input.
    pub fn origin(&self) -> Option<&str> {
        self.0.origin.as_deref()
    }

    /// Parsed document tree.
    pub fn object(&self) -> &Value {
        &self.0.value
    }

    /// Owned copy of the document tree, for building the next revision.
    pub fn read_object(&self) -> Value {
        self.0.value.clone()
    }

    pub fn positions(&self) -> &PositionIndex {
        &self.0.positions
    }

    /// Mapping records whose generated side lies in this revision.
    pub fn mappings(&self) -> &[Mapping] {
        &self.0.mappings
    }

    /// Artifacts this revision was derived from.
    pub fn inputs(&self) -> &[DocumentHandle] {
        &self.0.inputs
    }

    /// Every mapping record behind this revision, each paired with the key of
    /// the revision it generates into.
    ///
    /// Records of inputs come first, in input order, followed by this
    /// revision's own records. Shared ancestors are listed once.
    pub fn source_map(&self) -> Vec<(&str, &Mapping)> {
        let mut seen = HashSet::new();
        let mut records = Vec::new();
        self.collect_source_map(&mut seen, &mut records);
        records
    }

    fn collect_source_map<'a>(
        &'a self,
        seen: &mut HashSet<&'a str>,
        records: &mut Vec<(&'a str, &'a Mapping)>,
    ) {
        if !seen.insert(self.key()) {
            return;
        }
        for input in self.inputs() {
            input.collect_source_map(seen, records);
        }
        records.extend(self.mappings().iter().map(|m| (self.key(), m)));
    }

    /// Walk provenance back to the user-authored node(s) `path` came from.
    pub fn trace(&self, path: &JsonPath) -> Vec<SourceLocation> {
        source_map::trace(self, path)
    }

    /// Identifier used in diagnostics: the origin URI of the document this
    /// revision descends from (through its first input), else the store key.
    pub fn display_name(&self) -> &str {
        match (self.origin(), self.inputs().first()) {
            (Some(origin), _) => origin,
            (None, Some(primary)) => primary.display_name(),
            (None, None) => self.key(),
        }
    }
}

type Entries = BTreeMap<String, DocumentHandle>;

/// Shared append-only artifact storage.
#[derive(Debug, Clone, Default)]
pub struct ArtifactStore {
    entries: Arc<RwLock<Entries>>,
}

impl ArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The unnamed root scope.
    pub fn root(&self) -> StoreScope {
        StoreScope {
            store: self.clone(),
            prefix: String::new(),
        }
    }

    pub fn read(&self, key: &str) -> Option<DocumentHandle> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// All keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    fn insert(&self, key: String, artifact: NewArtifact) -> Result<DocumentHandle, StoreError> {
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if entries.contains_key(&key) {
            return Err(StoreError::AlreadyExists { key });
        }
        let handle = DocumentHandle(Arc::new(Artifact {
            key: key.clone(),
            origin: artifact.origin,
            value: artifact.value,
            positions: artifact.positions,
            mappings: artifact.mappings,
            inputs: artifact.inputs,
        }));
        entries.insert(key, handle.clone());
        Ok(handle)
    }
}

/// A named view into part of an [`ArtifactStore`].
#[derive(Debug, Clone)]
pub struct StoreScope {
    store: ArtifactStore,
    prefix: String,
}

impl StoreScope {
    /// Nested scope `<this scope>/<name>`.
    pub fn create_scope(&self, name: &str) -> StoreScope {
        StoreScope {
            store: self.store.clone(),
            prefix: self.key_for(name),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Full store key of `name` inside this scope.
    pub fn key_for(&self, name: &str) -> String {
        if self.prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", self.prefix, name)
        }
    }

    /// Write a new artifact named `name`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::AlreadyExists` if the name is taken in this scope.
    pub fn write(&self, name: &str, artifact: NewArtifact) -> Result<DocumentHandle, StoreError> {
        let key = self.key_for(name);
        tracing::debug!(key = %key, "writing artifact");
        self.store.insert(key, artifact)
    }

    pub fn read(&self, name: &str) -> Option<DocumentHandle> {
        self.store.read(&self.key_for(name))
    }

    /// Keys of every artifact inside this scope, nested scopes included.
    pub fn enumerate(&self) -> Vec<String> {
        let prefix = format!("{}/", self.prefix);
        self.store
            .keys()
            .into_iter()
            .filter(|key| self.prefix.is_empty() || key.starts_with(&prefix))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn write_and_read_back() {
        let store = ArtifactStore::new();
        let scope = store.root().create_scope("loader").create_scope("0");
        let handle = scope
            .write("doc.yaml", NewArtifact::derived(json!({ "swagger": "2.0" })))
            .unwrap();

        assert_eq!(handle.key(), "loader/0/doc.yaml");
        assert_eq!(handle.object()["swagger"], "2.0");
        let read = store.read("loader/0/doc.yaml").unwrap();
        assert_eq!(read.object(), handle.object());
        assert!(scope.read("doc.yaml").is_some());
    }

    #[test]
    fn writes_are_append_only() {
        let store = ArtifactStore::new();
        let scope = store.root().create_scope("compose");
        scope.write("composed.yaml", NewArtifact::derived(json!({}))).unwrap();

        let again = scope.write("composed.yaml", NewArtifact::derived(json!({ "x": 1 })));
        assert!(matches!(again, Err(StoreError::AlreadyExists { key }) if key == "compose/composed.yaml"));
        assert_eq!(store.read("compose/composed.yaml").unwrap().object(), &json!({}));
    }

    #[test]
    fn enumerate_is_scoped() {
        let store = ArtifactStore::new();
        let a = store.root().create_scope("a");
        let ab = a.create_scope("b");
        let other = store.root().create_scope("ab");
        a.write("1.yaml", NewArtifact::default()).unwrap();
        ab.write("2.yaml", NewArtifact::default()).unwrap();
        other.write("3.yaml", NewArtifact::default()).unwrap();

        assert_eq!(a.enumerate(), vec!["a/1.yaml", "a/b/2.yaml"]);
        assert_eq!(ab.enumerate(), vec!["a/b/2.yaml"]);
        assert_eq!(store.root().enumerate().len(), 3);
    }

    #[test]
    fn source_map_lists_inputs_first_once() {
        let store = ArtifactStore::new();
        let scope = store.root();
        let base = scope
            .write("base.yaml", NewArtifact::derived(json!({ "a": 1 })))
            .unwrap();
        let left = scope
            .write(
                "left.yaml",
                NewArtifact::derived(json!({ "a": 1 }))
                    .with_mappings(vec![Mapping::new(
                        "left",
                        base.key(),
                        JsonPath::root(),
                        JsonPath::root(),
                    )])
                    .with_inputs(vec![base.clone()]),
            )
            .unwrap();
        let right = scope
            .write(
                "right.yaml",
                NewArtifact::derived(json!({ "a": 1 }))
                    .with_mappings(vec![Mapping::new(
                        "right",
                        base.key(),
                        JsonPath::root(),
                        JsonPath::root(),
                    )])
                    .with_inputs(vec![base]),
            )
            .unwrap();
        let top = scope
            .write(
                "top.yaml",
                NewArtifact::derived(json!({ "a": 1 }))
                    .with_mappings(vec![Mapping::new(
                        "top",
                        left.key(),
                        JsonPath::root(),
                        JsonPath::root(),
                    )])
                    .with_inputs(vec![left, right]),
            )
            .unwrap();

        let names: Vec<(&str, &str)> = top
            .source_map()
            .into_iter()
            .map(|(key, m)| (key, m.name.as_str()))
            .collect();
        assert_eq!(
            names,
            vec![
                ("left.yaml", "left"),
                ("right.yaml", "right"),
                ("top.yaml", "top")
            ]
        );
    }
}
