//! Reference resolution: pulls every entity a document references into it.
//!
//! Starting from an entry document, every `$ref` that points into another
//! file is followed. The referenced entity, and transitively everything it
//! references, is copied into the entry document under the same
//! `<entityType>/<entityName>`, and the pointer is rewritten to the
//! same-file form `#/<entityType>/<entityName>`. Subtypes (entities whose
//! `allOf` names a copied entity) are pulled in along with their supertype.
//!
//! Each completed step commits a new revision of the entry document to the
//! store; nothing is modified in place.

use std::collections::{HashMap, HashSet};

use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::ResolveError;
use crate::loader::{load_literate, resolve_uri, InputSource};
use crate::source_map::{assignment_mappings, identity_mappings};
use crate::store::{DocumentHandle, NewArtifact, StoreScope};
use crate::types::{reference_nodes, JsonPath, Mapping, PathComponent, ReferenceNode, REF_KEY};

/// Scope (inside the resolution scope) receiving the entry document.
const ENTRY_SCOPE: &str = "yaml";

/// Scope (inside the resolution scope) receiving committed revisions.
const REVISION_SCOPE: &str = "ref-resolving";

/// Latest handle of every file touched by one resolution, by absolute URI.
pub type ExternalFileTable = HashMap<Url, DocumentHandle>;

/// An addressable `(entityType, entityName)` unit of a document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Entity {
    pub entity_type: String,
    pub name: String,
}

impl Entity {
    /// Entity addressed by a `#/<entityType>/<entityName>[/...]` fragment.
    pub fn from_fragment(fragment: &str) -> Option<Self> {
        let path = JsonPath::from_pointer(fragment);
        Self::from_components(path.components())
    }

    /// Entity owning the node at `path` (its first two steps).
    pub fn from_path(path: &JsonPath) -> Option<Self> {
        Self::from_components(path.components())
    }

    fn from_components(components: &[PathComponent]) -> Option<Self> {
        let key = |component: &PathComponent| match component {
            PathComponent::Key(key) => key.clone(),
            PathComponent::Index(index) => index.to_string(),
        };
        match components {
            [entity_type, name, ..] => Some(Self {
                entity_type: key(entity_type),
                name: key(name),
            }),
            _ => None,
        }
    }

    pub fn path(&self) -> JsonPath {
        JsonPath::root()
            .child(self.entity_type.as_str())
            .child(self.name.as_str())
    }

    /// Fully-qualified same-file pointer, `#/<entityType>/<entityName>`.
    pub fn pointer(&self) -> String {
        format!("#{}", self.path().to_pointer())
    }
}

/// Resolve `uri` into a self-contained document.
///
/// The entry document is loaded into `<scope>/yaml`, external files into
/// `<scope>/ext_<n>` and every committed revision into
/// `<scope>/ref-resolving/revision_<n>.yaml`. The returned handle is the last
/// revision.
///
/// Fragment-less pointers (`other.yaml` without `#`) are left untouched.
///
/// # Errors
///
/// - `ResolveError::FileNotFound` (or another load error) for the entry
///   document or any referenced file
/// - `ResolveError::UnresolvedReference` when a referenced entity does not
///   exist, or a same-file pointer is left dangling after resolution
/// - `ResolveError::Cancelled` if `cancel` fires before a load or commit
pub fn resolve(
    input: &dyn InputSource,
    uri: &Url,
    scope: &StoreScope,
    cancel: &CancellationToken,
) -> Result<DocumentHandle, ResolveError> {
    tracing::info!(uri = %uri, "resolving references");

    let entry = load_literate(input, uri, &scope.create_scope(ENTRY_SCOPE), cancel)?;
    let mut resolution = Resolution {
        input,
        scope,
        revisions: scope.create_scope(REVISION_SCOPE),
        cancel,
        source_uri: uri.clone(),
        working: entry.read_object(),
        visited: HashSet::new(),
        external_files: HashMap::from([(uri.clone(), entry)]),
        pending_mappings: Vec::new(),
        pending_inputs: Vec::new(),
    };

    let source_uri = uri.clone();
    resolution.ensure_complete(&source_uri, None)?;
    let resolved = resolution.latest();

    if let Some(reference) = unresolved_references(resolved.object()).into_iter().next() {
        return Err(ResolveError::UnresolvedReference {
            document: uri.to_string(),
            path: reference.path,
            pointer: reference.value,
        });
    }

    tracing::info!(
        uri = %uri,
        revision = %resolved.key(),
        files = resolution.external_files.len(),
        "references resolved"
    );
    Ok(resolved)
}

/// Same-file pointers in `document` that address nothing.
pub fn unresolved_references(document: &Value) -> Vec<ReferenceNode> {
    reference_nodes(document, &JsonPath::root())
        .into_iter()
        .filter(|r| r.value.starts_with('#') && JsonPath::locate(&r.value, document).is_none())
        .collect()
}

/// State of one top-level [`resolve`] call.
struct Resolution<'a> {
    input: &'a dyn InputSource,
    scope: &'a StoreScope,
    revisions: StoreScope,
    cancel: &'a CancellationToken,
    source_uri: Url,
    /// Working object of the entry document, shared by every recursion level.
    working: Value,
    /// Fully-qualified pointers already inlined or in progress.
    visited: HashSet<String>,
    external_files: ExternalFileTable,
    /// Records and inputs for values copied since the last commit.
    pending_mappings: Vec<Mapping>,
    pending_inputs: Vec<DocumentHandle>,
}

impl Resolution<'_> {
    fn latest(&self) -> DocumentHandle {
        self.external_files[&self.source_uri].clone()
    }

    /// Make sure everything reachable from `current_uri` is present in the
    /// entry document.
    ///
    /// Without `entity`, scans the whole current document for references to
    /// other files. With `entity`, scans only that entity's subtree (any
    /// target) and then pulls in the entities whose `allOf` names it.
    fn ensure_complete(
        &mut self,
        current_uri: &Url,
        entity: Option<&Entity>,
    ) -> Result<(), ResolveError> {
        let current = self.object_of(current_uri);
        let references: Vec<ReferenceNode> = match entity {
            None => reference_nodes(&current, &JsonPath::root())
                .into_iter()
                .filter(|r| !r.value.starts_with('#'))
                .collect(),
            Some(entity) => {
                let path = entity.path();
                match path.resolve_in(&current) {
                    Some(subtree) => reference_nodes(subtree, &path),
                    None => Vec::new(),
                }
            }
        };

        for reference in &references {
            self.follow(current_uri, reference)?;
        }

        if let Some(entity) = entity {
            self.include_dependents(current_uri, entity, &current)?;
        }

        self.commit()
    }

    /// Process one reference found in `current_uri`.
    fn follow(&mut self, current_uri: &Url, reference: &ReferenceNode) -> Result<(), ResolveError> {
        let Some(hash) = reference.value.find('#') else {
            // whole-file references are not inlined
            tracing::warn!(
                pointer = %reference.value,
                path = %reference.path,
                "skipping reference without a fragment"
            );
            return Ok(());
        };
        let (file_part, fragment) = reference.value.split_at(hash);
        let Some(target) = Entity::from_fragment(fragment) else {
            tracing::warn!(pointer = %reference.value, "skipping reference to a non-entity");
            return Ok(());
        };

        let file_uri = if file_part.is_empty() {
            None
        } else {
            let uri = resolve_uri(&self.source_uri, file_part)?;
            self.ensure_loaded(&uri)?;
            Some(uri)
        };

        if *current_uri == self.source_uri {
            if let Some(node) = reference.path.resolve_in_mut(&mut self.working) {
                *node = Value::String(fragment.to_string());
            }
        }

        let pointer = target.pointer();
        if !self.visited.insert(pointer.clone()) {
            tracing::debug!(pointer = %pointer, "already visited");
            return Ok(());
        }
        if target.path().resolve_in(&self.working).is_some() {
            return Ok(());
        }

        let origin_uri = file_uri.unwrap_or_else(|| current_uri.clone());
        if !self.has_entity(&origin_uri, &target) {
            return Err(ResolveError::UnresolvedReference {
                document: current_uri.to_string(),
                path: reference.path.clone(),
                pointer: reference.value.clone(),
            });
        }

        tracing::debug!(pointer = %pointer, from = %origin_uri, "inlining entity");
        self.ensure_complete(&origin_uri, Some(&target))?;
        self.copy_entity(&origin_uri, &target)
    }

    /// Pull in every entity of `current` whose `allOf` references `entity`.
    fn include_dependents(
        &mut self,
        current_uri: &Url,
        entity: &Entity,
        current: &Value,
    ) -> Result<(), ResolveError> {
        let pointer = entity.pointer();
        let mut dependents: Vec<Entity> = Vec::new();
        for reference in reference_nodes(current, &JsonPath::root()) {
            let is_all_of = reference.path.len() > 3 && reference.path.key_from_end(2) == Some("allOf");
            let names_entity = reference
                .value
                .find('#')
                .map(|hash| reference.value[hash..] == pointer)
                .unwrap_or(false);
            if !(is_all_of && names_entity) {
                continue;
            }
            if let Some(dependent) = Entity::from_path(&reference.path) {
                if !dependents.contains(&dependent) {
                    dependents.push(dependent);
                }
            }
        }

        for dependent in dependents {
            if !self.visited.insert(dependent.pointer()) {
                continue;
            }
            if dependent.path().resolve_in(&self.working).is_some() {
                tracing::debug!(subtype = %dependent.pointer(), "allOf dependent already present");
                continue;
            }
            tracing::debug!(
                subtype = %dependent.pointer(),
                supertype = %pointer,
                "including allOf dependent"
            );
            self.ensure_complete(current_uri, Some(&dependent))?;
            if dependent.path().resolve_in(&self.working).is_none() {
                self.copy_entity(current_uri, &dependent)?;
            }
        }
        Ok(())
    }

    /// Copy `entity` from `origin_uri` into the working object.
    fn copy_entity(&mut self, origin_uri: &Url, entity: &Entity) -> Result<(), ResolveError> {
        if *origin_uri == self.source_uri {
            // same object: resolved in place
            return Ok(());
        }

        let origin = self.external_files[origin_uri].clone();
        let path = entity.path();
        let mut value = path.resolve_in(origin.object()).cloned().ok_or_else(|| {
            ResolveError::UnresolvedReference {
                document: origin_uri.to_string(),
                path: path.clone(),
                pointer: entity.pointer(),
            }
        })?;
        strip_file_parts(&mut value);

        let reason = format!("resolving {}", entity.pointer());
        let Value::Object(document) = &mut self.working else {
            return Err(ResolveError::MalformedDocument {
                uri: self.source_uri.to_string(),
                message: "expected a mapping at the root".to_string(),
            });
        };
        let section = document
            .entry(entity.entity_type.clone())
            .or_insert_with(|| {
                self.pending_mappings.push(Mapping::new(
                    reason.clone(),
                    origin.key(),
                    JsonPath::root().child(entity.entity_type.as_str()),
                    JsonPath::root().child(entity.entity_type.as_str()),
                ));
                Value::Object(Map::new())
            });
        let Value::Object(section) = section else {
            return Err(ResolveError::MalformedDocument {
                uri: self.source_uri.to_string(),
                message: format!("'{}' is not a mapping", entity.entity_type),
            });
        };

        self.pending_mappings
            .extend(assignment_mappings(&value, origin.key(), &path, &path, &reason));
        section.insert(entity.name.clone(), value);
        if !self.pending_inputs.iter().any(|i| i.key() == origin.key()) {
            self.pending_inputs.push(origin);
        }
        Ok(())
    }

    /// Write the working object as the next revision of the entry document.
    fn commit(&mut self) -> Result<(), ResolveError> {
        if self.cancel.is_cancelled() {
            return Err(ResolveError::Cancelled);
        }

        let previous = self.latest();
        let mut mappings = identity_mappings(previous.key(), previous.object());
        mappings.append(&mut self.pending_mappings);
        let mut inputs = vec![previous];
        inputs.append(&mut self.pending_inputs);

        let name = format!("revision_{}.yaml", self.revisions.enumerate().len());
        let handle = self.revisions.write(
            &name,
            NewArtifact::derived(self.working.clone())
                .with_mappings(mappings)
                .with_inputs(inputs),
        )?;
        tracing::debug!(revision = %handle.key(), "committed revision");
        self.external_files.insert(self.source_uri.clone(), handle);
        Ok(())
    }

    fn ensure_loaded(&mut self, uri: &Url) -> Result<(), ResolveError> {
        if self.external_files.contains_key(uri) {
            return Ok(());
        }
        let scope = self
            .scope
            .create_scope(&format!("ext_{}", self.external_files.len()));
        let handle = load_literate(self.input, uri, &scope, self.cancel)?;
        self.external_files.insert(uri.clone(), handle);
        Ok(())
    }

    /// Current object of a file: the working object for the entry document,
    /// the loaded tree for any other.
    fn object_of(&self, uri: &Url) -> Value {
        if *uri == self.source_uri {
            self.working.clone()
        } else {
            self.external_files
                .get(uri)
                .map(DocumentHandle::read_object)
                .unwrap_or(Value::Null)
        }
    }

    fn has_entity(&self, uri: &Url, entity: &Entity) -> bool {
        let path = entity.path();
        if *uri == self.source_uri {
            path.resolve_in(&self.working).is_some()
        } else {
            self.external_files
                .get(uri)
                .and_then(|h| path.resolve_in(h.object()))
                .is_some()
        }
    }
}

/// Rewrite every `<file>#<fragment>` pointer under `value` to `#<fragment>`.
fn strip_file_parts(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, child) in map.iter_mut() {
                if key == REF_KEY {
                    if let Value::String(pointer) = child {
                        if let Some(hash) = pointer.find('#') {
                            if hash > 0 {
                                *pointer = pointer[hash..].to_string();
                            }
                        }
                        continue;
                    }
                }
                strip_file_parts(child);
            }
        }
        Value::Array(items) => {
            for item in items {
                strip_file_parts(item);
            }
        }
        _ => {}
    }
}
