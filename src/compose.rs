//! Composition of resolved documents into one.
//!
//! In Azure mode each document is first prepared on its own:
//!
//! - `info.title`, `info.description` and `info.version` are dropped
//! - parameters referencing the client-wide `api-version` parameter get an
//!   inlined copy of it, pinned to the document's version:
//!   ```yaml
//!   parameters:
//!     - name: api-version
//!       in: query
//!       type: string
//!       enum: ["2017-03-01"]
//!   ```
//! - document-level `produces`/`consumes` move onto every operation lacking
//!   its own
//!
//! The prepared documents are then deep-merged; an info override, when given,
//! is merged last and wins.

use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use crate::error::ComposeError;
use crate::merge::{merge_documents, ConflictPolicy};
use crate::source_map::{assignment_mappings, identity_mappings};
use crate::store::{DocumentHandle, NewArtifact, StoreScope};
use crate::types::{
    JsonPath, Mapping, API_VERSION_PARAM, HTTP_METHODS, OPERATION_DEFAULTS, PATH_CONTAINERS,
    REF_KEY,
};

/// Name of the merged document inside the compose scope.
pub const COMPOSED_NAME: &str = "composed.yaml";

/// Name of the merged document after the info override was applied.
pub const COMPOSED_INFO_NAME: &str = "composed_info.yaml";

const INFO_NAME: &str = "info.yaml";

const INLINE_API_VERSION: &str = "inlining api-version";

/// Info fields each document gives up to the composed document.
const DIGESTED_INFO_FIELDS: &[&str] = &["title", "description", "version"];

/// Compose `documents` into one document written to `scope`.
///
/// # Errors
///
/// - `ComposeError::MergeConflict` when two documents disagree on a value
/// - `ComposeError::InvalidDocument` when a document root is not a mapping
/// - `ComposeError::Cancelled` if `cancel` fires
pub fn compose(
    scope: &StoreScope,
    info_override: Option<&Value>,
    documents: &[DocumentHandle],
    azure_mode: bool,
    cancel: &CancellationToken,
) -> Result<DocumentHandle, ComposeError> {
    tracing::info!(documents = documents.len(), azure_mode, "composing documents");

    let prepared = if azure_mode {
        documents
            .iter()
            .enumerate()
            .map(|(index, document)| {
                if cancel.is_cancelled() {
                    return Err(ComposeError::Cancelled);
                }
                prepare(scope, index, document)
            })
            .collect::<Result<Vec<_>, _>>()?
    } else {
        documents.to_vec()
    };

    if cancel.is_cancelled() {
        return Err(ComposeError::Cancelled);
    }
    let merged = merge_documents(&prepared, ConflictPolicy::Reject)?;
    let composed = scope.write(
        COMPOSED_NAME,
        NewArtifact::derived(merged.value)
            .with_mappings(merged.mappings)
            .with_inputs(prepared),
    )?;

    let Some(info) = info_override.filter(|info| !is_empty_override(info)) else {
        return Ok(composed);
    };

    let info_document = scope.write(INFO_NAME, NewArtifact::derived(json!({ "info": info })))?;
    let documents = vec![composed, info_document];
    let merged = merge_documents(&documents, ConflictPolicy::PreferIncoming)?;
    let composed = scope.write(
        COMPOSED_INFO_NAME,
        NewArtifact::derived(merged.value)
            .with_mappings(merged.mappings)
            .with_inputs(documents),
    )?;
    Ok(composed)
}

fn is_empty_override(info: &Value) -> bool {
    match info {
        Value::Null => true,
        Value::Object(members) => members.is_empty(),
        _ => false,
    }
}

/// Apply the Azure preparation to `document`, writing `prepared_<index>.yaml`.
fn prepare(
    scope: &StoreScope,
    index: usize,
    document: &DocumentHandle,
) -> Result<DocumentHandle, ComposeError> {
    if !document.object().is_object() {
        return Err(ComposeError::InvalidDocument {
            key: document.key().to_string(),
            message: "expected a mapping at the root".to_string(),
        });
    }

    let preparation = Preparation::plan(document.object(), document.key());
    tracing::debug!(
        document = %document.key(),
        removals = preparation.removals.len(),
        populations = preparation.populations.len(),
        "prepared document"
    );
    let (value, mappings) = preparation.apply(document.read_object(), document.key());

    let handle = scope.write(
        &format!("prepared_{}.yaml", index),
        NewArtifact::derived(value)
            .with_mappings(mappings)
            .with_inputs(vec![document.clone()]),
    )?;
    Ok(handle)
}

/// A planned change to a document.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    /// Remove member `key` from the mapping at `path`.
    Remove { path: JsonPath, key: String },
    /// Copy every member of `value` into the mapping at `path`.
    Assign { path: JsonPath, value: Value },
    /// Set member `key` of the mapping at `path`.
    Set {
        path: JsonPath,
        key: String,
        value: Value,
    },
}

impl Mutation {
    /// Apply to `document`. Mutations whose target is gone are skipped.
    pub fn apply(&self, document: &mut Value) {
        let path = match self {
            Mutation::Remove { path, .. }
            | Mutation::Assign { path, .. }
            | Mutation::Set { path, .. } => path,
        };
        let Some(Value::Object(target)) = path.resolve_in_mut(document) else {
            tracing::debug!(path = %path, "mutation target missing");
            return;
        };
        match self {
            Mutation::Remove { key, .. } => {
                target.remove(key);
            }
            Mutation::Assign { value, .. } => {
                if let Value::Object(members) = value {
                    for (key, member) in members {
                        target.insert(key.clone(), member.clone());
                    }
                }
            }
            Mutation::Set { key, value, .. } => {
                target.insert(key.clone(), value.clone());
            }
        }
    }
}

/// The Azure preparation of one document, computed without touching it.
///
/// Removals are applied first; identity records are then taken over the
/// reduced tree, so original paths describe the document before anything
/// is inlined. Populations come last.
#[derive(Debug, Clone, Default)]
pub struct Preparation {
    pub removals: Vec<Mutation>,
    pub populations: Vec<Mutation>,
    pub mappings: Vec<Mapping>,
}

impl Preparation {
    /// Plan the preparation of `document`, stored under `source`.
    pub fn plan(document: &Value, source: &str) -> Self {
        let mut plan = Self::default();
        let root = JsonPath::root();

        let version = document.pointer("/info/version").cloned();
        if let Some(Value::Object(info)) = document.get("info") {
            for field in DIGESTED_INFO_FIELDS {
                if info.contains_key(*field) {
                    plan.removals.push(Mutation::Remove {
                        path: root.child("info"),
                        key: field.to_string(),
                    });
                }
            }
        }

        let (operations, parameters) = operations_and_parameters(document);

        plan.inline_api_version(document, source, version.as_ref(), &parameters);

        for key in OPERATION_DEFAULTS {
            let Some(default) = document.get(*key) else {
                continue;
            };
            let reason = format!("inlining {}", key);
            for (path, operation) in &operations {
                if operation.get(*key).map_or(true, Value::is_null) {
                    plan.populations.push(Mutation::Set {
                        path: path.clone(),
                        key: key.to_string(),
                        value: default.clone(),
                    });
                    plan.mappings.extend(assignment_mappings(
                        default,
                        source,
                        &root.child(*key),
                        &path.child(*key),
                        &reason,
                    ));
                }
            }
            plan.removals.push(Mutation::Remove {
                path: root.clone(),
                key: key.to_string(),
            });
        }

        plan
    }

    fn inline_api_version(
        &mut self,
        document: &Value,
        source: &str,
        version: Option<&Value>,
        parameters: &[(JsonPath, &Value)],
    ) {
        let Some(Value::Object(client_parameters)) = document.get("parameters") else {
            return;
        };
        let Some((name, definition)) = client_parameters
            .iter()
            .find(|(_, p)| p.get("name").and_then(Value::as_str) == Some(API_VERSION_PARAM))
        else {
            return;
        };

        let definition_path = JsonPath::root().child("parameters").child(name.as_str());
        let pointer = format!("#{}", definition_path.to_pointer());
        let version_path = JsonPath::root().child("info").child("version");
        if version.is_none() {
            tracing::warn!(
                document = %source,
                "no info.version; api-version is inlined without a constant"
            );
        }

        for (path, parameter) in parameters {
            if parameter.get(REF_KEY).and_then(Value::as_str) != Some(pointer.as_str()) {
                continue;
            }

            self.removals.push(Mutation::Remove {
                path: path.clone(),
                key: REF_KEY.to_string(),
            });
            self.populations.push(Mutation::Assign {
                path: path.clone(),
                value: definition.clone(),
            });
            self.mappings.extend(assignment_mappings(
                definition,
                source,
                &definition_path,
                path,
                INLINE_API_VERSION,
            ));

            if let Some(version) = version {
                self.populations.push(Mutation::Set {
                    path: path.clone(),
                    key: "enum".to_string(),
                    value: json!([version]),
                });
                for generated in [path.child("enum"), path.child("enum").child(0)] {
                    self.mappings.push(Mapping::new(
                        INLINE_API_VERSION,
                        source,
                        version_path.clone(),
                        generated,
                    ));
                }
            }
        }

        self.removals.push(Mutation::Remove {
            path: JsonPath::root().child("parameters"),
            key: name.clone(),
        });
    }

    /// Apply the plan to `document` (the tree the plan was made from),
    /// returning the prepared tree and its complete record list.
    pub fn apply(self, mut document: Value, source: &str) -> (Value, Vec<Mapping>) {
        for removal in &self.removals {
            removal.apply(&mut document);
        }
        let mut mappings = self.mappings;
        mappings.extend(identity_mappings(source, &document));
        for population in &self.populations {
            population.apply(&mut document);
        }
        (document, mappings)
    }
}

type Located<'a> = Vec<(JsonPath, &'a Value)>;

/// Operations of every path item, and the parameters of operations and path
/// items.
fn operations_and_parameters(document: &Value) -> (Located<'_>, Located<'_>) {
    let mut operations = Vec::new();
    let mut parameters = Vec::new();

    for container in PATH_CONTAINERS {
        let Some(Value::Object(items)) = document.get(*container) else {
            continue;
        };
        for (name, item) in items {
            let item_path = JsonPath::root().child(*container).child(name.as_str());
            let Value::Object(members) = item else {
                continue;
            };
            for method in HTTP_METHODS {
                if let Some(operation) = members.get(*method).filter(|o| o.is_object()) {
                    operations.push((item_path.child(*method), operation));
                }
            }
            for (path, owner) in operations
                .iter()
                .filter(|(path, _)| path.starts_with(&item_path))
                .map(|(path, operation)| (path.clone(), *operation))
                .chain(std::iter::once((item_path.clone(), item)))
            {
                if let Some(Value::Array(list)) = owner.get("parameters") {
                    for (index, parameter) in list.iter().enumerate() {
                        parameters.push((path.child("parameters").child(index), parameter));
                    }
                }
            }
        }
    }

    (operations, parameters)
}
