//! Deep merge of document trees with provenance.

use serde_json::{Map, Value};

use crate::error::ComposeError;
use crate::source_map::assignment_mappings;
use crate::store::DocumentHandle;
use crate::types::{JsonPath, Mapping};

/// Reason attached to records produced by merging.
pub const MERGE_REASON: &str = "merging";

/// What to do when two documents hold different leaf values at one path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConflictPolicy {
    /// Fail with `ComposeError::MergeConflict`.
    #[default]
    Reject,
    /// Keep the value of the later document.
    PreferIncoming,
}

/// Result of [`merge_documents`]: the merged tree and a record for every
/// node each input contributed.
#[derive(Debug, Clone)]
pub struct MergedDocument {
    pub value: Value,
    pub mappings: Vec<Mapping>,
}

/// Merge `documents` in order into one tree.
///
/// - objects are unioned key-wise, recursing into shared keys
/// - arrays are unioned by value; elements already present are not repeated
/// - equal values agree
/// - anything else is a conflict, handled per `policy`
///
/// # Errors
///
/// Returns `ComposeError::MergeConflict` naming the path, the earlier
/// document that defines it and the incoming document.
pub fn merge_documents(
    documents: &[DocumentHandle],
    policy: ConflictPolicy,
) -> Result<MergedDocument, ComposeError> {
    let mut value = Value::Object(Map::new());
    let mut mappings = Vec::new();

    for (index, document) in documents.iter().enumerate() {
        let mut merger = Merger {
            source: document.key(),
            policy,
            mappings: &mut mappings,
        };
        let root = JsonPath::root();
        if let Err(path) = merger.merge(&mut value, document.object(), &root, &root) {
            let existing = documents[..index]
                .iter()
                .find(|earlier| path.resolve_in(earlier.object()).is_some())
                .map(|earlier| earlier.display_name().to_string())
                .unwrap_or_default();
            return Err(ComposeError::MergeConflict {
                path,
                existing,
                incoming: document.display_name().to_string(),
            });
        }
    }

    Ok(MergedDocument { value, mappings })
}

/// Merge `incoming` into `target` without recording provenance.
///
/// On conflict returns the path where the values disagree.
pub fn merge_values(
    target: &mut Value,
    incoming: &Value,
    policy: ConflictPolicy,
) -> Result<(), JsonPath> {
    let mut discarded = Vec::new();
    let mut merger = Merger {
        source: "",
        policy,
        mappings: &mut discarded,
    };
    let root = JsonPath::root();
    merger.merge(target, incoming, &root, &root)
}

struct Merger<'a> {
    source: &'a str,
    policy: ConflictPolicy,
    mappings: &'a mut Vec<Mapping>,
}

impl Merger<'_> {
    /// Merge `incoming` (at `original` in the source) into `target` (at
    /// `generated`). On conflict returns the generated path.
    fn merge(
        &mut self,
        target: &mut Value,
        incoming: &Value,
        original: &JsonPath,
        generated: &JsonPath,
    ) -> Result<(), JsonPath> {
        if *target == *incoming {
            self.assign(incoming, original, generated);
            return Ok(());
        }

        match (target, incoming) {
            (Value::Object(existing), Value::Object(members)) => {
                self.record(original, generated);
                for (key, member) in members {
                    let original = original.child(key.as_str());
                    let generated = generated.child(key.as_str());
                    match existing.get_mut(key) {
                        Some(slot) => self.merge(slot, member, &original, &generated)?,
                        None => {
                            self.assign(member, &original, &generated);
                            existing.insert(key.clone(), member.clone());
                        }
                    }
                }
                Ok(())
            }
            (Value::Array(existing), Value::Array(items)) => {
                self.record(original, generated);
                for (index, item) in items.iter().enumerate() {
                    let position = match existing.iter().position(|e| e == item) {
                        Some(position) => position,
                        None => {
                            existing.push(item.clone());
                            existing.len() - 1
                        }
                    };
                    self.assign(item, &original.child(index), &generated.child(position));
                }
                Ok(())
            }
            (target, incoming) => match self.policy {
                ConflictPolicy::Reject => Err(generated.clone()),
                ConflictPolicy::PreferIncoming => {
                    *target = incoming.clone();
                    self.assign(incoming, original, generated);
                    Ok(())
                }
            },
        }
    }

    fn record(&mut self, original: &JsonPath, generated: &JsonPath) {
        self.mappings.push(Mapping::new(
            MERGE_REASON,
            self.source,
            original.clone(),
            generated.clone(),
        ));
    }

    fn assign(&mut self, value: &Value, original: &JsonPath, generated: &JsonPath) {
        self.mappings.extend(assignment_mappings(
            value,
            self.source,
            original,
            generated,
            MERGE_REASON,
        ));
    }
}
