//! Provenance records linking generated nodes back to their origins.
//!
//! Any value written into a generated document from somewhere else gets a
//! [`Mapping`] per node. Records are flat: they name the source revision and
//! the original path, never another record. Walking them revision by revision
//! ends at a loaded document, whose position index gives line and column.

use std::collections::HashSet;

use serde_json::Value;

use crate::store::DocumentHandle;
use crate::types::{descendants, JsonPath, Mapping, PathComponent, Position, SourceLocation};

/// Reason attached to records carrying a node over unchanged.
pub const IDENTITY: &str = "identity";

/// One record per node of `value`, mapping each path onto itself.
pub fn identity_mappings(source: &str, value: &Value) -> Vec<Mapping> {
    descendants(value, &JsonPath::root())
        .into_iter()
        .map(|(path, _)| Mapping::new(IDENTITY, source, path.clone(), path))
        .collect()
}

/// Records for assigning `value` (found at `original` in `source`) to
/// `generated`: one per node of the assigned subtree.
pub fn assignment_mappings(
    value: &Value,
    source: &str,
    original: &JsonPath,
    generated: &JsonPath,
    reason: &str,
) -> Vec<Mapping> {
    descendants(value, &JsonPath::root())
        .into_iter()
        .map(|(relative, _)| {
            Mapping::new(
                reason,
                source,
                original.join(relative.components()),
                generated.join(relative.components()),
            )
        })
        .collect()
}

/// Locate the user-authored node(s) that `path` in `handle` derives from.
pub fn trace(handle: &DocumentHandle, path: &JsonPath) -> Vec<SourceLocation> {
    let mut visited = HashSet::new();
    let mut locations = Vec::new();
    trace_into(handle, path, &mut visited, &mut locations);
    locations
}

fn trace_into(
    handle: &DocumentHandle,
    path: &JsonPath,
    visited: &mut HashSet<(String, JsonPath)>,
    locations: &mut Vec<SourceLocation>,
) {
    if !visited.insert((handle.key().to_string(), path.clone())) {
        return;
    }

    if handle.mappings().is_empty() {
        let location = SourceLocation {
            document: handle.display_name().to_string(),
            path: path.clone(),
            position: position_of(handle, path),
        };
        if !locations.contains(&location) {
            locations.push(location);
        }
        return;
    }

    for (mapping, suffix) in matching_records(handle.mappings(), path) {
        let original = mapping.original.path.join(suffix);
        match handle.inputs().iter().find(|i| i.key() == mapping.source) {
            Some(input) => trace_into(input, &original, visited, locations),
            None => {
                let location = SourceLocation {
                    document: mapping.source.clone(),
                    path: original,
                    position: None,
                };
                if !locations.contains(&location) {
                    locations.push(location);
                }
            }
        }
    }
}

/// Records generating exactly `path`, or else those generating its nearest
/// mapped ancestor, paired with the part of `path` below that ancestor.
fn matching_records<'a, 'p>(
    mappings: &'a [Mapping],
    path: &'p JsonPath,
) -> Vec<(&'a Mapping, &'p [PathComponent])> {
    let components = path.components();
    for len in (0..=components.len()).rev() {
        let (prefix, suffix) = components.split_at(len);
        let found: Vec<_> = mappings
            .iter()
            .filter(|m| m.generated.path.components() == prefix)
            .map(|m| (m, suffix))
            .collect();
        if !found.is_empty() {
            return found;
        }
    }
    Vec::new()
}

/// Position of `path`, or of its nearest indexed ancestor.
fn position_of(handle: &DocumentHandle, path: &JsonPath) -> Option<Position> {
    let components = path.components();
    (0..=components.len()).rev().find_map(|len| {
        let prefix: JsonPath = components[..len].iter().cloned().collect();
        handle.positions().get(&prefix).copied()
    })
}
