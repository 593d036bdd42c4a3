//! Dotted key paths and their equivalence with nested trees.
//!
//! `{"foo.bar": 1}` and `{"foo": {"bar": 1}}` name the same tree; [`expand`]
//! canonicalizes the former into the latter at every depth, so the merge
//! engine and the access layer only ever see nested mappings.

use std::sync::Arc;

use crate::error::ConfitError;
use crate::value::{Map, Value};

/// The key separator for dotted paths.
pub const SEPARATOR: char = '.';

/// Split a dotted path into its segments.
pub fn split(path: &str) -> impl Iterator<Item = &str> {
    path.split(SEPARATOR)
}

/// Join path segments into a dotted path.
pub fn join<I, S>(segments: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut joined = String::new();
    for segment in segments {
        if !joined.is_empty() {
            joined.push(SEPARATOR);
        }
        joined.push_str(segment.as_ref());
    }
    joined
}

/// Canonicalize a source mapping: every dotted key, at every depth (including
/// inside sequences), is expanded into nested mappings. Expanding an already
/// canonical mapping is a no-op.
///
/// Fails with [`ConfitError::PathConflict`] when a dotted key's expansion
/// collides with a different non-mapping value already present at a shared
/// prefix.
pub fn expand(source: &Map) -> Result<Map, ConfitError> {
    expand_at(source, &mut Vec::new())
}

fn expand_at(source: &Map, at: &mut Vec<String>) -> Result<Map, ConfitError> {
    let mut result = Map::new();
    for (key, value) in source {
        at.push(key.clone());
        let value = expand_value(value, at)?;
        at.pop();
        let mut segments = split(key);
        // the trailing segments become a chain of single-entry mappings
        // wrapped around the value, deepest first
        let head = segments.next().unwrap_or_default().to_string();
        let mut node = value;
        let rest: Vec<&str> = segments.collect();
        for segment in rest.into_iter().rev() {
            let mut wrapper = Map::new();
            wrapper.insert(segment.to_string(), node);
            node = Value::mapping(wrapper);
        }
        insert_strict(&mut result, head, node, at)?;
    }
    Ok(result)
}

fn expand_value(value: &Value, at: &mut Vec<String>) -> Result<Value, ConfitError> {
    match value {
        Value::Mapping(map) => Ok(Value::mapping(expand_at(map, at)?)),
        Value::Sequence(items) => {
            let expanded = items
                .iter()
                .map(|item| expand_value(item, at))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Value::sequence(expanded))
        }
        scalar => Ok(scalar.clone()),
    }
}

/// Add `value` under `key`, merging mapping-with-mapping recursively and
/// rejecting any other overlap (unless both sides are already equal).
fn insert_strict(
    target: &mut Map,
    key: String,
    value: Value,
    at: &mut Vec<String>,
) -> Result<(), ConfitError> {
    match target.remove(&key) {
        None => {
            target.insert(key, value);
            Ok(())
        }
        Some(Value::Mapping(existing)) => {
            if let Value::Mapping(incoming) = value {
                at.push(key.clone());
                let mut merged = (*existing).clone();
                let incoming =
                    Arc::try_unwrap(incoming).unwrap_or_else(|shared| (*shared).clone());
                for (sub_key, sub_value) in incoming {
                    insert_strict(&mut merged, sub_key, sub_value, at)?;
                }
                at.pop();
                target.insert(key, Value::mapping(merged));
                Ok(())
            } else {
                at.push(key);
                let path = join(at.iter());
                Err(ConfitError::PathConflict { path })
            }
        }
        Some(existing) => {
            if existing == value {
                target.insert(key, value);
                Ok(())
            } else {
                at.push(key);
                let path = join(at.iter());
                Err(ConfitError::PathConflict { path })
            }
        }
    }
}

/// Walk a canonical mapping by dotted path, without resolving references.
pub(crate) fn lookup<'a>(map: &'a Map, path: &str) -> Option<&'a Value> {
    let (prefix, leaf) = match path.rsplit_once(SEPARATOR) {
        Some((prefix, leaf)) => (Some(prefix), leaf),
        None => (None, path),
    };

    let mut current = map;
    if let Some(prefix) = prefix {
        for segment in split(prefix) {
            current = current.get(segment)?.as_mapping()?;
        }
    }
    current.get(leaf)
}
