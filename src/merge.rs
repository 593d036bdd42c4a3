use std::sync::Arc;

use tracing::trace;

use crate::value::{Map, Value};

/// Deep-merge `overlay` on top of `base`, producing a new tree.
/// If both sides have a mapping for the same key, recurse.
/// Otherwise, `overlay`'s value wins, replacing sequences and whole
/// sub-trees alike.
///
/// Unaffected branches are shared with the inputs rather than copied.
pub fn merged(base: &Map, overlay: &Map) -> Map {
    let mut out = base.clone();
    for (key, overlay_val) in overlay {
        match (out.remove(key), overlay_val) {
            (Some(Value::Mapping(base_map)), Value::Mapping(overlay_map)) => {
                out.insert(
                    key.clone(),
                    Value::Mapping(Arc::new(merged(&base_map, overlay_map))),
                );
            }
            (previous, overlay_val) => {
                if previous.is_some() {
                    trace!(key = %key, "overlay replaces earlier value");
                }
                out.insert(key.clone(), overlay_val.clone());
            }
        }
    }
    out
}

/// Fold an ordered run of canonical trees into one, rightmost winning.
/// No sources yield an empty tree; a single source yields an equivalent
/// tree that shares its unmodified branches.
pub fn merge_all<'a, I>(sources: I) -> Map
where
    I: IntoIterator<Item = &'a Map>,
{
    sources
        .into_iter()
        .fold(Map::new(), |acc, source| merged(&acc, source))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(v: serde_json::Value) -> Map {
        match Value::from(v) {
            Value::Mapping(m) => (*m).clone(),
            other => panic!("expected mapping, got {other:?}"),
        }
    }

    #[test]
    fn disjoint_keys_merge() {
        let out = merged(&map(json!({"host": "localhost"})), &map(json!({"port": 3000})));
        assert_eq!(out, map(json!({"host": "localhost", "port": 3000})));
    }

    #[test]
    fn same_scalar_key_overlay_wins() {
        let out = merged(&map(json!({"port": 8080})), &map(json!({"port": 3000})));
        assert_eq!(out, map(json!({"port": 3000})));
    }

    #[test]
    fn nested_mappings_recurse() {
        let base = map(json!({"database": {"url": "postgres://old", "pool_size": 5}}));
        let overlay = map(json!({"database": {"pool_size": 20}}));
        let out = merged(&base, &overlay);
        assert_eq!(
            out,
            map(json!({"database": {"url": "postgres://old", "pool_size": 20}}))
        );
    }

    #[test]
    fn overlay_scalar_replaces_mapping() {
        let base = map(json!({"database": {"url": "x"}}));
        let overlay = map(json!({"database": "flat_string"}));
        let out = merged(&base, &overlay);
        assert_eq!(out, map(json!({"database": "flat_string"})));
    }

    #[test]
    fn overlay_mapping_replaces_scalar() {
        let base = map(json!({"namespace": "plain"}));
        let overlay = map(json!({"namespace": {"key": 1}}));
        let out = merged(&base, &overlay);
        assert_eq!(out, map(json!({"namespace": {"key": 1}})));
    }

    #[test]
    fn overlay_sequence_replaces_sequence() {
        let base = map(json!({"tags": ["a", "b", "c"]}));
        let overlay = map(json!({"tags": ["z"]}));
        let out = merged(&base, &overlay);
        assert_eq!(out, map(json!({"tags": ["z"]})));
    }

    #[test]
    fn scalar_short_circuits_losing_subtree() {
        let base = map(json!({"a": {"deep": {"key": 1}, "other": 2}}));
        let overlay = map(json!({"a": 2}));
        let out = merged(&base, &overlay);
        assert_eq!(out, map(json!({"a": 2})));
    }

    #[test]
    fn empty_overlay_returns_base() {
        let base = map(json!({"port": 8080}));
        assert_eq!(merged(&base, &Map::new()), base);
    }

    #[test]
    fn empty_base_returns_overlay() {
        let overlay = map(json!({"port": 3000}));
        assert_eq!(merged(&Map::new(), &overlay), overlay);
    }

    #[test]
    fn deeply_nested_three_levels() {
        let base = map(json!({"a": {"b": {"c": {"val": 1, "other": "keep"}}}}));
        let overlay = map(json!({"a": {"b": {"c": {"val": 99}}}}));
        let out = merged(&base, &overlay);
        assert_eq!(
            out,
            map(json!({"a": {"b": {"c": {"val": 99, "other": "keep"}}}}))
        );
    }

    #[test]
    fn merge_all_rightmost_wins() {
        let sources = [
            map(json!({"host": "a"})),
            map(json!({"port": 1000})),
            map(json!({"host": "c"})),
        ];
        let out = merge_all(&sources);
        assert_eq!(out, map(json!({"host": "c", "port": 1000})));
    }

    #[test]
    fn merge_all_of_nothing_is_empty() {
        assert!(merge_all([]).is_empty());
    }

    #[test]
    fn merge_all_of_one_is_equivalent() {
        let source = map(json!({"a": {"b": 1}, "c": [1, 2]}));
        assert_eq!(merge_all([&source]), source);
    }

    #[test]
    fn unaffected_branches_are_shared() {
        let base = map(json!({"kept": {"deep": 1}, "replaced": 2}));
        let out = merged(&base, &map(json!({"replaced": 3})));
        let (Some(Value::Mapping(before)), Some(Value::Mapping(after))) =
            (base.get("kept"), out.get("kept"))
        else {
            panic!("expected mappings");
        };
        assert!(Arc::ptr_eq(before, after));
    }
}
