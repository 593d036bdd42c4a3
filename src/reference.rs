//! Lazy `${dotted.path}` reference resolution.
//!
//! A reference names another location in the same top-level tree; it is
//! resolved when the referring value is read, never at merge time, so a
//! later source can still satisfy a reference an earlier source left
//! dangling. Paths are segments of `[A-Za-z0-9_]+` joined by dots; anything
//! else (unbalanced braces included) is literal text.

use std::collections::BTreeSet;
use std::sync::{Arc, LazyLock};

use regex_lite::Regex;

use crate::error::ConfitError;
use crate::keypath;
use crate::value::{Map, Value};

static REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z0-9_]+(?:\.[A-Za-z0-9_]+)*)\}")
        .expect("reference pattern is valid")
});

/// Resolve any references in `value` against `root`. Only strings are
/// scanned; every other node is returned as-is. A string that is exactly one
/// reference keeps the referenced value's type.
pub fn resolve(root: &Map, value: &Value) -> Result<Value, ConfitError> {
    match value {
        Value::String(s) => resolve_str(root, s, &mut Vec::new()),
        other => Ok(other.clone()),
    }
}

/// Resolve a string value. `stack` carries the chain of paths currently
/// being resolved, for cycle detection.
fn resolve_str(root: &Map, value: &str, stack: &mut Vec<String>) -> Result<Value, ConfitError> {
    // paths substituted in completed render passes; a later pass resolving
    // one of them again means the passes will never converge
    let mut substituted: BTreeSet<String> = BTreeSet::new();
    let mut rendered = value.to_string();

    loop {
        if let Some(path) = sole_reference(&rendered) {
            return resolve_path(root, &path, stack);
        }
        if !REFERENCE.is_match(&rendered) {
            return Ok(Value::String(rendered));
        }

        // template pass: substitute every reference, left to right
        let mut out = String::with_capacity(rendered.len());
        let mut last = 0;
        let mut pass_paths = Vec::new();
        for captures in REFERENCE.captures_iter(&rendered) {
            let (Some(whole), Some(path)) = (captures.get(0), captures.get(1)) else {
                continue;
            };
            let path = path.as_str();
            if substituted.contains(path) {
                return Err(ConfitError::ReferenceCycle {
                    path: path.to_string(),
                });
            }
            let referenced = resolve_path(root, path, stack)?;
            out.push_str(&rendered[last..whole.start()]);
            out.push_str(&render(path, &referenced)?);
            last = whole.end();
            pass_paths.push(path.to_string());
        }
        out.push_str(&rendered[last..]);
        substituted.extend(pass_paths);
        // substituted fragments may have completed a pattern that was
        // split across literal text, so scan the output again
        rendered = out;
    }
}

/// Fully resolve the value at `path`, failing on unknown paths and on
/// chains that revisit a path already being resolved.
fn resolve_path(root: &Map, path: &str, stack: &mut Vec<String>) -> Result<Value, ConfitError> {
    if stack.iter().any(|seen| seen == path) {
        return Err(ConfitError::ReferenceCycle {
            path: path.to_string(),
        });
    }
    let Some(raw) = keypath::lookup(root, path) else {
        return Err(ConfitError::UnresolvedReference {
            reference: path.to_string(),
        });
    };
    match raw {
        Value::String(s) => {
            let s = s.clone();
            stack.push(path.to_string());
            let resolved = resolve_str(root, &s, stack);
            stack.pop();
            resolved
        }
        other => Ok(other.clone()),
    }
}

/// If the whole string is a single reference, its path.
fn sole_reference(value: &str) -> Option<String> {
    let captures = REFERENCE.captures(value)?;
    let whole = captures.get(0)?;
    if whole.start() == 0 && whole.end() == value.len() {
        Some(captures.get(1)?.as_str().to_string())
    } else {
        None
    }
}

/// Render a referenced value into a template; only scalars can be spliced
/// into surrounding text.
fn render(path: &str, value: &Value) -> Result<String, ConfitError> {
    match value {
        Value::Mapping(_) | Value::Sequence(_) => Err(ConfitError::ReferenceNotScalar {
            path: path.to_string(),
            found: value.type_name(),
        }),
        scalar => Ok(scalar.to_string()),
    }
}

/// Resolve every string reachable from `value`, recursing through mappings
/// and sequences. Used for typed extraction, where the whole sub-tree must
/// come out reference-free.
pub fn resolve_deep(root: &Map, value: &Value) -> Result<Value, ConfitError> {
    deep(root, value, &mut Vec::new(), "")
}

fn deep(
    root: &Map,
    value: &Value,
    visiting: &mut Vec<usize>,
    at: &str,
) -> Result<Value, ConfitError> {
    match value {
        Value::String(s) => match sole_reference(s) {
            Some(path) => {
                let referenced = resolve_path(root, &path, &mut Vec::new())?;
                match referenced {
                    composite @ (Value::Mapping(_) | Value::Sequence(_)) => {
                        deep(root, &composite, visiting, &path)
                    }
                    scalar => Ok(scalar),
                }
            }
            None => resolve_str(root, s, &mut Vec::new()),
        },
        Value::Mapping(map) => {
            let address = Arc::as_ptr(map) as usize;
            if visiting.contains(&address) {
                return Err(ConfitError::ReferenceCycle {
                    path: at.to_string(),
                });
            }
            visiting.push(address);
            let resolved = map
                .iter()
                .map(|(key, value)| Ok((key.clone(), deep(root, value, visiting, at)?)))
                .collect::<Result<Map, ConfitError>>();
            visiting.pop();
            Ok(Value::mapping(resolved?))
        }
        Value::Sequence(items) => {
            let address = Arc::as_ptr(items) as usize;
            if visiting.contains(&address) {
                return Err(ConfitError::ReferenceCycle {
                    path: at.to_string(),
                });
            }
            visiting.push(address);
            let resolved = items
                .iter()
                .map(|item| deep(root, item, visiting, at))
                .collect::<Result<Vec<_>, ConfitError>>();
            visiting.pop();
            Ok(Value::sequence(resolved?))
        }
        scalar => Ok(scalar.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keypath::expand;
    use serde_json::json;

    fn tree(v: serde_json::Value) -> Map {
        let Value::Mapping(m) = Value::from(v) else {
            panic!("expected mapping");
        };
        expand(&m).unwrap()
    }

    fn get(root: &Map, path: &str) -> Result<Value, ConfitError> {
        let raw = keypath::lookup(root, path).expect("test key present");
        resolve(root, raw)
    }

    #[test]
    fn plain_string_passes_through() {
        let root = tree(json!({"key": "no references here"}));
        assert_eq!(get(&root, "key").unwrap(), Value::from("no references here"));
    }

    #[test]
    fn malformed_patterns_stay_literal() {
        let root = tree(json!({
            "key1": "$(reference)",
            "key2": "${reference)",
            "key3": "${}",
            "key4": "$ {reference}",
            "key5": "#{reference}",
            "key6": "${key with spaces}",
            "key7": "${dash-ed}",
        }));
        for key in ["key1", "key2", "key3", "key4", "key5", "key6", "key7"] {
            let resolved = get(&root, key).unwrap();
            let raw = keypath::lookup(&root, key).unwrap();
            assert_eq!(&resolved, raw, "{key} should stay literal");
        }
    }

    #[test]
    fn template_renders_scalars() {
        let root = tree(json!({
            "ns.str": "string",
            "ns.int": 42,
            "ns.float": 2.5,
            "ns.bool": true,
            "ref1": "prefix ${ns.str} suffix",
            "ref2": "p${ns.int}s",
            "ref3": "flag=${ns.bool}",
            "ref4": "rate=${ns.float}",
        }));
        assert_eq!(get(&root, "ref1").unwrap(), Value::from("prefix string suffix"));
        assert_eq!(get(&root, "ref2").unwrap(), Value::from("p42s"));
        assert_eq!(get(&root, "ref3").unwrap(), Value::from("flag=true"));
        assert_eq!(get(&root, "ref4").unwrap(), Value::from("rate=2.5"));
    }

    #[test]
    fn sole_reference_keeps_type() {
        let root = tree(json!({
            "ns.int": 42,
            "ns.float": 2.5,
            "ns.bool": true,
            "ns.list": [1, 2],
            "ref_int": "${ns.int}",
            "ref_float": "${ns.float}",
            "ref_bool": "${ns.bool}",
            "ref_list": "${ns.list}",
        }));
        assert_eq!(get(&root, "ref_int").unwrap(), Value::Integer(42));
        assert_eq!(get(&root, "ref_float").unwrap(), Value::Float(2.5));
        assert_eq!(get(&root, "ref_bool").unwrap(), Value::Bool(true));
        assert_eq!(
            get(&root, "ref_list").unwrap(),
            Value::sequence(vec![Value::Integer(1), Value::Integer(2)])
        );
    }

    #[test]
    fn sole_reference_to_namespace_yields_mapping() {
        let root = tree(json!({"key": "${ns}", "ns.key": "string"}));
        let resolved = get(&root, "key").unwrap();
        let Value::Mapping(ns) = resolved else {
            panic!("expected mapping, got {resolved:?}");
        };
        assert_eq!(ns["key"], Value::from("string"));
    }

    #[test]
    fn namespace_in_template_fails() {
        let root = tree(json!({"broken": "no ${ns} inside", "ns.key": "string"}));
        let err = get(&root, "broken").unwrap_err();
        assert!(matches!(err, ConfitError::ReferenceNotScalar { .. }));
        assert!(err.to_string().contains("mapping"));
    }

    #[test]
    fn multiple_references_in_one_template() {
        let root = tree(json!({
            "key": "A seemingly ${ns.word1}, ${ns.word2} sentence.",
            "ns.word1": "full",
            "ns.word2": "complete",
        }));
        assert_eq!(
            get(&root, "key").unwrap(),
            Value::from("A seemingly full, complete sentence.")
        );
    }

    #[test]
    fn duplicate_reference_is_not_a_cycle() {
        let root = tree(json!({"word": "really", "key": "${word}, ${word} good"}));
        assert_eq!(get(&root, "key").unwrap(), Value::from("really, really good"));
    }

    #[test]
    fn multi_level_reference() {
        let root = tree(json!({
            "key": "A ${ns.part1}",
            "ns.part1": "seemingly full, ${ns.part2}.",
            "ns.part2": "complete sentence",
        }));
        assert_eq!(
            get(&root, "ns.part1").unwrap(),
            Value::from("seemingly full, complete sentence.")
        );
        assert_eq!(
            get(&root, "key").unwrap(),
            Value::from("A seemingly full, complete sentence.")
        );
    }

    #[test]
    fn nested_reference_resolves_inside_out() {
        let root = tree(json!({
            "ns": {"reference": "final", "final": "the actual value"},
            "wanted": "${ns.${ns.reference}}",
        }));
        assert_eq!(get(&root, "wanted").unwrap(), Value::from("the actual value"));
    }

    #[test]
    fn missing_reference_fails_on_read() {
        let root = tree(json!({"template.missing": "${ns.key}"}));
        let err = get(&root, "template.missing").unwrap_err();
        match err {
            ConfitError::UnresolvedReference { reference } => assert_eq!(reference, "ns.key"),
            other => panic!("expected UnresolvedReference, got {other:?}"),
        }
    }

    #[test]
    fn self_recursion_detected() {
        let root = tree(json!({"ns.key": "${ns.key}"}));
        let err = get(&root, "ns.key").unwrap_err();
        assert!(matches!(err, ConfitError::ReferenceCycle { .. }));
    }

    #[test]
    fn loop_recursion_detected() {
        let root = tree(json!({
            "a": "${b}",
            "b": "${a}",
        }));
        let err = get(&root, "a").unwrap_err();
        assert!(matches!(err, ConfitError::ReferenceCycle { .. }));
    }

    #[test]
    fn indirect_template_cycle_detected() {
        let root = tree(json!({
            "ns.key": "${ns.ns.key} tail",
            "ns.ns.key": "${ns.key} tail",
        }));
        let err = get(&root, "ns.key").unwrap_err();
        assert!(matches!(err, ConfitError::ReferenceCycle { .. }));
    }

    #[test]
    fn unreferenced_broken_references_stay_dormant() {
        let root = tree(json!({"ok": "fine", "broken": "${nope}"}));
        assert_eq!(get(&root, "ok").unwrap(), Value::from("fine"));
    }

    #[test]
    fn resolution_is_repeatable() {
        let root = tree(json!({"a": 1, "b": "${a}"}));
        assert_eq!(get(&root, "b").unwrap(), Value::Integer(1));
        assert_eq!(get(&root, "b").unwrap(), Value::Integer(1));
        // the tree itself still holds the verbatim reference
        assert_eq!(keypath::lookup(&root, "b"), Some(&Value::from("${a}")));
    }

    #[test]
    fn resolve_deep_covers_nested_values() {
        let root = tree(json!({
            "host": "localhost",
            "urls": ["${host}/a", {"inner": "${host}/b"}],
            "ns": {"flat": "${host}"},
        }));
        let resolved = resolve_deep(&root, &Value::mapping(root.clone())).unwrap();
        let Value::Mapping(resolved) = resolved else {
            panic!("expected mapping");
        };
        let urls = resolved["urls"].as_sequence().unwrap();
        assert_eq!(urls[0], Value::from("localhost/a"));
        assert_eq!(
            urls[1].as_mapping().unwrap()["inner"],
            Value::from("localhost/b")
        );
        assert_eq!(
            resolved["ns"].as_mapping().unwrap()["flat"],
            Value::from("localhost")
        );
    }

    #[test]
    fn resolve_deep_detects_self_embedding() {
        let root = tree(json!({"ns": {"this": "${ns}"}}));
        let err = resolve_deep(&root, &Value::mapping(root.clone())).unwrap_err();
        assert!(matches!(err, ConfitError::ReferenceCycle { .. }));
    }
}
