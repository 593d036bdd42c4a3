//! Mapping environment-variable names onto configuration trees.
//!
//! This is pure name/value translation: callers pass the pairs (typically
//! `std::env::vars()`, or synthetic data in tests) and decide where the
//! result sits in the merge order. Nothing here touches the process
//! environment.
//!
//! With prefix `APP`, names map as:
//!
//! | Variable | Key |
//! |----------|-----|
//! | `APP_KEY` | `key` |
//! | `APP_FOO_BAR` | `foo.bar` |
//! | `APP_FOO__BAR` | `foo_bar` |
//!
//! After stripping `PREFIX_` and lowercasing, the name is read left to
//! right: a doubled underscore emits a literal underscore, a single
//! underscore ends the current segment. A name that would produce an empty
//! segment (leading separator, trailing separator, nothing between two
//! separators) is skipped.

use tracing::trace;

use crate::error::ConfitError;
use crate::keypath;
use crate::value::{Map, Value};

/// Build a canonical tree from environment variables matching `{PREFIX}_*`.
/// Prefix matching is case-insensitive; non-matching pairs are ignored.
pub fn env_to_map(
    prefix: &str,
    vars: impl IntoIterator<Item = (String, String)>,
) -> Result<Map, ConfitError> {
    let needle = format!("{}_", prefix.to_ascii_lowercase());
    let mut dotted = Map::new();

    for (name, value) in vars {
        let lowered = name.to_ascii_lowercase();
        let Some(rest) = lowered.strip_prefix(&needle) else {
            continue;
        };
        let Some(path) = dotted_name(rest) else {
            trace!(variable = %name, "skipping environment variable with empty key segment");
            continue;
        };
        dotted.insert(path, parse_scalar(&value));
    }

    keypath::expand(&dotted)
}

/// Translate a prefix-stripped variable name into a dotted path, or `None`
/// when a segment comes out empty.
fn dotted_name(name: &str) -> Option<String> {
    let mut segments: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut chars = name.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '_' {
            if chars.peek() == Some(&'_') {
                chars.next();
                current.push('_');
            } else {
                if current.is_empty() {
                    return None;
                }
                segments.push(std::mem::take(&mut current));
            }
        } else {
            current.push(c);
        }
    }
    if current.is_empty() {
        return None;
    }
    segments.push(current);
    Some(segments.join("."))
}

/// Parse a raw variable value with the scalar grammar of the primary file
/// format: null, bool, integer, float (only with a decimal point), else
/// string.
pub fn parse_scalar(raw: &str) -> Value {
    if raw.eq_ignore_ascii_case("null") || raw == "~" {
        return Value::Null;
    }
    if raw.eq_ignore_ascii_case("true") {
        return Value::Bool(true);
    }
    if raw.eq_ignore_ascii_case("false") {
        return Value::Bool(false);
    }
    if let Ok(i) = raw.parse::<i64>() {
        return Value::Integer(i);
    }
    if raw.contains('.') {
        if let Ok(f) = raw.parse::<f64>() {
            return Value::Float(f);
        }
    }
    Value::String(raw.to_string())
}
