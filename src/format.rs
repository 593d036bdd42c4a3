//! Pluggable text formats for configuration sources.
//!
//! Each format turns text into a canonical tree and back; discovery and
//! file I/O stay with the caller. Parsing canonicalizes dotted keys and
//! rejects non-string mapping keys; serializing works from the raw
//! snapshot, so reference markers survive a round trip verbatim.

use tracing::debug;

use crate::error::ConfitError;
use crate::keypath;
use crate::value::{Map, Value};

pub trait Format {
    /// Parse text into a canonical tree.
    fn parse(&self, input: &str) -> Result<Map, ConfitError>;

    /// Serialize a raw snapshot, references left verbatim.
    fn serialize(&self, map: &Map) -> Result<String, ConfitError>;

    /// Default file suffix for this format, including the dot.
    fn suffix(&self) -> &'static str;
}

fn canonicalize(value: Value, format: &'static str) -> Result<Map, ConfitError> {
    match value {
        Value::Mapping(map) => {
            debug!(format, keys = map.len(), "parsed configuration source");
            keypath::expand(&map)
        }
        // an empty document is an empty tree
        Value::Null => Ok(Map::new()),
        other => Err(ConfitError::Parse {
            format,
            reason: format!("top-level value must be a mapping, got {}", other.type_name()),
        }),
    }
}

/// JSON, via `serde_json`.
pub struct Json;

impl Format for Json {
    fn parse(&self, input: &str) -> Result<Map, ConfitError> {
        let parsed: serde_json::Value =
            serde_json::from_str(input).map_err(|e| ConfitError::Parse {
                format: "json",
                reason: e.to_string(),
            })?;
        canonicalize(Value::from(parsed), "json")
    }

    fn serialize(&self, map: &Map) -> Result<String, ConfitError> {
        let value: serde_json::Value = Value::mapping(map.clone()).into();
        serde_json::to_string_pretty(&value).map_err(|e| ConfitError::Serialize {
            format: "json",
            reason: e.to_string(),
        })
    }

    fn suffix(&self) -> &'static str {
        ".json"
    }
}

/// YAML, via `serde_yaml`.
#[cfg(feature = "yaml")]
pub struct Yaml;

#[cfg(feature = "yaml")]
impl Format for Yaml {
    fn parse(&self, input: &str) -> Result<Map, ConfitError> {
        let parsed: serde_yaml::Value =
            serde_yaml::from_str(input).map_err(|e| ConfitError::Parse {
                format: "yaml",
                reason: e.to_string(),
            })?;
        canonicalize(from_yaml(parsed, &mut Vec::new())?, "yaml")
    }

    fn serialize(&self, map: &Map) -> Result<String, ConfitError> {
        serde_yaml::to_string(&Value::mapping(map.clone())).map_err(|e| {
            ConfitError::Serialize {
                format: "yaml",
                reason: e.to_string(),
            }
        })
    }

    fn suffix(&self) -> &'static str {
        ".yaml"
    }
}

#[cfg(feature = "yaml")]
fn from_yaml(value: serde_yaml::Value, at: &mut Vec<String>) -> Result<Value, ConfitError> {
    use serde_yaml::Value as Yaml;

    Ok(match value {
        Yaml::Null => Value::Null,
        Yaml::Bool(b) => Value::Bool(b),
        Yaml::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Integer(i)
            } else {
                n.as_f64().map_or(Value::Null, Value::Float)
            }
        }
        Yaml::String(s) => Value::String(s),
        Yaml::Sequence(items) => Value::sequence(
            items
                .into_iter()
                .map(|item| from_yaml(item, at))
                .collect::<Result<Vec<_>, _>>()?,
        ),
        Yaml::Mapping(mapping) => {
            let mut map = Map::new();
            for (key, value) in mapping {
                let Yaml::String(key) = key else {
                    return Err(ConfitError::KeyType {
                        path: keypath::join(at.iter()),
                        found: yaml_type_name(&key),
                    });
                };
                at.push(key.clone());
                let value = from_yaml(value, at)?;
                at.pop();
                map.insert(key, value);
            }
            Value::mapping(map)
        }
        Yaml::Tagged(tagged) => from_yaml(tagged.value, at)?,
    })
}

#[cfg(feature = "yaml")]
fn yaml_type_name(value: &serde_yaml::Value) -> &'static str {
    use serde_yaml::Value as Yaml;

    match value {
        Yaml::Null => "null",
        Yaml::Bool(_) => "bool",
        Yaml::Number(_) => "number",
        Yaml::String(_) => "string",
        Yaml::Sequence(_) => "sequence",
        Yaml::Mapping(_) => "mapping",
        Yaml::Tagged(_) => "tagged value",
    }
}

/// TOML, via the `toml` crate.
#[cfg(feature = "toml")]
pub struct Toml;

#[cfg(feature = "toml")]
impl Format for Toml {
    fn parse(&self, input: &str) -> Result<Map, ConfitError> {
        let table: toml::Table = toml::from_str(input).map_err(|e| ConfitError::Parse {
            format: "toml",
            reason: e.to_string(),
        })?;
        canonicalize(from_toml(toml::Value::Table(table)), "toml")
    }

    fn serialize(&self, map: &Map) -> Result<String, ConfitError> {
        let mut table = toml::Table::new();
        for (key, value) in map {
            table.insert(key.clone(), to_toml(value)?);
        }
        toml::to_string(&table).map_err(|e| ConfitError::Serialize {
            format: "toml",
            reason: e.to_string(),
        })
    }

    fn suffix(&self) -> &'static str {
        ".toml"
    }
}

#[cfg(feature = "toml")]
fn from_toml(value: toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::Integer(i),
        toml::Value::Float(f) => Value::Float(f),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(items) => {
            Value::sequence(items.into_iter().map(from_toml).collect())
        }
        toml::Value::Table(table) => Value::mapping(
            table
                .into_iter()
                .map(|(key, value)| (key, from_toml(value)))
                .collect(),
        ),
    }
}

#[cfg(feature = "toml")]
fn to_toml(value: &Value) -> Result<toml::Value, ConfitError> {
    Ok(match value {
        Value::Null => {
            return Err(ConfitError::Serialize {
                format: "toml",
                reason: "null values have no representation".into(),
            });
        }
        Value::Bool(b) => toml::Value::Boolean(*b),
        Value::Integer(i) => toml::Value::Integer(*i),
        Value::Float(f) => toml::Value::Float(*f),
        Value::String(s) => toml::Value::String(s.clone()),
        Value::Sequence(items) => toml::Value::Array(
            items
                .iter()
                .map(to_toml)
                .collect::<Result<Vec<_>, _>>()?,
        ),
        Value::Mapping(map) => {
            let mut table = toml::Table::new();
            for (key, value) in map.iter() {
                table.insert(key.clone(), to_toml(value)?);
            }
            toml::Value::Table(table)
        }
    })
}
