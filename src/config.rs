//! The public configuration facade: an immutable tree with dotted-path
//! access, a missing-key policy, lazy reference resolution, and set-like
//! combination of sources.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::BitOr;
use std::sync::Arc;

use serde::de::{self, Deserialize, DeserializeOwned, Deserializer};
use serde::ser::{Serialize, Serializer};
use tracing::debug;

use crate::error::ConfitError;
use crate::keypath;
use crate::merge;
use crate::reference;
use crate::sequence::ConfigurationSequence;
use crate::value::{Map, Value};

/// Policy for access to a key that is not configured.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Missing {
    /// Return [`Item::NotConfigured`], avoiding errors.
    #[default]
    Silent,
    /// Fail with [`ConfitError::NotConfigured`].
    Error,
}

/// A collection of configured values, produced by canonicalizing and merging
/// one or more source mappings. Immutable: every combination returns a new
/// `Configuration`, sharing unaffected branches with its inputs.
#[derive(Clone)]
pub struct Configuration {
    /// The top-level tree; references always resolve against this, so
    /// sub-configurations can still reach values outside their own view.
    root: Arc<Map>,
    /// This view's subtree. Equals `root` for a top-level configuration.
    source: Arc<Map>,
    missing: Missing,
}

/// One step of access into a [`Configuration`]: a resolved scalar, a
/// sub-tree, a wrapped sequence, or the not-configured sentinel.
///
/// The sentinel is the falsy, chainable case: `get` on it keeps returning
/// it, so `config.get("a.b")?.get("c")?.or("fallback")` never trips over a
/// missing intermediate key under the silent policy.
#[derive(Clone, Debug, PartialEq)]
pub enum Item {
    Value(Value),
    Config(Configuration),
    Sequence(ConfigurationSequence),
    NotConfigured,
}

impl Configuration {
    /// An empty configuration with the silent missing policy.
    pub fn new() -> Configuration {
        let empty = Arc::new(Map::new());
        Configuration {
            root: Arc::clone(&empty),
            source: empty,
            missing: Missing::default(),
        }
    }

    pub fn builder() -> ConfigurationBuilder {
        ConfigurationBuilder::default()
    }

    /// Build from a single source mapping, canonicalizing dotted keys.
    pub fn from_source(source: impl Into<Map>) -> Result<Configuration, ConfitError> {
        Configuration::builder().source(source).build()
    }

    /// Build from source mappings ordered least to most significant.
    pub fn from_sources<I, S>(sources: I) -> Result<Configuration, ConfitError>
    where
        I: IntoIterator<Item = S>,
        S: Into<Map>,
    {
        let mut builder = Configuration::builder();
        for source in sources {
            builder = builder.source(source);
        }
        builder.build()
    }

    /// Build from a JSON object value.
    pub fn from_json(value: serde_json::Value) -> Result<Configuration, ConfitError> {
        Configuration::builder().json_source(value).build()
    }

    /// The missing-key policy, inherited by every sub-configuration.
    pub fn missing(&self) -> Missing {
        self.missing
    }

    /// Value at a dotted path: a resolved scalar, a sub-configuration, or a
    /// wrapped sequence. An absent path follows the missing policy;
    /// reference errors surface regardless of policy.
    pub fn get(&self, path: &str) -> Result<Item, ConfitError> {
        match self.walk(path) {
            Ok(value) => wrap(&self.root, self.missing, value),
            Err(key) => match self.missing {
                Missing::Silent => Ok(Item::NotConfigured),
                Missing::Error => Err(ConfitError::NotConfigured { key }),
            },
        }
    }

    /// Like [`get`](Configuration::get), but an absent path yields `default`
    /// under either missing policy.
    pub fn get_or(&self, path: &str, default: impl Into<Item>) -> Result<Item, ConfitError> {
        match self.walk(path) {
            Ok(value) => wrap(&self.root, self.missing, value),
            Err(_) => Ok(default.into()),
        }
    }

    /// Whether a dotted path is configured. Never resolves references.
    pub fn contains_key(&self, path: &str) -> bool {
        keypath::lookup(&self.source, path).is_some()
    }

    /// Top-level keys, in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.source.keys().map(String::as_str)
    }

    /// Number of top-level keys.
    pub fn len(&self) -> usize {
        self.source.len()
    }

    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
    }

    /// Top-level keys with their resolved, wrapped values.
    pub fn items(&self) -> Result<Vec<(String, Item)>, ConfitError> {
        self.source
            .iter()
            .map(|(key, value)| Ok((key.clone(), wrap(&self.root, self.missing, value)?)))
            .collect()
    }

    /// Resolved, wrapped top-level values, in key order.
    pub fn values(&self) -> Result<Vec<Item>, ConfitError> {
        Ok(self.items()?.into_iter().map(|(_, item)| item).collect())
    }

    /// Combine with another configuration, `other` winning where both
    /// configure the same path. The result is a new top-level tree; this
    /// configuration's missing policy carries over.
    pub fn merge_with(&self, other: &Configuration) -> Configuration {
        let merged = Arc::new(merge::merged(&self.source, &other.source));
        Configuration {
            root: Arc::clone(&merged),
            source: merged,
            missing: self.missing,
        }
    }

    /// Combine with a plain source mapping (canonicalized first), the
    /// mapping winning where both configure the same path.
    pub fn merge_source(&self, source: impl Into<Map>) -> Result<Configuration, ConfitError> {
        let expanded = keypath::expand(&source.into())?;
        let merged = Arc::new(merge::merged(&self.source, &expanded));
        Ok(Configuration {
            root: Arc::clone(&merged),
            source: merged,
            missing: self.missing,
        })
    }

    /// Plain snapshot of this view's tree. References stay verbatim; the
    /// tree is never resolved as a side effect.
    pub fn to_map(&self) -> Map {
        (*self.source).clone()
    }

    /// Deserialize the fully reference-resolved tree into `T`.
    pub fn extract<T: DeserializeOwned>(&self) -> Result<T, ConfitError> {
        let resolved =
            reference::resolve_deep(&self.root, &Value::Mapping(Arc::clone(&self.source)))?;
        serde_json::from_value(resolved.into()).map_err(|e| ConfitError::InvalidValue {
            key: "<root>".into(),
            reason: e.to_string(),
        })
    }

    /// Deserialize the fully reference-resolved value at `path` into `T`.
    /// An absent path is an error under either missing policy.
    pub fn extract_at<T: DeserializeOwned>(&self, path: &str) -> Result<T, ConfitError> {
        match self.walk(path) {
            Ok(value) => {
                let resolved = reference::resolve_deep(&self.root, value)?;
                serde_json::from_value(resolved.into()).map_err(|e| ConfitError::InvalidValue {
                    key: path.into(),
                    reason: e.to_string(),
                })
            }
            Err(key) => Err(ConfitError::NotConfigured { key }),
        }
    }

    /// Walk the view by dotted path. On a miss, the error carries the taken
    /// steps up to and including the one that failed.
    fn walk(&self, path: &str) -> Result<&Value, String> {
        let segments: Vec<&str> = keypath::split(path).collect();
        let mut taken: Vec<&str> = Vec::with_capacity(segments.len());
        let mut current: &Map = &self.source;
        for (index, &segment) in segments.iter().enumerate() {
            taken.push(segment);
            let Some(value) = current.get(segment) else {
                return Err(keypath::join(&taken));
            };
            if index + 1 == segments.len() {
                return Ok(value);
            }
            match value {
                Value::Mapping(map) => current = map,
                // descending into a scalar or sequence: the next step is
                // where the path stops existing
                _ => {
                    taken.push(segments[index + 1]);
                    return Err(keypath::join(&taken));
                }
            }
        }
        Err(keypath::join(&taken))
    }
}

/// Wrap a raw tree node for a caller: resolve string references against
/// `root`, then hand back a scalar, sub-configuration, or sequence.
pub(crate) fn wrap(
    root: &Arc<Map>,
    missing: Missing,
    value: &Value,
) -> Result<Item, ConfitError> {
    let resolved = match value {
        Value::String(_) => reference::resolve(root, value)?,
        other => other.clone(),
    };
    Ok(match resolved {
        Value::Mapping(source) => Item::Config(Configuration {
            root: Arc::clone(root),
            source,
            missing,
        }),
        Value::Sequence(items) => {
            Item::Sequence(ConfigurationSequence::new(Arc::clone(root), items, missing))
        }
        scalar => Item::Value(scalar),
    })
}

impl Default for Configuration {
    fn default() -> Configuration {
        Configuration::new()
    }
}

/// Equality covers the canonical tree contents only; the missing policy and
/// the enclosing root are not observable state.
impl PartialEq for Configuration {
    fn eq(&self, other: &Configuration) -> bool {
        self.source == other.source
    }
}

impl Eq for Configuration {}

impl Hash for Configuration {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.source.hash(state);
    }
}

impl fmt::Debug for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Configuration")?;
        f.debug_map().entries(self.source.iter()).finish()
    }
}

impl From<Configuration> for Map {
    /// Structural extraction of the backing tree; branches stay shared.
    fn from(config: Configuration) -> Map {
        config.to_map()
    }
}

impl From<&Configuration> for Map {
    fn from(config: &Configuration) -> Map {
        config.to_map()
    }
}

impl<'a, 'b> BitOr<&'b Configuration> for &'a Configuration {
    type Output = Configuration;

    fn bitor(self, rhs: &'b Configuration) -> Configuration {
        self.merge_with(rhs)
    }
}

impl BitOr for Configuration {
    type Output = Configuration;

    fn bitor(self, rhs: Configuration) -> Configuration {
        self.merge_with(&rhs)
    }
}

impl Serialize for Configuration {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.source.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Configuration {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Configuration, D::Error> {
        let source = Map::deserialize(deserializer)?;
        Configuration::from_source(source).map_err(de::Error::custom)
    }
}

impl Item {
    /// Chained access: descends if this is a sub-configuration, keeps
    /// returning the sentinel once access has gone missing, and treats a
    /// step into a scalar or sequence as not configured.
    pub fn get(&self, path: &str) -> Result<Item, ConfitError> {
        match self {
            Item::Config(config) => config.get(path),
            Item::NotConfigured => Ok(Item::NotConfigured),
            Item::Value(_) | Item::Sequence(_) => Ok(Item::NotConfigured),
        }
    }

    pub fn is_configured(&self) -> bool {
        !matches!(self, Item::NotConfigured)
    }

    /// Default-coalescing: the sentinel gives way to `default`, anything
    /// configured stays.
    pub fn or(self, default: impl Into<Item>) -> Item {
        match self {
            Item::NotConfigured => default.into(),
            configured => configured,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Item::Value(Value::Null))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Item::Value(value) => value.as_str(),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Item::Value(value) => value.as_i64(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Item::Value(value) => value.as_f64(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Item::Value(value) => value.as_bool(),
            _ => None,
        }
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Item::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_config(&self) -> Option<&Configuration> {
        match self {
            Item::Config(config) => Some(config),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&ConfigurationSequence> {
        match self {
            Item::Sequence(sequence) => Some(sequence),
            _ => None,
        }
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Item::Value(value) => write!(f, "{value}"),
            Item::Config(config) => write!(f, "{config:?}"),
            Item::Sequence(sequence) => write!(f, "{sequence:?}"),
            Item::NotConfigured => f.write_str("(not configured)"),
        }
    }
}

impl From<Value> for Item {
    fn from(value: Value) -> Item {
        Item::Value(value)
    }
}

impl From<Configuration> for Item {
    fn from(config: Configuration) -> Item {
        Item::Config(config)
    }
}

impl From<&str> for Item {
    fn from(value: &str) -> Item {
        Item::Value(value.into())
    }
}

impl From<String> for Item {
    fn from(value: String) -> Item {
        Item::Value(value.into())
    }
}

impl From<i64> for Item {
    fn from(value: i64) -> Item {
        Item::Value(value.into())
    }
}

impl From<i32> for Item {
    fn from(value: i32) -> Item {
        Item::Value(value.into())
    }
}

impl From<f64> for Item {
    fn from(value: f64) -> Item {
        Item::Value(value.into())
    }
}

impl From<bool> for Item {
    fn from(value: bool) -> Item {
        Item::Value(value.into())
    }
}

/// Collects source mappings, least to most significant, and a missing
/// policy; `build` canonicalizes each source and folds them into one tree.
#[derive(Default)]
pub struct ConfigurationBuilder {
    sources: Vec<Map>,
    missing: Missing,
    invalid: Option<ConfitError>,
}

impl ConfigurationBuilder {
    pub fn missing(mut self, missing: Missing) -> Self {
        self.missing = missing;
        self
    }

    /// Add a source mapping; later sources override earlier ones.
    pub fn source(mut self, source: impl Into<Map>) -> Self {
        self.sources.push(source.into());
        self
    }

    /// Add a JSON object as a source. A non-object value fails at `build`.
    pub fn json_source(mut self, value: serde_json::Value) -> Self {
        match Value::from(value) {
            Value::Mapping(map) => self.sources.push((*map).clone()),
            other => {
                self.invalid.get_or_insert(ConfitError::InvalidValue {
                    key: "<source>".into(),
                    reason: format!("expected a mapping source, got {}", other.type_name()),
                });
            }
        }
        self
    }

    pub fn build(self) -> Result<Configuration, ConfitError> {
        if let Some(invalid) = self.invalid {
            return Err(invalid);
        }
        let expanded = self
            .sources
            .iter()
            .map(keypath::expand)
            .collect::<Result<Vec<_>, _>>()?;
        debug!(sources = expanded.len(), "merging configuration sources");
        let tree = Arc::new(merge::merge_all(&expanded));
        Ok(Configuration {
            root: Arc::clone(&tree),
            source: tree,
            missing: self.missing,
        })
    }
}
