//! Classes of configuration sources, ordered by precedence.
//!
//! Loaders tag what they produce with a [`Locality`]; the ordering decides
//! merge order (later classes override earlier ones). The engine itself
//! only consumes the resulting ordered run of sources.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::{Configuration, Missing};
use crate::error::ConfitError;
use crate::value::Map;

/// Where a configuration source comes from, least to most significant.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Locality {
    /// System-wide locations, e.g. `/etc/{name}.{suffix}`.
    System,
    /// User-local locations, e.g. the platform config directory.
    User,
    /// Application-local locations, dependent on the working directory.
    Application,
    /// Environment variables.
    Environment,
}

impl Locality {
    /// All localities, least to most significant.
    pub const LOAD_ORDER: [Locality; 4] = [
        Locality::System,
        Locality::User,
        Locality::Application,
        Locality::Environment,
    ];
}

impl fmt::Display for Locality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Locality::System => "system",
            Locality::User => "user",
            Locality::Application => "application",
            Locality::Environment => "environment",
        };
        f.write_str(name)
    }
}

impl Configuration {
    /// Build from `(Locality, source)` pairs, merging in load order.
    /// Sources sharing a locality keep their given relative order.
    pub fn from_localized<I, S>(sources: I, missing: Missing) -> Result<Configuration, ConfitError>
    where
        I: IntoIterator<Item = (Locality, S)>,
        S: Into<Map>,
    {
        let mut tagged: Vec<(Locality, Map)> = sources
            .into_iter()
            .map(|(locality, source)| (locality, source.into()))
            .collect();
        tagged.sort_by_key(|(locality, _)| *locality);

        let mut builder = Configuration::builder().missing(missing);
        for (_, source) in tagged {
            builder = builder.source(source);
        }
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use serde_json::json;

    fn map(v: serde_json::Value) -> Map {
        match Value::from(v) {
            Value::Mapping(m) => (*m).clone(),
            other => panic!("expected mapping, got {other:?}"),
        }
    }

    #[test]
    fn load_order_is_ascending() {
        assert!(Locality::System < Locality::User);
        assert!(Locality::User < Locality::Application);
        assert!(Locality::Application < Locality::Environment);
        let mut sorted = Locality::LOAD_ORDER;
        sorted.sort();
        assert_eq!(sorted, Locality::LOAD_ORDER);
    }

    #[test]
    fn later_locality_wins_regardless_of_input_order() {
        let config = Configuration::from_localized(
            [
                (Locality::Environment, map(json!({"key": "env"}))),
                (Locality::System, map(json!({"key": "system", "base": 1}))),
                (Locality::User, map(json!({"key": "user"}))),
            ],
            Missing::Silent,
        )
        .unwrap();
        assert_eq!(config.get("key").unwrap().as_str(), Some("env"));
        assert_eq!(config.get("base").unwrap().as_i64(), Some(1));
    }

    #[test]
    fn equal_localities_keep_relative_order() {
        let config = Configuration::from_localized(
            [
                (Locality::User, map(json!({"key": "first"}))),
                (Locality::User, map(json!({"key": "second"}))),
            ],
            Missing::Silent,
        )
        .unwrap();
        assert_eq!(config.get("key").unwrap().as_str(), Some("second"));
    }

    #[test]
    fn display_names_are_lowercase() {
        assert_eq!(Locality::System.to_string(), "system");
        assert_eq!(Locality::Environment.to_string(), "environment");
    }

    #[test]
    fn serde_round_trip() {
        let encoded = serde_json::to_string(&Locality::Application).unwrap();
        assert_eq!(encoded, "\"application\"");
        let decoded: Locality = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, Locality::Application);
    }
}
