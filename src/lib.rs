//! Deterministic layered configuration. Hand it your sources, get one
//! immutable tree back.
//!
//! Confit merges any number of partial, possibly-overlapping nested
//! mappings — parsed files, environment variables, in-memory maps — into a
//! single queryable [`Configuration`], and lets string values reference
//! other values anywhere in the tree with `${dotted.path}` markers.
//!
//! ```
//! use confit::{Configuration, Item};
//!
//! let defaults = Configuration::from_json(serde_json::json!({
//!     "database": {"host": "localhost", "port": 5432},
//!     "database.url": "postgres://${database.host}:${database.port}/app",
//! }))?;
//! let overrides = Configuration::from_json(serde_json::json!({
//!     "database.host": "db.internal",
//! }))?;
//!
//! let config = &defaults | &overrides;
//! assert_eq!(
//!     config.get("database.url")?.as_str(),
//!     Some("postgres://db.internal:5432/app"),
//! );
//! assert_eq!(config.get("database.missing")?, Item::NotConfigured);
//! # Ok::<(), confit::ConfitError>(())
//! ```
//!
//! # What confit does — and doesn't
//!
//! The crate is the merge and reference-resolution engine only. It never
//! performs I/O: it does not search directories, read files, or inspect the
//! process environment. Loaders hand it plain nested mappings (the
//! [`format`] adapters and [`env_to_map`] help produce those) and decide
//! the order; everything after that — canonicalization, precedence,
//! lookup, interpolation — is deterministic computation over immutable
//! data.
//!
//! # Layer precedence
//!
//! Sources are ordered least to most significant, and every source is
//! sparse: it only names the keys it wants to set.
//!
//! ```text
//! System-wide files       /etc/app.yaml
//!        ↑ overridden by
//! User-local files        ~/.config/app.yaml
//!        ↑ overridden by
//! Application files       ./app.yaml
//!        ↑ overridden by
//! Environment             APP_DATABASE_HOST=...
//! ```
//!
//! Merging recurses key-by-key through nested mappings; for anything else
//! (scalar against scalar, a list, or a whole sub-tree) the later source
//! wins outright. [`Locality`] names these source classes so loaders can
//! tag what they found and let
//! [`Configuration::from_localized`] put the layers in order.
//!
//! Dotted keys and nesting are interchangeable on the way in: a source
//! containing `"foo.bar": 1` and one containing `{"foo": {"bar": 1}}`
//! produce equal configurations.
//!
//! # References
//!
//! A string value may embed `${dotted.path}` markers pointing at other
//! values in the same tree. Resolution happens at read time, against the
//! merged result, so one layer can freely point at keys that another layer
//! supplies. A value that is exactly one reference takes the referenced
//! value's type; mixed text renders referenced scalars into the string.
//! Anything that does not parse as `${` segments `}` — stray braces,
//! spaces, dashes — is literal text.
//!
//! Broken references only fail when the value holding them is read, and
//! cycles are reported as errors instead of recursing forever.
//!
//! # Missing keys
//!
//! Each configuration carries a [`Missing`] policy. Under the default
//! `Silent` policy an absent path yields [`Item::NotConfigured`], a falsy
//! sentinel that swallows further access, so probing deep optional keys
//! needs no error handling; under `Error` the same access fails with the
//! offending key. An explicit fallback via
//! [`get_or`](Configuration::get_or) never fails for absence under either
//! policy.
//!
//! # Immutability
//!
//! A configuration never changes after construction. Merging two
//! configurations builds a new tree that shares unaffected branches with
//! both inputs, so deriving configurations is cheap and concurrent readers
//! can share instances freely. Snapshots ([`Configuration::to_map`],
//! serde serialization) expose reference markers verbatim, and a
//! configuration rebuilt from its own snapshot is equal to the original.
//!
//! # Environment variables
//!
//! [`env_to_map`] translates prefixed variable names into a tree without
//! touching the process environment: `APP_FOO_BAR` becomes `foo.bar`, a
//! doubled underscore keeps a literal underscore (`APP_FOO__BAR` →
//! `foo_bar`), and values parse as scalars (`true`, `8080`, `1.5`, `null`,
//! otherwise a string).
//!
//! ```
//! use confit::{env_to_map, Configuration};
//!
//! let vars = [("APP_DATABASE_HOST".to_string(), "db.internal".to_string())];
//! let config = Configuration::from_source(env_to_map("APP", vars)?)?;
//! assert_eq!(config.get("database.host")?.as_str(), Some("db.internal"));
//! # Ok::<(), confit::ConfitError>(())
//! ```
//!
//! # Formats
//!
//! The [`format`] module defines the parse/serialize capability the engine
//! expects from concrete file formats, with JSON built in and YAML and
//! TOML behind the `yaml` and `toml` features (both on by default).
//!
//! # Errors
//!
//! All fallible operations return [`ConfitError`]. Structural problems
//! (non-string keys, dotted keys colliding with scalars) surface when a
//! source is canonicalized; missing-key and reference problems surface at
//! the access that hits them, never earlier and never silently — except
//! where the `Silent` missing policy explicitly turns absent keys into the
//! sentinel.

pub mod env;
pub mod error;
pub mod format;
pub mod keypath;

mod config;
mod locality;
pub(crate) mod merge;
mod reference;
mod sequence;
mod value;

pub use config::{Configuration, ConfigurationBuilder, Item, Missing};
pub use env::env_to_map;
pub use error::ConfitError;
pub use locality::Locality;
pub use sequence::ConfigurationSequence;
pub use value::{Map, Value};
