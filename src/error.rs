use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfitError {
    #[error("mapping keys must be strings, got {found} at '{path}'")]
    KeyType { path: String, found: &'static str },

    #[error("cannot merge conflicting values at '{path}'")]
    PathConflict { path: String },

    #[error("no configuration for key '{key}'")]
    NotConfigured { key: String },

    #[error("unable to resolve referenced key '{reference}'")]
    UnresolvedReference { reference: String },

    #[error("cannot resolve recursive reference '{path}'")]
    ReferenceCycle { path: String },

    #[error("cannot insert {found} at '{path}' into referring value")]
    ReferenceNotScalar { path: String, found: &'static str },

    #[error("invalid value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("failed to parse {format} input: {reason}")]
    Parse { format: &'static str, reason: String },

    #[error("failed to serialize to {format}: {reason}")]
    Serialize { format: &'static str, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_configured_names_key() {
        let err = ConfitError::NotConfigured {
            key: "database.url".into(),
        };
        assert!(err.to_string().contains("database.url"));
    }

    #[test]
    fn key_type_names_location() {
        let err = ConfitError::KeyType {
            path: "outer.inner".into(),
            found: "integer",
        };
        let msg = err.to_string();
        assert!(msg.contains("outer.inner"));
        assert!(msg.contains("integer"));
    }

    #[test]
    fn cycle_names_path() {
        let err = ConfitError::ReferenceCycle {
            path: "ns.key".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("ns.key"));
        assert!(msg.contains("recursive"));
    }
}
