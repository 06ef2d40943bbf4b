use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodefigError {
    #[error("Cannot merge '{field}': expected {expected}, got {found}")]
    TypeMismatch {
        field: String,
        expected: &'static str,
        found: String,
    },

    #[error("Invalid value for '{field}' ({value}): {reason}")]
    Validation {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Unknown merge behavior '{0}' (expected append, update, clobber or dict_key_append)")]
    UnknownMergeBehavior(String),

    #[error("Unknown compare behavior '{0}' (expected include or exclude)")]
    UnknownCompareBehavior(String),

    #[error("Unknown key '{key}' for {shape} config")]
    UnknownKey { key: String, shape: String },

    #[error("Unknown keys in config")]
    UnknownKeys(Vec<NodefigError>),

    #[error("Unknown resource type '{0}'")]
    UnknownResourceType(String),

    #[error("Adapter type is required: call .adapter_type() on the builder")]
    AdapterTypeRequired,

    #[error("Failed to parse {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Failed to read {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Expected a mapping at the top level of {path}")]
    NotAMapping { path: PathBuf },

    #[error("Invalid override '{key}': {reason}")]
    InvalidOverride { key: String, reason: String },

    #[error("Settings error: {0}")]
    ConfigError(#[from] confique::Error),
}

impl NodefigError {
    /// Build a [`NodefigError::Validation`] from a field name, the offending
    /// value (if any) and a reason.
    pub fn validation(
        field: impl Into<String>,
        value: Option<&serde_json::Value>,
        reason: impl Into<String>,
    ) -> Self {
        let value = match value {
            Some(v) => v.to_string(),
            None => "<missing>".to_string(),
        };
        NodefigError::Validation {
            field: field.into(),
            value,
            reason: reason.into(),
        }
    }
}
