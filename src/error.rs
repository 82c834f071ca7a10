//! Error types for the schema migration

use thiserror::Error;

/// Result type for migration operations
pub type Result<T> = std::result::Result<T, CompatError>;

/// Migration errors. Every variant fails the whole call; no partial schema is returned.
#[derive(Error, Debug)]
pub enum CompatError {
    #[error("Invalid input schema: {}", errors.join("; "))]
    InvalidInputSchema { errors: Vec<String> },

    #[error("Conflicting data sources at {path}: x-fromData and x-fromUrl are mutually exclusive")]
    ConflictingSource { path: String },

    #[error("Unresolved $ref '{pointer}' at {path}")]
    UnresolvedRef { pointer: String, path: String },

    #[error("Unsupported extension combination [{}] at {path}: {reason}", keys.join(", "))]
    UnsupportedExtensionCombination {
        keys: Vec<String>,
        path: String,
        reason: String,
    },

    #[error("Invalid value for {key} at {path}: expected {expected}")]
    InvalidExtensionValue {
        key: String,
        path: String,
        expected: &'static str,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config_crate::ConfigError),
}

impl CompatError {
    /// JSON pointer of the node that caused the error, when there is one
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::ConflictingSource { path }
            | Self::UnresolvedRef { path, .. }
            | Self::UnsupportedExtensionCombination { path, .. }
            | Self::InvalidExtensionValue { path, .. } => Some(path),
            Self::InvalidInputSchema { .. } | Self::Json(_) | Self::Config(_) => None,
        }
    }
}
