//! Pack-specific error types.
//!
//! Every variant is a configuration error: the engine refuses to start with
//! a pack that fails to load or validate. Errors carry file paths and the
//! offending key so an operator can fix the YAML directly.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading or validating configuration.
#[derive(Debug, Error)]
pub enum PackError {
    /// YAML parsing failed.
    #[error("failed to parse YAML at {path}: {source}")]
    YamlParse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    /// JSON parsing failed.
    #[error("failed to parse JSON at {path}: {source}")]
    JsonParse {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// A required file was not found.
    #[error("required file not found: {path}")]
    FileNotFound { path: PathBuf },

    /// A category name in a pack is not one of the closed category set.
    #[error("jurisdiction {jurisdiction}: unknown category {name:?}")]
    UnknownCategory { jurisdiction: String, name: String },

    /// A field alias table refers to a category the pack does not define.
    #[error("jurisdiction {jurisdiction}: field aliases given for undefined category {category}")]
    AliasForUndefinedCategory {
        jurisdiction: String,
        category: String,
    },

    /// One source key is mapped to two canonical fields in the same table.
    #[error("jurisdiction {jurisdiction}, table {table}: source key {key:?} maps to both {first} and {second}")]
    AliasConflict {
        jurisdiction: String,
        table: String,
        key: String,
        first: String,
        second: String,
    },

    /// A canonical field was given an empty alias list.
    #[error("jurisdiction {jurisdiction}, table {table}: empty alias list for {field}")]
    EmptyAliasList {
        jurisdiction: String,
        table: String,
        field: String,
    },

    /// The same jurisdiction code appears in more than one pack.
    #[error("jurisdiction {code} is configured more than once")]
    DuplicateJurisdiction { code: String },

    /// A jurisdiction pack defines no categories.
    #[error("jurisdiction {code} defines no categories")]
    NoCategories { code: String },

    /// A reference family is malformed or duplicated.
    #[error("reference family {id:?}: {detail}")]
    InvalidFamily { id: String, detail: String },

    /// A numeric setting is outside its permitted range.
    #[error("invalid setting {setting}: {detail}")]
    InvalidSetting { setting: String, detail: String },

    /// Primitive validation failure delegated from cosreg-core.
    #[error("validation error: {0}")]
    Validation(#[from] cosreg_core::ValidationError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for pack operations.
pub type PackResult<T> = Result<T, PackError>;
