//! # Error Hierarchy
//!
//! Structured error types for the canonical record model, built with
//! `thiserror`. Validation failures carry the offending raw text so that
//! issue reports can point an operator at the exact source cell.

use thiserror::Error;

/// Top-level error type for the record model.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Canonicalization failure during digest computation.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// Record or primitive validation failure.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// Float values are not permitted in canonical representations.
    /// Concentrations are carried as decimal strings.
    #[error("float values are not permitted in canonical representations; use string or integer: {0}")]
    FloatRejected(f64),

    /// JSON serialization failed during canonicalization.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// Validation failures for domain primitives and regulatory records.
///
/// A record that fails validation is excluded from the run; the error is
/// collected into the issue report rather than aborting.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Jurisdiction code is empty or contains characters outside `[A-Z0-9-]`.
    #[error("invalid jurisdiction code {0:?}: expected uppercase letters, digits or '-'")]
    InvalidJurisdictionCode(String),

    /// Category name does not belong to the closed category set.
    #[error("unknown category {0:?}")]
    UnknownCategory(String),

    /// Status text could not be mapped to a status.
    #[error("unknown status {0:?}")]
    UnknownStatus(String),

    /// A required canonical field is missing or blank.
    #[error("missing required field {field:?}")]
    MissingField {
        /// Canonical field name.
        field: String,
    },

    /// Registry number text present but not of the `digits-digits-digit` form.
    #[error("invalid registry number {0:?}: expected NNNNNNN-NN-N")]
    InvalidRegistryNumber(String),

    /// Concentration text could not be parsed as a number with a known unit.
    #[error("unparseable concentration {raw:?}: {reason}")]
    InvalidConcentration {
        /// Source text.
        raw: String,
        /// What went wrong.
        reason: String,
    },

    /// Concentration parsed but falls outside 0..=100 percent.
    #[error("concentration {value}% out of range 0-100")]
    ConcentrationOutOfRange {
        /// Converted percentage, rendered as decimal text.
        value: String,
    },

    /// Publication date text is not a recognized date.
    #[error("invalid publication date {0:?}")]
    InvalidDate(String),

    /// Ingredient identity key has an unknown prefix or an empty body.
    #[error("invalid ingredient key {0:?}")]
    InvalidIngredientKey(String),
}
