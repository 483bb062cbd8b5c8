//! Reconciliation errors.
//!
//! Only configuration problems are errors here. Bad records, ambiguous
//! matches and suspicious data are collected into the
//! [`IssueReport`](crate::report::IssueReport) and never abort a run.

use thiserror::Error;

/// Fatal errors of a reconciliation run.
#[derive(Debug, Error)]
pub enum ReconError {
    /// A source table or query names a jurisdiction with no pack.
    #[error("unknown jurisdiction {code}")]
    UnknownJurisdiction { code: String },

    /// A source table or query names a category the jurisdiction does not define.
    #[error("category {category} is not defined for jurisdiction {jurisdiction}")]
    UndefinedCategory {
        jurisdiction: String,
        category: String,
    },

    /// Family pattern vocabulary could not be compiled.
    #[error("invalid family rules: {detail}")]
    FamilyRules { detail: String },

    /// Configuration failed to validate.
    #[error("configuration error: {0}")]
    Pack(#[from] cosreg_pack::PackError),
}

/// Result type alias for reconciliation operations.
pub type ReconResult<T> = Result<T, ReconError>;
