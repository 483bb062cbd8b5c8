//! Diff engine errors.

use cosreg_core::CanonicalizationError;
use thiserror::Error;

/// Errors building snapshots or comparing them.
#[derive(Debug, Error)]
pub enum DiffError {
    /// Snapshots of different jurisdictions were compared.
    #[error("cannot diff snapshots of different jurisdictions: {old} vs {new}")]
    JurisdictionMismatch {
        /// Jurisdiction of the old snapshot.
        old: String,
        /// Jurisdiction of the new snapshot.
        new: String,
    },

    /// Two clauses in one snapshot share an id.
    #[error("duplicate clause id {clause_id} in snapshot {version}")]
    DuplicateClause {
        /// The repeated id.
        clause_id: String,
        /// Snapshot version.
        version: String,
    },

    /// A stored digest does not match the snapshot content.
    #[error("snapshot digest mismatch: recorded {recorded}, computed {computed}")]
    DigestMismatch {
        /// Digest carried by the serialized snapshot.
        recorded: String,
        /// Digest of the content.
        computed: String,
    },

    /// Canonicalization of snapshot content failed.
    #[error("canonicalization failed: {0}")]
    Canonicalization(#[from] CanonicalizationError),
}

/// Result type alias for diff operations.
pub type DiffResult<T> = Result<T, DiffError>;
