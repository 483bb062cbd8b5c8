//! # cosreg-recon — Reconciliation Engine
//!
//! Turns per-jurisdiction regulatory lists into one reconciled view:
//!
//! ```text
//! M(I, J, C) : identity × jurisdiction × category → record
//! ```
//!
//! defined for every category C that jurisdiction J regulates, whether or
//! not J's lists mention identity I.
//!
//! ## Stages
//!
//! - [`ingest`]: alias projection and validation of raw rows.
//! - [`identity`]: registry-number, exact-name and fuzzy-name matching, with
//!   family cross-references through the [`family::FamilyReference`] seam.
//! - [`conflict`]: most-restrictive-wins within one jurisdiction, with a
//!   configurable tie-break.
//! - [`matrix`]: the grid itself and Not-Specified backfill.
//! - [`summary`]: one row per identity across jurisdictions.
//! - [`contradiction`]: prohibited-versus-allowed conflicts, status and
//!   limit differences.
//! - [`stats`] and [`report`]: counts and non-fatal findings.
//!
//! [`engine::ReconciliationEngine`] runs them in order.
//!
//! ## Determinism
//!
//! All keyed collections are `BTreeMap`/`BTreeSet`; fuzzy candidates are
//! visited in key order and ranked with an identity-key tie-break. The same
//! configuration and the same ordered input always produce byte-identical
//! serialized output.

pub mod conflict;
pub mod contradiction;
pub mod engine;
pub mod error;
pub mod family;
pub mod identity;
pub mod ingest;
pub mod matrix;
pub mod report;
pub mod similarity;
pub mod stats;
pub mod summary;

// Re-export primary types.
pub use conflict::{resolve_group, ResolvedGroup};
pub use contradiction::{detect_conflicts, ConflictReport, LimitDifference, StatusDivergence};
pub use engine::{Reconciliation, ReconciliationEngine};
pub use error::{ReconError, ReconResult};
pub use family::{FamilyLink, FamilyMatcher, FamilyReference, NoFamilies};
pub use identity::{IdentityEntry, IdentityRegistry, IdentityResolver, MatchPath, Resolution, ReviewEntry, ReviewReason};
pub use ingest::SourceTable;
pub use matrix::{CategoryTable, Matrix, MatrixCell};
pub use report::IssueReport;
pub use stats::Statistics;
pub use summary::{build_summary, JurisdictionEntry, SummaryRow};
