//! # Issue Report
//!
//! Everything a run found wrong with its input without failing: records
//! excluded by validation, consistency warnings on accepted records, and
//! identities waiting for a human to confirm them.

use cosreg_core::{Category, ConsistencyWarning, IngredientId, JurisdictionCode, ValidationError};
use serde::{Deserialize, Serialize};

use crate::identity::ReviewEntry;

/// Location of a source row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowRef {
    /// Jurisdiction of the source table.
    pub jurisdiction: JurisdictionCode,
    /// Category of the source table.
    pub category: Category,
    /// Zero-based row index within the table.
    pub row: usize,
    /// Primary name as given in the row, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_name: Option<String>,
}

/// A record excluded by validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordIssue {
    /// Where the record came from.
    #[serde(flatten)]
    pub source: RowRef,
    /// Why it was excluded.
    pub reason: String,
}

impl RecordIssue {
    pub(crate) fn new(source: RowRef, error: &ValidationError) -> Self {
        Self {
            source,
            reason: error.to_string(),
        }
    }
}

/// A consistency warning on an accepted record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordWarning {
    /// Where the record came from.
    #[serde(flatten)]
    pub source: RowRef,
    /// Identity the record resolved to.
    pub ingredient: IngredientId,
    /// The finding.
    pub warning: ConsistencyWarning,
}

/// Non-fatal findings of one run, in input order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IssueReport {
    /// Records excluded by validation.
    pub validation_errors: Vec<RecordIssue>,
    /// Consistency warnings on accepted records.
    pub warnings: Vec<RecordWarning>,
    /// Identities minted pending review.
    pub needs_review: Vec<ReviewEntry>,
}

impl IssueReport {
    /// Whether the run found nothing to report.
    pub fn is_clean(&self) -> bool {
        self.validation_errors.is_empty() && self.warnings.is_empty() && self.needs_review.is_empty()
    }

    /// Warnings for one identity.
    pub fn warnings_for<'a>(&'a self, ingredient: &'a IngredientId) -> impl Iterator<Item = &'a RecordWarning> + 'a {
        self.warnings.iter().filter(move |w| &w.ingredient == ingredient)
    }
}
