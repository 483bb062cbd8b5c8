//! Run statistics.

use std::collections::BTreeMap;

use cosreg_core::{Category, JurisdictionCode, Status};
use serde::{Deserialize, Serialize};

use crate::identity::IdentityRegistry;
use crate::matrix::Matrix;
use crate::report::IssueReport;
use crate::summary::SummaryRow;

/// Primary records in one (jurisdiction, category), by provenance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCounts {
    /// Read from source lists.
    pub source: usize,
    /// Synthesized Not-Specified.
    pub backfilled: usize,
}

/// Counts describing one reconciliation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statistics {
    /// Primary records per jurisdiction per category.
    pub by_jurisdiction: BTreeMap<JurisdictionCode, BTreeMap<Category, CategoryCounts>>,
    /// Summary statuses per jurisdiction.
    pub status_counts: BTreeMap<JurisdictionCode, BTreeMap<Status, usize>>,
    /// Distinct identities.
    pub total_identities: usize,
    /// Every record in the matrix, duplicates included.
    pub total_records: usize,
    /// Synthesized Not-Specified records.
    pub backfilled: usize,
    /// Identities minted pending review.
    pub needs_review: usize,
    /// Records excluded by validation.
    pub validation_errors: usize,
    /// Consistency warnings.
    pub warnings: usize,
    /// Records that lost intra-jurisdiction resolution.
    pub superseded: usize,
    /// Family cross-references.
    pub family_links: usize,
}

impl Statistics {
    /// Gather counts from the outputs of a run.
    pub fn collect(
        matrix: &Matrix,
        summary: &[SummaryRow],
        identities: &IdentityRegistry,
        report: &IssueReport,
        superseded: usize,
    ) -> Self {
        let mut by_jurisdiction: BTreeMap<JurisdictionCode, BTreeMap<Category, CategoryCounts>> =
            BTreeMap::new();
        for cell in matrix.cells() {
            let counts = by_jurisdiction
                .entry(cell.record.jurisdiction.clone())
                .or_default()
                .entry(cell.record.category)
                .or_default();
            if cell.is_backfilled() {
                counts.backfilled += 1;
            } else {
                counts.source += 1;
            }
        }

        let mut status_counts: BTreeMap<JurisdictionCode, BTreeMap<Status, usize>> = BTreeMap::new();
        for row in summary {
            for (j, entry) in &row.jurisdictions {
                *status_counts
                    .entry(j.clone())
                    .or_default()
                    .entry(entry.status)
                    .or_default() += 1;
            }
        }

        Self {
            by_jurisdiction,
            status_counts,
            total_identities: identities.identities.len(),
            total_records: matrix.total_records(),
            backfilled: matrix.backfilled_count(),
            needs_review: identities.needs_review_count(),
            validation_errors: report.validation_errors.len(),
            warnings: report.warnings.len(),
            superseded,
            family_links: identities.family_link_count(),
        }
    }

    /// Counts for one (jurisdiction, category).
    pub fn counts(&self, jurisdiction: &JurisdictionCode, category: Category) -> CategoryCounts {
        self.by_jurisdiction
            .get(jurisdiction)
            .and_then(|m| m.get(&category))
            .copied()
            .unwrap_or_default()
    }
}
