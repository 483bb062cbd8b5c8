//! # Intra-Jurisdiction Conflict Resolution
//!
//! One ingredient can appear in several lists of the same jurisdiction, for
//! example in both the prohibited and the restricted annex. The record with
//! the most restrictive status is authoritative; every other record stays in
//! place, annotated with what superseded it. Nothing is ever dropped.
//!
//! Equal statuses are broken by [`TieBreakPolicy`]:
//!
//! ```text
//! key = (status rank, scope rank, position)     lowest key wins
//!
//! general_table_first   scope rank: prohibited/restricted = 0, others = 1
//! first_seen            scope rank: always 0
//! ```

use cosreg_core::{Category, RegulatoryRecord, Scope, Status};
use cosreg_pack::TieBreakPolicy;

/// Ordering key of a record competing for authority. Lower wins.
pub fn authority_key(status: Status, category: Category, position: usize, policy: TieBreakPolicy) -> (u8, u8, usize) {
    let scope = match policy {
        TieBreakPolicy::GeneralTableFirst => match category.scope() {
            Scope::General => 0,
            Scope::Narrow => 1,
        },
        TieBreakPolicy::FirstSeen => 0,
    };
    (status.rank(), scope, position)
}

/// Index of the authoritative record, positions taken as slice order.
pub fn pick_authoritative(records: &[RegulatoryRecord], policy: TieBreakPolicy) -> Option<usize> {
    records
        .iter()
        .enumerate()
        .min_by_key(|(i, r)| authority_key(r.status, r.category, *i, policy))
        .map(|(i, _)| i)
}

/// Note attached to a record that lost to `winner`.
pub fn superseded_note(winner: &RegulatoryRecord) -> String {
    format!("superseded by {} ({})", winner.category, winner.status)
}

/// Records of one (identity, jurisdiction) after resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedGroup {
    /// Index of the authoritative record in `records`.
    pub authoritative: usize,
    /// Every input record, in input order; losers annotated.
    pub records: Vec<RegulatoryRecord>,
}

impl ResolvedGroup {
    /// The authoritative record.
    pub fn winner(&self) -> &RegulatoryRecord {
        &self.records[self.authoritative]
    }

    /// Records that lost.
    pub fn superseded(&self) -> impl Iterator<Item = &RegulatoryRecord> {
        self.records
            .iter()
            .enumerate()
            .filter(move |(i, _)| *i != self.authoritative)
            .map(|(_, r)| r)
    }

    /// Number of records that lost.
    pub fn superseded_count(&self) -> usize {
        self.records.len().saturating_sub(1)
    }
}

/// Resolve all records sharing one identity and jurisdiction, given in
/// insertion order. Returns `None` for an empty group.
pub fn resolve_group(mut records: Vec<RegulatoryRecord>, policy: TieBreakPolicy) -> Option<ResolvedGroup> {
    let authoritative = pick_authoritative(&records, policy)?;
    if records.len() > 1 {
        let note = superseded_note(&records[authoritative]);
        let winner = &records[authoritative];
        tracing::debug!(
            ingredient = %winner.ingredient,
            jurisdiction = %winner.jurisdiction,
            category = %winner.category,
            status = %winner.status,
            superseded = records.len() - 1,
            "resolved intra-jurisdiction conflict"
        );
        for (i, record) in records.iter_mut().enumerate() {
            if i != authoritative {
                record.annotate(note.clone());
            }
        }
    }
    Some(ResolvedGroup {
        authoritative,
        records,
    })
}
