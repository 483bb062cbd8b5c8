//! # Snapshot Diff
//!
//! Compares two snapshots of one jurisdiction clause by clause:
//!
//! - **added**: clause ids only in the new snapshot;
//! - **removed**: clause ids only in the old snapshot;
//! - **modified**: clause ids in both whose watched fields differ.
//!
//! Watched fields are category, maximum concentration and conditions.
//! A category change or a tighter limit (lowered, or introduced where there
//! was none) is high severity; any other change is medium.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::NaiveDate;
use cosreg_core::{ContentDigest, IngredientId, JurisdictionCode};
use serde::{Deserialize, Serialize};

use crate::error::{DiffError, DiffResult};
use crate::snapshot::{RuleClause, Snapshot};

/// How much a change matters to formulators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Informational or relaxing change.
    Medium,
    /// Reclassification or tightened limit.
    High,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Medium => "medium",
            Self::High => "high",
        })
    }
}

/// A clause field compared between versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatchedField {
    /// Category.
    Category,
    /// Maximum concentration.
    MaxConcentration,
    /// Usage conditions.
    Conditions,
}

impl fmt::Display for WatchedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Category => "category",
            Self::MaxConcentration => "max_concentration",
            Self::Conditions => "conditions",
        })
    }
}

/// One changed field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChange {
    /// Field.
    pub field: WatchedField,
    /// Old value, rendered as text.
    pub old: Option<String>,
    /// New value, rendered as text.
    pub new: Option<String>,
    /// Severity of this change.
    pub severity: Severity,
}

/// A clause present in both versions with changed fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModifiedClause {
    /// Clause id.
    pub clause_id: String,
    /// Ingredient of the new clause.
    pub ingredient: IngredientId,
    /// Ingredient name of the new clause.
    pub ingredient_name: String,
    /// Changed fields, in field order.
    pub changes: Vec<FieldChange>,
    /// Highest severity among the changes.
    pub severity: Severity,
}

/// Change counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSummary {
    /// Added + removed + modified.
    pub total_changes: usize,
    /// Added clauses.
    pub added: usize,
    /// Removed clauses.
    pub removed: usize,
    /// Modified clauses.
    pub modified: usize,
    /// Modified clauses of high severity.
    pub high_severity: usize,
    /// Distinct ingredients touched.
    pub affected_ingredients: usize,
}

/// Differences between two versions of one jurisdiction's rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotDiff {
    /// Jurisdiction.
    pub jurisdiction: JurisdictionCode,
    /// Old version label.
    pub from_version: String,
    /// New version label.
    pub to_version: String,
    /// Old publication date.
    pub from_date: Option<NaiveDate>,
    /// New publication date.
    pub to_date: Option<NaiveDate>,
    /// Old content digest.
    pub from_digest: ContentDigest,
    /// New content digest.
    pub to_digest: ContentDigest,
    /// Counts.
    pub summary: DiffSummary,
    /// Clauses only in the new version, by clause id.
    pub added: Vec<RuleClause>,
    /// Clauses only in the old version, by clause id.
    pub removed: Vec<RuleClause>,
    /// Changed clauses, by clause id.
    pub modified: Vec<ModifiedClause>,
    /// Every ingredient touched by any change.
    pub affected_ingredients: BTreeSet<IngredientId>,
}

impl SnapshotDiff {
    /// Whether the two versions are equivalent.
    pub fn is_empty(&self) -> bool {
        self.summary.total_changes == 0
    }

    /// Display name of every affected ingredient.
    pub fn affected_names(&self) -> BTreeMap<&IngredientId, &str> {
        let mut names = BTreeMap::new();
        for c in self.added.iter().chain(&self.removed) {
            names.insert(&c.ingredient, c.ingredient_name.as_str());
        }
        for m in &self.modified {
            names.insert(&m.ingredient, m.ingredient_name.as_str());
        }
        names
    }
}

fn text<T: ToString>(v: Option<&T>) -> Option<String> {
    v.map(ToString::to_string)
}

/// Field-level changes between two versions of a clause.
pub fn compare_clauses(old: &RuleClause, new: &RuleClause) -> Vec<FieldChange> {
    let mut changes = Vec::new();
    if old.category != new.category {
        changes.push(FieldChange {
            field: WatchedField::Category,
            old: Some(old.category.to_string()),
            new: Some(new.category.to_string()),
            severity: Severity::High,
        });
    }
    if old.max_concentration != new.max_concentration {
        let tighter = match (old.max_concentration, new.max_concentration) {
            (Some(o), Some(n)) => n < o,
            (None, Some(_)) => true,
            _ => false,
        };
        changes.push(FieldChange {
            field: WatchedField::MaxConcentration,
            old: text(old.max_concentration.as_ref()),
            new: text(new.max_concentration.as_ref()),
            severity: if tighter { Severity::High } else { Severity::Medium },
        });
    }
    if old.conditions != new.conditions {
        changes.push(FieldChange {
            field: WatchedField::Conditions,
            old: old.conditions.clone(),
            new: new.conditions.clone(),
            severity: Severity::Medium,
        });
    }
    changes
}

/// Compare two snapshots of one jurisdiction.
///
/// # Errors
///
/// [`DiffError::JurisdictionMismatch`] if the snapshots belong to different
/// jurisdictions.
pub fn diff(old: &Snapshot, new: &Snapshot) -> DiffResult<SnapshotDiff> {
    if old.jurisdiction() != new.jurisdiction() {
        return Err(DiffError::JurisdictionMismatch {
            old: old.jurisdiction().to_string(),
            new: new.jurisdiction().to_string(),
        });
    }

    let mut added = Vec::new();
    let mut removed = Vec::new();
    let mut modified = Vec::new();

    if old.digest() != new.digest() {
        for clause in new.clauses() {
            if old.clause(&clause.clause_id).is_none() {
                added.push(clause.clone());
            }
        }
        for clause in old.clauses() {
            match new.clause(&clause.clause_id) {
                None => removed.push(clause.clone()),
                Some(next) => {
                    let changes = compare_clauses(clause, next);
                    if let Some(severity) = changes.iter().map(|c| c.severity).max() {
                        modified.push(ModifiedClause {
                            clause_id: next.clause_id.clone(),
                            ingredient: next.ingredient.clone(),
                            ingredient_name: next.ingredient_name.clone(),
                            changes,
                            severity,
                        });
                    }
                }
            }
        }
    }

    let affected_ingredients: BTreeSet<IngredientId> = added
        .iter()
        .chain(&removed)
        .map(|c| c.ingredient.clone())
        .chain(modified.iter().map(|m| m.ingredient.clone()))
        .collect();
    let summary = DiffSummary {
        total_changes: added.len() + removed.len() + modified.len(),
        added: added.len(),
        removed: removed.len(),
        modified: modified.len(),
        high_severity: modified.iter().filter(|m| m.severity == Severity::High).count(),
        affected_ingredients: affected_ingredients.len(),
    };
    tracing::info!(
        jurisdiction = %new.jurisdiction(),
        from = %old.version(),
        to = %new.version(),
        added = summary.added,
        removed = summary.removed,
        modified = summary.modified,
        high_severity = summary.high_severity,
        "snapshot diff"
    );

    Ok(SnapshotDiff {
        jurisdiction: new.jurisdiction().clone(),
        from_version: old.version().to_string(),
        to_version: new.version().to_string(),
        from_date: old.published_at(),
        to_date: new.published_at(),
        from_digest: old.digest(),
        to_digest: new.digest(),
        summary,
        added,
        removed,
        modified,
        affected_ingredients,
    })
}
