//! # Cross-Jurisdiction Conflict Detection
//!
//! Compares each summary row across jurisdictions:
//!
//! - **Conflict**: one jurisdiction prohibits what another explicitly allows.
//! - **Difference**: two or more distinct specified statuses that do not
//!   amount to a conflict, e.g. prohibited in one market and restricted in
//!   another.
//! - **Limit difference**: two or more jurisdictions set a maximum
//!   concentration and the limits disagree.
//!
//! Not-Specified never takes part in a status comparison.

use std::collections::{BTreeMap, BTreeSet};

use cosreg_core::{Concentration, IngredientId, JurisdictionCode, RegistryNumber, Status};
use serde::{Deserialize, Serialize};

use crate::summary::SummaryRow;

/// Diverging statuses for one identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusDivergence {
    /// Identity.
    pub ingredient: IngredientId,
    /// Primary name.
    pub primary_name: String,
    /// Registry number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry_number: Option<RegistryNumber>,
    /// Specified status per jurisdiction.
    pub statuses: BTreeMap<JurisdictionCode, Status>,
    /// One line per prohibiting/allowing jurisdiction pair; empty for
    /// differences.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
}

/// Diverging concentration limits for one identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitDifference {
    /// Identity.
    pub ingredient: IngredientId,
    /// Primary name.
    pub primary_name: String,
    /// Registry number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry_number: Option<RegistryNumber>,
    /// Limit per jurisdiction that sets one.
    pub limits: BTreeMap<JurisdictionCode, Concentration>,
}

impl LimitDifference {
    /// Jurisdiction with the lowest limit (first in code order on ties).
    pub fn strictest(&self) -> Option<(&JurisdictionCode, Concentration)> {
        self.limits
            .iter()
            .min_by_key(|(_, c)| **c)
            .map(|(j, c)| (j, *c))
    }
}

/// Findings of one comparison pass, each list in identity order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictReport {
    /// Prohibited in one jurisdiction, allowed in another.
    pub conflicts: Vec<StatusDivergence>,
    /// Other status disagreements.
    pub differences: Vec<StatusDivergence>,
    /// Concentration limit disagreements.
    pub limit_differences: Vec<LimitDifference>,
}

impl ConflictReport {
    /// Whether nothing disagrees.
    pub fn is_empty(&self) -> bool {
        self.conflicts.is_empty() && self.differences.is_empty() && self.limit_differences.is_empty()
    }
}

fn conflict_details(statuses: &BTreeMap<JurisdictionCode, Status>) -> Vec<String> {
    let with = |wanted: Status| -> Vec<&JurisdictionCode> {
        statuses
            .iter()
            .filter(|(_, s)| **s == wanted)
            .map(|(j, _)| j)
            .collect()
    };
    let prohibiting = with(Status::Prohibited);
    let allowing = with(Status::Allowed);
    let mut details = Vec::new();
    for p in &prohibiting {
        for a in &allowing {
            details.push(format!("{p} prohibits but {a} allows"));
        }
    }
    details
}

/// Compare every summary row across jurisdictions.
pub fn detect_conflicts(rows: &[SummaryRow]) -> ConflictReport {
    let mut report = ConflictReport::default();
    for row in rows {
        let statuses: BTreeMap<JurisdictionCode, Status> = row
            .specified()
            .map(|(j, e)| (j.clone(), e.status))
            .collect();
        let distinct: BTreeSet<u8> = statuses.values().map(|s| s.rank()).collect();
        if distinct.len() >= 2 {
            let details = conflict_details(&statuses);
            let divergence = StatusDivergence {
                ingredient: row.ingredient.clone(),
                primary_name: row.primary_name.clone(),
                registry_number: row.registry_number.clone(),
                statuses,
                details,
            };
            if divergence.details.is_empty() {
                report.differences.push(divergence);
            } else {
                report.conflicts.push(divergence);
            }
        }

        let limits: BTreeMap<JurisdictionCode, Concentration> = row
            .jurisdictions
            .iter()
            .filter_map(|(j, e)| e.max_concentration.map(|c| (j.clone(), c)))
            .collect();
        let distinct_limits: BTreeSet<Concentration> = limits.values().copied().collect();
        if limits.len() >= 2 && distinct_limits.len() >= 2 {
            report.limit_differences.push(LimitDifference {
                ingredient: row.ingredient.clone(),
                primary_name: row.primary_name.clone(),
                registry_number: row.registry_number.clone(),
                limits,
            });
        }
    }
    tracing::info!(
        conflicts = report.conflicts.len(),
        differences = report.differences.len(),
        limit_differences = report.limit_differences.len(),
        "cross-jurisdiction comparison"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summary::JurisdictionEntry;
    use cosreg_core::{Category, Provenance};

    fn entry(status: Status, limit: Option<&str>) -> JurisdictionEntry {
        JurisdictionEntry {
            status,
            category: Category::Restricted,
            max_concentration: limit.map(|l| Concentration::from_percent_str(l).unwrap()),
            conditions: None,
            citation: None,
            provenance: Provenance::Source,
        }
    }

    fn row(name: &str, entries: &[(&str, Status, Option<&str>)]) -> SummaryRow {
        SummaryRow {
            ingredient: IngredientId::from_name(name),
            primary_name: name.to_string(),
            registry_number: None,
            jurisdictions: entries
                .iter()
                .map(|(j, s, l)| (JurisdictionCode::new(j).unwrap(), entry(*s, *l)))
                .collect(),
        }
    }

    #[test]
    fn prohibited_vs_allowed_is_a_conflict() {
        let report = detect_conflicts(&[row(
            "Triclosan",
            &[("A", Status::Prohibited, None), ("B", Status::Allowed, Some("0.3"))],
        )]);
        assert_eq!(report.conflicts.len(), 1);
        assert!(report.differences.is_empty());
        assert_eq!(report.conflicts[0].details, vec!["A prohibits but B allows".to_string()]);
    }

    #[test]
    fn prohibited_vs_restricted_is_only_a_difference() {
        let report = detect_conflicts(&[row(
            "Formaldehyde",
            &[("A", Status::Prohibited, None), ("B", Status::Restricted, Some("0.2"))],
        )]);
        assert!(report.conflicts.is_empty());
        assert_eq!(report.differences.len(), 1);
        assert_eq!(
            report.differences[0].statuses[&JurisdictionCode::new("B").unwrap()],
            Status::Restricted
        );
    }

    #[test]
    fn not_specified_is_ignored() {
        let report = detect_conflicts(&[row(
            "Water",
            &[("A", Status::Listed, None), ("B", Status::NotSpecified, None)],
        )]);
        assert!(report.is_empty());
    }

    #[test]
    fn differing_limits() {
        let report = detect_conflicts(&[row(
            "Methylparaben",
            &[
                ("A", Status::Allowed, Some("0.4")),
                ("B", Status::Allowed, Some("0.4")),
                ("C", Status::Allowed, Some("0.2")),
            ],
        )]);
        assert!(report.conflicts.is_empty());
        assert!(report.differences.is_empty());
        assert_eq!(report.limit_differences.len(), 1);
        let (j, limit) = report.limit_differences[0].strictest().unwrap();
        assert_eq!(j.as_str(), "C");
        assert_eq!(limit.to_string(), "0.2");
    }

    #[test]
    fn equal_limits_are_not_a_difference() {
        let report = detect_conflicts(&[row(
            "Methylparaben",
            &[("A", Status::Allowed, Some("0.4")), ("B", Status::Allowed, Some("0.40"))],
        )]);
        assert!(report.limit_differences.is_empty());
    }
}
