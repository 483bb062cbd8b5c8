//! # Cross-Jurisdiction Summary
//!
//! One row per identity; for each configured jurisdiction, the single
//! highest-priority classification across that jurisdiction's categories.
//! A pure projection of the [`Matrix`]: same matrix, same rows.

use std::collections::BTreeMap;

use cosreg_core::{Category, Concentration, IngredientId, JurisdictionCode, Provenance, RegistryNumber, Status};
use serde::{Deserialize, Serialize};

use crate::conflict::authority_key;
use crate::matrix::Matrix;

/// The winning classification of an identity in one jurisdiction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JurisdictionEntry {
    /// Status.
    pub status: Status,
    /// Category the status comes from.
    pub category: Category,
    /// Maximum concentration in percent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_concentration: Option<Concentration>,
    /// Usage conditions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<String>,
    /// Legal citation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citation: Option<String>,
    /// Whether the classification was read or synthesized.
    pub provenance: Provenance,
}

/// Summary of one identity across jurisdictions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryRow {
    /// Identity.
    pub ingredient: IngredientId,
    /// Primary name.
    pub primary_name: String,
    /// Registry number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry_number: Option<RegistryNumber>,
    /// Winning classification per jurisdiction.
    pub jurisdictions: BTreeMap<JurisdictionCode, JurisdictionEntry>,
}

impl SummaryRow {
    /// Status in one jurisdiction.
    pub fn status(&self, jurisdiction: &JurisdictionCode) -> Option<Status> {
        self.jurisdictions.get(jurisdiction).map(|e| e.status)
    }

    /// Entries whose status is anything but Not-Specified.
    pub fn specified(&self) -> impl Iterator<Item = (&JurisdictionCode, &JurisdictionEntry)> {
        self.jurisdictions.iter().filter(|(_, e)| e.status.is_specified())
    }
}

/// Project the matrix into summary rows, sorted by identity key.
pub fn build_summary(matrix: &Matrix) -> Vec<SummaryRow> {
    let policy = matrix.policy();
    matrix
        .identities()
        .map(|ingredient| {
            let jurisdictions = matrix
                .jurisdictions()
                .iter()
                .filter_map(|j| {
                    let winner = matrix.records_for(ingredient, j).min_by_key(|cell| {
                        authority_key(cell.record.status, cell.record.category, cell.position, policy)
                    })?;
                    let r = &winner.record;
                    Some((
                        j.clone(),
                        JurisdictionEntry {
                            status: r.status,
                            category: r.category,
                            max_concentration: r.max_concentration,
                            conditions: r.conditions.clone(),
                            citation: r.citation.clone(),
                            provenance: r.provenance,
                        },
                    ))
                })
                .collect();
            SummaryRow {
                ingredient: ingredient.clone(),
                primary_name: matrix.primary_name(ingredient).unwrap_or_default().to_string(),
                registry_number: matrix.registry_number(ingredient).cloned(),
                jurisdictions,
            }
        })
        .collect()
}
