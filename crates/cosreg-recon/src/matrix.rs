//! # Jurisdiction-Category Matrix
//!
//! Dense grid of (identity × jurisdiction × category) cells. Each cell
//! holds one primary record plus any same-cell duplicates, kept for audit.
//!
//! ## Completeness
//!
//! After [`Matrix::backfill`], every category a jurisdiction *defines* has a
//! primary record for every identity, synthesized as Not-Specified where no
//! source list mentions the ingredient. Categories a jurisdiction does not
//! define are never filled, and querying one through [`Matrix::cell`] is a
//! configuration error rather than an empty answer.
//!
//! The matrix is rebuilt in full on every run.

use std::collections::{BTreeMap, BTreeSet};

use cosreg_core::{Category, IngredientId, JurisdictionCode, Provenance, RegistryNumber, RegulatoryRecord};
use cosreg_pack::{EngineConfig, TieBreakPolicy};
use serde::{Serialize, Serializer};

use crate::conflict::authority_key;
use crate::error::{ReconError, ReconResult};

type CellKey = (IngredientId, JurisdictionCode, Category);

/// One (identity, jurisdiction, category) cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatrixCell {
    /// The cell's primary record.
    pub record: RegulatoryRecord,
    /// Other source records for the same cell, in input order.
    pub duplicates: Vec<RegulatoryRecord>,
    /// Input position of the primary record; backfilled cells follow every
    /// source record.
    pub position: usize,
}

impl MatrixCell {
    /// Whether the primary record was synthesized.
    pub fn is_backfilled(&self) -> bool {
        self.record.provenance == Provenance::Backfilled
    }

    /// Primary record followed by duplicates.
    pub fn records(&self) -> impl Iterator<Item = &RegulatoryRecord> {
        std::iter::once(&self.record).chain(self.duplicates.iter())
    }
}

/// All records of one category across jurisdictions and identities.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTable {
    /// The category.
    pub category: Category,
    /// Records ordered by identity, then jurisdiction; primaries first.
    pub records: Vec<RegulatoryRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct IdentityLabel {
    primary_name: String,
    registry_number: Option<RegistryNumber>,
}

/// The reconciled record grid.
#[derive(Debug, Clone)]
pub struct Matrix {
    cells: BTreeMap<CellKey, MatrixCell>,
    defined: BTreeMap<JurisdictionCode, BTreeSet<Category>>,
    jurisdictions: Vec<JurisdictionCode>,
    identities: BTreeMap<IngredientId, IdentityLabel>,
    policy: TieBreakPolicy,
    next_position: usize,
}

impl Matrix {
    /// Empty matrix over the configured jurisdictions.
    pub fn new(config: &EngineConfig) -> Self {
        let defined = config
            .jurisdictions()
            .iter()
            .map(|p| (p.code().clone(), p.defined_categories().collect()))
            .collect();
        Self {
            cells: BTreeMap::new(),
            defined,
            jurisdictions: config.jurisdictions().iter().map(|p| p.code().clone()).collect(),
            identities: BTreeMap::new(),
            policy: config.tie_break,
            next_position: 0,
        }
    }

    /// Make an identity known, so backfill covers it even before any of its
    /// records is inserted.
    pub fn register_identity(
        &mut self,
        ingredient: IngredientId,
        primary_name: impl Into<String>,
        registry_number: Option<RegistryNumber>,
    ) {
        self.identities.entry(ingredient).or_insert_with(|| IdentityLabel {
            primary_name: primary_name.into(),
            registry_number,
        });
    }

    /// Place a source record at its input position.
    ///
    /// If the cell is taken, the record with the lower authority key
    /// becomes primary and the other is kept as a duplicate.
    pub fn insert(&mut self, position: usize, record: RegulatoryRecord) {
        self.register_identity(
            record.ingredient.clone(),
            record.primary_name.clone(),
            record.registry_number.clone(),
        );
        self.next_position = self.next_position.max(position + 1);
        let key = (
            record.ingredient.clone(),
            record.jurisdiction.clone(),
            record.category,
        );
        match self.cells.get_mut(&key) {
            None => {
                self.cells.insert(
                    key,
                    MatrixCell {
                        record,
                        duplicates: Vec::new(),
                        position,
                    },
                );
            }
            Some(cell) => {
                let incoming = authority_key(record.status, record.category, position, self.policy);
                let current = authority_key(cell.record.status, cell.record.category, cell.position, self.policy);
                if incoming < current {
                    let displaced = std::mem::replace(&mut cell.record, record);
                    cell.duplicates.insert(0, displaced);
                    cell.position = position;
                } else {
                    cell.duplicates.push(record);
                }
            }
        }
    }

    /// Synthesize Not-Specified records for every empty defined cell.
    /// Returns the number of records added.
    pub fn backfill(&mut self) -> usize {
        let mut added = 0;
        for (ingredient, label) in &self.identities {
            for jurisdiction in &self.jurisdictions {
                let Some(categories) = self.defined.get(jurisdiction) else {
                    continue;
                };
                for &category in categories {
                    let key = (ingredient.clone(), jurisdiction.clone(), category);
                    if self.cells.contains_key(&key) {
                        continue;
                    }
                    let record = RegulatoryRecord::not_specified(
                        ingredient.clone(),
                        label.primary_name.clone(),
                        label.registry_number.clone(),
                        jurisdiction.clone(),
                        category,
                    );
                    self.cells.insert(
                        key,
                        MatrixCell {
                            record,
                            duplicates: Vec::new(),
                            position: self.next_position,
                        },
                    );
                    self.next_position += 1;
                    added += 1;
                }
            }
        }
        tracing::info!(
            identities = self.identities.len(),
            backfilled = added,
            "completeness backfill"
        );
        added
    }

    /// Primary record of a cell, if present.
    pub fn get(
        &self,
        ingredient: &IngredientId,
        jurisdiction: &JurisdictionCode,
        category: Category,
    ) -> Option<&RegulatoryRecord> {
        self.cells
            .get(&(ingredient.clone(), jurisdiction.clone(), category))
            .map(|c| &c.record)
    }

    /// Checked cell lookup.
    ///
    /// # Errors
    ///
    /// [`ReconError::UnknownJurisdiction`] if the jurisdiction is not
    /// configured, [`ReconError::UndefinedCategory`] if it does not define
    /// `category`. An unknown identity is `Ok(None)`.
    pub fn cell(
        &self,
        ingredient: &IngredientId,
        jurisdiction: &JurisdictionCode,
        category: Category,
    ) -> ReconResult<Option<&MatrixCell>> {
        let categories = self
            .defined
            .get(jurisdiction)
            .ok_or_else(|| ReconError::UnknownJurisdiction {
                code: jurisdiction.to_string(),
            })?;
        if !categories.contains(&category) {
            return Err(ReconError::UndefinedCategory {
                jurisdiction: jurisdiction.to_string(),
                category: category.to_string(),
            });
        }
        Ok(self
            .cells
            .get(&(ingredient.clone(), jurisdiction.clone(), category)))
    }

    /// Cells of one identity in one jurisdiction, in category order.
    pub fn records_for<'a>(
        &'a self,
        ingredient: &IngredientId,
        jurisdiction: &JurisdictionCode,
    ) -> impl Iterator<Item = &'a MatrixCell> + 'a {
        let lo = (ingredient.clone(), jurisdiction.clone(), Category::Prohibited);
        let hi = (ingredient.clone(), jurisdiction.clone(), Category::GeneralInventory);
        self.cells.range(lo..=hi).map(|(_, cell)| cell)
    }

    /// Every cell, ordered by identity, jurisdiction, category.
    pub fn cells(&self) -> impl Iterator<Item = &MatrixCell> {
        self.cells.values()
    }

    /// Known identities in key order.
    pub fn identities(&self) -> impl Iterator<Item = &IngredientId> {
        self.identities.keys()
    }

    /// Primary name an identity was first seen under.
    pub fn primary_name(&self, ingredient: &IngredientId) -> Option<&str> {
        self.identities.get(ingredient).map(|l| l.primary_name.as_str())
    }

    /// Registry number of an identity.
    pub fn registry_number(&self, ingredient: &IngredientId) -> Option<&RegistryNumber> {
        self.identities
            .get(ingredient)
            .and_then(|l| l.registry_number.as_ref())
    }

    /// Configured jurisdictions, in configuration order.
    pub fn jurisdictions(&self) -> &[JurisdictionCode] {
        &self.jurisdictions
    }

    /// Categories defined for a jurisdiction.
    pub fn defined_categories(&self, jurisdiction: &JurisdictionCode) -> Option<&BTreeSet<Category>> {
        self.defined.get(jurisdiction)
    }

    /// Tie-break policy the matrix was built with.
    pub fn policy(&self) -> TieBreakPolicy {
        self.policy
    }

    /// Every record, primaries and duplicates.
    pub fn total_records(&self) -> usize {
        self.cells.values().map(|c| 1 + c.duplicates.len()).sum()
    }

    /// Number of synthesized records.
    pub fn backfilled_count(&self) -> usize {
        self.cells.values().filter(|c| c.is_backfilled()).count()
    }

    /// Per-category record tables, in category order. Categories with no
    /// records are omitted.
    pub fn tables(&self) -> Vec<CategoryTable> {
        let mut by_category: BTreeMap<Category, Vec<RegulatoryRecord>> = BTreeMap::new();
        for ((_, _, category), cell) in &self.cells {
            by_category
                .entry(*category)
                .or_default()
                .extend(cell.records().cloned());
        }
        by_category
            .into_iter()
            .map(|(category, records)| CategoryTable { category, records })
            .collect()
    }
}

impl Serialize for Matrix {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.tables().serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cosreg_core::Status;
    use cosreg_pack::{CategoryProfile, JurisdictionPack};

    fn code(s: &str) -> JurisdictionCode {
        JurisdictionCode::new(s).unwrap()
    }

    fn pack(c: &str, categories: &[Category]) -> JurisdictionPack {
        categories.iter().fold(JurisdictionPack::new(code(c), c), |p, &cat| {
            p.with_category(cat, CategoryProfile::default())
        })
    }

    fn config() -> EngineConfig {
        EngineConfig::new(vec![
            pack("A", &[Category::Restricted]),
            pack(
                "B",
                &[Category::Prohibited, Category::Restricted, Category::AllowedPreservative],
            ),
        ])
        .unwrap()
    }

    fn source(id: &IngredientId, j: &str, category: Category, status: Status) -> RegulatoryRecord {
        let mut r = RegulatoryRecord::not_specified(id.clone(), "Triclosan", None, code(j), category);
        r.status = status;
        r.notes.clear();
        r.provenance = Provenance::Source;
        r
    }

    #[test]
    fn backfill_fills_defined_cells_only() {
        let id = IngredientId::from_name("Triclosan");
        let mut m = Matrix::new(&config());
        m.insert(0, source(&id, "A", Category::Restricted, Status::Restricted));
        assert_eq!(m.backfill(), 3);

        for category in [Category::Prohibited, Category::Restricted, Category::AllowedPreservative] {
            let r = m.get(&id, &code("B"), category).unwrap();
            assert_eq!(r.status, Status::NotSpecified);
            assert_eq!(r.provenance, Provenance::Backfilled);
            assert!(r.notes[0].contains("B"));
            assert!(r.notes[0].contains(category.as_str()));
        }
        assert!(m.get(&id, &code("A"), Category::Prohibited).is_none());
        assert_eq!(m.backfilled_count(), 3);
        assert_eq!(m.total_records(), 4);
    }

    #[test]
    fn backfill_is_idempotent() {
        let id = IngredientId::from_name("Triclosan");
        let mut m = Matrix::new(&config());
        m.insert(0, source(&id, "A", Category::Restricted, Status::Restricted));
        m.backfill();
        assert_eq!(m.backfill(), 0);
    }

    #[test]
    fn checked_lookup_rejects_undefined_category() {
        let id = IngredientId::from_name("Triclosan");
        let mut m = Matrix::new(&config());
        m.insert(0, source(&id, "A", Category::Restricted, Status::Restricted));
        m.backfill();
        assert!(m.cell(&id, &code("A"), Category::Restricted).unwrap().is_some());
        assert!(matches!(
            m.cell(&id, &code("A"), Category::Prohibited),
            Err(ReconError::UndefinedCategory { .. })
        ));
        assert!(matches!(
            m.cell(&id, &code("ZZ"), Category::Prohibited),
            Err(ReconError::UnknownJurisdiction { .. })
        ));
    }

    #[test]
    fn same_cell_duplicates_are_kept() {
        let id = IngredientId::from_name("Triclosan");
        let mut m = Matrix::new(&config());
        m.insert(0, source(&id, "B", Category::Restricted, Status::Allowed));
        m.insert(1, source(&id, "B", Category::Restricted, Status::Restricted));
        let cell = m.cell(&id, &code("B"), Category::Restricted).unwrap().unwrap();
        assert_eq!(cell.record.status, Status::Restricted);
        assert_eq!(cell.position, 1);
        assert_eq!(cell.duplicates.len(), 1);
        assert_eq!(m.total_records(), 2);
    }

    #[test]
    fn tables_group_by_category() {
        let id = IngredientId::from_name("Triclosan");
        let mut m = Matrix::new(&config());
        m.insert(0, source(&id, "A", Category::Restricted, Status::Restricted));
        m.backfill();
        let tables = m.tables();
        let categories: Vec<Category> = tables.iter().map(|t| t.category).collect();
        assert_eq!(
            categories,
            vec![Category::Prohibited, Category::Restricted, Category::AllowedPreservative]
        );
        assert_eq!(tables[1].records.len(), 2);
        let json = serde_json::to_value(&m).unwrap();
        assert_eq!(json.as_array().unwrap().len(), 3);
    }

    #[test]
    fn records_for_spans_categories() {
        let id = IngredientId::from_name("Triclosan");
        let other = IngredientId::from_name("Zinc Pyrithione");
        let mut m = Matrix::new(&config());
        m.insert(0, source(&id, "B", Category::Restricted, Status::Restricted));
        m.insert(1, source(&other, "B", Category::Prohibited, Status::Prohibited));
        m.backfill();
        assert_eq!(m.records_for(&id, &code("B")).count(), 3);
        assert!(m
            .records_for(&id, &code("B"))
            .all(|c| c.record.ingredient == id));
    }
}
