//! # Ingestion
//!
//! Turns raw source tables into validated records. Each row is projected
//! through its jurisdiction's alias table for the table's category, then
//! validated in that table's context (default unit, default citation).
//!
//! A table naming an unconfigured jurisdiction, or a category its
//! jurisdiction does not define, fails the whole run before any row is
//! read. A row that fails validation is excluded and reported; the rest of
//! the table carries on.

use cosreg_core::{Category, ConsistencyWarning, JurisdictionCode, ValidatedRecord};
use cosreg_pack::{EngineConfig, JurisdictionPack, RawRecord};
use serde::{Deserialize, Serialize};

use crate::error::{ReconError, ReconResult};
use crate::report::{RecordIssue, RowRef};

/// One extracted source list: a jurisdiction's table for one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceTable {
    /// Jurisdiction the list belongs to.
    pub jurisdiction: JurisdictionCode,
    /// Category the list defines.
    pub category: Category,
    /// Rows in source order.
    #[serde(default)]
    pub records: Vec<RawRecord>,
}

impl SourceTable {
    /// Empty table.
    pub fn new(jurisdiction: JurisdictionCode, category: Category) -> Self {
        Self {
            jurisdiction,
            category,
            records: Vec::new(),
        }
    }

    /// Append a row.
    pub fn with_record(mut self, record: RawRecord) -> Self {
        self.records.push(record);
        self
    }
}

/// A row that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestedRecord {
    /// Where it came from.
    pub source: RowRef,
    /// The validated record.
    pub record: ValidatedRecord,
    /// Consistency findings.
    pub warnings: Vec<ConsistencyWarning>,
}

/// Result of ingesting every table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ingestion {
    /// Accepted rows, tables in given order, rows in order.
    pub records: Vec<IngestedRecord>,
    /// Excluded rows.
    pub errors: Vec<RecordIssue>,
}

/// Check that a table's jurisdiction and category are configured.
pub fn check_table<'c>(config: &'c EngineConfig, table: &SourceTable) -> ReconResult<&'c JurisdictionPack> {
    let pack = config
        .jurisdiction(&table.jurisdiction)
        .ok_or_else(|| ReconError::UnknownJurisdiction {
            code: table.jurisdiction.to_string(),
        })?;
    if !pack.defines(table.category) {
        return Err(ReconError::UndefinedCategory {
            jurisdiction: table.jurisdiction.to_string(),
            category: table.category.to_string(),
        });
    }
    Ok(pack)
}

/// Project and validate every row of every table.
///
/// # Errors
///
/// [`ReconError::UnknownJurisdiction`] or [`ReconError::UndefinedCategory`]
/// if any table is not covered by the configuration.
pub fn ingest(config: &EngineConfig, tables: &[SourceTable]) -> ReconResult<Ingestion> {
    let packs = tables
        .iter()
        .map(|t| check_table(config, t))
        .collect::<ReconResult<Vec<_>>>()?;

    let mut out = Ingestion::default();
    for (table, pack) in tables.iter().zip(packs) {
        let aliases = pack.alias_table(table.category);
        let ctx = pack
            .record_context(table.category)
            .ok_or_else(|| ReconError::UndefinedCategory {
                jurisdiction: table.jurisdiction.to_string(),
                category: table.category.to_string(),
            })?;
        let before = out.records.len();

        for (row, raw) in table.records.iter().enumerate() {
            let input = aliases.project(raw);
            let source = RowRef {
                jurisdiction: table.jurisdiction.clone(),
                category: table.category,
                row,
                primary_name: input.primary_name.clone(),
            };
            match ValidatedRecord::from_input(&input, &ctx) {
                Ok((record, warnings)) => out.records.push(IngestedRecord {
                    source,
                    record,
                    warnings,
                }),
                Err(e) => {
                    tracing::warn!(
                        jurisdiction = %table.jurisdiction,
                        category = %table.category,
                        row,
                        error = %e,
                        "record excluded"
                    );
                    out.errors.push(RecordIssue::new(source, &e));
                }
            }
        }

        tracing::debug!(
            jurisdiction = %table.jurisdiction,
            category = %table.category,
            rows = table.records.len(),
            accepted = out.records.len() - before,
            "ingested source table"
        );
    }
    Ok(out)
}
