//! # Reconciliation Pipeline
//!
//! ```text
//! SourceTable[] ─▶ ingest ─▶ identity resolution ─▶ group by (identity, jurisdiction)
//!                                                        │
//!      Statistics ◀─ summary ◀─ backfill ◀─ matrix ◀─ conflict resolution
//! ```
//!
//! Single-threaded and synchronous. Identity resolution sees tables in the
//! given order and rows in source order, so the same input always yields
//! the same identities. Every output is rebuilt from scratch per run.

use std::collections::BTreeMap;

use cosreg_core::{normalize_name, IngredientId, JurisdictionCode, Provenance, RegistryNumber, RegulatoryRecord};
use cosreg_pack::EngineConfig;
use serde::Serialize;

use crate::conflict::resolve_group;
use crate::contradiction::{detect_conflicts, ConflictReport};
use crate::error::ReconResult;
use crate::family::FamilyMatcher;
use crate::identity::{IdentityRegistry, IdentityResolver};
use crate::ingest::{ingest, SourceTable};
use crate::matrix::Matrix;
use crate::report::{IssueReport, RecordWarning};
use crate::stats::Statistics;
use crate::summary::{build_summary, SummaryRow};

/// Outputs of one run.
#[derive(Debug, Clone, Serialize)]
pub struct Reconciliation {
    /// Per-category record tables.
    pub matrix: Matrix,
    /// One row per identity.
    pub summary: Vec<SummaryRow>,
    /// Identities, family links, review findings.
    pub identities: IdentityRegistry,
    /// Non-fatal findings.
    pub report: IssueReport,
    /// Counts.
    pub statistics: Statistics,
}

impl Reconciliation {
    /// Compare the summary across jurisdictions.
    pub fn conflicts(&self) -> ConflictReport {
        detect_conflicts(&self.summary)
    }

    /// Summary row of one identity.
    pub fn summary_row(&self, ingredient: &IngredientId) -> Option<&SummaryRow> {
        self.summary
            .binary_search_by(|row| row.ingredient.cmp(ingredient))
            .ok()
            .map(|i| &self.summary[i])
    }

    /// Summary row of the identity known by `name`. Primary names are
    /// tried before alternate names; each pass goes in identity order.
    pub fn summary_by_name(&self, name: &str) -> Option<&SummaryRow> {
        let key = normalize_name(name);
        if key.is_empty() {
            return None;
        }
        let entries = &self.identities.identities;
        entries
            .values()
            .find(|e| normalize_name(&e.primary_name) == key)
            .or_else(|| entries.values().find(|e| e.names.contains(&key)))
            .and_then(|e| self.summary_row(&e.ingredient))
    }

    /// Summary row of the identity carrying a registry number.
    pub fn summary_by_registry(&self, number: &RegistryNumber) -> Option<&SummaryRow> {
        self.identities
            .identities
            .values()
            .find(|e| e.registry_number.as_ref() == Some(number))
            .and_then(|e| self.summary_row(&e.ingredient))
    }

    /// Source records of one jurisdiction, primaries and duplicates, in
    /// matrix order. Synthesized records are left out.
    pub fn source_records(&self, jurisdiction: &JurisdictionCode) -> Vec<&RegulatoryRecord> {
        self.matrix
            .cells()
            .flat_map(|c| c.records())
            .filter(|r| &r.jurisdiction == jurisdiction && r.provenance == Provenance::Source)
            .collect()
    }
}

/// Runs reconciliations against one configuration.
#[derive(Debug, Clone)]
pub struct ReconciliationEngine {
    config: EngineConfig,
}

impl ReconciliationEngine {
    /// Engine over a validated configuration.
    ///
    /// # Errors
    ///
    /// Fails if the configuration, including its family vocabulary, does
    /// not validate.
    pub fn new(config: EngineConfig) -> ReconResult<Self> {
        config.validate()?;
        FamilyMatcher::new(&config.reference)?;
        Ok(Self { config })
    }

    /// The configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Reconcile source tables.
    ///
    /// # Errors
    ///
    /// Configuration errors only: a table for an unconfigured jurisdiction
    /// or an undefined category. Record-level problems end up in
    /// [`Reconciliation::report`].
    pub fn run(&self, tables: &[SourceTable]) -> ReconResult<Reconciliation> {
        let rows: usize = tables.iter().map(|t| t.records.len()).sum();
        tracing::info!(
            tables = tables.len(),
            rows,
            jurisdictions = self.config.jurisdictions().len(),
            tie_break = %self.config.tie_break,
            "reconciliation started"
        );

        let ingestion = ingest(&self.config, tables)?;
        let matcher = FamilyMatcher::new(&self.config.reference)?;
        let mut resolver = IdentityResolver::new(self.config.matching, &matcher);
        let mut report = IssueReport {
            validation_errors: ingestion.errors,
            ..IssueReport::default()
        };

        let mut groups: BTreeMap<(IngredientId, JurisdictionCode), Vec<(usize, RegulatoryRecord)>> =
            BTreeMap::new();
        for (position, ingested) in ingestion.records.into_iter().enumerate() {
            let resolution = resolver.resolve(&ingested.record);
            for warning in ingested.warnings {
                tracing::warn!(
                    ingredient = %resolution.ingredient,
                    jurisdiction = %ingested.source.jurisdiction,
                    category = %ingested.source.category,
                    row = ingested.source.row,
                    code = %warning.code,
                    "{}",
                    warning.message
                );
                report.warnings.push(RecordWarning {
                    source: ingested.source.clone(),
                    ingredient: resolution.ingredient.clone(),
                    warning,
                });
            }
            let record = ingested.record.into_record(resolution.ingredient);
            groups
                .entry((record.ingredient.clone(), record.jurisdiction.clone()))
                .or_default()
                .push((position, record));
        }
        let identities = resolver.finish();
        report.needs_review = identities.review.clone();

        let mut matrix = Matrix::new(&self.config);
        for entry in identities.identities.values() {
            matrix.register_identity(
                entry.ingredient.clone(),
                entry.primary_name.clone(),
                entry.registry_number.clone(),
            );
        }
        let mut superseded = 0;
        for (_, group) in groups {
            let (positions, records): (Vec<usize>, Vec<RegulatoryRecord>) = group.into_iter().unzip();
            let Some(resolved) = resolve_group(records, self.config.tie_break) else {
                continue;
            };
            superseded += resolved.superseded_count();
            for (position, record) in positions.into_iter().zip(resolved.records) {
                matrix.insert(position, record);
            }
        }
        matrix.backfill();

        let summary = build_summary(&matrix);
        let statistics = Statistics::collect(&matrix, &summary, &identities, &report, superseded);
        tracing::info!(
            identities = statistics.total_identities,
            records = statistics.total_records,
            backfilled = statistics.backfilled,
            superseded = statistics.superseded,
            needs_review = statistics.needs_review,
            validation_errors = statistics.validation_errors,
            warnings = statistics.warnings,
            "reconciliation finished"
        );

        Ok(Reconciliation {
            matrix,
            summary,
            identities,
            report,
            statistics,
        })
    }
}
