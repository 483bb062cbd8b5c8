//! # Regulation Snapshots
//!
//! A [`Snapshot`] is one published version of one jurisdiction's rules: a
//! set of [`RuleClause`]s keyed by clause id. Snapshots are immutable once
//! built. Their [`ContentDigest`] is the SHA-256 of the JCS-canonical
//! content, so two snapshots holding the same clauses have the same digest
//! however the clauses were collected.
//!
//! A serialized snapshot carries its digest; deserialization recomputes it
//! and rejects a mismatch.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use cosreg_core::{
    sha256_digest, CanonicalBytes, Category, Concentration, ContentDigest, IngredientId,
    JurisdictionCode, Provenance, RegulatoryRecord,
};
use serde::{Deserialize, Serialize};

use crate::error::{DiffError, DiffResult};

/// One rule of a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleClause {
    /// Stable id within the jurisdiction's rule set.
    pub clause_id: String,
    /// Ingredient the rule is about.
    pub ingredient: IngredientId,
    /// Ingredient name for display.
    pub ingredient_name: String,
    /// Category the rule places the ingredient in.
    pub category: Category,
    /// Maximum concentration in percent.
    #[serde(default)]
    pub max_concentration: Option<Concentration>,
    /// Usage conditions.
    #[serde(default)]
    pub conditions: Option<String>,
    /// Legal citation.
    #[serde(default)]
    pub citation: Option<String>,
}

impl RuleClause {
    /// Clause id used for clauses derived from records.
    pub fn record_clause_id(category: Category, ingredient: &IngredientId) -> String {
        format!("{category}:{ingredient}")
    }

    /// Clause for a reconciled record.
    pub fn from_record(record: &RegulatoryRecord) -> Self {
        Self {
            clause_id: Self::record_clause_id(record.category, &record.ingredient),
            ingredient: record.ingredient.clone(),
            ingredient_name: record.primary_name.clone(),
            category: record.category,
            max_concentration: record.max_concentration,
            conditions: record.conditions.clone(),
            citation: record.citation.clone(),
        }
    }
}

#[derive(Serialize)]
struct SnapshotContent<'a> {
    jurisdiction: &'a JurisdictionCode,
    version: &'a str,
    published_at: Option<NaiveDate>,
    clauses: Vec<&'a RuleClause>,
}

#[derive(Clone, Serialize, Deserialize)]
struct SnapshotWire {
    jurisdiction: JurisdictionCode,
    version: String,
    #[serde(default)]
    published_at: Option<NaiveDate>,
    clauses: Vec<RuleClause>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    digest: Option<ContentDigest>,
}

/// An immutable, content-addressed rule set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "SnapshotWire", try_from = "SnapshotWire")]
pub struct Snapshot {
    jurisdiction: JurisdictionCode,
    version: String,
    published_at: Option<NaiveDate>,
    clauses: BTreeMap<String, RuleClause>,
    digest: ContentDigest,
}

fn compute_digest(
    jurisdiction: &JurisdictionCode,
    version: &str,
    published_at: Option<NaiveDate>,
    clauses: &BTreeMap<String, RuleClause>,
) -> DiffResult<ContentDigest> {
    let content = SnapshotContent {
        jurisdiction,
        version,
        published_at,
        clauses: clauses.values().collect(),
    };
    Ok(sha256_digest(&CanonicalBytes::new(&content)?))
}

impl Snapshot {
    /// Build a snapshot.
    ///
    /// # Errors
    ///
    /// [`DiffError::DuplicateClause`] if two clauses share an id.
    pub fn new(
        jurisdiction: JurisdictionCode,
        version: impl Into<String>,
        published_at: Option<NaiveDate>,
        clauses: impl IntoIterator<Item = RuleClause>,
    ) -> DiffResult<Self> {
        let version = version.into();
        let mut keyed = BTreeMap::new();
        for clause in clauses {
            if keyed.contains_key(&clause.clause_id) {
                return Err(DiffError::DuplicateClause {
                    clause_id: clause.clause_id,
                    version,
                });
            }
            keyed.insert(clause.clause_id.clone(), clause);
        }
        let digest = compute_digest(&jurisdiction, &version, published_at, &keyed)?;
        tracing::debug!(
            jurisdiction = %jurisdiction,
            version = %version,
            clauses = keyed.len(),
            digest = %digest,
            "built snapshot"
        );
        Ok(Self {
            jurisdiction,
            version,
            published_at,
            clauses: keyed,
            digest,
        })
    }

    /// Snapshot of one jurisdiction's source records.
    ///
    /// Records of other jurisdictions and synthesized Not-Specified records
    /// are skipped. When several records map to one clause id, the first
    /// wins.
    pub fn from_records<'a>(
        jurisdiction: JurisdictionCode,
        version: impl Into<String>,
        published_at: Option<NaiveDate>,
        records: impl IntoIterator<Item = &'a RegulatoryRecord>,
    ) -> DiffResult<Self> {
        let mut clauses: BTreeMap<String, RuleClause> = BTreeMap::new();
        for record in records {
            if record.jurisdiction != jurisdiction || record.provenance == Provenance::Backfilled {
                continue;
            }
            let clause = RuleClause::from_record(record);
            clauses.entry(clause.clause_id.clone()).or_insert(clause);
        }
        Self::new(jurisdiction, version, published_at, clauses.into_values())
    }

    /// Jurisdiction.
    pub fn jurisdiction(&self) -> &JurisdictionCode {
        &self.jurisdiction
    }

    /// Version label.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Publication date.
    pub fn published_at(&self) -> Option<NaiveDate> {
        self.published_at
    }

    /// Clauses in id order.
    pub fn clauses(&self) -> impl Iterator<Item = &RuleClause> {
        self.clauses.values()
    }

    /// Look up a clause.
    pub fn clause(&self, clause_id: &str) -> Option<&RuleClause> {
        self.clauses.get(clause_id)
    }

    /// Number of clauses.
    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    /// Whether the snapshot has no clauses.
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Content digest.
    pub fn digest(&self) -> ContentDigest {
        self.digest
    }
}

impl From<Snapshot> for SnapshotWire {
    fn from(s: Snapshot) -> Self {
        Self {
            jurisdiction: s.jurisdiction,
            version: s.version,
            published_at: s.published_at,
            clauses: s.clauses.into_values().collect(),
            digest: Some(s.digest),
        }
    }
}

impl TryFrom<SnapshotWire> for Snapshot {
    type Error = DiffError;

    fn try_from(wire: SnapshotWire) -> Result<Self, Self::Error> {
        let recorded = wire.digest;
        let snapshot = Snapshot::new(wire.jurisdiction, wire.version, wire.published_at, wire.clauses)?;
        match recorded {
            Some(d) if d != snapshot.digest => Err(DiffError::DigestMismatch {
                recorded: d.to_string(),
                computed: snapshot.digest.to_string(),
            }),
            _ => Ok(snapshot),
        }
    }
}
