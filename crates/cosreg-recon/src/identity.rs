//! # Identity Resolution
//!
//! Decides which real-world ingredient each validated record refers to.
//! Records are resolved strictly in input order against an index that grows
//! as the pass proceeds. Paths, first match wins:
//!
//! 1. **Registry number.** Same normalized number, same identity.
//! 2. **Exact name.** Normalized primary or alternate name already indexed,
//!    unless the indexed identity carries a different registry number.
//! 3. **Fuzzy name.** Token-sort similarity against every indexed name.
//!    Identities with a conflicting registry number are not candidates. A
//!    unique best candidate at or above the threshold is accepted; a
//!    runner-up within the tie margin makes the match ambiguous.
//! 4. **Mint.** A new identity, keyed by registry number when present. Its
//!    names are classified against the family reference.
//!
//! Ambiguous fuzzy matches, and near misses between the review floor and
//! the threshold, mint a separate identity flagged for review rather than
//! guessing. The index lives for one run.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use cosreg_core::{normalize_name, Category, IngredientId, JurisdictionCode, RegistryNumber, ValidatedRecord};
use cosreg_pack::MatchingConfig;
use serde::{Deserialize, Serialize};

use crate::family::{FamilyLink, FamilyReference};
use crate::similarity::token_sort_similarity;

/// How a record was matched to its identity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "path", rename_all = "snake_case")]
pub enum MatchPath {
    /// Same registry number.
    RegistryNumber,
    /// Same normalized name.
    ExactName,
    /// Fuzzy name match with the given similarity.
    FuzzyName {
        /// Similarity score.
        score: f64,
    },
    /// No match; a new identity was minted.
    Minted,
}

impl fmt::Display for MatchPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RegistryNumber => f.write_str("registry_number"),
            Self::ExactName => f.write_str("exact_name"),
            Self::FuzzyName { score } => write!(f, "fuzzy_name({score:.3})"),
            Self::Minted => f.write_str("minted"),
        }
    }
}

/// Outcome of resolving one record.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// Identity the record belongs to.
    pub ingredient: IngredientId,
    /// Path that produced it.
    pub path: MatchPath,
    /// Set when the identity was minted pending review.
    pub review: Option<ReviewReason>,
}

/// Why a record was surfaced for manual review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewReason {
    /// Two or more candidates scored within the tie margin.
    AmbiguousMatch,
    /// The best candidate scored between the review floor and the threshold.
    BelowThreshold,
}

/// A fuzzy candidate considered for a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Candidate identity.
    pub ingredient: IngredientId,
    /// Best-scoring indexed name of the candidate.
    pub name: String,
    /// Similarity score.
    pub score: f64,
}

/// A record whose identity could not be decided automatically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewEntry {
    /// Identity minted for the record.
    pub ingredient: IngredientId,
    /// Record primary name.
    pub primary_name: String,
    /// Source jurisdiction.
    pub jurisdiction: JurisdictionCode,
    /// Source category.
    pub category: Category,
    /// Why review is needed.
    pub reason: ReviewReason,
    /// Competing candidates, best first.
    pub candidates: Vec<Candidate>,
}

/// Everything known about one identity after resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityEntry {
    /// Identity key.
    pub ingredient: IngredientId,
    /// Primary name of the first record resolved to the identity.
    pub primary_name: String,
    /// Registry number, if any record carried one.
    pub registry_number: Option<RegistryNumber>,
    /// Every normalized name indexed for the identity.
    pub names: BTreeSet<String>,
    /// Family memberships.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub families: Vec<FamilyLink>,
    /// Whether resolution of the identity was ambiguous or low-confidence.
    #[serde(default)]
    pub needs_review: bool,
}

/// Name and registry lookups over minted identities.
#[derive(Debug, Clone, Default)]
pub struct IdentityIndex {
    entries: BTreeMap<IngredientId, IdentityEntry>,
    by_registry: BTreeMap<RegistryNumber, IngredientId>,
    by_name: BTreeMap<String, IngredientId>,
}

impl IdentityIndex {
    /// Empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of identities.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no identity has been minted.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up an identity.
    pub fn get(&self, id: &IngredientId) -> Option<&IdentityEntry> {
        self.entries.get(id)
    }

    fn index_names(&mut self, id: &IngredientId, names: &[String]) {
        for name in names {
            self.by_name.entry(name.clone()).or_insert_with(|| id.clone());
            if let Some(entry) = self.entries.get_mut(id) {
                entry.names.insert(name.clone());
            }
        }
    }

    fn attach_registry(&mut self, id: &IngredientId, number: &RegistryNumber) {
        if let Some(entry) = self.entries.get_mut(id) {
            if entry.registry_number.is_none() {
                entry.registry_number = Some(number.clone());
                self.by_registry
                    .entry(number.clone())
                    .or_insert_with(|| id.clone());
            }
        }
    }

    fn registry_conflicts(&self, id: &IngredientId, number: Option<&RegistryNumber>) -> bool {
        match (number, self.entries.get(id).and_then(|e| e.registry_number.as_ref())) {
            (Some(a), Some(b)) => a != b,
            _ => false,
        }
    }
}

/// Identity index plus review findings, after resolution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IdentityRegistry {
    /// Identities by key.
    pub identities: BTreeMap<IngredientId, IdentityEntry>,
    /// Records surfaced for review, in input order.
    pub review: Vec<ReviewEntry>,
}

impl IdentityRegistry {
    /// Identities sharing at least one family with `id`, excluding `id`.
    pub fn related(&self, id: &IngredientId) -> Vec<&IngredientId> {
        let Some(entry) = self.identities.get(id) else {
            return Vec::new();
        };
        let families: BTreeSet<&str> = entry.families.iter().map(|l| l.family_id.as_str()).collect();
        self.identities
            .values()
            .filter(|other| other.ingredient != *id)
            .filter(|other| {
                other
                    .families
                    .iter()
                    .any(|l| families.contains(l.family_id.as_str()))
            })
            .map(|other| &other.ingredient)
            .collect()
    }

    /// Number of identities flagged for review.
    pub fn needs_review_count(&self) -> usize {
        self.identities.values().filter(|e| e.needs_review).count()
    }

    /// Total family links across identities.
    pub fn family_link_count(&self) -> usize {
        self.identities.values().map(|e| e.families.len()).sum()
    }
}

/// Sequential identity resolver.
pub struct IdentityResolver<'a> {
    matching: MatchingConfig,
    families: &'a dyn FamilyReference,
    index: IdentityIndex,
    review: Vec<ReviewEntry>,
}

fn record_names(record: &ValidatedRecord) -> Vec<String> {
    let mut names = vec![normalize_name(&record.primary_name)];
    for alt in &record.alternate_names {
        let key = normalize_name(alt);
        if !key.is_empty() && !names.contains(&key) {
            names.push(key);
        }
    }
    names
}

enum Fuzzy {
    Accepted(IngredientId, f64),
    Review(ReviewReason, Vec<Candidate>),
    NoMatch,
}

impl<'a> IdentityResolver<'a> {
    /// Resolver with an empty index.
    pub fn new(matching: MatchingConfig, families: &'a dyn FamilyReference) -> Self {
        Self {
            matching,
            families,
            index: IdentityIndex::new(),
            review: Vec::new(),
        }
    }

    /// Read access to the index built so far.
    pub fn index(&self) -> &IdentityIndex {
        &self.index
    }

    /// Resolve one record, updating the index.
    pub fn resolve(&mut self, record: &ValidatedRecord) -> Resolution {
        let names = record_names(record);
        let registry = record.registry_number.as_ref();

        if let Some(id) = registry.and_then(|rn| self.index.by_registry.get(rn)).cloned() {
            self.index.index_names(&id, &names);
            return self.resolved(record, id, MatchPath::RegistryNumber);
        }

        let exact = names
            .iter()
            .filter_map(|n| self.index.by_name.get(n))
            .find(|id| !self.index.registry_conflicts(id, registry))
            .cloned();
        if let Some(id) = exact {
            if let Some(rn) = registry {
                self.index.attach_registry(&id, rn);
            }
            self.index.index_names(&id, &names);
            return self.resolved(record, id, MatchPath::ExactName);
        }

        match self.fuzzy(&names, registry) {
            Fuzzy::Accepted(id, score) => {
                if let Some(rn) = registry {
                    self.index.attach_registry(&id, rn);
                }
                self.index.index_names(&id, &names);
                self.resolved(record, id, MatchPath::FuzzyName { score })
            }
            Fuzzy::Review(reason, candidates) => {
                let id = self.mint(record, &names, true);
                tracing::warn!(
                    ingredient = %id,
                    name = %record.primary_name,
                    jurisdiction = %record.jurisdiction,
                    reason = ?reason,
                    candidates = candidates.len(),
                    "identity needs review"
                );
                self.review.push(ReviewEntry {
                    ingredient: id.clone(),
                    primary_name: record.primary_name.clone(),
                    jurisdiction: record.jurisdiction.clone(),
                    category: record.category,
                    reason,
                    candidates,
                });
                let mut resolution = self.resolved(record, id, MatchPath::Minted);
                resolution.review = Some(reason);
                resolution
            }
            Fuzzy::NoMatch => {
                let id = self.mint(record, &names, false);
                self.resolved(record, id, MatchPath::Minted)
            }
        }
    }

    fn resolved(&self, record: &ValidatedRecord, ingredient: IngredientId, path: MatchPath) -> Resolution {
        tracing::debug!(
            ingredient = %ingredient,
            name = %record.primary_name,
            jurisdiction = %record.jurisdiction,
            category = %record.category,
            path = %path,
            "resolved identity"
        );
        Resolution {
            ingredient,
            path,
            review: None,
        }
    }

    fn fuzzy(&self, names: &[String], registry: Option<&RegistryNumber>) -> Fuzzy {
        let mut best: BTreeMap<&IngredientId, (f64, &str)> = BTreeMap::new();
        for (indexed, id) in &self.index.by_name {
            if self.index.registry_conflicts(id, registry) {
                continue;
            }
            let score = names
                .iter()
                .map(|n| token_sort_similarity(n, indexed))
                .fold(0.0_f64, f64::max);
            let slot = best.entry(id).or_insert((score, indexed.as_str()));
            if score > slot.0 {
                *slot = (score, indexed.as_str());
            }
        }

        let mut ranked: Vec<Candidate> = best
            .into_iter()
            .filter(|(_, (score, _))| *score >= self.matching.review_floor)
            .map(|(id, (score, name))| Candidate {
                ingredient: id.clone(),
                name: name.to_string(),
                score,
            })
            .collect();
        ranked.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.ingredient.cmp(&b.ingredient))
        });

        let Some(top) = ranked.first() else {
            return Fuzzy::NoMatch;
        };
        if top.score < self.matching.fuzzy_threshold {
            return Fuzzy::Review(ReviewReason::BelowThreshold, ranked);
        }
        let tied = ranked
            .get(1)
            .is_some_and(|second| top.score - second.score <= self.matching.tie_margin);
        if tied {
            let cutoff = top.score - self.matching.tie_margin;
            ranked.retain(|c| c.score >= cutoff);
            return Fuzzy::Review(ReviewReason::AmbiguousMatch, ranked);
        }
        Fuzzy::Accepted(top.ingredient.clone(), top.score)
    }

    fn mint(&mut self, record: &ValidatedRecord, names: &[String], needs_review: bool) -> IngredientId {
        let base = match &record.registry_number {
            Some(rn) => IngredientId::from_registry(rn),
            None => IngredientId::from_name(&record.primary_name),
        };
        let mut id = base.clone();
        let mut n = 2;
        while self.index.entries.contains_key(&id) {
            id = IngredientId::from_name(&format!("{} #{n}", record.primary_name));
            n += 1;
        }
        if id != base {
            tracing::warn!(ingredient = %id, collided_with = %base, "identity key collision");
        }

        let mut families = BTreeSet::new();
        for name in names {
            families.extend(self.families.classify(name));
        }
        let families: Vec<FamilyLink> = families.into_iter().collect();
        if !families.is_empty() {
            tracing::debug!(ingredient = %id, families = ?families, "family cross-reference");
        }

        self.index.entries.insert(
            id.clone(),
            IdentityEntry {
                ingredient: id.clone(),
                primary_name: record.primary_name.clone(),
                registry_number: record.registry_number.clone(),
                names: BTreeSet::new(),
                families,
                needs_review,
            },
        );
        if let Some(rn) = &record.registry_number {
            self.index.by_registry.insert(rn.clone(), id.clone());
        }
        self.index.index_names(&id, names);
        id
    }

    /// Finish the pass, keeping identities and review findings.
    pub fn finish(self) -> IdentityRegistry {
        IdentityRegistry {
            identities: self.index.entries,
            review: self.review,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::family::{FamilyMatcher, NoFamilies};
    use cosreg_core::{RecordContext, RecordInput};
    use cosreg_pack::{FamilyDefinition, FamilyRelation, ReferenceTable};

    fn record(name: &str, cas: Option<&str>, alts: &[&str]) -> ValidatedRecord {
        let input = RecordInput {
            primary_name: Some(name.to_string()),
            registry_number: cas.map(str::to_string),
            alternate_names: alts.iter().map(|a| a.to_string()).collect(),
            ..Default::default()
        };
        let ctx = RecordContext::new(JurisdictionCode::new("EU").unwrap(), Category::Prohibited);
        ValidatedRecord::from_input(&input, &ctx).unwrap().0
    }

    fn resolver() -> IdentityResolver<'static> {
        IdentityResolver::new(MatchingConfig::default(), &NoFamilies)
    }

    #[test]
    fn same_registry_number_same_identity() {
        let mut r = resolver();
        let a = r.resolve(&record("Formaldehyde", Some("50-00-0"), &[]));
        let b = r.resolve(&record("Formalin", Some("50-00-0"), &[]));
        assert_eq!(a.ingredient, b.ingredient);
        assert_eq!(a.path, MatchPath::Minted);
        assert_eq!(b.path, MatchPath::RegistryNumber);
        assert_eq!(a.ingredient.as_str(), "cas:50-00-0");
    }

    #[test]
    fn different_registry_numbers_never_merge() {
        let mut r = resolver();
        let a = r.resolve(&record("Benzoic Acid", Some("65-85-0"), &[]));
        let b = r.resolve(&record("Benzoic Acid", Some("532-32-1"), &[]));
        assert_ne!(a.ingredient, b.ingredient);
    }

    #[test]
    fn exact_name_match_is_case_and_space_insensitive() {
        let mut r = resolver();
        let a = r.resolve(&record("Salicylic Acid", None, &[]));
        let b = r.resolve(&record("  SALICYLIC   acid ", None, &[]));
        assert_eq!(a.ingredient, b.ingredient);
        assert_eq!(b.path, MatchPath::ExactName);
    }

    #[test]
    fn name_match_attaches_registry_number() {
        let mut r = resolver();
        let a = r.resolve(&record("Salicylic Acid", None, &[]));
        let b = r.resolve(&record("Salicylic Acid", Some("69-72-7"), &[]));
        let c = r.resolve(&record("2-Hydroxybenzoic acid", Some("69-72-7"), &[]));
        assert_eq!(a.ingredient, b.ingredient);
        assert_eq!(c.ingredient, a.ingredient);
        assert_eq!(c.path, MatchPath::RegistryNumber);
        assert_eq!(
            r.index().get(&a.ingredient).unwrap().registry_number.as_ref().unwrap().as_str(),
            "69-72-7"
        );
    }

    #[test]
    fn alternate_names_are_matched() {
        let mut r = resolver();
        let a = r.resolve(&record("Benzoic Acid", None, &["安息香酸"]));
        let b = r.resolve(&record("安息香酸", None, &[]));
        assert_eq!(a.ingredient, b.ingredient);
    }

    #[test]
    fn fuzzy_match_above_threshold() {
        let mut r = resolver();
        let a = r.resolve(&record("Methylparaben", None, &[]));
        let b = r.resolve(&record("Methyl Paraben", None, &[]));
        assert_eq!(a.ingredient, b.ingredient);
        assert!(matches!(b.path, MatchPath::FuzzyName { score } if score >= 0.90));
    }

    #[test]
    fn fuzzy_tie_is_flagged_not_guessed() {
        let matching = MatchingConfig {
            review_floor: 0.85,
            ..MatchingConfig::default()
        };
        let mut r = IdentityResolver::new(matching, &NoFamilies);
        let a = r.resolve(&record("Ethyl Lactate", None, &[]));
        let b = r.resolve(&record("Ethyl Loctite", None, &[]));
        assert_ne!(a.ingredient, b.ingredient);
        // one edit from both existing names
        let c = r.resolve(&record("Ethyl Lactite", None, &[]));
        assert_ne!(c.ingredient, a.ingredient);
        assert_ne!(c.ingredient, b.ingredient);
        assert_eq!(c.review, Some(ReviewReason::AmbiguousMatch));
        let registry = r.finish();
        let entry = registry
            .review
            .iter()
            .find(|e| e.ingredient == c.ingredient)
            .unwrap();
        assert_eq!(entry.reason, ReviewReason::AmbiguousMatch);
        assert_eq!(entry.candidates.len(), 2);
        assert!(registry.identities[&c.ingredient].needs_review);
    }

    #[test]
    fn near_miss_is_flagged_below_threshold() {
        let mut r = resolver();
        r.resolve(&record("Cetearyl Alcohol", None, &[]));
        let b = r.resolve(&record("Cetyl Alcohol", None, &[]));
        let registry = r.finish();
        assert_eq!(registry.review.len(), 1);
        assert_eq!(registry.review[0].ingredient, b.ingredient);
        assert_eq!(registry.review[0].reason, ReviewReason::BelowThreshold);
        assert_eq!(registry.needs_review_count(), 1);
    }

    #[test]
    fn fuzzy_never_crosses_registry_numbers() {
        let mut r = resolver();
        let a = r.resolve(&record("Methylparaben", Some("99-76-3"), &[]));
        let b = r.resolve(&record("Methyl Paraben", Some("120-47-8"), &[]));
        assert_ne!(a.ingredient, b.ingredient);
    }

    #[test]
    fn resolution_is_idempotent() {
        let inputs = vec![
            record("Formaldehyde", Some("50-00-0"), &[]),
            record("Methylparaben", None, &[]),
            record("Methyl Paraben", None, &[]),
            record("Formalin", Some("50-00-0"), &[]),
            record("Water", None, &["Aqua"]),
        ];
        let run = || {
            let mut r = resolver();
            inputs.iter().map(|i| r.resolve(i).ingredient).collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn minting_records_family_links() {
        let table = ReferenceTable::new(vec![FamilyDefinition {
            id: "benzoates".to_string(),
            parent: "Benzoic Acid".to_string(),
            registry_number: None,
            relations: [FamilyRelation::Salt].into_iter().collect(),
        }])
        .unwrap();
        let matcher = FamilyMatcher::new(&table).unwrap();
        let mut r = IdentityResolver::new(MatchingConfig::default(), &matcher);
        let acid = r.resolve(&record("Benzoic Acid", Some("65-85-0"), &[]));
        let salt = r.resolve(&record("Sodium Benzoate", Some("532-32-1"), &[]));
        let other = r.resolve(&record("Triclosan", Some("3380-34-5"), &[]));
        assert_ne!(acid.ingredient, salt.ingredient);
        let registry = r.finish();
        assert_eq!(registry.related(&salt.ingredient), vec![&acid.ingredient]);
        assert_eq!(registry.related(&acid.ingredient), vec![&salt.ingredient]);
        assert!(registry.related(&other.ingredient).is_empty());
        assert_eq!(registry.family_link_count(), 2);
    }
}
