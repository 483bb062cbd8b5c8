//! # Family Cross-References
//!
//! When identity resolution mints a new identity, its names are checked
//! against registered chemical families. A hit records a non-owning
//! [`FamilyLink`]; identities are never merged on family grounds.
//!
//! The check goes through the [`FamilyReference`] trait so the heuristics
//! are replaceable. [`FamilyMatcher`] is the reference-table implementation:
//!
//! | Pattern | Example | Base |
//! |---|---|---|
//! | `<cation> <stem>ate` | sodium benzoate | benzoic acid |
//! | `<stem> <cation> salt` | benzoic acid sodium salt | benzoic acid |
//! | `<alkyl> <stem>ate` | methyl benzoate | benzoic acid |
//! | `<base>[-]<n>` | PEG-40 | peg |
//!
//! The base is then looked up among registered family parents.

use std::collections::BTreeSet;

use cosreg_pack::{FamilyRelation, ReferenceTable};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{ReconError, ReconResult};

/// Membership of an identity in a registered family.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FamilyLink {
    /// Family identifier from the reference table.
    pub family_id: String,
    /// How the identity relates to the family parent.
    pub relation: FamilyRelation,
}

/// Source of family cross-references.
pub trait FamilyReference {
    /// Families a normalized ingredient name belongs to.
    fn classify(&self, normalized_name: &str) -> Vec<FamilyLink>;
}

/// A reference that knows no families.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFamilies;

impl FamilyReference for NoFamilies {
    fn classify(&self, _normalized_name: &str) -> Vec<FamilyLink> {
        Vec::new()
    }
}

/// Pattern-based family detection over a [`ReferenceTable`].
#[derive(Debug)]
pub struct FamilyMatcher<'a> {
    table: &'a ReferenceTable,
    salt_prefix: Option<Regex>,
    salt_suffix: Option<Regex>,
    ester_prefix: Option<Regex>,
    polymer: Regex,
}

fn alternation(words: &[String]) -> Option<String> {
    let escaped: Vec<String> = words
        .iter()
        .map(|w| w.trim().to_lowercase())
        .filter(|w| !w.is_empty())
        .map(|w| regex::escape(&w))
        .collect();
    (!escaped.is_empty()).then(|| escaped.join("|"))
}

fn compile(pattern: &str) -> ReconResult<Regex> {
    Regex::new(pattern).map_err(|e| ReconError::FamilyRules {
        detail: e.to_string(),
    })
}

impl<'a> FamilyMatcher<'a> {
    /// Compile the table's vocabulary into patterns.
    ///
    /// # Errors
    ///
    /// [`ReconError::FamilyRules`] if a pattern fails to compile.
    pub fn new(table: &'a ReferenceTable) -> ReconResult<Self> {
        let rules = table.rules();
        let salt_prefix = alternation(&rules.salt_cations)
            .map(|cations| compile(&format!(r"^(?:di|tri|tetra)?(?:{cations})\s+(\S+?)ate$")))
            .transpose()?;
        let salt_suffix = alternation(&rules.salt_cations)
            .map(|cations| compile(&format!(r"^(.+?)\s+(?:di|tri|tetra)?(?:{cations})\s+salt$")))
            .transpose()?;
        let ester_prefix = alternation(&rules.ester_groups)
            .map(|groups| compile(&format!(r"^(?:{groups})\s+(\S+?)ate$")))
            .transpose()?;
        let polymer = compile(r"^(.*[a-z].*?)[\s-]*(\d+)$")?;
        Ok(Self {
            table,
            salt_prefix,
            salt_suffix,
            ester_prefix,
            polymer,
        })
    }

    fn polymer_canonical(&self, base: &str) -> String {
        let synonyms = &self.table.rules().polymer_synonyms;
        synonyms
            .get(base)
            .cloned()
            .unwrap_or_else(|| base.to_string())
    }

    /// Candidate `(relation, base)` pairs for a normalized name.
    fn candidates(&self, name: &str) -> Vec<(FamilyRelation, String)> {
        let mut out = vec![(FamilyRelation::Parent, name.to_string())];
        if let Some(caps) = self.salt_prefix.as_ref().and_then(|re| re.captures(name)) {
            out.push((FamilyRelation::Salt, format!("{}ic acid", &caps[1])));
        }
        if let Some(caps) = self.salt_suffix.as_ref().and_then(|re| re.captures(name)) {
            out.push((FamilyRelation::Salt, caps[1].to_string()));
        }
        if let Some(caps) = self.ester_prefix.as_ref().and_then(|re| re.captures(name)) {
            out.push((FamilyRelation::Ester, format!("{}ic acid", &caps[1])));
        }
        if let Some(caps) = self.polymer.captures(name) {
            out.push((FamilyRelation::Polymer, caps[1].trim().to_string()));
        }
        out
    }
}

impl FamilyReference for FamilyMatcher<'_> {
    fn classify(&self, normalized_name: &str) -> Vec<FamilyLink> {
        let mut links = BTreeSet::new();
        for (relation, base) in self.candidates(normalized_name) {
            let base = if matches!(relation, FamilyRelation::Parent | FamilyRelation::Polymer) {
                self.polymer_canonical(&base)
            } else {
                base
            };
            for family in self.table.families() {
                let parent = self.polymer_canonical(&family.parent_key());
                if parent == base && family.admits(relation) {
                    links.insert(FamilyLink {
                        family_id: family.id.clone(),
                        relation,
                    });
                }
            }
        }
        links.into_iter().collect()
    }
}
