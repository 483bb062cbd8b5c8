//! # Ingredient Reference Data
//!
//! Chemical families the identity resolver may cross-reference, and the
//! vocabulary its family patterns are built from. Family links never merge
//! identities; they record that, for example, Sodium Benzoate and Benzoic
//! Acid belong to the same family.
//!
//! ```yaml
//! families:
//!   - id: benzoates
//!     parent: Benzoic Acid
//!     registry_number: 65-85-0
//!     relations: [salt, ester]
//!   - id: polyethylene-glycols
//!     parent: PEG
//!     relations: [polymer]
//! rules:
//!   salt_cations: [sodium, potassium, calcium]
//!   ester_groups: [methyl, ethyl, propyl, butyl]
//!   polymer_synonyms:
//!     polyethylene glycol: peg
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;

use cosreg_core::{normalize_name, RegistryNumber};
use serde::{Deserialize, Serialize};

use crate::error::{PackError, PackResult};
use crate::parser::load_typed;

/// How a member relates to its family's parent compound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FamilyRelation {
    /// The parent compound itself.
    Parent,
    /// A salt of the parent acid (`sodium benzoate` of `benzoic acid`).
    Salt,
    /// An ester of the parent acid (`methyl benzoate`).
    Ester,
    /// A polymer-weight variant (`PEG-40` of `PEG`).
    Polymer,
}

impl fmt::Display for FamilyRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Parent => "parent",
            Self::Salt => "salt",
            Self::Ester => "ester",
            Self::Polymer => "polymer",
        })
    }
}

/// One registered family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyDefinition {
    /// Stable family identifier.
    pub id: String,
    /// Parent compound name (`Benzoic Acid`, `PEG`).
    pub parent: String,
    /// Registry number of the parent, when it has one.
    #[serde(default)]
    pub registry_number: Option<RegistryNumber>,
    /// Which derivative relations this family admits.
    #[serde(default)]
    pub relations: BTreeSet<FamilyRelation>,
}

impl FamilyDefinition {
    /// Normalized parent name.
    pub fn parent_key(&self) -> String {
        normalize_name(&self.parent)
    }

    /// Whether the family admits members related by `relation`. The parent
    /// relation is always admitted.
    pub fn admits(&self, relation: FamilyRelation) -> bool {
        relation == FamilyRelation::Parent || self.relations.contains(&relation)
    }
}

fn default_salt_cations() -> Vec<String> {
    ["sodium", "potassium", "calcium", "magnesium", "ammonium", "zinc"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_ester_groups() -> Vec<String> {
    ["methyl", "ethyl", "propyl", "butyl", "isopropyl", "isobutyl", "benzyl"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_polymer_synonyms() -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    map.insert("polyethylene glycol".to_string(), "peg".to_string());
    map
}

/// Vocabulary the family patterns are built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FamilyRules {
    /// Cation words that mark a salt (`sodium benzoate`).
    pub salt_cations: Vec<String>,
    /// Alkyl words that mark an ester (`methyl benzoate`).
    pub ester_groups: Vec<String>,
    /// Polymer base synonyms, long form → short form.
    pub polymer_synonyms: BTreeMap<String, String>,
}

impl Default for FamilyRules {
    fn default() -> Self {
        Self {
            salt_cations: default_salt_cations(),
            ester_groups: default_ester_groups(),
            polymer_synonyms: default_polymer_synonyms(),
        }
    }
}

/// Ingredient family reference table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceTable {
    #[serde(default)]
    families: Vec<FamilyDefinition>,
    #[serde(default)]
    rules: FamilyRules,
}

impl ReferenceTable {
    /// Build a table from families, with default rules.
    pub fn new(families: Vec<FamilyDefinition>) -> PackResult<Self> {
        let table = Self {
            families,
            rules: FamilyRules::default(),
        };
        table.validate()?;
        Ok(table)
    }

    /// Replace the pattern vocabulary.
    pub fn with_rules(mut self, rules: FamilyRules) -> Self {
        self.rules = rules;
        self
    }

    /// Load and validate a reference table from YAML or JSON.
    pub fn load(path: &Path) -> PackResult<Self> {
        let table: Self = load_typed(path)?;
        table.validate()?;
        Ok(table)
    }

    /// Reject blank or duplicate family ids and duplicate parents.
    pub fn validate(&self) -> PackResult<()> {
        let mut ids = BTreeSet::new();
        let mut parents = BTreeSet::new();
        for family in &self.families {
            let invalid = |detail: &str| PackError::InvalidFamily {
                id: family.id.clone(),
                detail: detail.to_string(),
            };
            if family.id.trim().is_empty() {
                return Err(invalid("blank family id"));
            }
            if family.parent_key().is_empty() {
                return Err(invalid("blank parent name"));
            }
            if !ids.insert(family.id.clone()) {
                return Err(invalid("duplicate family id"));
            }
            if !parents.insert(family.parent_key()) {
                return Err(invalid("parent already registered by another family"));
            }
        }
        Ok(())
    }

    /// Registered families.
    pub fn families(&self) -> &[FamilyDefinition] {
        &self.families
    }

    /// Pattern vocabulary.
    pub fn rules(&self) -> &FamilyRules {
        &self.rules
    }

    /// Family whose normalized parent name equals `parent_key`.
    pub fn family_by_parent(&self, parent_key: &str) -> Option<&FamilyDefinition> {
        self.families.iter().find(|f| f.parent_key() == parent_key)
    }
}
