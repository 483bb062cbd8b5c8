//! # Engine Configuration
//!
//! [`EngineConfig`] gathers everything a reconciliation run depends on: the
//! ordered list of jurisdiction packs, identity-matching thresholds, the
//! same-status tie-break policy, and the ingredient reference table.
//!
//! It can be built in code or loaded from a manifest whose relative paths
//! resolve against the manifest's directory:
//!
//! ```yaml
//! matching:
//!   fuzzy_threshold: 0.90
//!   review_floor: 0.80
//!   tie_margin: 0.01
//! tie_break: general_table_first
//! packs:
//!   - packs/eu.yaml
//!   - packs/cn.yaml
//! reference: reference.yaml
//! ```

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use cosreg_core::{Category, JurisdictionCode};
use serde::{Deserialize, Serialize};

use crate::error::{PackError, PackResult};
use crate::jurisdiction::JurisdictionPack;
use crate::parser::load_typed;
use crate::reference::ReferenceTable;

/// Default similarity at or above which a fuzzy name match is accepted.
pub const DEFAULT_FUZZY_THRESHOLD: f64 = 0.90;
/// Default similarity at or above which a rejected fuzzy match is still
/// surfaced for review.
pub const DEFAULT_REVIEW_FLOOR: f64 = 0.80;
/// Default score gap under which two fuzzy candidates count as tied.
pub const DEFAULT_TIE_MARGIN: f64 = 0.01;

/// Identity-matching thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// Accept a fuzzy match at or above this similarity.
    pub fuzzy_threshold: f64,
    /// Surface near misses at or above this similarity for review.
    pub review_floor: f64,
    /// Runner-up candidates within this margin of the best make the match
    /// ambiguous.
    pub tie_margin: f64,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
            review_floor: DEFAULT_REVIEW_FLOOR,
            tie_margin: DEFAULT_TIE_MARGIN,
        }
    }
}

impl MatchingConfig {
    /// Check threshold ranges.
    pub fn validate(&self) -> PackResult<()> {
        let invalid = |setting: &str, detail: String| PackError::InvalidSetting {
            setting: setting.to_string(),
            detail,
        };
        if !(self.fuzzy_threshold > 0.0 && self.fuzzy_threshold <= 1.0) {
            return Err(invalid(
                "matching.fuzzy_threshold",
                format!("{} not in (0, 1]", self.fuzzy_threshold),
            ));
        }
        if !(self.review_floor >= 0.0 && self.review_floor <= self.fuzzy_threshold) {
            return Err(invalid(
                "matching.review_floor",
                format!(
                    "{} not in [0, fuzzy_threshold={}]",
                    self.review_floor, self.fuzzy_threshold
                ),
            ));
        }
        if !(self.tie_margin >= 0.0 && self.tie_margin < 1.0) {
            return Err(invalid(
                "matching.tie_margin",
                format!("{} not in [0, 1)", self.tie_margin),
            ));
        }
        Ok(())
    }
}

/// How records of equal status compete for authority within one
/// jurisdiction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TieBreakPolicy {
    /// A record from a general prohibited/restricted table beats one from a
    /// narrower table; otherwise the first-seen record wins.
    #[default]
    GeneralTableFirst,
    /// The first-seen record wins.
    FirstSeen,
}

impl fmt::Display for TieBreakPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::GeneralTableFirst => "general_table_first",
            Self::FirstSeen => "first_seen",
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
struct Manifest {
    #[serde(default)]
    matching: MatchingConfig,
    #[serde(default)]
    tie_break: TieBreakPolicy,
    packs: Vec<PathBuf>,
    #[serde(default)]
    reference: Option<PathBuf>,
}

/// Everything a reconciliation run is configured by.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Matching thresholds.
    pub matching: MatchingConfig,
    /// Same-status tie-break policy.
    pub tie_break: TieBreakPolicy,
    /// Ingredient family reference data.
    pub reference: ReferenceTable,
    jurisdictions: Vec<JurisdictionPack>,
}

impl EngineConfig {
    /// Build a configuration from packs, with default settings.
    ///
    /// # Errors
    ///
    /// Fails if any pack is invalid or two packs share a code.
    pub fn new(jurisdictions: Vec<JurisdictionPack>) -> PackResult<Self> {
        let config = Self {
            matching: MatchingConfig::default(),
            tie_break: TieBreakPolicy::default(),
            reference: ReferenceTable::default(),
            jurisdictions,
        };
        config.validate()?;
        Ok(config)
    }

    /// Replace the reference table.
    pub fn with_reference(mut self, reference: ReferenceTable) -> Self {
        self.reference = reference;
        self
    }

    /// Replace the tie-break policy.
    pub fn with_tie_break(mut self, policy: TieBreakPolicy) -> Self {
        self.tie_break = policy;
        self
    }

    /// Replace the matching thresholds.
    pub fn with_matching(mut self, matching: MatchingConfig) -> Self {
        self.matching = matching;
        self
    }

    /// Load a manifest and every file it references.
    pub fn load(path: &Path) -> PackResult<Self> {
        let manifest: Manifest = load_typed(path)?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        let jurisdictions = manifest
            .packs
            .iter()
            .map(|p| JurisdictionPack::load(&base.join(p)))
            .collect::<PackResult<Vec<_>>>()?;
        let reference = match &manifest.reference {
            Some(p) => ReferenceTable::load(&base.join(p))?,
            None => ReferenceTable::default(),
        };
        let config = Self {
            matching: manifest.matching,
            tie_break: manifest.tie_break,
            reference,
            jurisdictions,
        };
        config.validate()?;
        tracing::info!(
            jurisdictions = config.jurisdictions.len(),
            families = config.reference.families().len(),
            tie_break = %config.tie_break,
            "loaded engine configuration"
        );
        Ok(config)
    }

    /// Check every pack, the thresholds, the reference table, and that no
    /// jurisdiction is configured twice.
    pub fn validate(&self) -> PackResult<()> {
        self.matching.validate()?;
        self.reference.validate()?;
        let mut seen = BTreeSet::new();
        for pack in &self.jurisdictions {
            pack.validate()?;
            if !seen.insert(pack.code().clone()) {
                return Err(PackError::DuplicateJurisdiction {
                    code: pack.code().to_string(),
                });
            }
        }
        Ok(())
    }

    /// Configured jurisdictions, in configuration order.
    pub fn jurisdictions(&self) -> &[JurisdictionPack] {
        &self.jurisdictions
    }

    /// Look up a jurisdiction pack.
    pub fn jurisdiction(&self, code: &JurisdictionCode) -> Option<&JurisdictionPack> {
        self.jurisdictions.iter().find(|p| p.code() == code)
    }

    /// Whether `category` is defined for `code`.
    pub fn defines(&self, code: &JurisdictionCode, category: Category) -> bool {
        self.jurisdiction(code).is_some_and(|p| p.defines(category))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jurisdiction::CategoryProfile;
    use std::fs;

    fn pack(code: &str) -> JurisdictionPack {
        JurisdictionPack::new(JurisdictionCode::new(code).unwrap(), code)
            .with_category(Category::Prohibited, CategoryProfile::default())
    }

    #[test]
    fn defaults() {
        let config = EngineConfig::new(vec![pack("EU")]).unwrap();
        assert_eq!(config.matching.fuzzy_threshold, 0.90);
        assert_eq!(config.matching.review_floor, 0.80);
        assert_eq!(config.matching.tie_margin, 0.01);
        assert_eq!(config.tie_break, TieBreakPolicy::GeneralTableFirst);
    }

    #[test]
    fn duplicate_jurisdiction_rejected() {
        assert!(matches!(
            EngineConfig::new(vec![pack("EU"), pack("eu")]),
            Err(PackError::DuplicateJurisdiction { .. })
        ));
    }

    #[test]
    fn threshold_ranges_validated() {
        let bad = MatchingConfig {
            fuzzy_threshold: 1.5,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
        let floor_above = MatchingConfig {
            review_floor: 0.95,
            ..Default::default()
        };
        assert!(floor_above.validate().is_err());
        let nan = MatchingConfig {
            tie_margin: f64::NAN,
            ..Default::default()
        };
        assert!(nan.validate().is_err());
    }

    #[test]
    fn lookup_and_defines() {
        let config = EngineConfig::new(vec![pack("EU"), pack("CN")]).unwrap();
        let cn = JurisdictionCode::new("CN").unwrap();
        assert!(config.defines(&cn, Category::Prohibited));
        assert!(!config.defines(&cn, Category::Restricted));
        assert!(!config.defines(&JurisdictionCode::new("JP").unwrap(), Category::Prohibited));
        let order: Vec<&str> = config.jurisdictions().iter().map(|p| p.code().as_str()).collect();
        assert_eq!(order, vec!["EU", "CN"]);
    }

    #[test]
    fn loads_manifest_with_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("packs")).unwrap();
        fs::write(
            dir.path().join("packs/eu.yaml"),
            "code: EU\ncategories:\n  prohibited:\n  restricted:\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("reference.yaml"),
            "families:\n  - id: benzoates\n    parent: Benzoic Acid\n    relations: [salt, ester]\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("engine.yaml"),
            "matching:\n  fuzzy_threshold: 0.92\ntie_break: first_seen\npacks: [packs/eu.yaml]\nreference: reference.yaml\n",
        )
        .unwrap();

        let config = EngineConfig::load(&dir.path().join("engine.yaml")).unwrap();
        assert_eq!(config.matching.fuzzy_threshold, 0.92);
        assert_eq!(config.matching.review_floor, DEFAULT_REVIEW_FLOOR);
        assert_eq!(config.tie_break, TieBreakPolicy::FirstSeen);
        assert_eq!(config.jurisdictions().len(), 1);
        assert_eq!(config.reference.families().len(), 1);
    }

    #[test]
    fn missing_pack_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("engine.yaml"), "packs: [missing.yaml]\n").unwrap();
        assert!(matches!(
            EngineConfig::load(&dir.path().join("engine.yaml")),
            Err(PackError::FileNotFound { .. })
        ));
    }
}
