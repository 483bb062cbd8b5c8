//! # Jurisdiction Packs
//!
//! A [`JurisdictionPack`] is the machine-readable description of one market:
//! which categories its regulation defines, the legal basis of each, the
//! unit its lists quote concentrations in, and how its source columns map
//! onto canonical fields.
//!
//! ## File format
//!
//! ```yaml
//! code: JP
//! name: Japan
//! categories:
//!   prohibited:
//!     citation: "Standards for Cosmetics, Appendix 1"
//!   allowed_preservative:
//!     citation: "Standards for Cosmetics, Appendix 3"
//!     concentration_unit: percent
//! fields:
//!   common:
//!     primary_name: ["INCI名", "INCI Name"]
//!   allowed_preservative:
//!     max_concentration: ["配合上限 (g/100g)"]
//! ```
//!
//! Category keys accept the canonical names and the source table names
//! (`preservatives`, `whitelist`). A category absent from `categories` is
//! undefined for the jurisdiction: the engine neither accepts source tables
//! for it nor backfills it.

use std::collections::BTreeMap;
use std::path::Path;

use cosreg_core::{Category, ConcentrationUnit, JurisdictionCode, RecordContext};
use serde::{Deserialize, Serialize};

use crate::alias::AliasTable;
use crate::error::{PackError, PackResult};
use crate::parser::load_typed;

/// Key of the alias table shared by every category of a pack.
pub const COMMON_TABLE: &str = "common";

/// Per-category settings of a jurisdiction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryProfile {
    /// Legal basis applied to records that carry no citation of their own.
    pub citation: Option<String>,
    /// Unit the category's source list quotes concentrations in.
    pub concentration_unit: ConcentrationUnit,
}

/// On-disk shape of a pack, before category keys are resolved.
#[derive(Debug, Clone, Deserialize)]
struct PackFile {
    code: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    categories: BTreeMap<String, Option<CategoryProfile>>,
    #[serde(default)]
    fields: BTreeMap<String, AliasTable>,
}

/// Validated configuration for one jurisdiction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JurisdictionPack {
    code: JurisdictionCode,
    name: String,
    categories: BTreeMap<Category, CategoryProfile>,
    common_fields: AliasTable,
    category_fields: BTreeMap<Category, AliasTable>,
}

impl JurisdictionPack {
    /// Start a pack in code. Add categories with [`Self::with_category`].
    pub fn new(code: JurisdictionCode, name: impl Into<String>) -> Self {
        Self {
            code,
            name: name.into(),
            categories: BTreeMap::new(),
            common_fields: AliasTable::new(),
            category_fields: BTreeMap::new(),
        }
    }

    /// Define a category.
    pub fn with_category(mut self, category: Category, profile: CategoryProfile) -> Self {
        self.categories.insert(category, profile);
        self
    }

    /// Set the alias table shared by all categories.
    pub fn with_common_fields(mut self, table: AliasTable) -> Self {
        self.common_fields = table;
        self
    }

    /// Set a category-specific alias overlay.
    pub fn with_category_fields(mut self, category: Category, table: AliasTable) -> Self {
        self.category_fields.insert(category, table);
        self
    }

    /// Load and validate a pack from a YAML or JSON file.
    pub fn load(path: &Path) -> PackResult<Self> {
        let file: PackFile = load_typed(path)?;
        let pack = Self::from_file(file)?;
        pack.validate()?;
        tracing::info!(
            jurisdiction = %pack.code,
            categories = pack.categories.len(),
            path = %path.display(),
            "loaded jurisdiction pack"
        );
        Ok(pack)
    }

    /// Parse and validate a pack from YAML text.
    pub fn from_yaml_str(yaml: &str) -> PackResult<Self> {
        let file: PackFile = serde_yaml::from_str(yaml).map_err(|e| PackError::YamlParse {
            path: "<inline>".into(),
            source: e,
        })?;
        let pack = Self::from_file(file)?;
        pack.validate()?;
        Ok(pack)
    }

    fn from_file(file: PackFile) -> PackResult<Self> {
        let code = JurisdictionCode::new(&file.code)?;
        let resolve = |name: &str| -> PackResult<Category> {
            name.parse::<Category>().map_err(|_| PackError::UnknownCategory {
                jurisdiction: code.to_string(),
                name: name.to_string(),
            })
        };

        let mut categories = BTreeMap::new();
        for (name, profile) in file.categories {
            categories.insert(resolve(&name)?, profile.unwrap_or_default());
        }

        let mut common_fields = AliasTable::new();
        let mut category_fields = BTreeMap::new();
        for (name, table) in file.fields {
            if name == COMMON_TABLE {
                common_fields = table;
            } else {
                category_fields.insert(resolve(&name)?, table);
            }
        }

        Ok(Self {
            name: file.name.unwrap_or_else(|| code.to_string()),
            code,
            categories,
            common_fields,
            category_fields,
        })
    }

    /// Check structural invariants: at least one category, alias overlays
    /// only for defined categories, and conflict-free alias tables.
    pub fn validate(&self) -> PackResult<()> {
        let code = self.code.as_str();
        if self.categories.is_empty() {
            return Err(PackError::NoCategories {
                code: code.to_string(),
            });
        }
        self.common_fields.validate(code, COMMON_TABLE)?;
        for (category, table) in &self.category_fields {
            if !self.categories.contains_key(category) {
                return Err(PackError::AliasForUndefinedCategory {
                    jurisdiction: code.to_string(),
                    category: category.to_string(),
                });
            }
            table.validate(code, category.as_str())?;
        }
        for &category in self.categories.keys() {
            self.alias_table(category).validate(code, category.as_str())?;
        }
        Ok(())
    }

    /// Jurisdiction code.
    pub fn code(&self) -> &JurisdictionCode {
        &self.code
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Categories this jurisdiction defines, in category order.
    pub fn defined_categories(&self) -> impl Iterator<Item = Category> + '_ {
        self.categories.keys().copied()
    }

    /// Whether the jurisdiction defines `category`.
    pub fn defines(&self, category: Category) -> bool {
        self.categories.contains_key(&category)
    }

    /// Settings of a defined category.
    pub fn profile(&self, category: Category) -> Option<&CategoryProfile> {
        self.categories.get(&category)
    }

    /// Effective alias table for a category: common aliases, overlaid with
    /// the category's own, completed with canonical-name fallbacks.
    pub fn alias_table(&self, category: Category) -> AliasTable {
        let base = match self.category_fields.get(&category) {
            Some(overlay) => self.common_fields.overlay(overlay),
            None => self.common_fields.clone(),
        };
        base.with_canonical_fallbacks()
    }

    /// Validation context for records of a defined category.
    pub fn record_context(&self, category: Category) -> Option<RecordContext> {
        let profile = self.categories.get(&category)?;
        Some(RecordContext {
            jurisdiction: self.code.clone(),
            category,
            concentration_unit: profile.concentration_unit,
            default_citation: profile.citation.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alias::{CanonicalField, RawRecord};
    use std::io::Write;

    const JP: &str = r#"
code: jp
name: Japan
categories:
  prohibited:
    citation: "Appendix 1"
  restricted:
  preservatives:
    citation: "Appendix 3"
    concentration_unit: percent
fields:
  common:
    primary_name: ["INCI名", "INCI Name"]
    registry_number: ["CAS"]
  allowed_preservative:
    max_concentration: ["配合上限"]
"#;

    #[test]
    fn parses_categories_including_source_names() {
        let pack = JurisdictionPack::from_yaml_str(JP).unwrap();
        assert_eq!(pack.code().as_str(), "JP");
        assert_eq!(pack.name(), "Japan");
        let defined: Vec<Category> = pack.defined_categories().collect();
        assert_eq!(
            defined,
            vec![
                Category::Prohibited,
                Category::Restricted,
                Category::AllowedPreservative
            ]
        );
        assert!(!pack.defines(Category::AllowedColorant));
    }

    #[test]
    fn record_context_carries_citation_and_unit() {
        let pack = JurisdictionPack::from_yaml_str(JP).unwrap();
        let ctx = pack.record_context(Category::Prohibited).unwrap();
        assert_eq!(ctx.default_citation.as_deref(), Some("Appendix 1"));
        assert_eq!(ctx.concentration_unit, ConcentrationUnit::Percent);
        assert!(pack.record_context(Category::AllowedUvFilter).is_none());
        assert_eq!(
            pack.record_context(Category::Restricted).unwrap().default_citation,
            None
        );
    }

    #[test]
    fn alias_table_overlays_category_fields() {
        let pack = JurisdictionPack::from_yaml_str(JP).unwrap();
        let table = pack.alias_table(Category::AllowedPreservative);
        let raw = RawRecord::from_pairs([("INCI名", "Methylparaben"), ("配合上限", "0.4")]);
        let input = table.project(&raw);
        assert_eq!(input.primary_name.as_deref(), Some("Methylparaben"));
        assert_eq!(input.max_concentration.as_deref(), Some("0.4"));
        assert_eq!(
            pack.alias_table(Category::Prohibited)
                .aliases(CanonicalField::MaxConcentration),
            &["max_concentration".to_string()]
        );
    }

    #[test]
    fn unknown_category_is_rejected() {
        let yaml = "code: EU\ncategories:\n  fragrances:\n";
        assert!(matches!(
            JurisdictionPack::from_yaml_str(yaml),
            Err(PackError::UnknownCategory { .. })
        ));
    }

    #[test]
    fn aliases_for_undefined_category_are_rejected() {
        let yaml = "code: EU\ncategories:\n  prohibited:\nfields:\n  colorants:\n    primary_name: [Name]\n";
        assert!(matches!(
            JurisdictionPack::from_yaml_str(yaml),
            Err(PackError::AliasForUndefinedCategory { .. })
        ));
    }

    #[test]
    fn pack_without_categories_is_rejected() {
        assert!(matches!(
            JurisdictionPack::from_yaml_str("code: CA\n"),
            Err(PackError::NoCategories { .. })
        ));
    }

    #[test]
    fn invalid_code_is_rejected() {
        assert!(matches!(
            JurisdictionPack::from_yaml_str("code: 'E U'\ncategories:\n  prohibited:\n"),
            Err(PackError::Validation(_))
        ));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        file.write_all(JP.as_bytes()).unwrap();
        let pack = JurisdictionPack::load(file.path()).unwrap();
        assert_eq!(pack.code().as_str(), "JP");
    }

    #[test]
    fn builder_matches_yaml() {
        let built = JurisdictionPack::new(JurisdictionCode::new("CA").unwrap(), "Canada")
            .with_category(Category::Prohibited, CategoryProfile::default())
            .with_category(Category::Restricted, CategoryProfile::default());
        assert!(built.validate().is_ok());
        let parsed = JurisdictionPack::from_yaml_str(
            "code: CA\nname: Canada\ncategories:\n  prohibited:\n  restricted:\n",
        )
        .unwrap();
        assert_eq!(built, parsed);
    }
}
