//! # Regulatory Categories — Single Source of Truth
//!
//! Defines the closed [`Category`] enum. Jurisdictions name their annexes and
//! appendices differently ("Annex V", "Appendix 3", "Table 4"), but every list
//! maps onto one of these six categories. Exhaustive `match` means adding a
//! category forces every handler in the workspace to address it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::status::Status;

/// A regulatory list category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Substances banned from cosmetic products.
    Prohibited,
    /// Substances permitted only under limits or conditions.
    Restricted,
    /// Positive list of permitted preservatives.
    AllowedPreservative,
    /// Positive list of permitted UV filters.
    AllowedUvFilter,
    /// Positive list of permitted colorants.
    AllowedColorant,
    /// General inventory of ingredients in use (e.g. IECIC).
    GeneralInventory,
}

/// How broad a category's intended scope is. Used to break ties between
/// records of equal status in different categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// General prohibited/restricted tables.
    General,
    /// Function-specific positive lists and inventories.
    Narrow,
}

impl Category {
    /// Total number of categories.
    pub const COUNT: usize = 6;

    /// Returns all categories in declaration order.
    pub fn all() -> &'static [Category] {
        &[
            Self::Prohibited,
            Self::Restricted,
            Self::AllowedPreservative,
            Self::AllowedUvFilter,
            Self::AllowedColorant,
            Self::GeneralInventory,
        ]
    }

    /// Canonical snake_case name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Prohibited => "prohibited",
            Self::Restricted => "restricted",
            Self::AllowedPreservative => "allowed_preservative",
            Self::AllowedUvFilter => "allowed_uv_filter",
            Self::AllowedColorant => "allowed_colorant",
            Self::GeneralInventory => "general_inventory",
        }
    }

    /// Status a record in this category carries when the source row states none.
    pub fn default_status(self) -> Status {
        match self {
            Self::Prohibited => Status::Prohibited,
            Self::Restricted => Status::Restricted,
            Self::AllowedPreservative | Self::AllowedUvFilter | Self::AllowedColorant => {
                Status::Allowed
            }
            Self::GeneralInventory => Status::Listed,
        }
    }

    /// Whether `status` is consistent with this category.
    ///
    /// `NotSpecified` is consistent everywhere. Inventories accept both
    /// `Listed` and `NotListed`.
    pub fn admits(self, status: Status) -> bool {
        if status == Status::NotSpecified {
            return true;
        }
        match self {
            Self::GeneralInventory => matches!(status, Status::Listed | Status::NotListed),
            other => other.default_status() == status,
        }
    }

    /// Scope of the category for tie-breaking.
    pub fn scope(self) -> Scope {
        match self {
            Self::Prohibited | Self::Restricted => Scope::General,
            Self::AllowedPreservative
            | Self::AllowedUvFilter
            | Self::AllowedColorant
            | Self::GeneralInventory => Scope::Narrow,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = ValidationError;

    /// Accepts canonical names plus the table names used by source
    /// extractors (`preservatives`, `uv_filters`, `colorants`, `whitelist`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase().replace(['-', ' '], "_");
        let category = match key.as_str() {
            "prohibited" => Self::Prohibited,
            "restricted" => Self::Restricted,
            "allowed_preservative" | "preservative" | "preservatives" => {
                Self::AllowedPreservative
            }
            "allowed_uv_filter" | "uv_filter" | "uv_filters" => Self::AllowedUvFilter,
            "allowed_colorant" | "colorant" | "colorants" => Self::AllowedColorant,
            "general_inventory" | "inventory" | "whitelist" => Self::GeneralInventory,
            _ => return Err(ValidationError::UnknownCategory(s.to_string())),
        };
        Ok(category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_has_count_entries() {
        assert_eq!(Category::all().len(), Category::COUNT);
    }

    #[test]
    fn display_round_trips_through_parse() {
        for &category in Category::all() {
            assert_eq!(
                category.to_string().parse::<Category>().unwrap(),
                category
            );
        }
    }

    #[test]
    fn parses_source_table_names() {
        assert_eq!(
            "preservatives".parse::<Category>().unwrap(),
            Category::AllowedPreservative
        );
        assert_eq!(
            "UV Filters".parse::<Category>().unwrap(),
            Category::AllowedUvFilter
        );
        assert_eq!(
            "whitelist".parse::<Category>().unwrap(),
            Category::GeneralInventory
        );
        assert!("fragrances".parse::<Category>().is_err());
    }

    #[test]
    fn admits_expected_statuses() {
        assert!(Category::Prohibited.admits(Status::Prohibited));
        assert!(!Category::Prohibited.admits(Status::Restricted));
        assert!(Category::GeneralInventory.admits(Status::NotListed));
        assert!(!Category::GeneralInventory.admits(Status::Allowed));
        for &category in Category::all() {
            assert!(category.admits(Status::NotSpecified));
            assert!(category.admits(category.default_status()));
        }
    }

    #[test]
    fn general_tables_have_general_scope() {
        assert_eq!(Category::Prohibited.scope(), Scope::General);
        assert_eq!(Category::Restricted.scope(), Scope::General);
        assert_eq!(Category::AllowedColorant.scope(), Scope::Narrow);
        assert!(Scope::General < Scope::Narrow);
    }

    #[test]
    fn serde_names_match_display() {
        for &category in Category::all() {
            let json = serde_json::to_string(&category).unwrap();
            assert_eq!(json, format!("\"{category}\""));
        }
    }
}
