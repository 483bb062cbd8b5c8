//! Product-type scope of a regulatory record.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The product type a limit or condition applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductType {
    /// Hair products.
    Hair,
    /// Skin products.
    Skin,
    /// Products applied around the eyes.
    Eye,
    /// Lip products.
    Lip,
    /// Nail products.
    Nail,
    /// Oral-care products.
    Oral,
    /// Products in contact with mucous membranes.
    Mucosa,
    /// Products not in contact with mucous membranes.
    NonMucosa,
    /// Products rinsed off after application.
    RinseOff,
    /// Products left on the skin or hair.
    LeaveOn,
    /// Scope text that does not map onto a known type.
    Other,
}

impl ProductType {
    /// Map source vocabulary (English, Japanese, Chinese) to a product type.
    ///
    /// Returns `None` for blank text and [`ProductType::Other`] for text that
    /// names a scope outside this set.
    pub fn from_text(text: &str) -> Option<Self> {
        let lowered = text.trim().to_lowercase();
        if lowered.is_empty() || lowered == "-" {
            return None;
        }
        let table: &[(&[&str], ProductType)] = &[
            (&["rinse-off", "rinse off", "rinse_off", "洗い流す", "淋洗"], Self::RinseOff),
            (&["leave-on", "leave on", "leave_on", "洗い流さない", "驻留"], Self::LeaveOn),
            (&["non-mucosa", "non mucosa", "non_mucosa", "粘膜に使用されない"], Self::NonMucosa),
            (&["mucosa", "mucous", "粘膜"], Self::Mucosa),
            (&["oral", "toothpaste", "mouthwash", "口腔"], Self::Oral),
            (&["hair", "头发", "毛髪", "発毛"], Self::Hair),
            (&["eye", "眼", "目"], Self::Eye),
            (&["lip", "唇", "口紅"], Self::Lip),
            (&["nail", "指甲", "爪"], Self::Nail),
            (&["skin", "皮肤", "肌"], Self::Skin),
        ];
        let found = table
            .iter()
            .find(|(needles, _)| needles.iter().any(|n| lowered.contains(n)))
            .map(|(_, ty)| *ty);
        Some(found.unwrap_or(Self::Other))
    }

    /// Canonical snake_case name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hair => "hair",
            Self::Skin => "skin",
            Self::Eye => "eye",
            Self::Lip => "lip",
            Self::Nail => "nail",
            Self::Oral => "oral",
            Self::Mucosa => "mucosa",
            Self::NonMucosa => "non_mucosa",
            Self::RinseOff => "rinse_off",
            Self::LeaveOn => "leave_on",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for ProductType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
