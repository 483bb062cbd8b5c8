//! # Regulatory Records
//!
//! A [`RegulatoryRecord`] is one classification of one ingredient within one
//! jurisdiction and one category. Records are built in two steps:
//!
//! 1. [`ValidatedRecord::from_input`] checks a loosely-typed [`RecordInput`]
//!    (canonical field names, raw text values) and produces a validated
//!    record plus any [`ConsistencyWarning`]s.
//! 2. Once identity resolution has assigned an [`IngredientId`],
//!    [`ValidatedRecord::into_record`] produces the final record.
//!
//! Validation failures exclude the record; consistency warnings never do.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::category::Category;
use crate::concentration::{Concentration, ConcentrationCell, ConcentrationUnit};
use crate::error::ValidationError;
use crate::identity::IngredientId;
use crate::jurisdiction::JurisdictionCode;
use crate::normalize::{clean_display_name, normalize_name};
use crate::product::ProductType;
use crate::registry::RegistryNumber;
use crate::status::Status;

/// Separator used when notes are flattened into a single text field.
pub const NOTE_SEPARATOR: &str = " | ";

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// Loosely-typed record input keyed by canonical field.
///
/// Produced by projecting a raw source row through a jurisdiction's field
/// alias table. Every value is raw text; nothing has been checked yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordInput {
    /// Primary (usually INCI) name.
    pub primary_name: Option<String>,
    /// Alternate or localized names.
    pub alternate_names: Vec<String>,
    /// Registry number text.
    pub registry_number: Option<String>,
    /// Status text; absent means "the category's default status".
    pub status: Option<String>,
    /// Maximum concentration text, possibly with a unit.
    pub max_concentration: Option<String>,
    /// Product-type scope text.
    pub product_scope: Option<String>,
    /// Usage conditions.
    pub conditions: Option<String>,
    /// Legal citation.
    pub citation: Option<String>,
    /// Source publication date text.
    pub published_at: Option<String>,
    /// Free-text notes.
    pub notes: Option<String>,
}

/// Per-table context a record is validated in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordContext {
    /// Jurisdiction the source table belongs to.
    pub jurisdiction: JurisdictionCode,
    /// Category of the source table.
    pub category: Category,
    /// Unit concentrations are quoted in when a cell carries no unit.
    pub concentration_unit: ConcentrationUnit,
    /// Citation applied when a row carries none.
    pub default_citation: Option<String>,
}

impl RecordContext {
    /// Context with percent units and no default citation.
    pub fn new(jurisdiction: JurisdictionCode, category: Category) -> Self {
        Self {
            jurisdiction,
            category,
            concentration_unit: ConcentrationUnit::Percent,
            default_citation: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Consistency warnings
// ---------------------------------------------------------------------------

/// Kind of consistency warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningCode {
    /// Status does not match what the category implies.
    StatusCategoryMismatch,
    /// Restricted record with neither a concentration limit nor conditions.
    RestrictedWithoutLimits,
    /// Prohibited record carrying a concentration limit.
    ProhibitedWithConcentration,
    /// Registry number fails its check digit.
    RegistryCheckDigit,
}

impl fmt::Display for WarningCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::StatusCategoryMismatch => "status_category_mismatch",
            Self::RestrictedWithoutLimits => "restricted_without_limits",
            Self::ProhibitedWithConcentration => "prohibited_with_concentration",
            Self::RegistryCheckDigit => "registry_check_digit",
        })
    }
}

/// A non-blocking data-quality finding on an otherwise valid record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsistencyWarning {
    /// Warning kind.
    pub code: WarningCode,
    /// Canonical field the warning concerns.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl ConsistencyWarning {
    fn new(code: WarningCode, field: &str, message: String) -> Self {
        Self {
            code,
            field: field.to_string(),
            message,
        }
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Where a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Read from a source table.
    #[default]
    Source,
    /// Synthesized by completeness backfill.
    Backfilled,
}

/// A record that passed validation but has no identity yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRecord {
    /// Cleaned primary name, original case preserved.
    pub primary_name: String,
    /// Cleaned alternate names, deduplicated, excluding the primary name.
    pub alternate_names: Vec<String>,
    /// Normalized registry number.
    pub registry_number: Option<RegistryNumber>,
    /// Jurisdiction.
    pub jurisdiction: JurisdictionCode,
    /// Category.
    pub category: Category,
    /// Status.
    pub status: Status,
    /// Maximum concentration in percent.
    pub max_concentration: Option<Concentration>,
    /// Product-type scope.
    pub product_scope: Option<ProductType>,
    /// Usage conditions.
    pub conditions: Option<String>,
    /// Legal citation.
    pub citation: Option<String>,
    /// Source publication date.
    pub published_at: Option<NaiveDate>,
    /// Notes.
    pub notes: Vec<String>,
}

/// One classification of one ingredient in one jurisdiction and category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegulatoryRecord {
    /// Ingredient identity.
    pub ingredient: IngredientId,
    /// Primary name as it appeared in the source.
    pub primary_name: String,
    /// Alternate or localized names.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternate_names: Vec<String>,
    /// Normalized registry number.
    pub registry_number: Option<RegistryNumber>,
    /// Jurisdiction.
    pub jurisdiction: JurisdictionCode,
    /// Category.
    pub category: Category,
    /// Status. Never absent.
    pub status: Status,
    /// Maximum concentration in percent.
    pub max_concentration: Option<Concentration>,
    /// Product-type scope.
    pub product_scope: Option<ProductType>,
    /// Usage conditions.
    pub conditions: Option<String>,
    /// Legal citation.
    pub citation: Option<String>,
    /// Source publication date.
    pub published_at: Option<NaiveDate>,
    /// Notes, including resolution provenance.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
    /// Whether the record was read or synthesized.
    #[serde(default)]
    pub provenance: Provenance,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Parse a publication date in one of the layouts source lists use.
///
/// Accepts `YYYY-MM-DD`, `YYYY/MM/DD`, `YYYY.MM.DD`, `YYYY-MM` (first of the
/// month) and `YYYY` (first of January).
pub fn parse_publication_date(raw: &str) -> Result<NaiveDate, ValidationError> {
    let text = raw.trim();
    for layout in ["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(text, layout) {
            return Ok(date);
        }
    }
    let month_padded = format!("{text}-01");
    if let Ok(date) = NaiveDate::parse_from_str(&month_padded, "%Y-%m-%d") {
        return Ok(date);
    }
    if text.len() == 4 {
        if let Ok(year) = text.parse::<i32>() {
            if let Some(date) = NaiveDate::from_ymd_opt(year, 1, 1) {
                return Ok(date);
            }
        }
    }
    Err(ValidationError::InvalidDate(raw.to_string()))
}

impl ValidatedRecord {
    /// Validate a record input in its table context.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found: missing primary name,
    /// malformed registry number, unknown status, unparseable or
    /// out-of-range concentration, or invalid date.
    pub fn from_input(
        input: &RecordInput,
        ctx: &RecordContext,
    ) -> Result<(Self, Vec<ConsistencyWarning>), ValidationError> {
        let primary_name = non_blank(&input.primary_name)
            .map(clean_display_name)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| ValidationError::MissingField {
                field: "primary_name".to_string(),
            })?;

        let registry_number = match non_blank(&input.registry_number) {
            Some(raw) => RegistryNumber::parse(raw)?,
            None => None,
        };

        let status = match non_blank(&input.status) {
            Some(raw) => raw.parse::<Status>()?,
            None => ctx.category.default_status(),
        };

        let max_concentration = match non_blank(&input.max_concentration) {
            Some(raw) => match Concentration::parse_cell(raw, ctx.concentration_unit)? {
                ConcentrationCell::Limit(c) => Some(c),
                ConcentrationCell::Unlimited | ConcentrationCell::Absent => None,
            },
            None => None,
        };

        let published_at = non_blank(&input.published_at)
            .map(parse_publication_date)
            .transpose()?;

        let product_scope = non_blank(&input.product_scope).and_then(ProductType::from_text);

        let primary_key = normalize_name(&primary_name);
        let mut seen = vec![primary_key];
        let mut alternate_names = Vec::new();
        for alt in &input.alternate_names {
            let cleaned = clean_display_name(alt);
            let key = normalize_name(&cleaned);
            if cleaned.is_empty() || seen.contains(&key) {
                continue;
            }
            seen.push(key);
            alternate_names.push(cleaned);
        }

        let record = Self {
            primary_name,
            alternate_names,
            registry_number,
            jurisdiction: ctx.jurisdiction.clone(),
            category: ctx.category,
            status,
            max_concentration,
            product_scope,
            conditions: non_blank(&input.conditions).map(str::to_string),
            citation: non_blank(&input.citation)
                .map(str::to_string)
                .or_else(|| ctx.default_citation.clone()),
            published_at,
            notes: non_blank(&input.notes)
                .map(|n| vec![n.to_string()])
                .unwrap_or_default(),
        };
        let warnings = record.consistency_warnings();
        Ok((record, warnings))
    }

    fn consistency_warnings(&self) -> Vec<ConsistencyWarning> {
        let mut warnings = Vec::new();
        if !self.category.admits(self.status) {
            warnings.push(ConsistencyWarning::new(
                WarningCode::StatusCategoryMismatch,
                "status",
                format!(
                    "status {} in {} table (expected {})",
                    self.status,
                    self.category,
                    self.category.default_status()
                ),
            ));
        }
        if self.status == Status::Restricted
            && self.max_concentration.is_none()
            && self.conditions.is_none()
        {
            warnings.push(ConsistencyWarning::new(
                WarningCode::RestrictedWithoutLimits,
                "max_concentration",
                "restricted ingredient has neither a concentration limit nor conditions".to_string(),
            ));
        }
        if self.status == Status::Prohibited {
            if let Some(limit) = self.max_concentration {
                warnings.push(ConsistencyWarning::new(
                    WarningCode::ProhibitedWithConcentration,
                    "max_concentration",
                    format!("prohibited ingredient carries a concentration limit of {limit}%"),
                ));
            }
        }
        if let Some(rn) = &self.registry_number {
            if !rn.has_valid_check_digit() {
                warnings.push(ConsistencyWarning::new(
                    WarningCode::RegistryCheckDigit,
                    "registry_number",
                    format!("registry number {rn} fails its check digit"),
                ));
            }
        }
        warnings
    }

    /// Attach an identity, producing the final source record.
    pub fn into_record(self, ingredient: IngredientId) -> RegulatoryRecord {
        RegulatoryRecord {
            ingredient,
            primary_name: self.primary_name,
            alternate_names: self.alternate_names,
            registry_number: self.registry_number,
            jurisdiction: self.jurisdiction,
            category: self.category,
            status: self.status,
            max_concentration: self.max_concentration,
            product_scope: self.product_scope,
            conditions: self.conditions,
            citation: self.citation,
            published_at: self.published_at,
            notes: self.notes,
            provenance: Provenance::Source,
        }
    }
}

impl RegulatoryRecord {
    /// Synthesize a Not-Specified record for a (jurisdiction, category) pair
    /// that has no source record for the ingredient.
    pub fn not_specified(
        ingredient: IngredientId,
        primary_name: impl Into<String>,
        registry_number: Option<RegistryNumber>,
        jurisdiction: JurisdictionCode,
        category: Category,
    ) -> Self {
        let note = format!("not specified in {jurisdiction} {category} list");
        Self {
            ingredient,
            primary_name: primary_name.into(),
            alternate_names: Vec::new(),
            registry_number,
            jurisdiction,
            category,
            status: Status::NotSpecified,
            max_concentration: None,
            product_scope: None,
            conditions: None,
            citation: None,
            published_at: None,
            notes: vec![note],
            provenance: Provenance::Backfilled,
        }
    }

    /// Append a note.
    pub fn annotate(&mut self, note: impl Into<String>) {
        self.notes.push(note.into());
    }

    /// Notes joined into one text field.
    pub fn notes_text(&self) -> Option<String> {
        if self.notes.is_empty() {
            None
        } else {
            Some(self.notes.join(NOTE_SEPARATOR))
        }
    }

    /// Flat, order-stable mapping of every canonical field.
    ///
    /// Absent optional fields map to `null` so every record yields the same
    /// key set.
    pub fn to_flat_map(&self) -> BTreeMap<String, Value> {
        fn text<T: ToString>(v: Option<T>) -> Value {
            v.map(|x| Value::String(x.to_string())).unwrap_or(Value::Null)
        }
        let mut map = BTreeMap::new();
        map.insert("ingredient".to_string(), Value::String(self.ingredient.to_string()));
        map.insert("primary_name".to_string(), Value::String(self.primary_name.clone()));
        map.insert(
            "alternate_names".to_string(),
            Value::Array(
                self.alternate_names
                    .iter()
                    .cloned()
                    .map(Value::String)
                    .collect(),
            ),
        );
        map.insert("registry_number".to_string(), text(self.registry_number.as_ref()));
        map.insert("jurisdiction".to_string(), Value::String(self.jurisdiction.to_string()));
        map.insert("category".to_string(), Value::String(self.category.to_string()));
        map.insert("status".to_string(), Value::String(self.status.to_string()));
        map.insert("max_concentration".to_string(), text(self.max_concentration));
        map.insert("product_scope".to_string(), text(self.product_scope));
        map.insert("conditions".to_string(), text(self.conditions.as_ref()));
        map.insert("citation".to_string(), text(self.citation.as_ref()));
        map.insert(
            "published_at".to_string(),
            text(self.published_at.map(|d| d.format("%Y-%m-%d"))),
        );
        map.insert("notes".to_string(), text(self.notes_text()));
        map.insert(
            "provenance".to_string(),
            Value::String(
                match self.provenance {
                    Provenance::Source => "source",
                    Provenance::Backfilled => "backfilled",
                }
                .to_string(),
            ),
        );
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(category: Category) -> RecordContext {
        RecordContext::new(JurisdictionCode::new("EU").unwrap(), category)
    }

    fn input(name: &str) -> RecordInput {
        RecordInput {
            primary_name: Some(name.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn status_defaults_from_category() {
        let (rec, warnings) =
            ValidatedRecord::from_input(&input("Formaldehyde"), &ctx(Category::Prohibited)).unwrap();
        assert_eq!(rec.status, Status::Prohibited);
        assert!(warnings.is_empty());
    }

    #[test]
    fn missing_primary_name_is_an_error() {
        let err = ValidatedRecord::from_input(&RecordInput::default(), &ctx(Category::Prohibited))
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::MissingField {
                field: "primary_name".to_string()
            }
        );
        let blank = input("   ");
        assert!(ValidatedRecord::from_input(&blank, &ctx(Category::Prohibited)).is_err());
    }

    #[test]
    fn out_of_range_concentration_is_an_error() {
        let mut i = input("Salicylic Acid");
        i.max_concentration = Some("120%".to_string());
        assert!(matches!(
            ValidatedRecord::from_input(&i, &ctx(Category::Restricted)),
            Err(ValidationError::ConcentrationOutOfRange { .. })
        ));
    }

    #[test]
    fn malformed_registry_number_is_an_error() {
        let mut i = input("Salicylic Acid");
        i.registry_number = Some("69-7-27".to_string());
        assert!(matches!(
            ValidatedRecord::from_input(&i, &ctx(Category::Restricted)),
            Err(ValidationError::InvalidRegistryNumber(_))
        ));
    }

    #[test]
    fn unknown_status_is_an_error() {
        let mut i = input("Salicylic Acid");
        i.status = Some("sometimes".to_string());
        assert!(matches!(
            ValidatedRecord::from_input(&i, &ctx(Category::Restricted)),
            Err(ValidationError::UnknownStatus(_))
        ));
    }

    #[test]
    fn status_category_mismatch_warns() {
        let mut i = input("Hydroquinone");
        i.status = Some("Restricted".to_string());
        let (rec, warnings) =
            ValidatedRecord::from_input(&i, &ctx(Category::Prohibited)).unwrap();
        assert_eq!(rec.status, Status::Restricted);
        assert!(warnings
            .iter()
            .any(|w| w.code == WarningCode::StatusCategoryMismatch));
    }

    #[test]
    fn restricted_without_limits_warns() {
        let (_, warnings) =
            ValidatedRecord::from_input(&input("Salicylic Acid"), &ctx(Category::Restricted))
                .unwrap();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].code, WarningCode::RestrictedWithoutLimits);

        let mut with_conditions = input("Salicylic Acid");
        with_conditions.conditions = Some("Not for children under 3".to_string());
        let (_, warnings) =
            ValidatedRecord::from_input(&with_conditions, &ctx(Category::Restricted)).unwrap();
        assert!(warnings.is_empty());
    }

    #[test]
    fn prohibited_with_concentration_warns() {
        let mut i = input("Formaldehyde");
        i.max_concentration = Some("0.1".to_string());
        let (_, warnings) = ValidatedRecord::from_input(&i, &ctx(Category::Prohibited)).unwrap();
        assert!(warnings
            .iter()
            .any(|w| w.code == WarningCode::ProhibitedWithConcentration));
    }

    #[test]
    fn bad_check_digit_warns_but_validates() {
        let mut i = input("Formaldehyde");
        i.registry_number = Some("50-00-1".to_string());
        let (rec, warnings) = ValidatedRecord::from_input(&i, &ctx(Category::Prohibited)).unwrap();
        assert!(rec.registry_number.is_some());
        assert_eq!(warnings[0].code, WarningCode::RegistryCheckDigit);
    }

    #[test]
    fn not_specified_status_is_never_a_mismatch() {
        let mut i = input("Water");
        i.status = Some("Not-Specified".to_string());
        let (_, warnings) = ValidatedRecord::from_input(&i, &ctx(Category::Prohibited)).unwrap();
        assert!(warnings.is_empty());
    }

    #[test]
    fn default_citation_and_unit_apply() {
        let mut context = ctx(Category::AllowedPreservative);
        context.concentration_unit = ConcentrationUnit::Ppm;
        context.default_citation = Some("Annex V".to_string());
        let mut i = input("Methylparaben");
        i.max_concentration = Some("4000".to_string());
        let (rec, _) = ValidatedRecord::from_input(&i, &context).unwrap();
        assert_eq!(rec.citation.as_deref(), Some("Annex V"));
        assert_eq!(rec.max_concentration.unwrap().to_string(), "0.4");
    }

    #[test]
    fn alternate_names_are_deduplicated() {
        let mut i = input("Benzoic Acid");
        i.alternate_names = vec![
            "benzoic  acid".to_string(),
            "安息香酸".to_string(),
            "安息香酸".to_string(),
            " ".to_string(),
        ];
        let (rec, _) = ValidatedRecord::from_input(&i, &ctx(Category::AllowedPreservative)).unwrap();
        assert_eq!(rec.alternate_names, vec!["安息香酸".to_string()]);
    }

    #[test]
    fn publication_date_layouts() {
        let d = NaiveDate::from_ymd_opt(2023, 7, 1).unwrap();
        assert_eq!(parse_publication_date("2023-07-01").unwrap(), d);
        assert_eq!(parse_publication_date("2023/07/01").unwrap(), d);
        assert_eq!(parse_publication_date("2023.07.01").unwrap(), d);
        assert_eq!(parse_publication_date("2023-07").unwrap(), d);
        assert_eq!(
            parse_publication_date("2023").unwrap(),
            NaiveDate::from_ymd_opt(2023, 1, 1).unwrap()
        );
        assert!(parse_publication_date("July 2023").is_err());
    }

    #[test]
    fn flat_map_has_stable_key_set() {
        let (validated, _) =
            ValidatedRecord::from_input(&input("Formaldehyde"), &ctx(Category::Prohibited)).unwrap();
        let rec = validated.into_record(IngredientId::from_name("Formaldehyde"));
        let backfilled = RegulatoryRecord::not_specified(
            IngredientId::from_name("Formaldehyde"),
            "Formaldehyde",
            None,
            JurisdictionCode::new("CN").unwrap(),
            Category::Restricted,
        );
        let a: Vec<String> = rec.to_flat_map().into_keys().collect();
        let b: Vec<String> = backfilled.to_flat_map().into_keys().collect();
        assert_eq!(a, b);
        assert_eq!(
            backfilled.to_flat_map()["status"],
            Value::String("not_specified".to_string())
        );
        assert_eq!(
            backfilled.to_flat_map()["provenance"],
            Value::String("backfilled".to_string())
        );
    }

    #[test]
    fn notes_join_with_separator() {
        let mut rec = RegulatoryRecord::not_specified(
            IngredientId::from_name("Water"),
            "Water",
            None,
            JurisdictionCode::new("JP").unwrap(),
            Category::Prohibited,
        );
        rec.annotate("second");
        let text = rec.notes_text().unwrap();
        assert!(text.ends_with(" | second"));
    }
}
