//! # Field Alias Tables
//!
//! Source extractors emit flat key-value rows whose keys follow each
//! jurisdiction's own vocabulary ("INCI名", "Chemical name / INN",
//! "cas_no"). An [`AliasTable`] declares, per canonical field, the ordered
//! list of source keys that may carry it. Projection takes the first listed
//! key present with a non-blank value.
//!
//! Tables are validated when a pack loads: an empty alias list, or a source
//! key claimed by two canonical fields, is a configuration error.
//!
//! Key comparison is insensitive to case, surrounding whitespace, and the
//! choice of space, hyphen or underscore as separator.

use std::collections::BTreeMap;
use std::fmt;

use cosreg_core::RecordInput;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{PackError, PackResult};

// ---------------------------------------------------------------------------
// Raw records
// ---------------------------------------------------------------------------

/// One extracted source row: jurisdiction-specific keys, loosely typed values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRecord(BTreeMap<String, Value>);

impl RawRecord {
    /// Empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a row from `(key, text)` pairs.
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), Value::String(v.into())))
                .collect(),
        )
    }

    /// Set a value.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    /// Iterate over entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    fn lookup(&self, alias: &str) -> Option<&Value> {
        if let Some(v) = self.0.get(alias) {
            return Some(v);
        }
        let wanted = normalize_key(alias);
        self.0
            .iter()
            .find(|(k, _)| normalize_key(k) == wanted)
            .map(|(_, v)| v)
    }
}

fn normalize_key(key: &str) -> String {
    key.trim()
        .to_lowercase()
        .chars()
        .map(|c| if c == ' ' || c == '-' { '_' } else { c })
        .collect()
}

fn value_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::Null => return None,
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Array(items) => items
            .iter()
            .filter_map(value_text)
            .collect::<Vec<_>>()
            .join("; "),
        Value::Object(_) => return None,
    };
    (!text.is_empty()).then_some(text)
}

fn value_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().filter_map(value_text).collect(),
        other => value_text(other)
            .map(|text| {
                text.split([';', '；', '|'])
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default(),
    }
}

// ---------------------------------------------------------------------------
// Canonical fields
// ---------------------------------------------------------------------------

/// Canonical record fields a source key can map onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalField {
    /// Primary name.
    PrimaryName,
    /// Alternate or localized names.
    AlternateNames,
    /// Registry number.
    RegistryNumber,
    /// Status.
    Status,
    /// Maximum concentration.
    MaxConcentration,
    /// Product-type scope.
    ProductScope,
    /// Usage conditions.
    Conditions,
    /// Legal citation.
    Citation,
    /// Publication date.
    PublishedAt,
    /// Notes.
    Notes,
}

impl CanonicalField {
    /// All canonical fields.
    pub fn all() -> &'static [CanonicalField] {
        &[
            Self::PrimaryName,
            Self::AlternateNames,
            Self::RegistryNumber,
            Self::Status,
            Self::MaxConcentration,
            Self::ProductScope,
            Self::Conditions,
            Self::Citation,
            Self::PublishedAt,
            Self::Notes,
        ]
    }

    /// Canonical snake_case name, also the fallback source key.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PrimaryName => "primary_name",
            Self::AlternateNames => "alternate_names",
            Self::RegistryNumber => "registry_number",
            Self::Status => "status",
            Self::MaxConcentration => "max_concentration",
            Self::ProductScope => "product_scope",
            Self::Conditions => "conditions",
            Self::Citation => "citation",
            Self::PublishedAt => "published_at",
            Self::Notes => "notes",
        }
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Alias tables
// ---------------------------------------------------------------------------

/// Canonical field → ordered source keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AliasTable(BTreeMap<CanonicalField, Vec<String>>);

impl AliasTable {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style alias declaration.
    pub fn with(mut self, field: CanonicalField, aliases: &[&str]) -> Self {
        self.0
            .insert(field, aliases.iter().map(|a| a.to_string()).collect());
        self
    }

    /// Aliases declared for a field.
    pub fn aliases(&self, field: CanonicalField) -> &[String] {
        self.0.get(&field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Overlay `other` on `self`: a field declared in `other` replaces the
    /// field's alias list here.
    pub fn overlay(&self, other: &AliasTable) -> AliasTable {
        let mut merged = self.0.clone();
        for (field, aliases) in &other.0 {
            merged.insert(*field, aliases.clone());
        }
        AliasTable(merged)
    }

    /// Complete the table so each canonical field also answers to its own
    /// canonical name, unless that name is already claimed by another field.
    pub fn with_canonical_fallbacks(&self) -> AliasTable {
        let mut merged = self.0.clone();
        let claimed: Vec<String> = merged.values().flatten().map(|k| normalize_key(k)).collect();
        for &field in CanonicalField::all() {
            let own = field.as_str();
            let list = merged.entry(field).or_default();
            let present = list.iter().any(|k| normalize_key(k) == own);
            if !present && !claimed.contains(&own.to_string()) {
                list.push(own.to_string());
            }
        }
        AliasTable(merged)
    }

    /// Check the table for empty lists and keys claimed by two fields.
    pub fn validate(&self, jurisdiction: &str, table: &str) -> PackResult<()> {
        let mut owners: BTreeMap<String, CanonicalField> = BTreeMap::new();
        for (field, aliases) in &self.0 {
            if aliases.iter().all(|a| a.trim().is_empty()) {
                return Err(PackError::EmptyAliasList {
                    jurisdiction: jurisdiction.to_string(),
                    table: table.to_string(),
                    field: field.to_string(),
                });
            }
            for alias in aliases {
                let key = normalize_key(alias);
                match owners.get(&key) {
                    Some(owner) if owner != field => {
                        return Err(PackError::AliasConflict {
                            jurisdiction: jurisdiction.to_string(),
                            table: table.to_string(),
                            key: alias.clone(),
                            first: owner.to_string(),
                            second: field.to_string(),
                        });
                    }
                    _ => {
                        owners.insert(key, *field);
                    }
                }
            }
        }
        Ok(())
    }

    fn first_value<'a>(&self, raw: &'a RawRecord, field: CanonicalField) -> Option<&'a Value> {
        self.aliases(field)
            .iter()
            .filter_map(|alias| raw.lookup(alias))
            .find(|v| value_text(v).is_some())
    }

    /// Project a raw row onto canonical fields.
    pub fn project(&self, raw: &RawRecord) -> RecordInput {
        let text = |field| self.first_value(raw, field).and_then(value_text);
        RecordInput {
            primary_name: text(CanonicalField::PrimaryName),
            alternate_names: self
                .aliases(CanonicalField::AlternateNames)
                .iter()
                .filter_map(|alias| raw.lookup(alias))
                .flat_map(value_list)
                .collect(),
            registry_number: text(CanonicalField::RegistryNumber),
            status: text(CanonicalField::Status),
            max_concentration: text(CanonicalField::MaxConcentration),
            product_scope: text(CanonicalField::ProductScope),
            conditions: text(CanonicalField::Conditions),
            citation: text(CanonicalField::Citation),
            published_at: text(CanonicalField::PublishedAt),
            notes: text(CanonicalField::Notes),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> AliasTable {
        AliasTable::new()
            .with(CanonicalField::PrimaryName, &["INCI Name", "Chemical name / INN"])
            .with(CanonicalField::RegistryNumber, &["CAS Number", "cas_no"])
            .with(CanonicalField::AlternateNames, &["Japanese Name", "synonyms"])
            .with(CanonicalField::MaxConcentration, &["Max Conc"])
    }

    #[test]
    fn projects_first_present_alias() {
        let raw = RawRecord::from_pairs([
            ("Chemical name / INN", "Formaldehyde"),
            ("cas_no", "50-00-0"),
        ]);
        let input = table().project(&raw);
        assert_eq!(input.primary_name.as_deref(), Some("Formaldehyde"));
        assert_eq!(input.registry_number.as_deref(), Some("50-00-0"));
        assert_eq!(input.status, None);
    }

    #[test]
    fn blank_values_fall_through_to_next_alias() {
        let raw = RawRecord::from_pairs([("INCI Name", "  "), ("Chemical name / INN", "Triclosan")]);
        assert_eq!(table().project(&raw).primary_name.as_deref(), Some("Triclosan"));
    }

    #[test]
    fn key_matching_ignores_case_and_separators() {
        let raw = RawRecord::from_pairs([("inci_name", "Water"), ("CAS-NUMBER", "7732-18-5")]);
        let input = table().project(&raw);
        assert_eq!(input.primary_name.as_deref(), Some("Water"));
        assert_eq!(input.registry_number.as_deref(), Some("7732-18-5"));
    }

    #[test]
    fn numbers_become_text() {
        let mut raw = RawRecord::from_pairs([("INCI Name", "Salicylic Acid")]);
        raw.insert("Max Conc", serde_json::json!(0.5));
        assert_eq!(table().project(&raw).max_concentration.as_deref(), Some("0.5"));
    }

    #[test]
    fn alternate_names_collect_from_all_aliases() {
        let mut raw = RawRecord::from_pairs([
            ("INCI Name", "Benzoic Acid"),
            ("Japanese Name", "安息香酸"),
        ]);
        raw.insert("synonyms", serde_json::json!(["Benzenecarboxylic acid", "E210"]));
        let names = table().project(&raw).alternate_names;
        assert_eq!(names, vec!["安息香酸", "Benzenecarboxylic acid", "E210"]);
    }

    #[test]
    fn alternate_names_split_delimited_text() {
        let raw = RawRecord::from_pairs([("INCI Name", "Benzoic Acid"), ("synonyms", "a; b | c")]);
        assert_eq!(table().project(&raw).alternate_names, vec!["a", "b", "c"]);
    }

    #[test]
    fn overlay_replaces_field_lists() {
        let base = table();
        let over = AliasTable::new().with(CanonicalField::MaxConcentration, &["Maximum concentration"]);
        let merged = base.overlay(&over);
        assert_eq!(merged.aliases(CanonicalField::MaxConcentration), &["Maximum concentration"]);
        assert_eq!(merged.aliases(CanonicalField::PrimaryName).len(), 2);
    }

    #[test]
    fn canonical_fallbacks_answer_to_field_names() {
        let t = AliasTable::new().with_canonical_fallbacks();
        let raw = RawRecord::from_pairs([("primary_name", "Water"), ("status", "Listed")]);
        let input = t.project(&raw);
        assert_eq!(input.primary_name.as_deref(), Some("Water"));
        assert_eq!(input.status.as_deref(), Some("Listed"));
        assert!(t.validate("EU", "common").is_ok());
    }

    #[test]
    fn canonical_fallback_skipped_when_name_claimed_elsewhere() {
        let t = AliasTable::new()
            .with(CanonicalField::Conditions, &["notes"])
            .with_canonical_fallbacks();
        assert!(!t.aliases(CanonicalField::Notes).iter().any(|a| a == "notes"));
        assert!(t.validate("EU", "common").is_ok());
    }

    #[test]
    fn conflicting_alias_rejected() {
        let t = AliasTable::new()
            .with(CanonicalField::PrimaryName, &["Name"])
            .with(CanonicalField::AlternateNames, &["name"]);
        assert!(matches!(
            t.validate("EU", "common"),
            Err(PackError::AliasConflict { .. })
        ));
    }

    #[test]
    fn empty_alias_list_rejected() {
        let t = AliasTable::new().with(CanonicalField::Status, &[]);
        assert!(matches!(
            t.validate("EU", "prohibited"),
            Err(PackError::EmptyAliasList { .. })
        ));
    }

    #[test]
    fn unknown_canonical_field_fails_to_deserialize() {
        let yaml = "primary_name: [INCI]\nflavour: [taste]\n";
        assert!(serde_yaml::from_str::<AliasTable>(yaml).is_err());
    }
}
