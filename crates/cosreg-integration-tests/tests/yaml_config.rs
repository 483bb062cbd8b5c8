//! Reconciliation driven entirely by configuration files.
//!
//! Writes an engine manifest, two jurisdiction packs with their own field
//! vocabularies, a family reference table and JSON source tables into a
//! temporary directory, then loads and runs them.

use std::fs;
use std::path::Path;

use cosreg_core::{Category, IngredientId, JurisdictionCode, Provenance, RegistryNumber, Status};
use cosreg_pack::{EngineConfig, FamilyRelation, TieBreakPolicy};
use cosreg_recon::{ReconciliationEngine, SourceTable};

const MANIFEST: &str = "\
matching:
  fuzzy_threshold: 0.9
tie_break: general_table_first
packs:
  - packs/eu.yaml
  - packs/cn.yaml
reference: reference.yaml
";

const EU_PACK: &str = "\
code: EU
name: European Union
categories:
  prohibited:
    citation: Annex II
  restricted:
    citation: Annex III
fields:
  common:
    primary_name: [\"Chemical name / INN\"]
    registry_number: [\"CAS number\"]
  restricted:
    max_concentration: [\"Maximum concentration in ready for use preparation\"]
";

const CN_PACK: &str = "\
code: CN
name: China
categories:
  restricted:
    citation: STSC 2015 Table 3
    concentration_unit: ppm
fields:
  common:
    primary_name: [\"INCI名称\", \"中文名称\"]
    registry_number: [\"CAS号\"]
    max_concentration: [\"最大允许浓度\"]
";

const REFERENCE: &str = "\
families:
  - id: salicylates
    parent: Salicylic Acid
    registry_number: 69-72-7
    relations: [salt, ester]
";

const TABLES: &str = r#"[
  {
    "jurisdiction": "EU",
    "category": "restricted",
    "records": [
      {
        "Chemical name / INN": "Salicylic acid",
        "CAS number": "69-72-7",
        "Maximum concentration in ready for use preparation": "0.5"
      },
      {
        "Chemical name / INN": "Sodium Salicylate",
        "CAS number": "54-21-7",
        "Maximum concentration in ready for use preparation": "0.5"
      }
    ]
  },
  {
    "jurisdiction": "EU",
    "category": "prohibited",
    "records": [
      { "CAS number": "50-00-0" }
    ]
  },
  {
    "jurisdiction": "CN",
    "category": "restricted",
    "records": [
      { "INCI名称": "SALICYLIC ACID", "中文名称": "水杨酸", "CAS号": "69-72-7", "最大允许浓度": "2000" }
    ]
  }
]"#;

fn write(dir: &Path, name: &str, body: &str) {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, body).unwrap();
}

fn setup() -> (tempfile::TempDir, EngineConfig, Vec<SourceTable>) {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "engine.yaml", MANIFEST);
    write(dir.path(), "packs/eu.yaml", EU_PACK);
    write(dir.path(), "packs/cn.yaml", CN_PACK);
    write(dir.path(), "reference.yaml", REFERENCE);
    write(dir.path(), "tables.json", TABLES);

    let config = EngineConfig::load(&dir.path().join("engine.yaml")).unwrap();
    let tables: Vec<SourceTable> =
        serde_json::from_str(&fs::read_to_string(dir.path().join("tables.json")).unwrap()).unwrap();
    (dir, config, tables)
}

fn code(s: &str) -> JurisdictionCode {
    JurisdictionCode::new(s).unwrap()
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

#[test]
fn manifest_loads_packs_in_order() {
    let (_dir, config, tables) = setup();
    let order: Vec<&str> = config.jurisdictions().iter().map(|p| p.code().as_str()).collect();
    assert_eq!(order, vec!["EU", "CN"]);
    assert_eq!(config.tie_break, TieBreakPolicy::GeneralTableFirst);
    assert_eq!(config.reference.families().len(), 1);
    assert_eq!(tables.len(), 3);
}

// ---------------------------------------------------------------------------
// Running
// ---------------------------------------------------------------------------

#[test]
fn jurisdiction_vocabularies_project_onto_one_identity() {
    let (_dir, config, tables) = setup();
    let out = ReconciliationEngine::new(config).unwrap().run(&tables).unwrap();

    let acid = IngredientId::from_registry(&RegistryNumber::new("69-72-7").unwrap());
    let cn = out.matrix.get(&acid, &code("CN"), Category::Restricted).unwrap();
    assert_eq!(cn.max_concentration.unwrap().to_string(), "0.2");
    assert_eq!(cn.citation.as_deref(), Some("STSC 2015 Table 3"));
    assert_eq!(cn.provenance, Provenance::Source);

    let eu = out.matrix.get(&acid, &code("EU"), Category::Restricted).unwrap();
    assert_eq!(eu.max_concentration.unwrap().to_string(), "0.5");
    assert_eq!(eu.citation.as_deref(), Some("Annex III"));

    let eu_prohibited = out.matrix.get(&acid, &code("EU"), Category::Prohibited).unwrap();
    assert_eq!(eu_prohibited.status, Status::NotSpecified);

    let report = out.conflicts();
    assert!(report.conflicts.is_empty());
    let limits = report
        .limit_differences
        .iter()
        .find(|l| l.ingredient == acid)
        .unwrap();
    assert_eq!(limits.strictest().map(|(j, _)| j.as_str()), Some("CN"));
}

#[test]
fn nameless_row_is_reported_not_reconciled() {
    let (_dir, config, tables) = setup();
    let out = ReconciliationEngine::new(config).unwrap().run(&tables).unwrap();

    assert_eq!(out.report.validation_errors.len(), 1);
    let issue = &out.report.validation_errors[0];
    assert_eq!(issue.source.jurisdiction, code("EU"));
    assert_eq!(issue.source.category, Category::Prohibited);
    assert!(issue.reason.contains("primary_name"));
    assert_eq!(out.statistics.validation_errors, 1);
    assert_eq!(out.statistics.counts(&code("EU"), Category::Prohibited).source, 0);
}

#[test]
fn reference_table_links_salt_to_parent() {
    let (_dir, config, tables) = setup();
    let out = ReconciliationEngine::new(config).unwrap().run(&tables).unwrap();

    let acid = IngredientId::from_registry(&RegistryNumber::new("69-72-7").unwrap());
    let salt = IngredientId::from_registry(&RegistryNumber::new("54-21-7").unwrap());
    assert_eq!(out.statistics.total_identities, 2);
    assert_eq!(out.identities.related(&salt), vec![&acid]);
    let entry = &out.identities.identities[&salt];
    assert_eq!(entry.families[0].relation, FamilyRelation::Salt);
}

#[test]
fn reconciliation_serializes_to_json() {
    let (_dir, config, tables) = setup();
    let out = ReconciliationEngine::new(config).unwrap().run(&tables).unwrap();
    let value = serde_json::to_value(&out).unwrap();
    assert!(value.get("matrix").is_some());
    assert!(value.get("summary").unwrap().as_array().unwrap().len() == 2);
    assert_eq!(value["statistics"]["total_identities"], 2);
}
