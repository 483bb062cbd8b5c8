//! # cosreg-pack — Jurisdiction Packs and Engine Configuration
//!
//! Machine-readable configuration for the reconciliation engine:
//!
//! - **Jurisdiction packs** ([`jurisdiction`]): the categories a market's
//!   regulation defines, the legal basis of each, the concentration unit its
//!   lists use, and its field-alias tables.
//!
//! - **Field aliases** ([`alias`]): declarative mapping from source column
//!   names onto canonical record fields, validated at load.
//!
//! - **Engine settings** ([`config`]): matching thresholds and the
//!   same-status tie-break policy.
//!
//! - **Reference data** ([`reference`]): ingredient families and the
//!   salt/ester/polymer vocabulary used to detect family members.
//!
//! ## Data Format
//!
//! Everything loads from YAML (or JSON) through the helpers in [`parser`].
//! Every loader validates before returning; an invalid pack is a fatal
//! configuration error.

pub mod alias;
pub mod config;
pub mod error;
pub mod jurisdiction;
pub mod parser;
pub mod reference;

pub use alias::{AliasTable, CanonicalField, RawRecord};
pub use config::{EngineConfig, MatchingConfig, TieBreakPolicy};
pub use error::{PackError, PackResult};
pub use jurisdiction::{CategoryProfile, JurisdictionPack};
pub use reference::{FamilyDefinition, FamilyRelation, FamilyRules, ReferenceTable};
