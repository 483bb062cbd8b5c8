//! # Ingredient Identity Keys
//!
//! An [`IngredientId`] names one real-world substance across every
//! jurisdiction and category. Keys are content-derived so that re-running
//! resolution over the same input yields the same keys:
//!
//! - `cas:<registry number>` when the first record seen for the substance
//!   carried a registry number,
//! - `name:<normalized primary name>` otherwise.
//!
//! The prefix records how the identity was minted, not how later records
//! were matched to it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ValidationError;
use crate::normalize::normalize_name;
use crate::registry::RegistryNumber;

const REGISTRY_PREFIX: &str = "cas:";
const NAME_PREFIX: &str = "name:";

/// Stable key for one real-world ingredient.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct IngredientId(String);

impl IngredientId {
    /// Key derived from a registry number.
    pub fn from_registry(number: &RegistryNumber) -> Self {
        Self(format!("{REGISTRY_PREFIX}{number}"))
    }

    /// Key derived from a primary name, normalized first.
    pub fn from_name(name: &str) -> Self {
        Self(format!("{NAME_PREFIX}{}", normalize_name(name)))
    }

    /// Access the key string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the key was minted from a registry number.
    pub fn is_registry_based(&self) -> bool {
        self.0.starts_with(REGISTRY_PREFIX)
    }
}

impl fmt::Display for IngredientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for IngredientId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(body) = s.strip_prefix(REGISTRY_PREFIX) {
            let number = RegistryNumber::new(body)
                .map_err(|_| ValidationError::InvalidIngredientKey(s.to_string()))?;
            return Ok(Self::from_registry(&number));
        }
        if let Some(body) = s.strip_prefix(NAME_PREFIX) {
            if !body.trim().is_empty() {
                return Ok(Self::from_name(body));
            }
        }
        Err(ValidationError::InvalidIngredientKey(s.to_string()))
    }
}

impl<'de> Deserialize<'de> for IngredientId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
