//! # Jurisdiction Codes
//!
//! Jurisdictions are configuration data, not an enum: the set of markets the
//! engine reconciles is whatever the loaded jurisdiction packs declare. The
//! code itself is a validated newtype so that a jurisdiction can never be
//! confused with a category name or an ingredient key.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ValidationError;

/// A jurisdiction code such as `EU`, `CN`, `JP` or `ASEAN`.
///
/// # Validation
///
/// Trimmed, upper-cased, non-empty, and restricted to ASCII letters, digits
/// and `-`. Lower-case input is accepted and folded.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct JurisdictionCode(String);

impl JurisdictionCode {
    /// Create a jurisdiction code, validating its shape.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidJurisdictionCode`] when the input is
    /// blank or carries characters outside `[A-Za-z0-9-]`.
    pub fn new(value: impl AsRef<str>) -> Result<Self, ValidationError> {
        let raw = value.as_ref();
        let code = raw.trim().to_ascii_uppercase();
        let valid = !code.is_empty()
            && code
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-');
        if !valid {
            return Err(ValidationError::InvalidJurisdictionCode(raw.to_string()));
        }
        Ok(Self(code))
    }

    /// Access the code string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JurisdictionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for JurisdictionCode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl<'de> Deserialize<'de> for JurisdictionCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::new(&raw).map_err(serde::de::Error::custom)
    }
}
