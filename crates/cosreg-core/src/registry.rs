//! # Chemical Registry Numbers
//!
//! The registry number (CAS-style `NNNNNNN-NN-N`) is the strongest identity
//! signal the engine has: two records with the same normalized number are
//! always the same ingredient, and two records with different numbers are
//! never merged automatically.
//!
//! Source cells are messy ("CAS No. 50-00-0", "５０－００－０", "0050-00-0 /
//! 30525-89-4"), so [`RegistryNumber::parse`] extracts the first well-formed
//! number from the text after width and dash folding.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use unicode_normalization::UnicodeNormalization;

use crate::error::ValidationError;

fn registry_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?:^|[^\d-])(\d{2,7})-(\d{2})-(\d)(?:$|[^\d-])")
            .expect("registry number pattern is a valid regex")
    })
}

/// Markers that mean "no registry number" rather than a malformed one.
const ABSENT_MARKERS: &[&str] = &["", "-", "--", "n/a", "na", "none", "/", "—", "－"];

/// A normalized chemical registry number.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct RegistryNumber(String);

impl RegistryNumber {
    /// Extract and normalize a registry number from free text.
    ///
    /// Returns `Ok(None)` for blank cells and not-applicable markers.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidRegistryNumber`] when the text is
    /// neither absent nor contains a `digits-digits-digit` number.
    pub fn parse(raw: &str) -> Result<Option<Self>, ValidationError> {
        let trimmed = raw.trim();
        if ABSENT_MARKERS.contains(&trimmed.to_lowercase().as_str()) {
            return Ok(None);
        }
        let folded: String = trimmed
            .nfkc()
            .map(|c| match c {
                '\u{2010}'..='\u{2015}' | '\u{2212}' => '-',
                other => other,
            })
            .collect();
        let caps = registry_pattern()
            .captures(&folded)
            .ok_or_else(|| ValidationError::InvalidRegistryNumber(raw.to_string()))?;
        let head = caps[1].trim_start_matches('0');
        if head.len() < 2 {
            return Err(ValidationError::InvalidRegistryNumber(raw.to_string()));
        }
        Ok(Some(Self(format!("{head}-{}-{}", &caps[2], &caps[3]))))
    }

    /// Parse text that must contain a registry number.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidRegistryNumber`] for blank input as
    /// well as malformed input.
    pub fn new(raw: &str) -> Result<Self, ValidationError> {
        Self::parse(raw)?.ok_or_else(|| ValidationError::InvalidRegistryNumber(raw.to_string()))
    }

    /// Access the normalized number.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the trailing check digit matches the weighted digit sum.
    ///
    /// Digits before the check digit are weighted 1, 2, 3, ... from the
    /// right; the sum modulo 10 must equal the check digit.
    pub fn has_valid_check_digit(&self) -> bool {
        let digits: Vec<u32> = self.0.chars().filter_map(|c| c.to_digit(10)).collect();
        let Some((&check, body)) = digits.split_last() else {
            return false;
        };
        let sum: u32 = body
            .iter()
            .rev()
            .enumerate()
            .map(|(i, d)| (i as u32 + 1) * d)
            .sum();
        sum % 10 == check
    }
}

impl fmt::Display for RegistryNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for RegistryNumber {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::new(&raw).map_err(serde::de::Error::custom)
    }
}
