//! # Concentrations and Unit Conversion
//!
//! Maximum authorized concentrations are stored as an exact integer count of
//! millionths of a percent. Floating point never enters identity, ordering,
//! equality or content digests; on the wire a [`Concentration`] is a decimal
//! string (`"0.2"`). Source values finer than a micro-percent are rounded
//! half up.
//!
//! Source lists quote limits in different units. Conversion factors to
//! percent:
//!
//! | Unit | Factor |
//! |---|---|
//! | `%`, `w/w%`, `g/100g` | 1 |
//! | `g/kg` | 0.1 |
//! | `ppm`, `mg/kg` | 0.0001 |
//! | `ppb` | 0.0000001 |

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ValidationError;

/// Millionths of a percent in one percent.
const SCALE: u64 = 1_000_000;
/// Upper bound: 100 percent.
const MAX_MICROS: u64 = 100 * SCALE;

/// Unit a source list quotes concentrations in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConcentrationUnit {
    /// Percent by weight. Also covers `w/w%` and `g/100g`.
    #[default]
    Percent,
    /// Grams per kilogram.
    GramsPerKilogram,
    /// Parts per million. Also covers `mg/kg`.
    Ppm,
    /// Parts per billion.
    Ppb,
}

impl ConcentrationUnit {
    /// Parse a unit label as written in source documents.
    pub fn from_label(label: &str) -> Option<Self> {
        let key = label.trim().to_lowercase().replace(' ', "");
        let unit = match key.as_str() {
            "%" | "percent" | "w/w%" | "%w/w" | "g/100g" => Self::Percent,
            "g/kg" | "grams_per_kilogram" => Self::GramsPerKilogram,
            "ppm" | "mg/kg" => Self::Ppm,
            "ppb" | "µg/kg" | "μg/kg" | "ug/kg" => Self::Ppb,
            _ => return None,
        };
        Some(unit)
    }

    /// Convert an amount in this unit, given as an integer mantissa scaled by
    /// `10^-exp`, to millionths of a percent, rounding half up. Returns
    /// `None` on overflow.
    fn to_micros(self, mantissa: u128, exp: u32) -> Option<u128> {
        // value_percent = mantissa * 10^-exp * factor; micros = value_percent * 10^6
        let (num_pow, den_pow): (u32, u32) = match self {
            Self::Percent => (6, 0),
            Self::GramsPerKilogram => (5, 0),
            Self::Ppm => (2, 0),
            Self::Ppb => (0, 1),
        };
        let numerator = mantissa.checked_mul(10u128.checked_pow(num_pow)?)?;
        let denominator = 10u128.checked_pow(exp + den_pow)?;
        Some(numerator.checked_add(denominator / 2)? / denominator)
    }
}

impl fmt::Display for ConcentrationUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Percent => "%",
            Self::GramsPerKilogram => "g/kg",
            Self::Ppm => "ppm",
            Self::Ppb => "ppb",
        })
    }
}

/// A concentration limit expressed as a percentage in `0..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Concentration(u64);

/// Outcome of reading a concentration cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConcentrationCell {
    /// A numeric limit.
    Limit(Concentration),
    /// The cell explicitly states there is no numeric limit (`○`, "no limit").
    Unlimited,
    /// Blank or not-applicable.
    Absent,
}

impl Concentration {
    /// Zero percent.
    pub const ZERO: Self = Self(0);

    /// Construct from millionths of a percent.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::ConcentrationOutOfRange`] above 100%.
    pub fn from_micros(micros: u64) -> Result<Self, ValidationError> {
        if micros > MAX_MICROS {
            return Err(ValidationError::ConcentrationOutOfRange {
                value: format_micros(micros),
            });
        }
        Ok(Self(micros))
    }

    /// Millionths of a percent.
    pub fn micros(self) -> u64 {
        self.0
    }

    /// Parse a percentage given as decimal text without unit (`"0.2"`).
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidConcentration`] or
    /// [`ValidationError::ConcentrationOutOfRange`].
    pub fn from_percent_str(raw: &str) -> Result<Self, ValidationError> {
        Self::from_amount(raw, raw.trim(), ConcentrationUnit::Percent)
    }

    /// Read a concentration cell, converting from `default_unit` unless the
    /// text carries its own unit (`"1000 ppm"`, `"0.5%"`).
    ///
    /// Ranges and compound cells (`"0.1-0.5%"`, `"2.5% (rinse-off)"`) take the
    /// first number, which is the figure source lists put first for the
    /// most general product scope. A unit written after the upper bound of a
    /// range applies to the lower bound too.
    ///
    /// Comma thousands grouping (`"1,000"`) and decimal commas (`"0,5"`) are
    /// accepted. A single comma followed by exactly three digits is grouping
    /// unless the integer part is zero. Values finer than 0.000001% are
    /// rounded to the nearest micro-percent.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidConcentration`] when no number can be
    /// read, the digit grouping is malformed, or another number follows the
    /// first without a separator (`"1 000"`). Returns
    /// [`ValidationError::ConcentrationOutOfRange`] when the converted value
    /// lies outside `0..=100`.
    pub fn parse_cell(
        raw: &str,
        default_unit: ConcentrationUnit,
    ) -> Result<ConcentrationCell, ValidationError> {
        let text = raw.trim();
        let lowered = text.to_lowercase();
        if matches!(lowered.as_str(), "" | "-" | "－" | "n/a" | "na" | "none" | "/") {
            return Ok(ConcentrationCell::Absent);
        }
        if matches!(
            lowered.as_str(),
            "○" | "〇" | "unlimited" | "no limit" | "not limited" | "无限制"
        ) {
            return Ok(ConcentrationCell::Unlimited);
        }

        let (prefix, token, tail) =
            locate_number(text).ok_or_else(|| invalid(raw, "no numeric value"))?;
        if prefix.trim_end().ends_with('-') {
            return Err(ValidationError::ConcentrationOutOfRange {
                value: text.to_string(),
            });
        }
        let number = decimal_text(token).map_err(|reason| invalid(raw, reason))?;
        let unit = cell_unit(tail, default_unit).map_err(|reason| invalid(raw, reason))?;
        Self::from_amount(raw, &number, unit).map(ConcentrationCell::Limit)
    }

    fn from_amount(raw: &str, number: &str, unit: ConcentrationUnit) -> Result<Self, ValidationError> {
        if let Some(stripped) = number.strip_prefix('-') {
            if !stripped.is_empty() {
                return Err(ValidationError::ConcentrationOutOfRange {
                    value: number.to_string(),
                });
            }
        }
        let (int_part, frac_part) = match number.split_once('.') {
            Some((i, f)) => (i, f),
            None => (number, ""),
        };
        let well_formed = !(int_part.is_empty() && frac_part.is_empty())
            && int_part.chars().all(|c| c.is_ascii_digit())
            && frac_part.chars().all(|c| c.is_ascii_digit());
        if !well_formed {
            return Err(invalid(raw, "not a decimal number"));
        }
        let frac_trimmed = frac_part.trim_end_matches('0');
        let frac_kept = &frac_trimmed[..frac_trimmed.len().min(MAX_FRACTION_DIGITS)];
        let digits = format!("{int_part}{frac_kept}");
        let digits = digits.trim_start_matches('0');
        let mantissa: u128 = if digits.is_empty() {
            0
        } else {
            digits.parse().map_err(|_| invalid(raw, "number too large"))?
        };
        let micros = unit
            .to_micros(mantissa, frac_kept.len() as u32)
            .filter(|m| *m <= u128::from(MAX_MICROS))
            .ok_or_else(|| ValidationError::ConcentrationOutOfRange {
                value: number.to_string(),
            })?;
        Self::from_micros(micros as u64)
    }
}

/// Fraction digits beyond this cannot change the rounded micro-percent value
/// in any supported unit.
const MAX_FRACTION_DIGITS: usize = 18;

fn invalid(raw: &str, reason: &str) -> ValidationError {
    ValidationError::InvalidConcentration {
        raw: raw.to_string(),
        reason: reason.to_string(),
    }
}

/// Split `text` around its first number: `(prefix, number, tail)`.
///
/// A number starts at a digit, or at a `.` followed by a digit, and runs
/// over digit groups joined by single `.` or `,` characters.
fn locate_number(text: &str) -> Option<(&str, &str, &str)> {
    let bytes = text.as_bytes();
    let start = bytes.iter().enumerate().position(|(i, b)| {
        b.is_ascii_digit() || (*b == b'.' && bytes.get(i + 1).is_some_and(u8::is_ascii_digit))
    })?;
    let mut end = start;
    loop {
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
        let joined = matches!(bytes.get(end), Some(b'.' | b','))
            && bytes.get(end + 1).is_some_and(u8::is_ascii_digit);
        if !joined {
            break;
        }
        end += 1;
    }
    Some((&text[..start], &text[start..end], &text[end..]))
}

/// Rewrite a number token with `.` as the only separator.
fn decimal_text(token: &str) -> Result<String, &'static str> {
    let Some(pos) = token.rfind(['.', ',']) else {
        return Ok(token.to_string());
    };
    let (mark, other) = if token[pos..].starts_with('.') {
        ('.', ',')
    } else {
        (',', '.')
    };
    let (head, tail) = (&token[..pos], &token[pos + 1..]);

    if head.contains(mark) {
        // Repeated mark: only comma grouping without a decimal part.
        if mark == '.' || token.contains(other) {
            return Err("ambiguous digit separators");
        }
        return ungroup(token, ',');
    }
    if head.contains(other) {
        return Ok(format!("{}.{tail}", ungroup(head, other)?));
    }
    let thousands = mark == ','
        && tail.len() == 3
        && (1..=3).contains(&head.len())
        && !head.starts_with('0');
    if thousands {
        Ok(format!("{head}{tail}"))
    } else {
        Ok(format!("{head}.{tail}"))
    }
}

/// Join digit groups: a leading group of one to three digits, then groups
/// of exactly three.
fn ungroup(text: &str, separator: char) -> Result<String, &'static str> {
    let mut groups = text.split(separator);
    let lead = groups.next().unwrap_or_default();
    if !(1..=3).contains(&lead.len()) {
        return Err("malformed digit grouping");
    }
    let mut out = lead.to_string();
    for group in groups {
        if group.len() != 3 {
            return Err("malformed digit grouping");
        }
        out.push_str(group);
    }
    Ok(out)
}

/// Unit for the text after the first number.
fn cell_unit(tail: &str, default_unit: ConcentrationUnit) -> Result<ConcentrationUnit, &'static str> {
    let tail = tail.trim_start();
    if let Some(unit) = unit_label(tail) {
        return Ok(unit);
    }
    if let Some(rest) = tail.strip_prefix(['-', '~', '–', '～']) {
        return match locate_number(rest.trim_start()) {
            Some(("", _, after)) => cell_unit(after, default_unit),
            _ => Ok(default_unit),
        };
    }
    if locate_number(tail).is_some_and(|(prefix, _, _)| prefix.is_empty()) {
        return Err("unexpected number after value");
    }
    Ok(default_unit)
}

/// Read an explicit unit label at the start of `tail`.
fn unit_label(tail: &str) -> Option<ConcentrationUnit> {
    let lowered = tail.to_lowercase();
    const LABELS: &[&str] = &[
        "w/w%", "g/100g", "g/100 g", "g/kg", "mg/kg", "µg/kg", "μg/kg", "ppm", "ppb", "%",
    ];
    LABELS
        .iter()
        .find(|label| lowered.starts_with(*label))
        .and_then(|label| ConcentrationUnit::from_label(label))
}

fn format_micros(micros: u64) -> String {
    let int = micros / SCALE;
    let frac = micros % SCALE;
    if frac == 0 {
        return int.to_string();
    }
    let frac = format!("{frac:06}");
    format!("{int}.{}", frac.trim_end_matches('0'))
}

impl fmt::Display for Concentration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_micros(self.0))
    }
}

impl FromStr for Concentration {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_percent_str(s)
    }
}

impl Serialize for Concentration {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Concentration {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Wire {
            Text(String),
            Integer(u64),
            Decimal(f64),
        }
        match Wire::deserialize(deserializer)? {
            Wire::Text(s) => Self::from_percent_str(&s).map_err(serde::de::Error::custom),
            Wire::Integer(n) => n
                .checked_mul(SCALE)
                .ok_or_else(|| serde::de::Error::custom("concentration overflow"))
                .and_then(|m| Self::from_micros(m).map_err(serde::de::Error::custom)),
            Wire::Decimal(f) => {
                Self::from_percent_str(&f.to_string()).map_err(serde::de::Error::custom)
            }
        }
    }
}
