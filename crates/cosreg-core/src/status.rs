//! # Regulatory Status and Priority
//!
//! Every regulatory record carries exactly one [`Status`]. Statuses form a
//! total order by restrictiveness: when several records classify the same
//! ingredient within one jurisdiction, the most restrictive one is
//! authoritative.
//!
//! ```text
//! Prohibited (1) > Restricted (2) > Allowed (3) > Listed (4) > NotListed (5) > NotSpecified (6)
//! ```
//!
//! Lower rank wins. `Ord` on [`Status`] follows rank, so `min()` over a set
//! of statuses yields the authoritative one.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Regulatory status of an ingredient in one jurisdiction/category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Must not be used in cosmetic products.
    Prohibited,
    /// Permitted subject to limits or conditions.
    Restricted,
    /// Explicitly permitted for a specific function (preservative, UV filter, colorant).
    Allowed,
    /// Present on a general ingredient inventory.
    Listed,
    /// Absent from a general ingredient inventory that was consulted.
    NotListed,
    /// The jurisdiction's lists say nothing about the ingredient.
    NotSpecified,
}

/// Status priority order, most restrictive first.
pub const STATUS_PRIORITY: [Status; Status::COUNT] = [
    Status::Prohibited,
    Status::Restricted,
    Status::Allowed,
    Status::Listed,
    Status::NotListed,
    Status::NotSpecified,
];

impl Status {
    /// Total number of statuses.
    pub const COUNT: usize = 6;

    /// Returns all statuses in priority order.
    pub fn all() -> &'static [Status] {
        &STATUS_PRIORITY
    }

    /// Priority rank, 1 (most restrictive) through 6.
    pub fn rank(self) -> u8 {
        match self {
            Self::Prohibited => 1,
            Self::Restricted => 2,
            Self::Allowed => 3,
            Self::Listed => 4,
            Self::NotListed => 5,
            Self::NotSpecified => 6,
        }
    }

    /// The more restrictive of two statuses.
    pub fn strictest(self, other: Self) -> Self {
        if self.rank() <= other.rank() {
            self
        } else {
            other
        }
    }

    /// Whether the status carries regulatory content (anything except
    /// [`Status::NotSpecified`]).
    pub fn is_specified(self) -> bool {
        !matches!(self, Self::NotSpecified)
    }

    /// Canonical snake_case name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Prohibited => "prohibited",
            Self::Restricted => "restricted",
            Self::Allowed => "allowed",
            Self::Listed => "listed",
            Self::NotListed => "not_listed",
            Self::NotSpecified => "not_specified",
        }
    }
}

impl PartialOrd for Status {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Status {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = ValidationError;

    /// Parses source vocabulary: canonical names, title-case labels,
    /// hyphen/space variants, and the Chinese/Japanese labels seen in
    /// source lists.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s
            .trim()
            .to_lowercase()
            .replace(['-', ' '], "_");
        let status = match key.as_str() {
            "prohibited" | "banned" | "禁用" | "禁止" | "配合禁止" => Self::Prohibited,
            "restricted" | "limited" | "限用" | "配合制限" => Self::Restricted,
            "allowed" | "permitted" | "准用" | "許可" => Self::Allowed,
            "listed" | "已使用" | "収載" => Self::Listed,
            "not_listed" | "unlisted" | "未收录" => Self::NotListed,
            "not_specified" | "unspecified" | "未规定" => Self::NotSpecified,
            _ => return Err(ValidationError::UnknownStatus(s.to_string())),
        };
        Ok(status)
    }
}
