//! Course Tiers
//!
//! The fixed set of course levels with their price and access artifact.
//! Prices and join links are configuration constants, never user input.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{EnrollError, Result};

/// Course tier (level)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CourseTier {
    Beginner,
    Intermediate,
    Advanced,
}

/// Static information attached to a tier
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TierInfo {
    pub name: &'static str,
    pub description: &'static str,
    pub price_cents: i64,
    pub duration: &'static str,
    pub schedule: &'static str,
    pub access_link: &'static str,
}

const BEGINNER: TierInfo = TierInfo {
    name: "Beginner",
    description: "12-week beginner level software development course",
    price_cents: 25_000, // $250
    duration: "12 weeks",
    schedule: "Mon/Wed/Fri – 8:00–9:30 AM EST",
    access_link: "https://zoom.us/j/beginner-class",
};

const INTERMEDIATE: TierInfo = TierInfo {
    name: "Intermediate",
    description: "12-week intermediate level software development course",
    price_cents: 35_000, // $350
    duration: "12 weeks",
    schedule: "Mon/Wed/Fri – 12:00–1:30 PM EST",
    access_link: "https://zoom.us/j/intermediate-class",
};

const ADVANCED: TierInfo = TierInfo {
    name: "Advanced",
    description: "12-week advanced level software development course",
    price_cents: 55_000, // $550
    duration: "12 weeks",
    schedule: "Mon/Wed/Fri – 4:00–5:30 PM EST",
    access_link: "https://zoom.us/j/advanced-class",
};

impl CourseTier {
    pub const ALL: [Self; 3] = [Self::Beginner, Self::Intermediate, Self::Advanced];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Beginner => "beginner",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
        }
    }

    pub const fn info(self) -> &'static TierInfo {
        match self {
            Self::Beginner => &BEGINNER,
            Self::Intermediate => &INTERMEDIATE,
            Self::Advanced => &ADVANCED,
        }
    }

    pub const fn price_cents(self) -> i64 {
        self.info().price_cents
    }

    pub const fn access_link(self) -> &'static str {
        self.info().access_link
    }

    /// Resolve a tier carried in processor metadata.
    ///
    /// Unlike request parsing this reports `UnknownTier`: the value was
    /// written by us at checkout time, so a mismatch means the table and
    /// the session disagree rather than the caller sent garbage.
    pub fn from_metadata(value: &str) -> Result<Self> {
        value
            .parse()
            .map_err(|_| EnrollError::UnknownTier(value.to_string()))
    }
}

/// Format an amount in cents as US dollars, e.g. `$250.00`
pub fn format_usd(cents: i64) -> String {
    format!("${}", Decimal::new(cents, 2))
}

impl FromStr for CourseTier {
    type Err = EnrollError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "beginner" => Ok(Self::Beginner),
            "intermediate" => Ok(Self::Intermediate),
            "advanced" => Ok(Self::Advanced),
            _ => Err(EnrollError::InvalidTier(s.to_string())),
        }
    }
}

impl fmt::Display for CourseTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
