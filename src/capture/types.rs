//! Core types for dot capture
//!
//! Defines the raw pen sample and the page identifier every sample carries.

use crate::time::timebase::Timestamp;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// Pen phase of a dot sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum DotType {
    /// Tip touched the paper
    PenDown = 0,
    /// Tip moving on the paper
    PenMove = 1,
    /// Tip lifted
    PenUp = 2,
    /// Pen hovering above the paper
    PenHover = 3,
}

impl DotType {
    /// Check if this sample is pen motion, touching or hovering
    pub fn is_motion(&self) -> bool {
        matches!(self, DotType::PenMove | DotType::PenHover)
    }
}

/// Identifier of one physical printed sheet: `"{section}-{note}-{page}"`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PagePattern {
    pub section: u32,
    pub note: u32,
    pub page: u32,
}

impl PagePattern {
    pub const fn new(section: u32, note: u32, page: u32) -> Self {
        Self {
            section,
            note,
            page,
        }
    }
}

impl fmt::Display for PagePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.section, self.note, self.page)
    }
}

static PATTERN_SYNTAX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d+)-(\d+)-(\d+)\s*$").expect("valid regex"));

impl FromStr for PagePattern {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || crate::Error::Catalog(format!("invalid page pattern '{}'", s));
        let caps = PATTERN_SYNTAX.captures(s).ok_or_else(invalid)?;
        let field = |i: usize| -> Result<u32, crate::Error> {
            caps[i].parse::<u32>().map_err(|_| invalid())
        };
        Ok(Self::new(field(1)?, field(2)?, field(3)?))
    }
}

impl Serialize for PagePattern {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PagePattern {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// One raw pen sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dot {
    /// Driver timestamp
    pub timestamp: Timestamp,
    pub section: u32,
    pub note: u32,
    pub page: u32,
    /// Position (pen units)
    pub x: f64,
    pub y: f64,
    /// Pen phase
    #[serde(rename = "type")]
    pub dot_type: DotType,
    /// Tip pressure, when the pen reports it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub force: Option<u16>,
}

impl Dot {
    /// Create a dot on the given sheet
    pub fn new(
        timestamp: Timestamp,
        pattern: PagePattern,
        x: f64,
        y: f64,
        dot_type: DotType,
    ) -> Self {
        Self {
            timestamp,
            section: pattern.section,
            note: pattern.note,
            page: pattern.page,
            x,
            y,
            dot_type,
            force: None,
        }
    }

    /// Attach a pressure reading
    pub fn with_force(mut self, force: u16) -> Self {
        self.force = Some(force);
        self
    }

    /// The sheet this dot was written on
    pub fn pattern(&self) -> PagePattern {
        PagePattern::new(self.section, self.note, self.page)
    }

    pub fn position(&self) -> (f64, f64) {
        (self.x, self.y)
    }
}
