use std::fmt;

use time::Date;

/// A billing cycle identified by (month, year).
///
/// Ordering is chronological: year first, then month. Field order matters
/// for the derived `Ord`. Values are not validated, so a month of 13 is kept
/// as-is and sorts after December of the same year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Period {
    pub year: i32,
    pub month: i32,
}

impl Period {
    pub fn new(month: i32, year: i32) -> Self {
        Self { year, month }
    }

    /// The period a calendar date falls in.
    pub fn from_date(date: Date) -> Self {
        Self::new(u8::from(date.month()) as i32, date.year())
    }

    /// Human-readable label, e.g. `3/2024`.
    pub fn label(&self) -> String {
        format!("{}/{}", self.month, self.year)
    }

    /// Sortable text key, e.g. `2024-03`.
    pub fn key(&self) -> String {
        format!("{:04}-{:02}", self.year, self.month)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Inclusive period bounds; a missing side is unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PeriodRange {
    pub from: Option<Period>,
    pub to: Option<Period>,
}

impl PeriodRange {
    pub fn is_unbounded(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }

    pub fn contains(&self, period: Period) -> bool {
        self.from.map_or(true, |from| period >= from) && self.to.map_or(true, |to| period <= to)
    }
}
