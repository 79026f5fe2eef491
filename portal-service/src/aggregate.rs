//! Consumption aggregation over already-fetched readings.
//!
//! Sums are computed at full precision and rounded to two decimals only when
//! building the presentation records. Consumption that cannot be read as a
//! number counts as zero so a single malformed row never fails a report.

use std::{
    collections::{HashMap, HashSet},
    hash::Hash,
};

use serde::Serialize;
use water_client::domain::{MeterReadingRow, Period, Reading};

/// Parse a stored numeric field, treating missing or unparseable values as 0.
pub fn coerce_amount(raw: Option<&str>) -> f64 {
    let Some(raw) = raw else {
        return 0.0;
    };

    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => {
            metrics::counter!("aggregate_coerced_values_total").increment(1);
            tracing::debug!(value = raw, "non-numeric amount treated as zero");
            0.0
        }
    }
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Anything carrying a period and a stored consumption value.
pub trait ConsumptionRecord {
    fn period(&self) -> Period;
    fn raw_consumption(&self) -> Option<&str>;

    fn consumption_m3(&self) -> f64 {
        coerce_amount(self.raw_consumption())
    }
}

impl ConsumptionRecord for Reading {
    fn period(&self) -> Period {
        Reading::period(self)
    }

    fn raw_consumption(&self) -> Option<&str> {
        self.consumption.as_deref()
    }
}

impl ConsumptionRecord for MeterReadingRow {
    fn period(&self) -> Period {
        MeterReadingRow::period(self)
    }

    fn raw_consumption(&self) -> Option<&str> {
        self.consumption.as_deref()
    }
}

/// Sum `terms` in ascending order, so the result does not depend on the
/// order they arrive in.
pub fn sorted_sum<I: IntoIterator<Item = f64>>(terms: I) -> f64 {
    let mut terms: Vec<f64> = terms.into_iter().collect();
    terms.sort_by(f64::total_cmp);
    terms.into_iter().sum()
}

/// Sum `value` over `rows`, grouped by `key`. Rows whose key is `None` are
/// skipped.
///
/// Each group's terms are added in ascending order, so the result does not
/// depend on the order of `rows`.
pub fn sum_by<'a, T, K, I, FK, FV>(rows: I, key: FK, value: FV) -> HashMap<K, f64>
where
    T: 'a,
    I: IntoIterator<Item = &'a T>,
    K: Eq + Hash,
    FK: Fn(&T) -> Option<K>,
    FV: Fn(&T) -> f64,
{
    let mut groups: HashMap<K, Vec<f64>> = HashMap::new();
    for row in rows {
        if let Some(k) = key(row) {
            groups.entry(k).or_default().push(value(row));
        }
    }

    groups
        .into_iter()
        .map(|(k, terms)| (k, sorted_sum(terms)))
        .collect()
}

/// The sector names that may appear in sector reports.
#[derive(Debug, Clone, Default)]
pub struct SectorAllowList {
    names: HashSet<String>,
}

impl SectorAllowList {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, sector: &str) -> bool {
        self.names.contains(sector)
    }

    /// The row's sector, if it is one of the known names.
    pub fn admit<'r>(&self, row: &'r MeterReadingRow) -> Option<&'r str> {
        row.sector.as_deref().filter(|s| self.contains(s))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodTotal {
    pub period: Period,
    pub label: String,
    pub total_m3: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectorTotal {
    pub sector: String,
    pub total_m3: f64,
    /// Most recent periods first.
    pub recent: Vec<PeriodTotal>,
}

/// Total consumption per period, in chronological order.
pub fn period_totals<R: ConsumptionRecord>(rows: &[R]) -> Vec<PeriodTotal> {
    let mut totals: Vec<(Period, f64)> = sum_by(rows, |r| Some(r.period()), |r| r.consumption_m3())
        .into_iter()
        .collect();
    totals.sort_by_key(|(period, _)| *period);

    totals
        .into_iter()
        .map(|(period, total)| PeriodTotal {
            period,
            label: period.label(),
            total_m3: round2(total),
        })
        .collect()
}

/// Total consumption per known sector, largest first.
///
/// Rows without a sector or with a sector outside `allowed` are dropped.
/// Each entry also carries its `recent` latest periods, newest first.
pub fn sector_totals(rows: &[MeterReadingRow], allowed: &SectorAllowList, recent: usize) -> Vec<SectorTotal> {
    let totals = sum_by(rows, |r| allowed.admit(r).map(str::to_string), |r| r.consumption_m3());

    let mut by_sector: HashMap<&str, Vec<MeterReadingRow>> = HashMap::new();
    for row in rows {
        if let Some(sector) = allowed.admit(row) {
            by_sector.entry(sector).or_default().push(row.clone());
        }
    }

    let mut out: Vec<SectorTotal> = totals
        .into_iter()
        .map(|(sector, total)| {
            let periods = by_sector
                .get(sector.as_str())
                .map(|rows| period_totals(rows.as_slice()))
                .unwrap_or_default();
            let recent = periods.into_iter().rev().take(recent).collect();
            SectorTotal {
                sector,
                total_m3: round2(total),
                recent,
            }
        })
        .collect();

    out.sort_by(|a, b| {
        b.total_m3
            .total_cmp(&a.total_m3)
            .then_with(|| a.sector.cmp(&b.sector))
    });
    out
}
