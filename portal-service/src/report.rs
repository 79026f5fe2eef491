//! Individual-meter and sector consumption reports.

use std::collections::HashSet;

use serde::Serialize;
use time::{macros::format_description, Date};
use water_client::domain::{Meter, Period, PeriodRange, Reading};

use crate::{
    aggregate::{
        coerce_amount, period_totals, round2, sorted_sum, ConsumptionRecord, PeriodTotal, SectorAllowList,
    },
    error::PortalError,
    store::ReadingStore,
};

/// Inclusive calendar-date bounds for a report. Either side may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: Option<Date>,
    pub end: Option<Date>,
}

fn parse_date(field: &str, raw: &str) -> Result<Date, PortalError> {
    Date::parse(raw.trim(), format_description!("[year]-[month]-[day]"))
        .map_err(|_| PortalError::invalid(format!("{field} date '{raw}' is not in YYYY-MM-DD form")))
}

impl DateRange {
    /// Parse optional `YYYY-MM-DD` bounds. Blank values count as absent.
    pub fn parse(start: Option<&str>, end: Option<&str>) -> Result<Self, PortalError> {
        let start = start
            .filter(|s| !s.trim().is_empty())
            .map(|s| parse_date("start", s))
            .transpose()?;
        let end = end
            .filter(|s| !s.trim().is_empty())
            .map(|s| parse_date("end", s))
            .transpose()?;

        let range = Self { start, end };
        range.validate()?;
        Ok(range)
    }

    pub fn validate(&self) -> Result<(), PortalError> {
        match (self.start, self.end) {
            (Some(start), Some(end)) if start > end => Err(PortalError::invalid(format!(
                "start date {start} is after end date {end}"
            ))),
            _ => Ok(()),
        }
    }

    /// Readings are matched on the period each bound falls in.
    pub fn periods(&self) -> PeriodRange {
        PeriodRange {
            from: self.start.map(Period::from_date),
            to: self.end.map(Period::from_date),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", content = "value", rename_all = "snake_case")]
pub enum ReportTarget {
    Meter(i64),
    Sector(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportFilter {
    pub target: ReportTarget,
    pub range: DateRange,
}

/// A reading prepared for a time-series chart or table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReadingPoint {
    pub reading_id: i64,
    pub period: Period,
    pub label: String,
    pub meter_value: f64,
    pub consumption_m3: f64,
}

impl From<&Reading> for ReadingPoint {
    fn from(r: &Reading) -> Self {
        let period = r.period();
        ReadingPoint {
            reading_id: r.reading_id,
            period,
            label: period.label(),
            meter_value: coerce_amount(r.meter_value.as_deref()),
            consumption_m3: r.consumption_m3(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeterReport {
    pub meter: Meter,
    pub range: DateRange,
    pub readings: Vec<ReadingPoint>,
    pub total_m3: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectorReport {
    pub sector: String,
    pub range: DateRange,
    pub meter_count: usize,
    pub periods: Vec<PeriodTotal>,
    pub grand_total_m3: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyReason {
    UnknownMeter,
    UnknownSector,
    NoReadingsInRange,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Report {
    Meter(MeterReport),
    Sector(SectorReport),
    Empty {
        target: ReportTarget,
        reason: EmptyReason,
    },
}

/// A meter together with all of its readings in chronological order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeterHistory {
    pub meter: Meter,
    pub readings: Vec<ReadingPoint>,
}

pub struct ReportAssembler<'a> {
    store: &'a dyn ReadingStore,
    sectors: &'a SectorAllowList,
}

impl<'a> ReportAssembler<'a> {
    pub fn new(store: &'a dyn ReadingStore, sectors: &'a SectorAllowList) -> Self {
        Self { store, sectors }
    }

    /// Build the report described by `filter`.
    ///
    /// The range is validated before the backend is contacted.
    pub async fn assemble(&self, filter: &ReportFilter) -> Result<Report, PortalError> {
        filter.range.validate()?;

        match &filter.target {
            ReportTarget::Meter(meter_id) => self.meter_report(*meter_id, filter.range).await,
            ReportTarget::Sector(sector) => self.sector_report(sector, filter.range).await,
        }
    }

    async fn meter_report(&self, meter_id: i64, range: DateRange) -> Result<Report, PortalError> {
        let empty = |reason| Report::Empty {
            target: ReportTarget::Meter(meter_id),
            reason,
        };

        let Some(meter) = self.store.meter(meter_id).await? else {
            return Ok(empty(EmptyReason::UnknownMeter));
        };

        let mut readings = self.store.meter_readings(meter_id, &range.periods()).await?;
        if readings.is_empty() {
            tracing::info!(meter_id, "no readings in requested range");
            return Ok(empty(EmptyReason::NoReadingsInRange));
        }
        readings.sort_by_key(|r| r.period());

        let total = sorted_sum(readings.iter().map(|r| r.consumption_m3()));
        let readings: Vec<ReadingPoint> = readings.iter().map(ReadingPoint::from).collect();

        metrics::counter!("reports_generated_total", "mode" => "meter").increment(1);
        tracing::info!(meter_id, readings = readings.len(), "meter report assembled");

        Ok(Report::Meter(MeterReport {
            meter,
            range,
            readings,
            total_m3: round2(total),
        }))
    }

    async fn sector_report(&self, sector: &str, range: DateRange) -> Result<Report, PortalError> {
        let empty = |reason| Report::Empty {
            target: ReportTarget::Sector(sector.to_string()),
            reason,
        };

        if !self.sectors.contains(sector) {
            tracing::debug!(sector, "sector not in allow-list, excluded");
            return Ok(empty(EmptyReason::UnknownSector));
        }

        let rows = self.store.sector_readings(Some(sector), &range.periods()).await?;
        if rows.is_empty() {
            return Ok(empty(EmptyReason::NoReadingsInRange));
        }

        let meter_count = rows.iter().map(|r| r.meter_id).collect::<HashSet<_>>().len();
        let grand_total = sorted_sum(rows.iter().map(|r| r.consumption_m3()));
        let periods = period_totals(rows.as_slice());

        metrics::counter!("reports_generated_total", "mode" => "sector").increment(1);
        tracing::info!(sector, meter_count, periods = periods.len(), "sector report assembled");

        Ok(Report::Sector(SectorReport {
            sector: sector.to_string(),
            range,
            meter_count,
            periods,
            grand_total_m3: round2(grand_total),
        }))
    }
}

/// Fetch a meter and its full reading history, oldest first.
pub async fn meter_history(store: &dyn ReadingStore, meter_id: i64) -> Result<MeterHistory, PortalError> {
    let meter = store
        .meter(meter_id)
        .await?
        .ok_or(PortalError::MeterNotFound(meter_id))?;

    let mut readings = store.meter_readings(meter_id, &PeriodRange::default()).await?;
    readings.sort_by_key(|r| r.period());

    Ok(MeterHistory {
        meter,
        readings: readings.iter().map(ReadingPoint::from).collect(),
    })
}
