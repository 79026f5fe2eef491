use serde::Serialize;
use time::{Date, Month};

use crate::{error::PortalError, store::ReadingStore};

/// Day of the month on which meters are read.
pub const READING_DAY: u8 = 20;
/// Last day of the monthly reading window.
pub const READING_WINDOW_END: u8 = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeSeverity {
    Info,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReadingNotice {
    pub severity: NoticeSeverity,
    pub days_until_reading_day: i64,
    pub message: String,
}

/// The next reading day on or after `today`.
fn next_reading_day(today: Date) -> Option<Date> {
    if today.day() <= READING_DAY {
        return Date::from_calendar_date(today.year(), today.month(), READING_DAY).ok();
    }

    let (year, month) = match today.month() {
        Month::December => (today.year() + 1, Month::January),
        m => (today.year(), m.next()),
    };
    Date::from_calendar_date(year, month, READING_DAY).ok()
}

/// Notice shown to office staff about the monthly meter reading.
pub fn reading_notice(today: Date) -> ReadingNotice {
    let days = next_reading_day(today)
        .map(|target| (target - today).whole_days())
        .unwrap_or(0);

    if (READING_DAY..=READING_WINDOW_END).contains(&today.day()) {
        return ReadingNotice {
            severity: NoticeSeverity::Warning,
            days_until_reading_day: days,
            message: format!(
                "Meter reading window is open (day {READING_DAY} to {READING_WINDOW_END}); record this month's readings."
            ),
        };
    }

    ReadingNotice {
        severity: NoticeSeverity::Info,
        days_until_reading_day: days,
        message: format!("Next meter reading in {days} day(s), on day {READING_DAY}."),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub total_clients: i64,
    pub reading_notice: ReadingNotice,
}

pub async fn load_stats(store: &dyn ReadingStore, today: Date) -> Result<DashboardStats, PortalError> {
    let total_clients = store.meter_count().await?;

    Ok(DashboardStats {
        total_clients,
        reading_notice: reading_notice(today),
    })
}
