use serde::{Deserialize, Serialize};
use water_client::domain::{Period, Reading};

use crate::{
    aggregate::{coerce_amount, round2, ConsumptionRecord},
    error::PortalError,
    store::ReadingStore,
};

/// Monthly fixed charge, in pesos.
pub const FIXED_CHARGE: f64 = 3550.0;
/// Price per cubic meter consumed, in pesos.
pub const UNIT_PRICE: f64 = 550.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tariff {
    pub fixed_charge: f64,
    pub unit_price: f64,
}

impl Default for Tariff {
    fn default() -> Self {
        Self {
            fixed_charge: FIXED_CHARGE,
            unit_price: UNIT_PRICE,
        }
    }
}

/// An estimated bill for one reading. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bill {
    pub meter_id: i64,
    pub period: Period,
    pub meter_value: f64,
    pub consumption_m3: f64,
    pub fixed_charge: f64,
    pub consumption_charge: f64,
    pub total: f64,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum BillingError {
    #[error("no readings available")]
    NoReadings,
}

/// The most recent reading by period. Ties keep the last one given.
pub fn latest_reading(readings: &[Reading]) -> Option<&Reading> {
    readings.iter().max_by_key(|r| r.period())
}

/// Bill a single reading. Negative or unreadable consumption is not charged.
pub fn bill_for_reading(reading: &Reading, tariff: &Tariff) -> Bill {
    let consumption = reading.consumption_m3();
    let billable = consumption.max(0.0);
    let consumption_charge = round2(billable * tariff.unit_price);

    Bill {
        meter_id: reading.meter_id,
        period: reading.period(),
        meter_value: coerce_amount(reading.meter_value.as_deref()),
        consumption_m3: consumption,
        fixed_charge: tariff.fixed_charge,
        consumption_charge,
        total: round2(tariff.fixed_charge + consumption_charge),
    }
}

/// Bill a meter from its latest reading.
pub fn compute_bill(readings: &[Reading], tariff: &Tariff) -> Result<Bill, BillingError> {
    latest_reading(readings)
        .map(|r| bill_for_reading(r, tariff))
        .ok_or(BillingError::NoReadings)
}

/// Fetch a meter's readings and bill the latest one.
///
/// An unknown meter is `MeterNotFound`; a known meter with no readings is
/// `NoReadings`.
pub async fn bill_for_meter(
    store: &dyn ReadingStore,
    meter_id: i64,
    tariff: &Tariff,
) -> Result<Bill, PortalError> {
    if store.meter(meter_id).await?.is_none() {
        return Err(PortalError::MeterNotFound(meter_id));
    }

    let readings = store.meter_readings(meter_id, &Default::default()).await?;

    match compute_bill(&readings, tariff) {
        Ok(bill) => {
            metrics::counter!("bills_computed_total").increment(1);
            tracing::info!(meter_id, period = %bill.period, total = bill.total, "bill computed");
            Ok(bill)
        }
        Err(BillingError::NoReadings) => Err(PortalError::NoReadings(meter_id)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::{meter, reading, MemoryStore};

    #[test]
    fn ten_cubic_meters() {
        let bill = compute_bill(&[reading(1, 7, 5, 2024, "10")], &Tariff::default()).expect("bill");
        assert_eq!(bill.consumption_charge, 5500.0);
        assert_eq!(bill.fixed_charge, 3550.0);
        assert_eq!(bill.total, 9050.0);
        assert_eq!(bill.period, Period::new(5, 2024));
    }

    #[test]
    fn no_readings_is_not_a_fixed_charge_bill() {
        assert_eq!(compute_bill(&[], &Tariff::default()), Err(BillingError::NoReadings));
    }

    #[test]
    fn uses_latest_period_regardless_of_order() {
        let readings = vec![
            reading(1, 7, 3, 2024, "1"),
            reading(2, 7, 11, 2023, "50"),
            reading(3, 7, 12, 2023, "2"),
        ];
        let bill = compute_bill(&readings, &Tariff::default()).expect("bill");
        assert_eq!(bill.period, Period::new(3, 2024));
        assert_eq!(bill.total, 3550.0 + 550.0);
    }

    #[test]
    fn negative_or_missing_consumption_is_not_charged() {
        let mut negative = reading(1, 7, 1, 2024, "-4");
        let bill = bill_for_reading(&negative, &Tariff::default());
        assert_eq!(bill.consumption_charge, 0.0);
        assert_eq!(bill.total, 3550.0);

        negative.consumption = None;
        let bill = bill_for_reading(&negative, &Tariff::default());
        assert_eq!(bill.consumption_m3, 0.0);
        assert_eq!(bill.total, 3550.0);
    }

    #[test]
    fn custom_tariff() {
        let tariff = Tariff {
            fixed_charge: 1000.0,
            unit_price: 100.0,
        };
        let bill = bill_for_reading(&reading(1, 7, 1, 2024, "2.5"), &tariff);
        assert_eq!(bill.total, 1250.0);
    }

    #[tokio::test]
    async fn meter_without_readings_reports_no_readings() {
        let store = MemoryStore::new(vec![meter(7, "Ana", Some("Centro"))], vec![]);
        let err = bill_for_meter(&store, 7, &Tariff::default()).await.unwrap_err();
        assert!(matches!(err, PortalError::NoReadings(7)));
    }

    #[tokio::test]
    async fn unknown_meter_is_not_found() {
        let store = MemoryStore::new(vec![], vec![]);
        let err = bill_for_meter(&store, 99, &Tariff::default()).await.unwrap_err();
        assert!(matches!(err, PortalError::MeterNotFound(99)));
        assert_eq!(store.calls(), 1);
    }

    #[tokio::test]
    async fn backend_failure_passes_message_through() {
        let store = MemoryStore::failing("connection reset");
        let err = bill_for_meter(&store, 7, &Tariff::default()).await.unwrap_err();
        assert_eq!(err.to_string(), "backend error: connection reset");
    }
}
