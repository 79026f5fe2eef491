//! Boundary to the relational backend.
//!
//! Every portal operation reaches the backend through [`ReadingStore`], so
//! the aggregation and report logic can run against the Postgres adapter in
//! production and an in-memory double in tests.

pub mod postgres;

#[cfg(test)]
pub(crate) mod memory;

use water_client::domain::{Meter, MeterReadingRow, PeriodRange, Reading};

pub use postgres::PgReadingStore;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("{0}")]
    Query(String),
}

#[async_trait::async_trait]
pub trait ReadingStore: Send + Sync {
    async fn meter(&self, meter_id: i64) -> Result<Option<Meter>, StoreError>;

    async fn meters(&self) -> Result<Vec<Meter>, StoreError>;

    async fn meter_count(&self) -> Result<i64, StoreError>;

    async fn meter_readings(
        &self,
        meter_id: i64,
        range: &PeriodRange,
    ) -> Result<Vec<Reading>, StoreError>;

    /// Readings joined with meter identity, optionally for one sector only.
    async fn sector_readings(
        &self,
        sector: Option<&str>,
        range: &PeriodRange,
    ) -> Result<Vec<MeterReadingRow>, StoreError>;

    /// Returns `false` when no reading has the given ID.
    async fn update_meter_value(&self, reading_id: i64, meter_value: f64) -> Result<bool, StoreError>;
}
