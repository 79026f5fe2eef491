use sqlx::PgPool;
use water_client::{
    db::{meter_queries, reading_queries},
    domain::{Meter, MeterReadingRow, PeriodRange, Reading},
};

use super::{ReadingStore, StoreError};

/// [`ReadingStore`] over the hosted Postgres database.
#[derive(Clone)]
pub struct PgReadingStore {
    pool: PgPool,
}

impl PgReadingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn backend_error(op: &'static str, e: anyhow::Error) -> StoreError {
    tracing::error!(error = %e, op, "backend query failed");
    metrics::counter!("backend_errors_total", "op" => op).increment(1);
    StoreError::Query(e.to_string())
}

#[async_trait::async_trait]
impl ReadingStore for PgReadingStore {
    async fn meter(&self, meter_id: i64) -> Result<Option<Meter>, StoreError> {
        meter_queries::find_meter(&self.pool, meter_id)
            .await
            .map_err(|e| backend_error("find_meter", e))
    }

    async fn meters(&self) -> Result<Vec<Meter>, StoreError> {
        meter_queries::list_meters(&self.pool)
            .await
            .map_err(|e| backend_error("list_meters", e))
    }

    async fn meter_count(&self) -> Result<i64, StoreError> {
        meter_queries::count_meters(&self.pool)
            .await
            .map_err(|e| backend_error("count_meters", e))
    }

    async fn meter_readings(
        &self,
        meter_id: i64,
        range: &PeriodRange,
    ) -> Result<Vec<Reading>, StoreError> {
        reading_queries::meter_readings(&self.pool, meter_id, range)
            .await
            .map_err(|e| backend_error("meter_readings", e))
    }

    async fn sector_readings(
        &self,
        sector: Option<&str>,
        range: &PeriodRange,
    ) -> Result<Vec<MeterReadingRow>, StoreError> {
        reading_queries::readings_with_meters(&self.pool, sector, range)
            .await
            .map_err(|e| backend_error("readings_with_meters", e))
    }

    async fn update_meter_value(&self, reading_id: i64, meter_value: f64) -> Result<bool, StoreError> {
        reading_queries::update_meter_value(&self.pool, reading_id, meter_value)
            .await
            .map(|affected| affected > 0)
            .map_err(|e| backend_error("update_meter_value", e))
    }
}
