use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::Mutex;
use water_client::domain::{Meter, MeterReadingRow, PeriodRange, Reading};

use super::{ReadingStore, StoreError};

/// In-memory backend double that counts every call it receives.
pub(crate) struct MemoryStore {
    meters: Vec<Meter>,
    readings: Mutex<Vec<Reading>>,
    calls: AtomicUsize,
    failure: Option<String>,
}

impl MemoryStore {
    pub(crate) fn new(meters: Vec<Meter>, readings: Vec<Reading>) -> Self {
        Self {
            meters,
            readings: Mutex::new(readings),
            calls: AtomicUsize::new(0),
            failure: None,
        }
    }

    /// A store whose every call fails with `message`.
    pub(crate) fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::new(vec![], vec![])
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) async fn reading(&self, reading_id: i64) -> Option<Reading> {
        self.readings
            .lock()
            .await
            .iter()
            .find(|r| r.reading_id == reading_id)
            .cloned()
    }

    fn enter(&self) -> Result<(), StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.failure {
            Some(msg) => Err(StoreError::Query(msg.clone())),
            None => Ok(()),
        }
    }
}

pub(crate) fn meter(meter_id: i64, client_name: &str, sector: Option<&str>) -> Meter {
    Meter {
        meter_id,
        client_name: client_name.to_string(),
        address: Some(format!("Calle {meter_id}")),
        sector: sector.map(str::to_string),
    }
}

pub(crate) fn reading(reading_id: i64, meter_id: i64, month: i32, year: i32, consumption: &str) -> Reading {
    Reading {
        reading_id,
        meter_id,
        month,
        year,
        meter_value: Some((reading_id * 100).to_string()),
        consumption: Some(consumption.to_string()),
    }
}

#[async_trait::async_trait]
impl ReadingStore for MemoryStore {
    async fn meter(&self, meter_id: i64) -> Result<Option<Meter>, StoreError> {
        self.enter()?;
        Ok(self.meters.iter().find(|m| m.meter_id == meter_id).cloned())
    }

    async fn meters(&self) -> Result<Vec<Meter>, StoreError> {
        self.enter()?;
        Ok(self.meters.clone())
    }

    async fn meter_count(&self) -> Result<i64, StoreError> {
        self.enter()?;
        Ok(self.meters.len() as i64)
    }

    async fn meter_readings(
        &self,
        meter_id: i64,
        range: &PeriodRange,
    ) -> Result<Vec<Reading>, StoreError> {
        self.enter()?;
        Ok(self
            .readings
            .lock()
            .await
            .iter()
            .filter(|r| r.meter_id == meter_id && range.contains(r.period()))
            .cloned()
            .collect())
    }

    async fn sector_readings(
        &self,
        sector: Option<&str>,
        range: &PeriodRange,
    ) -> Result<Vec<MeterReadingRow>, StoreError> {
        self.enter()?;
        let readings = self.readings.lock().await;
        let mut rows = Vec::new();
        for r in readings.iter().filter(|r| range.contains(r.period())) {
            let Some(m) = self.meters.iter().find(|m| m.meter_id == r.meter_id) else {
                continue;
            };
            if sector.is_some() && m.sector.as_deref() != sector {
                continue;
            }
            rows.push(MeterReadingRow {
                meter_id: m.meter_id,
                client_name: m.client_name.clone(),
                address: m.address.clone(),
                sector: m.sector.clone(),
                reading_id: r.reading_id,
                month: r.month,
                year: r.year,
                meter_value: r.meter_value.clone(),
                consumption: r.consumption.clone(),
            });
        }
        Ok(rows)
    }

    async fn update_meter_value(&self, reading_id: i64, meter_value: f64) -> Result<bool, StoreError> {
        self.enter()?;
        let mut readings = self.readings.lock().await;
        match readings.iter_mut().find(|r| r.reading_id == reading_id) {
            Some(r) => {
                r.meter_value = Some(meter_value.to_string());
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
