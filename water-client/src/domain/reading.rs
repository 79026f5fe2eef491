use super::Period;

/// One monthly reading of a meter, as stored in `lecturas`.
///
/// `meter_value` and `consumption` are carried as the backend's text
/// rendering; numeric interpretation is left to the caller.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Reading {
    pub reading_id: i64,
    pub meter_id: i64,
    pub month: i32,
    pub year: i32,
    pub meter_value: Option<String>,
    pub consumption: Option<String>,
}

impl Reading {
    pub fn period(&self) -> Period {
        Period::new(self.month, self.year)
    }
}

/// A reading flattened with the identity of the meter it belongs to.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MeterReadingRow {
    pub meter_id: i64,
    pub client_name: String,
    pub address: Option<String>,
    pub sector: Option<String>,
    pub reading_id: i64,
    pub month: i32,
    pub year: i32,
    pub meter_value: Option<String>,
    pub consumption: Option<String>,
}

impl MeterReadingRow {
    pub fn period(&self) -> Period {
        Period::new(self.month, self.year)
    }
}
