use serde::Deserialize;

use crate::{error::PortalError, store::ReadingStore};

/// A new meter value as submitted by an operator: a JSON number or text.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum MeterValueInput {
    Number(f64),
    Text(String),
}

impl MeterValueInput {
    /// Unlike report aggregation, edits reject anything that is not a number.
    pub fn parse(&self) -> Result<f64, PortalError> {
        let value = match self {
            Self::Number(v) => *v,
            Self::Text(raw) => raw
                .trim()
                .parse::<f64>()
                .map_err(|_| PortalError::invalid(format!("meter value '{raw}' is not a number")))?,
        };

        if !value.is_finite() {
            return Err(PortalError::invalid("meter value must be a finite number"));
        }
        Ok(value)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MeterValueUpdate {
    pub meter_value: MeterValueInput,
}

/// Overwrite the meter value of one reading and return the stored value.
///
/// Consumption is not recomputed here; the backend owns it.
pub async fn update_meter_value(
    store: &dyn ReadingStore,
    reading_id: i64,
    input: &MeterValueInput,
) -> Result<f64, PortalError> {
    let value = input.parse()?;

    if !store.update_meter_value(reading_id, value).await? {
        return Err(PortalError::ReadingNotFound(reading_id));
    }

    metrics::counter!("readings_edited_total").increment(1);
    tracing::info!(reading_id, meter_value = value, "meter value updated");
    Ok(value)
}
