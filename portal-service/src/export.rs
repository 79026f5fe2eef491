//! Tabular export of readings for spreadsheet tools.

use std::io;

use water_client::domain::MeterReadingRow;

use crate::store::ReadingStore;

/// Column order of every export.
pub const EXPORT_COLUMNS: [&str; 7] = [
    "meter_id",
    "client_name",
    "sector",
    "address",
    "meter_value",
    "month",
    "year",
];

#[derive(thiserror::Error, Debug)]
pub enum ExportError {
    #[error("csv write failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("export io failed: {0}")]
    Io(#[from] io::Error),
    #[error("backend error: {0}")]
    Backend(#[from] crate::store::StoreError),
}

fn export_record(row: &MeterReadingRow) -> [String; 7] {
    [
        row.meter_id.to_string(),
        row.client_name.clone(),
        row.sector.clone().unwrap_or_default(),
        row.address.clone().unwrap_or_default(),
        row.meter_value.as_deref().map(str::trim).unwrap_or_default().to_string(),
        row.month.to_string(),
        row.year.to_string(),
    ]
}

/// Write `rows` as CSV with a header, ordered by meter then period.
///
/// Returns the number of data rows written.
pub fn write_csv<W: io::Write>(rows: &[MeterReadingRow], out: W) -> Result<usize, ExportError> {
    let mut ordered: Vec<&MeterReadingRow> = rows.iter().collect();
    ordered.sort_by_key(|r| (r.meter_id, r.period()));

    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(EXPORT_COLUMNS)?;
    for row in &ordered {
        writer.write_record(export_record(row))?;
    }
    writer.flush()?;

    metrics::counter!("export_rows_total").increment(ordered.len() as u64);
    Ok(ordered.len())
}

pub fn to_csv_bytes(rows: &[MeterReadingRow]) -> Result<Vec<u8>, ExportError> {
    let mut buf = Vec::new();
    write_csv(rows, &mut buf)?;
    Ok(buf)
}

/// Fetch every reading, or one sector's, and render the export.
pub async fn export_readings(store: &dyn ReadingStore, sector: Option<&str>) -> Result<Vec<u8>, ExportError> {
    let rows = store.sector_readings(sector, &Default::default()).await?;
    tracing::info!(sector, rows = rows.len(), "exporting readings");
    to_csv_bytes(&rows)
}
