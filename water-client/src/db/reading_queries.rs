use anyhow::Result;
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::domain::{MeterReadingRow, PeriodRange, Reading};

/// Append `(anio, mes)` bounds for whichever sides of the range are set.
fn push_period_range(builder: &mut QueryBuilder<'_, Postgres>, range: &PeriodRange) {
    if let Some(from) = range.from {
        builder
            .push(" AND (l.anio::int, l.mes::int) >= (")
            .push_bind(from.year)
            .push(", ")
            .push_bind(from.month)
            .push(")");
    }
    if let Some(to) = range.to {
        builder
            .push(" AND (l.anio::int, l.mes::int) <= (")
            .push_bind(to.year)
            .push(", ")
            .push_bind(to.month)
            .push(")");
    }
}

/// Fetch a meter's readings, optionally restricted to a period range.
///
/// `lectura` and `consumo` are read as text so that rows stored either as
/// numbers or as free text decode into the same record.
pub async fn meter_readings(
    pool: &PgPool,
    meter_id: i64,
    range: &PeriodRange,
) -> Result<Vec<Reading>> {
    let mut builder = QueryBuilder::<Postgres>::new(
        r#"
        SELECT
            l.id_lectura::bigint AS reading_id,
            l.id_medidor::bigint AS meter_id,
            l.mes::int           AS month,
            l.anio::int          AS year,
            l.lectura::text      AS meter_value,
            l.consumo::text      AS consumption
        FROM lecturas l
        WHERE l.id_medidor = "#,
    );
    builder.push_bind(meter_id);
    push_period_range(&mut builder, range);
    builder.push(" ORDER BY l.anio, l.mes");

    let rows = builder
        .build_query_as::<Reading>()
        .fetch_all(pool)
        .await?;

    Ok(rows)
}

/// Fetch readings joined with their meter's identity.
///
/// With `sector` set, only meters in that sector are returned.
pub async fn readings_with_meters(
    pool: &PgPool,
    sector: Option<&str>,
    range: &PeriodRange,
) -> Result<Vec<MeterReadingRow>> {
    let mut builder = QueryBuilder::<Postgres>::new(
        r#"
        SELECT
            m.id_medidor::bigint AS meter_id,
            m.nombre_cliente     AS client_name,
            m.direccion          AS address,
            m.sector,
            l.id_lectura::bigint AS reading_id,
            l.mes::int           AS month,
            l.anio::int          AS year,
            l.lectura::text      AS meter_value,
            l.consumo::text      AS consumption
        FROM lecturas l
        JOIN datos_medidor m ON m.id_medidor = l.id_medidor
        WHERE TRUE"#,
    );
    if let Some(sector) = sector {
        builder.push(" AND m.sector = ").push_bind(sector.to_string());
    }
    push_period_range(&mut builder, range);
    builder.push(" ORDER BY m.id_medidor, l.anio, l.mes");

    let rows = builder
        .build_query_as::<MeterReadingRow>()
        .fetch_all(pool)
        .await?;

    Ok(rows)
}

/// Overwrite the recorded meter value of one reading.
///
/// Consumption is left untouched; the backend derives it. Returns the
/// number of rows affected.
pub async fn update_meter_value(pool: &PgPool, reading_id: i64, meter_value: f64) -> Result<u64> {
    let result = sqlx::query("UPDATE lecturas SET lectura = $1 WHERE id_lectura = $2")
        .bind(meter_value)
        .bind(reading_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}
