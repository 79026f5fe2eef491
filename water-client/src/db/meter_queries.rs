use anyhow::Result;
use sqlx::PgPool;

use crate::domain::Meter;

const METER_COLUMNS: &str = r#"
    id_medidor::bigint AS meter_id,
    nombre_cliente     AS client_name,
    direccion          AS address,
    sector
"#;

/// Fetch a single meter by its externally assigned ID.
pub async fn find_meter(pool: &PgPool, meter_id: i64) -> Result<Option<Meter>> {
    let sql = format!("SELECT {METER_COLUMNS} FROM datos_medidor WHERE id_medidor = $1");

    let row = sqlx::query_as::<_, Meter>(&sql)
        .bind(meter_id)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

/// Fetch every registered meter, ordered by ID.
pub async fn list_meters(pool: &PgPool) -> Result<Vec<Meter>> {
    let sql = format!("SELECT {METER_COLUMNS} FROM datos_medidor ORDER BY id_medidor");

    let rows = sqlx::query_as::<_, Meter>(&sql).fetch_all(pool).await?;

    Ok(rows)
}

pub async fn count_meters(pool: &PgPool) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM datos_medidor")
        .fetch_one(pool)
        .await?;

    Ok(count)
}
