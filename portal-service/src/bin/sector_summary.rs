use anyhow::Result;
use portal_service::{aggregate::sector_totals, config::AppConfig, observability, store::PgReadingStore, ReadingStore};
use sqlx::postgres::PgPoolOptions;
use water_client::domain::PeriodRange;

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let cfg = AppConfig::load()?;

    let pool = PgPoolOptions::new()
        .max_connections(cfg.database.max_connections)
        .connect(&cfg.database.uri)
        .await?;
    let store = PgReadingStore::new(pool);

    let rows = store.sector_readings(None, &PeriodRange::default()).await?;
    let allowed = cfg.sectors.allow_list();

    for total in sector_totals(&rows, &allowed, cfg.sectors.recent_periods) {
        let recent = total
            .recent
            .iter()
            .map(|p| format!("{}={}", p.label, p.total_m3))
            .collect::<Vec<_>>()
            .join(", ");
        tracing::info!(sector = %total.sector, total_m3 = total.total_m3, %recent, "sector consumption");
    }

    Ok(())
}
