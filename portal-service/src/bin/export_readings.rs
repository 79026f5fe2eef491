use anyhow::{bail, Result};
use portal_service::{config::AppConfig, export::export_readings, observability, store::PgReadingStore};
use sqlx::postgres::PgPoolOptions;
use std::env;

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        bail!("usage: export_readings <output_csv_path> [sector]");
    }
    let out_path = &args[1];
    let sector = args.get(2).map(String::as_str);

    // PORTAL_CONFIG may point at a read-only replica for bulk exports.
    let cfg = AppConfig::load()?;

    let pool = PgPoolOptions::new()
        .max_connections(cfg.database.max_connections)
        .connect(&cfg.database.uri)
        .await?;
    let store = PgReadingStore::new(pool);

    let bytes = export_readings(&store, sector).await?;
    tokio::fs::write(out_path, &bytes).await?;

    tracing::info!(path = %out_path, bytes = bytes.len(), "export written");

    Ok(())
}
