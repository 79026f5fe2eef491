use anyhow::Result;
use portal_service::{
    config::AppConfig,
    http::{self, AppState},
    metrics_server, observability,
    request_gen::ViewGates,
    store::PgReadingStore,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    // Load configuration
    let cfg = AppConfig::load()?;

    // Start metrics server if configured
    if let Some(metrics_cfg) = &cfg.metrics {
        metrics_server::init(&metrics_cfg.bind_addr)?;
    }

    let pool = PgPoolOptions::new()
        .max_connections(cfg.database.max_connections)
        .connect(&cfg.database.uri)
        .await?;

    let state = AppState {
        store: Arc::new(PgReadingStore::new(pool)),
        tariff: cfg.tariff,
        sectors: Arc::new(cfg.sectors.allow_list()),
        recent_periods: cfg.sectors.recent_periods,
        views: Arc::new(ViewGates::new()),
    };

    let listener = tokio::net::TcpListener::bind(&cfg.http.bind_addr).await?;
    tracing::info!(addr = %cfg.http.bind_addr, "portal listening");

    axum::serve(listener, http::router(state).into_make_service()).await?;

    Ok(())
}
