use std::net::SocketAddr;

use anyhow::Context;
use axum::{http::StatusCode, routing::get, Router};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

static PROM_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Attached to every exported series.
pub const SERVICE_LABEL: &str = "water-portal";

/// Every counter the portal emits, with its help text.
pub const PORTAL_COUNTERS: &[(&str, &str)] = &[
    ("portal_requests_total", "HTTP requests served, by endpoint"),
    ("portal_input_rejected_total", "requests rejected for invalid input before any backend call"),
    ("backend_errors_total", "failed backend queries, by operation"),
    ("aggregate_coerced_values_total", "consumption or meter values that did not parse and counted as zero"),
    ("bills_computed_total", "bills estimated from a meter's latest reading"),
    ("reports_generated_total", "meter and sector reports assembled, by mode"),
    ("readings_edited_total", "meter values overwritten by operators"),
    ("export_rows_total", "reading rows written to CSV exports"),
    ("view_stale_results_dropped_total", "view refreshes dropped because a newer refresh started"),
];

fn describe_portal_metrics() {
    for (name, help) in PORTAL_COUNTERS {
        metrics::describe_counter!(*name, *help);
    }
}

/// Install the Prometheus recorder and serve `/metrics` on `bind_addr`.
pub fn init(bind_addr: &str) -> anyhow::Result<()> {
    let addr: SocketAddr = bind_addr
        .parse()
        .with_context(|| format!("invalid metrics bind address '{bind_addr}'"))?;

    let handle = PrometheusBuilder::new()
        .add_global_label("service", SERVICE_LABEL)
        .install_recorder()
        .context("failed to install Prometheus metrics recorder")?;

    // Only the first call installs a handle.
    let _ = PROM_HANDLE.set(handle);
    describe_portal_metrics();

    tokio::spawn(async move {
        let app = Router::new().route("/metrics", get(metrics_handler));

        match tokio::net::TcpListener::bind(addr).await {
            Ok(listener) => {
                tracing::info!(%addr, counters = PORTAL_COUNTERS.len(), "metrics listener bound");
                if let Err(e) = axum::serve(listener, app.into_make_service()).await {
                    tracing::error!(error = %e, "metrics server error");
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to bind metrics listener");
            }
        }
    });

    Ok(())
}

async fn metrics_handler() -> Result<String, StatusCode> {
    PROM_HANDLE
        .get()
        .map(PrometheusHandle::render)
        .ok_or(StatusCode::SERVICE_UNAVAILABLE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn counter_catalogue_is_unique_and_prometheus_shaped() {
        let names: HashSet<_> = PORTAL_COUNTERS.iter().map(|(name, _)| *name).collect();
        assert_eq!(names.len(), PORTAL_COUNTERS.len());
        for (name, help) in PORTAL_COUNTERS {
            assert!(name.ends_with("_total"), "{name}");
            assert!(name.chars().all(|c| c.is_ascii_lowercase() || c == '_'), "{name}");
            assert!(!help.is_empty());
        }
    }

    #[test]
    fn catalogue_covers_request_and_backend_counters() {
        let names: Vec<_> = PORTAL_COUNTERS.iter().map(|(name, _)| *name).collect();
        assert!(names.contains(&"portal_requests_total"));
        assert!(names.contains(&"backend_errors_total"));
        assert!(names.contains(&"view_stale_results_dropped_total"));
    }

    #[test]
    fn bad_bind_address_is_rejected_before_installing() {
        let err = init("not-an-address").unwrap_err();
        assert!(err.to_string().contains("not-an-address"));
        assert!(PROM_HANDLE.get().is_none());
    }
}
