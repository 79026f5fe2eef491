//! JSON HTTP surface of the portal.
//!
//! Each request reads through the shared [`ReadingStore`] and returns a
//! freshly assembled view. The only state kept between requests is the
//! per-view refresh gates.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use water_client::domain::{Meter, PeriodRange};

use crate::{
    access::{nav_items, nav_theme, route_decision, NavItem, NavTheme, Role, RouteDecision},
    aggregate::{sector_totals, SectorAllowList, SectorTotal},
    billing::{bill_for_meter, Bill, Tariff},
    dashboard::{load_stats, DashboardStats},
    edit::{update_meter_value, MeterValueUpdate},
    error::PortalError,
    export::{export_readings, ExportError},
    report::{meter_history, DateRange, MeterHistory, Report, ReportAssembler, ReportFilter, ReportTarget},
    request_gen::ViewGates,
    search::{filter_meters, parse_id, parse_meter_id},
    store::ReadingStore,
};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ReadingStore>,
    pub tariff: Tariff,
    pub sectors: Arc<SectorAllowList>,
    pub recent_periods: usize,
    pub views: Arc<ViewGates>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/meters", get(list_meters))
        .route("/meters/:id", get(get_meter))
        .route("/meters/:id/history", get(get_history))
        .route("/meters/:id/bill", get(get_bill))
        .route("/readings/:id", put(put_meter_value))
        .route("/reports/meter/:id", get(get_meter_report))
        .route("/reports/sector/:sector", get(get_sector_report))
        .route("/sectors/summary", get(get_sector_summary))
        .route("/export", get(get_export))
        .route("/dashboard", get(get_dashboard))
        .route("/navigation", get(get_navigation))
        .with_state(state)
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

fn error_response(status: StatusCode, message: String) -> Response {
    (status, Json(ErrorBody { error: message })).into_response()
}

impl IntoResponse for PortalError {
    fn into_response(self) -> Response {
        let status = match &self {
            PortalError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            PortalError::MeterNotFound(_) | PortalError::ReadingNotFound(_) | PortalError::NoReadings(_) => {
                StatusCode::NOT_FOUND
            }
            PortalError::Superseded => StatusCode::CONFLICT,
            PortalError::Backend(_) => StatusCode::BAD_GATEWAY,
        };
        error_response(status, self.to_string())
    }
}

impl IntoResponse for ExportError {
    fn into_response(self) -> Response {
        let status = match &self {
            ExportError::Backend(_) => StatusCode::BAD_GATEWAY,
            ExportError::Csv(_) | ExportError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        tracing::error!(error = %self, "export failed");
        error_response(status, self.to_string())
    }
}

fn hit(endpoint: &'static str) {
    metrics::counter!("portal_requests_total", "endpoint" => endpoint).increment(1);
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
}

async fn list_meters(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<Meter>>, PortalError> {
    hit("meters");
    let meters = state.store.meters().await?;
    let term = params.q.unwrap_or_default();
    Ok(Json(filter_meters(&meters, &term).into_iter().cloned().collect()))
}

async fn get_meter(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Meter>, PortalError> {
    hit("meter");
    let meter_id = parse_meter_id(&id)?;
    state
        .store
        .meter(meter_id)
        .await?
        .map(Json)
        .ok_or(PortalError::MeterNotFound(meter_id))
}

async fn get_history(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MeterHistory>, PortalError> {
    hit("history");
    let meter_id = parse_meter_id(&id)?;
    Ok(Json(meter_history(state.store.as_ref(), meter_id).await?))
}

async fn get_bill(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Bill>, PortalError> {
    hit("bill");
    let meter_id = parse_meter_id(&id)?;
    Ok(Json(bill_for_meter(state.store.as_ref(), meter_id, &state.tariff).await?))
}

#[derive(Debug, Serialize)]
pub struct MeterValueUpdated {
    pub reading_id: i64,
    pub meter_value: f64,
}

async fn put_meter_value(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<MeterValueUpdate>,
) -> Result<Json<MeterValueUpdated>, PortalError> {
    hit("update_reading");
    let reading_id = parse_id("reading", &id)?;
    let meter_value = update_meter_value(state.store.as_ref(), reading_id, &body.meter_value).await?;
    Ok(Json(MeterValueUpdated { reading_id, meter_value }))
}

#[derive(Debug, Default, Deserialize)]
pub struct RangeParams {
    pub start: Option<String>,
    pub end: Option<String>,
}

impl RangeParams {
    fn date_range(&self) -> Result<DateRange, PortalError> {
        DateRange::parse(self.start.as_deref(), self.end.as_deref())
    }
}

async fn assemble(state: &AppState, target: ReportTarget, params: &RangeParams) -> Result<Report, PortalError> {
    let filter = ReportFilter {
        target,
        range: params.date_range()?,
    };
    ReportAssembler::new(state.store.as_ref(), &state.sectors)
        .assemble(&filter)
        .await
}

async fn get_meter_report(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<RangeParams>,
) -> Result<Json<Report>, PortalError> {
    hit("meter_report");
    let meter_id = parse_meter_id(&id)?;
    Ok(Json(assemble(&state, ReportTarget::Meter(meter_id), &params).await?))
}

async fn get_sector_report(
    State(state): State<AppState>,
    Path(sector): Path<String>,
    Query(params): Query<RangeParams>,
) -> Result<Json<Report>, PortalError> {
    hit("sector_report");
    Ok(Json(assemble(&state, ReportTarget::Sector(sector), &params).await?))
}

#[derive(Debug, Default, Deserialize)]
pub struct SummaryParams {
    /// Client view refreshing the summary. A newer refresh of the same
    /// view answers 409 to the older one.
    pub view: Option<String>,
}

async fn load_sector_summary(state: &AppState) -> Result<Vec<SectorTotal>, PortalError> {
    let rows = state.store.sector_readings(None, &PeriodRange::default()).await?;
    Ok(sector_totals(&rows, &state.sectors, state.recent_periods))
}

async fn get_sector_summary(
    State(state): State<AppState>,
    Query(params): Query<SummaryParams>,
) -> Result<Json<Vec<SectorTotal>>, PortalError> {
    hit("sector_summary");
    let totals = match params.view.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
        Some(view) => {
            let gate = state.views.gate(view).await;
            gate.run_latest(load_sector_summary(&state)).await?
        }
        None => load_sector_summary(&state).await?,
    };
    Ok(Json(totals))
}

#[derive(Debug, Default, Deserialize)]
pub struct ExportParams {
    pub sector: Option<String>,
}

async fn get_export(
    State(state): State<AppState>,
    Query(params): Query<ExportParams>,
) -> Result<Response, ExportError> {
    hit("export");
    let sector = params.sector.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let body = export_readings(state.store.as_ref(), sector).await?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"lecturas.csv\""),
        ],
        body,
    )
        .into_response())
}

async fn get_dashboard(State(state): State<AppState>) -> Result<Json<DashboardStats>, PortalError> {
    hit("dashboard");
    let today = time::OffsetDateTime::now_utc().date();
    Ok(Json(load_stats(state.store.as_ref(), today).await?))
}

#[derive(Debug, Default, Deserialize)]
pub struct NavigationParams {
    pub role: Option<String>,
    pub path: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct NavigationView {
    pub role: Role,
    pub items: Vec<NavItem>,
    pub theme: NavTheme,
    pub decision: RouteDecision,
}

async fn get_navigation(Query(params): Query<NavigationParams>) -> Json<NavigationView> {
    hit("navigation");
    let role = Role::from_metadata(params.role.as_deref());
    let path = params.path.as_deref().unwrap_or("/");

    Json(NavigationView {
        role,
        items: nav_items(role),
        theme: nav_theme(path, role),
        decision: route_decision(path, role),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        aggregate::SectorAllowList,
        store::memory::{meter, reading, MemoryStore},
    };

    fn state(store: MemoryStore) -> AppState {
        AppState {
            store: Arc::new(store),
            tariff: Tariff::default(),
            sectors: Arc::new(SectorAllowList::new(["Centro", "Norte"])),
            recent_periods: 2,
            views: Arc::new(ViewGates::new()),
        }
    }

    fn sample() -> MemoryStore {
        MemoryStore::new(
            vec![
                meter(1, "Ana Rojas", Some("Centro")),
                meter(2, "Luis Soto", Some("Norte")),
                meter(3, "Eva Diaz", Some("Costa")),
            ],
            vec![
                reading(10, 1, 1, 2024, "4"),
                reading(11, 1, 2, 2024, "6"),
                reading(20, 2, 2, 2024, "9"),
                reading(30, 3, 2, 2024, "50"),
            ],
        )
    }

    #[tokio::test]
    async fn searches_meters() {
        let Json(found) = list_meters(
            State(state(sample())),
            Query(SearchParams {
                q: Some("soto".into()),
            }),
        )
        .await
        .expect("search");
        assert_eq!(found.iter().map(|m| m.meter_id).collect::<Vec<_>>(), vec![2]);
    }

    #[tokio::test]
    async fn bill_uses_configured_tariff() {
        let Json(bill) = get_bill(State(state(sample())), Path("1".into())).await.expect("bill");
        assert_eq!(bill.total, 3550.0 + 6.0 * 550.0);
    }

    #[tokio::test]
    async fn error_statuses() {
        let st = state(sample());

        let bad_id = get_bill(State(st.clone()), Path("abc".into())).await.unwrap_err();
        assert_eq!(bad_id.into_response().status(), StatusCode::BAD_REQUEST);

        let missing = get_meter(State(st.clone()), Path("99".into())).await.unwrap_err();
        assert_eq!(missing.into_response().status(), StatusCode::NOT_FOUND);

        let failing = state(MemoryStore::failing("timeout"));
        let backend = get_meter(State(failing), Path("1".into())).await.unwrap_err();
        assert_eq!(backend.into_response().status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn inverted_report_range_is_rejected() {
        let err = get_meter_report(
            State(state(sample())),
            Path("1".into()),
            Query(RangeParams {
                start: Some("2024-03-01".into()),
                end: Some("2024-01-01".into()),
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, PortalError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn summary_skips_unknown_sectors() {
        let Json(summary) = get_sector_summary(State(state(sample())), Query(SummaryParams::default()))
            .await
            .expect("summary");
        let sectors: Vec<_> = summary.iter().map(|s| s.sector.as_str()).collect();
        assert_eq!(sectors, vec!["Centro", "Norte"]);
        assert_eq!(summary[0].total_m3, 10.0);
    }

    #[tokio::test]
    async fn summary_for_a_view_is_gated() {
        let st = state(sample());
        let params = || {
            Query(SummaryParams {
                view: Some("tab-1".into()),
            })
        };

        let Json(first) = get_sector_summary(State(st.clone()), params()).await.expect("summary");
        let Json(second) = get_sector_summary(State(st.clone()), params()).await.expect("summary");
        assert_eq!(first, second);
        assert_eq!(st.views.tracked().await, 1);

        assert_eq!(PortalError::Superseded.into_response().status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn unknown_meter_bill_is_not_found() {
        let err = get_bill(State(state(sample())), Path("99".into())).await.unwrap_err();
        assert!(matches!(err, PortalError::MeterNotFound(99)));
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn updates_meter_value() {
        let Json(updated) = put_meter_value(
            State(state(sample())),
            Path("11".into()),
            Json(MeterValueUpdate {
                meter_value: crate::edit::MeterValueInput::Text("1234.5".into()),
            }),
        )
        .await
        .expect("update");
        assert_eq!(updated.reading_id, 11);
        assert_eq!(updated.meter_value, 1234.5);
    }

    #[tokio::test]
    async fn export_sets_csv_headers() {
        let response = get_export(State(state(sample())), Query(ExportParams::default()))
            .await
            .expect("export");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()),
            Some("text/csv; charset=utf-8")
        );
    }

    #[tokio::test]
    async fn navigation_for_anonymous_admin_route() {
        let Json(view) = get_navigation(Query(NavigationParams {
            role: None,
            path: Some("/admin/informes".into()),
        }))
        .await;
        assert_eq!(view.role, Role::Anonymous);
        assert_eq!(view.decision, RouteDecision::RedirectToLogin);
    }
}
