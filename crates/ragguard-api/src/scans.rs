use axum::{Json, extract::State};

use ragguard_types::models::ScanReport;
use ragguard_types::query::VerdictCounts;

use crate::error::ApiError;
use crate::state::{AppState, run_db};
use crate::views;

async fn load_reports(state: &AppState) -> Result<Vec<ScanReport>, ApiError> {
    let rows = run_db(state, |db| db.list_scan_reports()).await?;
    Ok(rows.into_iter().map(views::scan_report).collect())
}

/// GET /api/scans/all: every scan report, newest first.
pub async fn list_scans(State(state): State<AppState>) -> Result<Json<Vec<ScanReport>>, ApiError> {
    Ok(Json(load_reports(&state).await?))
}

/// GET /api/scans/summary: verdict counts for the admin dashboard.
pub async fn summary(State(state): State<AppState>) -> Result<Json<VerdictCounts>, ApiError> {
    let reports = load_reports(&state).await?;
    Ok(Json(VerdictCounts::tally(&reports)))
}
