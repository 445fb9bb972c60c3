use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::features::reports::handlers::{self, ReportState};
use crate::features::reports::services::{ReportService, ResolutionService, SessionRegistry};

/// Create routes for the reports feature
///
/// All routes are protected; the auth middleware is applied by the caller
pub fn routes(
    registry: Arc<SessionRegistry>,
    report_service: Arc<ReportService>,
    resolution_service: Arc<ResolutionService>,
) -> Router {
    let state = ReportState {
        registry,
        report_service,
        resolution_service,
    };

    Router::new()
        .route("/api/reports", get(handlers::list_reports))
        .route("/api/reports/stream", get(handlers::stream_reports))
        .route("/api/reports/{id}", get(handlers::get_report))
        .route("/api/reports/{id}/resolve", post(handlers::resolve_report))
        .with_state(state)
}
