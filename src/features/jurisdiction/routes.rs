use std::sync::Arc;

use axum::{routing::get, Router};

use crate::features::jurisdiction::handlers;
use crate::features::jurisdiction::services::JurisdictionService;

/// Create routes for the jurisdiction feature
///
/// Protected; requires the auth middleware to be applied by the caller
pub fn routes(service: Arc<JurisdictionService>) -> Router {
    Router::new()
        .route("/api/jurisdiction", get(handlers::get_jurisdiction))
        .with_state(service)
}
