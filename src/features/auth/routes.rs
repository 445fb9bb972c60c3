use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::features::auth::handlers;
use crate::features::reports::services::SessionRegistry;

/// Create routes for the session surface
///
/// Protected; requires the auth middleware to be applied by the caller
pub fn routes(registry: Arc<SessionRegistry>) -> Router {
    Router::new()
        .route("/api/session", get(handlers::get_session))
        .route("/api/session/sign-out", post(handlers::sign_out))
        .with_state(registry)
}
