#[cfg(test)]
use crate::features::auth::model::Identity;

#[cfg(test)]
use axum::{extract::Request, middleware::Next, response::Response, Router};

#[cfg(test)]
pub fn create_org_identity() -> Identity {
    Identity {
        uid: "test-org-uid".to_string(),
        email: "org@example.org".to_string(),
    }
}

#[cfg(test)]
async fn inject_org_identity_middleware(mut request: Request, next: Next) -> Response {
    request.extensions_mut().insert(create_org_identity());
    next.run(request).await
}

/// Wrap a router so every request carries the test organisation identity,
/// bypassing JWT validation.
#[cfg(test)]
pub fn with_org_auth(router: Router) -> Router {
    router.layer(axum::middleware::from_fn(inject_org_identity_middleware))
}
