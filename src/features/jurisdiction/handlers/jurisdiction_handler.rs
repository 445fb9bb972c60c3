use std::sync::Arc;

use axum::{extract::State, Json};

use crate::core::error::{AppError, Result};
use crate::features::auth::model::Identity;
use crate::features::jurisdiction::dtos::JurisdictionResponseDto;
use crate::features::jurisdiction::services::JurisdictionService;
use crate::shared::types::ApiResponse;

/// Get the jurisdiction pincode set for the authenticated organisation
#[utoipa::path(
    get,
    path = "/api/jurisdiction",
    responses(
        (status = 200, description = "Jurisdiction pincodes (empty when none configured, or when the store is unreachable and the view degrades)", body = ApiResponse<JurisdictionResponseDto>),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "jurisdiction"
)]
pub async fn get_jurisdiction(
    identity: Identity,
    State(service): State<Arc<JurisdictionService>>,
) -> Result<Json<ApiResponse<JurisdictionResponseDto>>> {
    match service.resolve(&identity.email).await {
        Ok(pincodes) => Ok(Json(ApiResponse::success(
            Some(JurisdictionResponseDto { pincodes }),
            None,
            None,
        ))),
        // Degraded state: the dashboard renders with an empty set and the
        // error message instead of failing the whole page.
        Err(AppError::TransientFetch(message)) => Ok(Json(ApiResponse::success(
            Some(JurisdictionResponseDto {
                pincodes: Vec::new(),
            }),
            Some(message),
            None,
        ))),
        Err(other) => Err(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::StoreConfig;
    use crate::features::jurisdiction::routes;
    use crate::modules::store::{Document, DocumentStore, MemoryDocumentStore};
    use crate::shared::test_helpers::with_org_auth;
    use axum_test::TestServer;
    use serde_json::json;
    use std::time::Duration;

    fn server(store: Arc<MemoryDocumentStore>) -> TestServer {
        let config = StoreConfig {
            base_url: "http://store.local".to_string(),
            api_key: "test".to_string(),
            reports_collection: "reports".to_string(),
            pincodes_collection: "pincodes".to_string(),
            organisations_collection: "organisations".to_string(),
            poll_interval: Duration::from_secs(5),
        };
        let service = Arc::new(JurisdictionService::new(
            store as Arc<dyn DocumentStore>,
            &config,
        ));
        TestServer::new(with_org_auth(routes::routes(service))).unwrap()
    }

    #[tokio::test]
    async fn returns_the_resolved_pincode_set() {
        let store = Arc::new(MemoryDocumentStore::new());
        store.put(
            "pincodes",
            Document::new(
                "p1",
                json!({ "email": "org@example.org", "pincodes": ["110001"] })
                    .as_object()
                    .cloned()
                    .unwrap(),
            ),
        );

        let response = server(store).get("/api/jurisdiction").await;
        response.assert_status_ok();
        let body: ApiResponse<JurisdictionResponseDto> = response.json();
        assert_eq!(body.data.unwrap().pincodes, vec!["110001"]);
    }

    #[tokio::test]
    async fn store_outage_degrades_to_an_empty_set_with_a_message() {
        let store = Arc::new(MemoryDocumentStore::new());
        store.set_fail_reads(true);

        let response = server(store).get("/api/jurisdiction").await;
        response.assert_status_ok();
        let body: ApiResponse<JurisdictionResponseDto> = response.json();
        assert!(body.data.unwrap().pincodes.is_empty());
        assert!(body.message.is_some());
    }
}
