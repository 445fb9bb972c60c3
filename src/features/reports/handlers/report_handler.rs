use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, Query, State},
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::stream::Stream;
use futures::StreamExt;
use tokio_stream::wrappers::WatchStream;
use tracing::debug;

use crate::core::error::{AppError, Result};
use crate::features::auth::model::Identity;
use crate::features::reports::dtos::{
    ReportDetailResponseDto, ReportListItemDto, ReportQueryDto, ResolveReportResponseDto,
};
use crate::features::reports::services::pipeline;
use crate::features::reports::services::{
    ReportService, ResolutionService, ResolutionUpload, SessionRegistry,
};
use crate::shared::types::{ApiResponse, Meta};

/// State for report handlers
#[derive(Clone)]
pub struct ReportState {
    pub registry: Arc<SessionRegistry>,
    pub report_service: Arc<ReportService>,
    pub resolution_service: Arc<ResolutionService>,
}

/// List the jurisdiction-scoped reports with the dashboard filters applied
#[utoipa::path(
    get,
    path = "/api/reports",
    params(ReportQueryDto),
    responses(
        (status = 200, description = "Scoped, filtered, sorted reports", body = ApiResponse<Vec<ReportListItemDto>>),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "reports"
)]
pub async fn list_reports(
    identity: Identity,
    State(state): State<ReportState>,
    Query(query): Query<ReportQueryDto>,
) -> Result<Json<ApiResponse<Vec<ReportListItemDto>>>> {
    let session = state.registry.session_for(&identity);
    let scoped = session.snapshot();
    let filtered = pipeline::apply(&query.filter_state(), scoped);

    let dtos: Vec<ReportListItemDto> = filtered.iter().map(Into::into).collect();
    let total = dtos.len() as i64;
    Ok(Json(ApiResponse::success(
        Some(dtos),
        None,
        Some(Meta { total }),
    )))
}

/// Live feed of jurisdiction-scoped snapshots as server-sent events.
/// Each event carries the full recomputed list in baseline order.
#[utoipa::path(
    get,
    path = "/api/reports/stream",
    responses(
        (status = 200, description = "SSE stream of scoped report snapshots"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "reports"
)]
pub async fn stream_reports(
    identity: Identity,
    State(state): State<ReportState>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    let session = state.registry.session_for(&identity);

    let stream = WatchStream::new(session.feed()).map(|reports| {
        let dtos: Vec<ReportListItemDto> = reports.iter().map(Into::into).collect();
        let event = Event::default()
            .json_data(&dtos)
            .unwrap_or_else(|_| Event::default().data("[]"));
        Ok(event)
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Get one report with normalised photo URLs
#[utoipa::path(
    get,
    path = "/api/reports/{id}",
    params(
        ("id" = String, Path, description = "Report ID")
    ),
    responses(
        (status = 200, description = "Report found", body = ApiResponse<ReportDetailResponseDto>),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Report not found")
    ),
    security(("bearer_auth" = [])),
    tag = "reports"
)]
pub async fn get_report(
    _identity: Identity,
    State(state): State<ReportState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<ReportDetailResponseDto>>> {
    let report = state.report_service.get_by_id(&id).await?;
    let dto = ReportDetailResponseDto::from(&report);
    Ok(Json(ApiResponse::success(Some(dto), None, None)))
}

/// Mark a report resolved
///
/// Accepts multipart/form-data with:
/// - `photo`: the resolution photo (required, image/*, at most 8 MiB)
/// - `description`: what was done (required, non-blank)
#[utoipa::path(
    post,
    path = "/api/reports/{id}/resolve",
    params(
        ("id" = String, Path, description = "Report ID")
    ),
    request_body(
        content = crate::features::reports::dtos::ResolveReportDto,
        content_type = "multipart/form-data",
        description = "Resolution photo and description",
    ),
    responses(
        (status = 200, description = "Report resolved", body = ApiResponse<ResolveReportResponseDto>),
        (status = 400, description = "Invalid photo or description"),
        (status = 401, description = "Unauthorized"),
        (status = 502, description = "Photo uploaded but the report patch failed")
    ),
    security(("bearer_auth" = [])),
    tag = "reports"
)]
pub async fn resolve_report(
    identity: Identity,
    State(state): State<ReportState>,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<ResolveReportResponseDto>>> {
    let mut upload: Option<ResolutionUpload> = None;
    let mut description = String::new();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        debug!("Failed to read multipart field: {}", e);
        AppError::BadRequest(format!("Failed to read multipart data: {}", e))
    })? {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "photo" => {
                let content_type = field
                    .content_type()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "application/octet-stream".to_string());

                let filename = field
                    .file_name()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "photo".to_string());

                let data = field.bytes().await.map_err(|e| {
                    debug!("Failed to read photo bytes: {}", e);
                    AppError::BadRequest(format!("Failed to read photo data: {}", e))
                })?;

                upload = Some(ResolutionUpload {
                    filename,
                    content_type,
                    data: data.to_vec(),
                });
            }
            "description" => {
                description = field.text().await.map_err(|e| {
                    AppError::BadRequest(format!("Failed to read description: {}", e))
                })?;
            }
            other => {
                debug!("Ignoring unexpected multipart field '{}'", other);
            }
        }
    }

    let resolved_photo_url = state
        .resolution_service
        .resolve_report(&id, upload, &description, &identity)
        .await?;

    Ok(Json(ApiResponse::success(
        Some(ResolveReportResponseDto {
            id,
            status: "resolved".to_string(),
            resolved_photo_url,
        }),
        Some("Report resolved".to_string()),
        None,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::StoreConfig;
    use crate::features::jurisdiction::JurisdictionService;
    use crate::features::reports::routes;
    use crate::modules::storage::{MemoryStorage, ObjectStorage};
    use crate::modules::store::{Document, DocumentStore, MemoryDocumentStore};
    use crate::shared::test_helpers::{create_org_identity, with_org_auth};
    use axum::extract::DefaultBodyLimit;
    use axum_test::multipart::{MultipartForm, Part};
    use axum_test::TestServer;
    use fake::faker::lorem::en::Sentence;
    use fake::Fake;
    use serde_json::json;
    use std::time::Duration;

    fn store_config() -> StoreConfig {
        StoreConfig {
            base_url: "http://store.local".to_string(),
            api_key: "test".to_string(),
            reports_collection: "reports".to_string(),
            pincodes_collection: "pincodes".to_string(),
            organisations_collection: "organisations".to_string(),
            poll_interval: Duration::from_secs(5),
        }
    }

    fn doc(id: &str, fields: serde_json::Value) -> Document {
        Document::new(id, fields.as_object().cloned().unwrap())
    }

    struct Fixture {
        server: TestServer,
        store: Arc<MemoryDocumentStore>,
        storage: Arc<MemoryStorage>,
        registry: Arc<SessionRegistry>,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryDocumentStore::new());
        let storage = Arc::new(MemoryStorage::new());
        let config = store_config();

        let jurisdiction = Arc::new(JurisdictionService::new(
            store.clone() as Arc<dyn DocumentStore>,
            &config,
        ));
        let registry = Arc::new(SessionRegistry::new(
            store.clone() as Arc<dyn DocumentStore>,
            jurisdiction,
            &config,
        ));
        let report_service = Arc::new(ReportService::new(
            store.clone() as Arc<dyn DocumentStore>,
            &config,
        ));
        let resolution_service = Arc::new(ResolutionService::new(
            store.clone() as Arc<dyn DocumentStore>,
            storage.clone() as Arc<dyn ObjectStorage>,
            &config,
        ));

        let router = with_org_auth(routes::routes(
            Arc::clone(&registry),
            report_service,
            resolution_service,
        ))
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024));

        Fixture {
            server: TestServer::new(router).unwrap(),
            store,
            storage,
            registry,
        }
    }

    fn seed_jurisdiction(store: &MemoryDocumentStore) {
        store.put(
            "pincodes",
            doc(
                "p1",
                json!({ "email": "org@example.org", "pincodes": ["110001", " 110002 "] }),
            ),
        );
    }

    fn seed_report(store: &MemoryDocumentStore, id: &str, pincode: &str, status: &str, ts: i64) {
        let title: String = Sentence(3..6).fake();
        store.put(
            "reports",
            doc(
                id,
                json!({
                    "title": title,
                    "pincode": pincode,
                    "status": status,
                    "severity": "Moderate",
                    "timestamp": ts,
                    "userName": "Reporter",
                }),
            ),
        );
    }

    /// Touch the session and wait for the scoped feed to converge so list
    /// assertions are deterministic.
    async fn warm_feed(fixture: &Fixture, expected: usize) {
        let session = fixture.registry.session_for(&create_org_identity());
        let mut feed = session.feed();
        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                {
                    let current = feed.borrow_and_update();
                    if current.len() == expected {
                        return;
                    }
                }
                feed.changed().await.unwrap();
            }
        })
        .await
        .expect("feed did not converge");
    }

    #[tokio::test]
    async fn list_scopes_reports_to_the_jurisdiction() {
        let f = fixture();
        seed_jurisdiction(&f.store);
        seed_report(&f.store, "visible", "110002", "pending", 100);
        seed_report(&f.store, "outside", "110003", "pending", 200);
        warm_feed(&f, 1).await;

        let response = f.server.get("/api/reports").await;
        response.assert_status_ok();

        let body: ApiResponse<Vec<ReportListItemDto>> = response.json();
        let items = body.data.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "visible");
        assert_eq!(body.meta.unwrap().total, 1);
    }

    #[tokio::test]
    async fn list_applies_status_and_order_filters() {
        let f = fixture();
        seed_jurisdiction(&f.store);
        seed_report(&f.store, "old-pending", "110001", "pending", 100);
        seed_report(&f.store, "resolved", "110001", "resolved", 200);
        seed_report(&f.store, "new-pending", "110002", "pending", 300);
        warm_feed(&f, 3).await;

        let response = f
            .server
            .get("/api/reports")
            .add_query_param("status", "pending")
            .add_query_param("order", "asc")
            .await;
        response.assert_status_ok();

        let body: ApiResponse<Vec<ReportListItemDto>> = response.json();
        let ids: Vec<String> = body.data.unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["old-pending", "new-pending"]);
    }

    #[tokio::test]
    async fn list_with_no_severities_checked_is_empty() {
        let f = fixture();
        seed_jurisdiction(&f.store);
        seed_report(&f.store, "r1", "110001", "pending", 100);
        warm_feed(&f, 1).await;

        let response = f
            .server
            .get("/api/reports")
            .add_query_param("mild", "false")
            .add_query_param("moderate", "false")
            .add_query_param("severe", "false")
            .await;
        response.assert_status_ok();

        let body: ApiResponse<Vec<ReportListItemDto>> = response.json();
        assert!(body.data.unwrap().is_empty());
    }

    #[tokio::test]
    async fn detail_normalises_photos_and_missing_is_not_found() {
        let f = fixture();
        f.store.put(
            "reports",
            doc(
                "r1",
                json!({
                    "title": "Broken streetlight",
                    "pincode": "110001",
                    "status": "pending",
                    "imagePic": "https://photos.example.org/y.jpg"
                }),
            ),
        );

        let response = f.server.get("/api/reports/r1").await;
        response.assert_status_ok();
        let body: ApiResponse<ReportDetailResponseDto> = response.json();
        let detail = body.data.unwrap();
        assert_eq!(
            detail.main_photo_url.as_deref(),
            Some("https://photos.example.org/y.jpg")
        );
        // pending report exposes no resolution fields
        assert_eq!(detail.resolved_photo_url, None);

        let response = f.server.get("/api/reports/ghost").await;
        response.assert_status_not_found();
    }

    #[tokio::test]
    async fn resolve_uploads_photo_and_patches_the_report() {
        let f = fixture();
        f.store.put(
            "reports",
            doc("r1", json!({ "pincode": "110001", "status": "pending" })),
        );

        let form = MultipartForm::new()
            .add_text("description", "Road repaved")
            .add_part(
                "photo",
                Part::bytes(vec![0u8; 2 * 1024 * 1024])
                    .file_name("after fix.png")
                    .mime_type("image/png"),
            );

        let response = f.server.post("/api/reports/r1/resolve").multipart(form).await;
        response.assert_status_ok();

        let body: ApiResponse<ResolveReportResponseDto> = response.json();
        let resolved = body.data.unwrap();
        assert_eq!(resolved.status, "resolved");

        let patched = f.store.get("reports", "r1").await.unwrap().unwrap();
        assert_eq!(patched.str_field("status"), Some("resolved"));
        assert_eq!(
            patched.str_field("resolvedPhotoUrl"),
            Some(resolved.resolved_photo_url.as_str())
        );
        assert_eq!(f.storage.objects().len(), 1);
    }

    #[tokio::test]
    async fn resolve_rejects_non_image_uploads_without_uploading() {
        let f = fixture();
        f.store.put(
            "reports",
            doc("r1", json!({ "pincode": "110001", "status": "pending" })),
        );

        let form = MultipartForm::new()
            .add_text("description", "Road repaved")
            .add_part(
                "photo",
                Part::bytes(b"%PDF-1.4".to_vec())
                    .file_name("doc.pdf")
                    .mime_type("application/pdf"),
            );

        let response = f.server.post("/api/reports/r1/resolve").multipart(form).await;
        response.assert_status_bad_request();
        assert!(f.storage.objects().is_empty());

        let untouched = f.store.get("reports", "r1").await.unwrap().unwrap();
        assert_eq!(untouched.str_field("status"), Some("pending"));
    }
}
