use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::features::auth::handlers as auth_handlers;
use crate::features::auth::model::Identity;
use crate::features::jurisdiction::dtos as jurisdiction_dtos;
use crate::features::jurisdiction::handlers as jurisdiction_handlers;
use crate::features::reports::{dtos as reports_dtos, handlers as reports_handlers};
use crate::shared::types::{ApiResponse, Meta};

#[derive(OpenApi)]
#[openapi(
    paths(
        // Session
        auth_handlers::session_handler::get_session,
        auth_handlers::session_handler::sign_out,
        // Jurisdiction
        jurisdiction_handlers::jurisdiction_handler::get_jurisdiction,
        // Reports
        reports_handlers::report_handler::list_reports,
        reports_handlers::report_handler::stream_reports,
        reports_handlers::report_handler::get_report,
        reports_handlers::report_handler::resolve_report,
    ),
    components(
        schemas(
            // Shared
            Meta,
            // Session
            Identity,
            auth_handlers::SignOutResponseDto,
            ApiResponse<Identity>,
            ApiResponse<auth_handlers::SignOutResponseDto>,
            // Jurisdiction
            jurisdiction_dtos::JurisdictionResponseDto,
            ApiResponse<jurisdiction_dtos::JurisdictionResponseDto>,
            // Reports
            reports_dtos::StatusFilterDto,
            reports_dtos::DateOrderDto,
            reports_dtos::ReportListItemDto,
            reports_dtos::ReportDetailResponseDto,
            reports_dtos::ResolveReportDto,
            reports_dtos::ResolveReportResponseDto,
            ApiResponse<Vec<reports_dtos::ReportListItemDto>>,
            ApiResponse<reports_dtos::ReportDetailResponseDto>,
            ApiResponse<reports_dtos::ResolveReportResponseDto>,
        )
    ),
    tags(
        (name = "session", description = "Authenticated session surface"),
        (name = "jurisdiction", description = "Organisation jurisdiction pincodes"),
        (name = "reports", description = "Jurisdiction-scoped report dashboard"),
    ),
    modifiers(&SecurityAddon),
    info(
        title = "CivicDesk Admin API",
        version = "0.1.0",
        description = "Jurisdiction-scoped report dashboard for organisation staff",
    )
)]
pub struct ApiDoc;

/// Adds Bearer JWT security scheme to OpenAPI spec
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Modifier to override OpenAPI info from config
pub struct SwaggerInfoModifier {
    pub title: String,
    pub version: String,
    pub description: String,
}

impl Modify for SwaggerInfoModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi.info.title = self.title.clone();
        openapi.info.version = self.version.clone();
        openapi.info.description = Some(self.description.clone());
    }
}
