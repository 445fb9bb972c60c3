use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::features::reports::models::{timestamp, Report};
use crate::features::reports::services::pipeline::{
    DateOrder, FilterState, PincodeFilter, SeveritySelection, StatusFilter,
};

/// Status filter values accepted by the list endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilterDto {
    #[default]
    All,
    Pending,
    Resolved,
}

/// Date sort order accepted by the list endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DateOrderDto {
    Asc,
    #[default]
    Desc,
}

/// Query parameters for the report list. Defaults are the dashboard's
/// reset state: everything visible, newest first.
#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct ReportQueryDto {
    /// all | pending | resolved
    #[serde(default)]
    pub status: StatusFilterDto,

    /// "all" (or absent) for the whole jurisdiction, or one specific pincode
    #[serde(default)]
    pub pincode: Option<String>,

    /// asc | desc
    #[serde(default)]
    pub order: DateOrderDto,

    /// Include Mild reports
    #[serde(default = "default_true")]
    pub mild: bool,

    /// Include Moderate reports
    #[serde(default = "default_true")]
    pub moderate: bool,

    /// Include Severe reports
    #[serde(default = "default_true")]
    pub severe: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ReportQueryDto {
    fn default() -> Self {
        Self {
            status: StatusFilterDto::All,
            pincode: None,
            order: DateOrderDto::Desc,
            mild: true,
            moderate: true,
            severe: true,
        }
    }
}

impl ReportQueryDto {
    pub fn filter_state(&self) -> FilterState {
        let status = match self.status {
            StatusFilterDto::All => StatusFilter::All,
            StatusFilterDto::Pending => StatusFilter::Pending,
            StatusFilterDto::Resolved => StatusFilter::Resolved,
        };

        let pincode = match self.pincode.as_deref().map(str::trim) {
            None | Some("") | Some("all") => PincodeFilter::All,
            Some(p) => PincodeFilter::Exact(p.to_string()),
        };

        let order = match self.order {
            DateOrderDto::Asc => DateOrder::Asc,
            DateOrderDto::Desc => DateOrder::Desc,
        };

        FilterState {
            status,
            pincode,
            order,
            severities: SeveritySelection {
                mild: self.mild,
                moderate: self.moderate,
                severe: self.severe,
            },
        }
    }
}

/// One row of the dashboard table
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReportListItemDto {
    pub id: String,
    pub title: Option<String>,
    /// Reporter display name, falling back to the reporter uid
    pub reported_by: Option<String>,
    pub pincode: Option<String>,
    pub severity: Option<String>,
    /// RFC 3339 rendering; absent when the document has no usable timestamp
    pub timestamp: Option<String>,
    pub timestamp_ms: i64,
    pub status: Option<String>,
}

impl From<&Report> for ReportListItemDto {
    fn from(report: &Report) -> Self {
        Self {
            id: report.id.clone(),
            title: report.title.clone(),
            reported_by: report.reporter_label().map(str::to_string),
            pincode: report.pincode.clone(),
            severity: report.severity_label.clone(),
            timestamp: timestamp::format_millis(report.timestamp_ms),
            timestamp_ms: report.timestamp_ms,
            status: report.status.clone(),
        }
    }
}

/// Full report detail
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReportDetailResponseDto {
    pub id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub model_category: Option<String>,
    pub severity: Option<String>,
    pub pincode: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Google Maps link, present when both coordinates are
    pub location_url: Option<String>,
    /// Normalised reported photos; the first entry is the main photo
    pub photo_urls: Vec<String>,
    pub main_photo_url: Option<String>,
    pub timestamp: Option<String>,
    pub status: Option<String>,
    /// Resolution fields, present only on resolved reports
    pub resolved_photo_url: Option<String>,
    pub resolution_description: Option<String>,
    pub resolved_by: Option<String>,
    pub resolved_at: Option<String>,
}

impl From<&Report> for ReportDetailResponseDto {
    fn from(report: &Report) -> Self {
        let photo_urls =
            crate::features::reports::models::photos::extract_photo_urls(&report.fields);
        let main_photo_url = photo_urls.first().cloned();

        let location_url = match (report.latitude, report.longitude) {
            (Some(lat), Some(lon)) => Some(format!(
                "https://maps.google.com/maps?q={},{}&z=15",
                lat, lon
            )),
            _ => None,
        };

        // The resolved photo is a separate single field, shown only once
        // the report is resolved
        let resolved = report.is_resolved();

        Self {
            id: report.id.clone(),
            title: report.title.clone(),
            description: report.description.clone(),
            category: report.category.clone(),
            model_category: report.model_category.clone(),
            severity: report.severity_label.clone(),
            pincode: report.pincode.clone(),
            latitude: report.latitude,
            longitude: report.longitude,
            location_url,
            photo_urls,
            main_photo_url,
            timestamp: timestamp::format_millis(report.timestamp_ms),
            status: report.status.clone(),
            resolved_photo_url: resolved.then(|| report.resolved_photo_url.clone()).flatten(),
            resolution_description: resolved
                .then(|| report.resolution_description.clone())
                .flatten(),
            resolved_by: resolved.then(|| report.resolved_by.clone()).flatten(),
            resolved_at: resolved
                .then(|| report.resolved_at_ms.and_then(timestamp::format_millis))
                .flatten(),
        }
    }
}

/// Resolve-report form for OpenAPI documentation.
/// Note: the handler reads the multipart body directly.
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct ResolveReportDto {
    /// The resolution photo (one image, at most 8 MiB)
    #[schema(format = Binary, content_media_type = "application/octet-stream")]
    pub photo: String,
    /// What was done to resolve the report
    pub description: String,
}

/// Response after a successful resolution
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ResolveReportResponseDto {
    pub id: String,
    pub status: String,
    pub resolved_photo_url: String,
}
