use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

use crate::features::reports::models::timestamp;
use crate::modules::store::Document;

/// Report severity as set by the reporting client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum Severity {
    Mild,
    Moderate,
    Severe,
}

impl Severity {
    /// Case-insensitive parse; unknown labels yield `None`
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "mild" => Some(Severity::Mild),
            "moderate" => Some(Severity::Moderate),
            "severe" => Some(Severity::Severe),
            _ => None,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Mild => write!(f, "Mild"),
            Severity::Moderate => write!(f, "Moderate"),
            Severity::Severe => write!(f, "Severe"),
        }
    }
}

/// Typed view over a report document.
///
/// Report documents are created by external reporter clients and are not
/// uniformly shaped, so every field except the id is optional and parsing
/// is lenient. The raw field map is kept for photo-URL extraction and
/// detail rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub model_category: Option<String>,
    pub severity_label: Option<String>,
    pub severity: Option<Severity>,
    /// Trimmed pincode; `None` when absent or blank
    pub pincode: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Normalised creation time, epoch milliseconds (0 when unknown)
    pub timestamp_ms: i64,
    /// Raw status string; compared case-insensitively
    pub status: Option<String>,
    pub user_name: Option<String>,
    pub uid: Option<String>,
    pub resolved_photo_url: Option<String>,
    pub resolution_description: Option<String>,
    pub resolved_by: Option<String>,
    pub resolved_at_ms: Option<i64>,
    /// Full document fields, for photo extraction
    pub fields: Map<String, Value>,
}

impl Report {
    pub fn from_document(document: &Document) -> Self {
        let fields = &document.fields;

        let severity_label = trimmed_str(fields, "severity");
        let severity = severity_label.as_deref().and_then(Severity::parse);

        // Older documents kept the resolution text under `newDescription`
        let resolution_description = trimmed_str(fields, "resolutionDescription")
            .or_else(|| trimmed_str(fields, "newDescription"));

        let resolved_at_ms = fields
            .get("resolvedAt")
            .map(|v| timestamp::epoch_millis(Some(v)))
            .filter(|ms| *ms != 0);

        Self {
            id: document.id.clone(),
            title: trimmed_str(fields, "title"),
            description: trimmed_str(fields, "description"),
            category: trimmed_str(fields, "category"),
            model_category: trimmed_str(fields, "modelCategory"),
            severity_label,
            severity,
            pincode: trimmed_str(fields, "pincode"),
            latitude: number_field(fields, "latitude"),
            longitude: number_field(fields, "longitude"),
            timestamp_ms: timestamp::epoch_millis(fields.get("timestamp")),
            status: trimmed_str(fields, "status"),
            user_name: trimmed_str(fields, "userName"),
            uid: trimmed_str(fields, "uid"),
            resolved_photo_url: trimmed_str(fields, "resolvedPhotoUrl"),
            resolution_description,
            resolved_by: trimmed_str(fields, "resolvedBy"),
            resolved_at_ms,
            fields: fields.clone(),
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.status
            .as_deref()
            .is_some_and(|s| s.eq_ignore_ascii_case("resolved"))
    }

    #[allow(dead_code)]
    pub fn is_pending(&self) -> bool {
        self.status
            .as_deref()
            .is_some_and(|s| s.eq_ignore_ascii_case("pending"))
    }

    /// Display name for the dashboard table: reporter name, falling back
    /// to the reporter uid
    pub fn reporter_label(&self) -> Option<&str> {
        self.user_name.as_deref().or(self.uid.as_deref())
    }
}

fn trimmed_str(fields: &Map<String, Value>, name: &str) -> Option<String> {
    let value = fields.get(name)?;
    match value {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        // Some clients wrote pincodes as numbers
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn number_field(fields: &Map<String, Value>, name: &str) -> Option<f64> {
    let value = fields.get(name)?;
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
