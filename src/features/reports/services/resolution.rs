//! Resolution submission: validate the upload, store the photo, patch the
//! report document.
//!
//! Validation failures happen before any external side effect. If the patch
//! fails after a successful upload, the uploaded blob is left orphaned (the
//! caller sees a generic failure and a retry uploads under a new key).
//! Concurrent submissions for the same report are not coordinated; the last
//! patch wins.

use std::sync::Arc;

use chrono::Utc;
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::json;

use crate::core::config::StoreConfig;
use crate::core::error::{AppError, Result};
use crate::features::auth::model::Identity;
use crate::modules::storage::ObjectStorage;
use crate::modules::store::{DocumentPatch, DocumentStore};

/// Maximum accepted photo size
pub const MAX_PHOTO_BYTES: usize = 8 * 1024 * 1024;

lazy_static! {
    static ref WHITESPACE_RUN: Regex = Regex::new(r"\s+").unwrap();
}

/// A single resolution photo as received from the form
#[derive(Debug, Clone)]
pub struct ResolutionUpload {
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

pub struct ResolutionService {
    store: Arc<dyn DocumentStore>,
    storage: Arc<dyn ObjectStorage>,
    reports_collection: String,
}

impl ResolutionService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        storage: Arc<dyn ObjectStorage>,
        config: &StoreConfig,
    ) -> Self {
        Self {
            store,
            storage,
            reports_collection: config.reports_collection.clone(),
        }
    }

    /// Mark a report resolved. Returns the URL of the uploaded photo.
    pub async fn resolve_report(
        &self,
        report_id: &str,
        upload: Option<ResolutionUpload>,
        description: &str,
        identity: &Identity,
    ) -> Result<String> {
        let description = description.trim();
        if description.is_empty() {
            return Err(AppError::Validation(
                "Description cannot be empty.".to_string(),
            ));
        }

        let upload = upload
            .filter(|u| !u.data.is_empty())
            .ok_or_else(|| AppError::Validation("Please upload one image file.".to_string()))?;

        if !upload.content_type.starts_with("image/") {
            return Err(AppError::Validation(
                "Please upload a valid image file (PNG, JPG, JPEG, GIF, etc.).".to_string(),
            ));
        }

        if upload.data.len() > MAX_PHOTO_BYTES {
            return Err(AppError::Validation(
                "Image too large. Please choose an image under 8 MB.".to_string(),
            ));
        }

        // Per-report, timestamp-disambiguated key; a retry after a partial
        // failure uploads under a fresh key.
        let key = format!(
            "reports/{}/resolved_photo_{}_{}",
            report_id,
            Utc::now().timestamp_millis(),
            sanitize_filename(&upload.filename)
        );

        self.storage
            .put(&key, upload.data, &upload.content_type)
            .await?;
        let url = self.storage.object_url(&key);

        // One atomic patch; the original reported photo fields are never
        // part of it.
        let patch = DocumentPatch::new()
            .set("status", json!("resolved"))
            .set("resolvedPhotoUrl", json!(url))
            .set("resolutionDescription", json!(description))
            .set("resolvedBy", json!(identity.resolver_tag()))
            .set_server_timestamp("resolvedAt");

        self.store
            .patch(&self.reports_collection, report_id, patch)
            .await
            .map_err(|e| {
                AppError::PartialFailure(format!(
                    "Patch for report {} failed after uploading '{}': {}",
                    report_id, key, e
                ))
            })?;

        tracing::info!("Report {} resolved by {}", report_id, identity.email);
        Ok(url)
    }
}

fn sanitize_filename(filename: &str) -> String {
    let sanitized = WHITESPACE_RUN.replace_all(filename.trim(), "_");
    if sanitized.is_empty() {
        "photo".to_string()
    } else {
        sanitized.into_owned()
    }
}
