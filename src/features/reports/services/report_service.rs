use std::sync::Arc;

use crate::core::config::StoreConfig;
use crate::core::error::{AppError, Result};
use crate::features::reports::models::Report;
use crate::modules::store::DocumentStore;

/// Point reads over the report collection
pub struct ReportService {
    store: Arc<dyn DocumentStore>,
    reports_collection: String,
}

impl ReportService {
    pub fn new(store: Arc<dyn DocumentStore>, config: &StoreConfig) -> Self {
        Self {
            store,
            reports_collection: config.reports_collection.clone(),
        }
    }

    /// Fetch one report by id
    pub async fn get_by_id(&self, id: &str) -> Result<Report> {
        let document = self
            .store
            .get(&self.reports_collection, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Report not found.".to_string()))?;

        Ok(Report::from_document(&document))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::store::{Document, MemoryDocumentStore};
    use serde_json::json;
    use std::time::Duration;

    fn config() -> StoreConfig {
        StoreConfig {
            base_url: "http://store.local".to_string(),
            api_key: "test".to_string(),
            reports_collection: "reports".to_string(),
            pincodes_collection: "pincodes".to_string(),
            organisations_collection: "organisations".to_string(),
            poll_interval: Duration::from_secs(5),
        }
    }

    #[tokio::test]
    async fn missing_report_is_not_found() {
        let store = Arc::new(MemoryDocumentStore::new());
        let service = ReportService::new(store, &config());

        let err = service.get_by_id("ghost").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn found_report_is_mapped() {
        let store = Arc::new(MemoryDocumentStore::new());
        store.put(
            "reports",
            Document::new(
                "r1",
                json!({ "title": "Pothole", "pincode": "110001", "status": "pending" })
                    .as_object()
                    .cloned()
                    .unwrap(),
            ),
        );
        let service = ReportService::new(store, &config());

        let report = service.get_by_id("r1").await.unwrap();
        assert_eq!(report.title.as_deref(), Some("Pothole"));
        assert!(report.is_pending());
    }
}
