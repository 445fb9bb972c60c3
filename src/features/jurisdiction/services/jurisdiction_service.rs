use std::sync::Arc;

use serde_json::Value;

use crate::core::config::StoreConfig;
use crate::core::error::Result;
use crate::modules::store::{Document, DocumentStore};

/// Resolves the set of pincodes an identity is authorised to see.
///
/// Lookup is a two-collection fallback keyed on the identity's email: the
/// dedicated pincodes collection is tried first, then the organisations
/// collection. No match in either is a valid state (empty set, "no
/// jurisdiction configured"), not an error.
pub struct JurisdictionService {
    store: Arc<dyn DocumentStore>,
    pincodes_collection: String,
    organisations_collection: String,
}

impl JurisdictionService {
    pub fn new(store: Arc<dyn DocumentStore>, config: &StoreConfig) -> Self {
        Self {
            store,
            pincodes_collection: config.pincodes_collection.clone(),
            organisations_collection: config.organisations_collection.clone(),
        }
    }

    /// Resolve the ordered, trimmed pincode set for an email
    pub async fn resolve(&self, email: &str) -> Result<Vec<String>> {
        if let Some(pincodes) = self.lookup(&self.pincodes_collection, email).await? {
            return Ok(pincodes);
        }

        if let Some(pincodes) = self.lookup(&self.organisations_collection, email).await? {
            return Ok(pincodes);
        }

        tracing::info!("No jurisdiction configured for {}", email);
        Ok(Vec::new())
    }

    /// `Some` when a document matched the email, even if its pincode list
    /// is empty or malformed; the fallback collection is only consulted
    /// when no document matched at all.
    async fn lookup(&self, collection: &str, email: &str) -> Result<Option<Vec<String>>> {
        let documents = self.store.find_by_field(collection, "email", email).await?;
        Ok(documents.first().map(extract_pincodes))
    }
}

fn extract_pincodes(document: &Document) -> Vec<String> {
    let Some(Value::Array(entries)) = document.field("pincodes") else {
        // non-array treated as empty
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| match entry {
            Value::String(s) => {
                let s = s.trim();
                (!s.is_empty()).then(|| s.to_string())
            }
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::store::MemoryDocumentStore;
    use serde_json::json;

    fn config() -> StoreConfig {
        StoreConfig {
            base_url: "http://store.local".to_string(),
            api_key: "test".to_string(),
            reports_collection: "reports".to_string(),
            pincodes_collection: "pincodes".to_string(),
            organisations_collection: "organisations".to_string(),
            poll_interval: std::time::Duration::from_secs(5),
        }
    }

    fn doc(id: &str, fields: serde_json::Value) -> Document {
        Document::new(id, fields.as_object().cloned().unwrap())
    }

    fn service(store: Arc<MemoryDocumentStore>) -> JurisdictionService {
        JurisdictionService::new(store, &config())
    }

    #[tokio::test]
    async fn pincodes_collection_is_checked_first() {
        let store = Arc::new(MemoryDocumentStore::new());
        store.put(
            "pincodes",
            doc("p1", json!({ "email": "org@example.org", "pincodes": ["110001", " 110002 "] })),
        );
        store.put(
            "organisations",
            doc("o1", json!({ "email": "org@example.org", "pincodes": ["999999"] })),
        );

        let pincodes = service(store).resolve("org@example.org").await.unwrap();
        assert_eq!(pincodes, vec!["110001", "110002"]);
    }

    #[tokio::test]
    async fn falls_back_to_organisations_collection() {
        let store = Arc::new(MemoryDocumentStore::new());
        store.put(
            "organisations",
            doc("o1", json!({ "email": "org@example.org", "pincodes": [110003] })),
        );

        let pincodes = service(store).resolve("org@example.org").await.unwrap();
        assert_eq!(pincodes, vec!["110003"]);
    }

    #[tokio::test]
    async fn no_match_in_either_collection_is_an_empty_set() {
        let store = Arc::new(MemoryDocumentStore::new());
        let pincodes = service(store).resolve("nobody@example.org").await.unwrap();
        assert!(pincodes.is_empty());
    }

    #[tokio::test]
    async fn matched_document_with_malformed_pincodes_is_empty_not_fallback() {
        let store = Arc::new(MemoryDocumentStore::new());
        store.put(
            "pincodes",
            doc("p1", json!({ "email": "org@example.org", "pincodes": "110001" })),
        );
        store.put(
            "organisations",
            doc("o1", json!({ "email": "org@example.org", "pincodes": ["110002"] })),
        );

        // The pincodes document matched, so its malformed field wins over
        // the organisations fallback.
        let pincodes = service(store).resolve("org@example.org").await.unwrap();
        assert!(pincodes.is_empty());
    }

    #[tokio::test]
    async fn transport_failure_surfaces_as_error() {
        let store = Arc::new(MemoryDocumentStore::new());
        store.set_fail_reads(true);
        let err = service(store).resolve("org@example.org").await.unwrap_err();
        assert!(matches!(err, crate::core::error::AppError::TransientFetch(_)));
    }
}
