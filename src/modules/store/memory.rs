//! In-memory document store used by tests and local development.
//!
//! Implements the same trait as the REST client; mutations broadcast a
//! fresh snapshot to subscribers synchronously.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tokio::sync::broadcast;

use crate::core::error::{AppError, Result};
use crate::modules::store::document::{
    CollectionSubscription, Document, DocumentPatch, DocumentStore, PatchValue,
};

const SUBSCRIPTION_BUFFER: usize = 16;

#[derive(Default)]
#[allow(dead_code)]
pub struct MemoryDocumentStore {
    collections: Mutex<HashMap<String, Vec<Document>>>,
    senders: Mutex<HashMap<String, broadcast::Sender<Vec<Document>>>>,
    fail_patches: AtomicBool,
    fail_reads: AtomicBool,
}

#[allow(dead_code)]
impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a document and notify subscribers
    pub fn put(&self, collection: &str, document: Document) {
        {
            let mut collections = self.collections.lock().unwrap_or_else(|e| e.into_inner());
            let documents = collections.entry(collection.to_string()).or_default();
            if let Some(existing) = documents.iter_mut().find(|d| d.id == document.id) {
                *existing = document;
            } else {
                documents.push(document);
            }
        }
        self.notify(collection);
    }

    /// Make subsequent patches fail, to exercise the partial-failure path
    pub fn set_fail_patches(&self, fail: bool) {
        self.fail_patches.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent reads fail, to exercise degraded states
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    fn check_reads(&self) -> Result<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(AppError::TransientFetch(
                "Simulated store outage".to_string(),
            ));
        }
        Ok(())
    }

    fn snapshot(&self, collection: &str) -> Vec<Document> {
        let collections = self.collections.lock().unwrap_or_else(|e| e.into_inner());
        collections.get(collection).cloned().unwrap_or_default()
    }

    fn notify(&self, collection: &str) {
        let snapshot = self.snapshot(collection);
        let senders = self.senders.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(sender) = senders.get(collection) {
            let _ = sender.send(snapshot);
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn find_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Vec<Document>> {
        self.check_reads()?;
        Ok(self
            .snapshot(collection)
            .into_iter()
            .filter(|d| d.str_field(field) == Some(value))
            .collect())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        self.check_reads()?;
        Ok(self.snapshot(collection).into_iter().find(|d| d.id == id))
    }

    async fn list(&self, collection: &str) -> Result<Vec<Document>> {
        self.check_reads()?;
        Ok(self.snapshot(collection))
    }

    async fn patch(&self, collection: &str, id: &str, patch: DocumentPatch) -> Result<()> {
        if self.fail_patches.load(Ordering::SeqCst) {
            return Err(AppError::TransientFetch(
                "Simulated patch failure".to_string(),
            ));
        }

        {
            let mut collections = self.collections.lock().unwrap_or_else(|e| e.into_inner());
            let documents = collections.entry(collection.to_string()).or_default();
            let document = documents
                .iter_mut()
                .find(|d| d.id == id)
                .ok_or_else(|| {
                    AppError::NotFound(format!("Document {} not found in {}", id, collection))
                })?;

            for (field, value) in patch.entries() {
                let resolved = match value {
                    PatchValue::Value(v) => v.clone(),
                    // The store assigns the time; here "the store" is us
                    PatchValue::ServerTimestamp => Value::String(Utc::now().to_rfc3339()),
                };
                document.fields.insert(field.clone(), resolved);
            }
        }

        self.notify(collection);
        Ok(())
    }

    async fn subscribe(&self, collection: &str) -> Result<CollectionSubscription> {
        let mut senders = self.senders.lock().unwrap_or_else(|e| e.into_inner());
        let sender = senders
            .entry(collection.to_string())
            .or_insert_with(|| broadcast::channel(SUBSCRIPTION_BUFFER).0);
        Ok(CollectionSubscription::new(sender.subscribe()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(id: &str, email: &str) -> Document {
        let mut fields = serde_json::Map::new();
        fields.insert("email".to_string(), json!(email));
        Document::new(id, fields)
    }

    #[tokio::test]
    async fn find_by_field_matches_string_equality() {
        let store = MemoryDocumentStore::new();
        store.put("orgs", doc("a", "one@example.org"));
        store.put("orgs", doc("b", "two@example.org"));

        let found = store
            .find_by_field("orgs", "email", "two@example.org")
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "b");
    }

    #[tokio::test]
    async fn patch_applies_fields_and_server_timestamp() {
        let store = MemoryDocumentStore::new();
        store.put("reports", doc("r1", "x@example.org"));

        let patch = DocumentPatch::new()
            .set("status", json!("resolved"))
            .set_server_timestamp("resolvedAt");
        store.patch("reports", "r1", patch).await.unwrap();

        let updated = store.get("reports", "r1").await.unwrap().unwrap();
        assert_eq!(updated.str_field("status"), Some("resolved"));
        assert!(updated.str_field("resolvedAt").is_some());
        // untouched field survives
        assert_eq!(updated.str_field("email"), Some("x@example.org"));
    }

    #[tokio::test]
    async fn subscribers_receive_snapshots_on_mutation() {
        let store = MemoryDocumentStore::new();
        let mut subscription = store.subscribe("reports").await.unwrap();

        store.put("reports", doc("r1", "x@example.org"));
        let snapshot = subscription.recv().await.unwrap();
        assert_eq!(snapshot.len(), 1);

        store.put("reports", doc("r2", "y@example.org"));
        let snapshot = subscription.recv().await.unwrap();
        assert_eq!(snapshot.len(), 2);
    }

    #[tokio::test]
    async fn patch_on_missing_document_is_not_found() {
        let store = MemoryDocumentStore::new();
        let err = store
            .patch("reports", "ghost", DocumentPatch::new().set("a", json!(1)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
