use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::broadcast;

use crate::core::error::Result;

/// A single JSON document in a named collection.
///
/// Documents are schemaless; typed views are built on top by the features
/// that consume them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Store-assigned identifier, unique within the collection
    pub id: String,
    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl Document {
    pub fn new(id: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }

    #[allow(dead_code)]
    pub fn f64_field(&self, name: &str) -> Option<f64> {
        self.fields.get(name).and_then(Value::as_f64)
    }
}

/// A value in a partial update: either plain JSON, or the sentinel telling
/// the store to assign its own timestamp.
#[derive(Debug, Clone, PartialEq)]
pub enum PatchValue {
    Value(Value),
    ServerTimestamp,
}

impl PatchValue {
    /// Wire representation; the sentinel is resolved by the store on write
    pub fn to_wire(&self) -> Value {
        match self {
            PatchValue::Value(v) => v.clone(),
            PatchValue::ServerTimestamp => {
                serde_json::json!({ "$serverTimestamp": true })
            }
        }
    }
}

/// An ordered set of field updates applied as one atomic patch.
/// Fields not named in the patch are left untouched by the store.
#[derive(Debug, Clone, Default)]
pub struct DocumentPatch {
    entries: Vec<(String, PatchValue)>,
}

impl DocumentPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, field: &str, value: Value) -> Self {
        self.entries.push((field.to_string(), PatchValue::Value(value)));
        self
    }

    pub fn set_server_timestamp(mut self, field: &str) -> Self {
        self.entries
            .push((field.to_string(), PatchValue::ServerTimestamp));
        self
    }

    pub fn entries(&self) -> &[(String, PatchValue)] {
        &self.entries
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_wire(&self) -> Value {
        let mut map = Map::new();
        for (field, value) in &self.entries {
            map.insert(field.clone(), value.to_wire());
        }
        Value::Object(map)
    }
}

/// A change-notification subscription over one collection.
///
/// Every message carries the full current snapshot, so consumers recompute
/// their derived state from scratch rather than diffing.
pub struct CollectionSubscription {
    rx: broadcast::Receiver<Vec<Document>>,
}

impl CollectionSubscription {
    pub fn new(rx: broadcast::Receiver<Vec<Document>>) -> Self {
        Self { rx }
    }

    /// Wait for the next snapshot. Returns `None` once the store side is
    /// gone. A lagged receiver skips to the most recent snapshot, which is
    /// safe because each message is complete.
    pub async fn recv(&mut self) -> Option<Vec<Document>> {
        loop {
            match self.rx.recv().await {
                Ok(snapshot) => return Some(snapshot),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!("Subscription lagged, skipped {} snapshots", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// The external document store this application delegates persistence to.
///
/// Consistency and ordering of individual updates are the store's concern,
/// not this application's.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Equality query over one field of a collection
    async fn find_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Vec<Document>>;

    /// Point read by id; `None` when the document does not exist
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>>;

    /// Full collection snapshot
    async fn list(&self, collection: &str) -> Result<Vec<Document>>;

    /// Partial field update; fields outside the patch are never overwritten
    async fn patch(&self, collection: &str, id: &str, patch: DocumentPatch) -> Result<()>;

    /// Subscribe to change notifications for a collection
    async fn subscribe(&self, collection: &str) -> Result<CollectionSubscription>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn patch_wire_format_carries_values_and_sentinel() {
        let patch = DocumentPatch::new()
            .set("status", json!("resolved"))
            .set_server_timestamp("resolvedAt");

        assert_eq!(
            patch.to_wire(),
            json!({
                "status": "resolved",
                "resolvedAt": { "$serverTimestamp": true }
            })
        );
        assert!(!patch.is_empty());
        assert_eq!(patch.entries().len(), 2);
    }

    #[test]
    fn subscription_recv_skips_lagged_snapshots_and_ends_on_close() {
        tokio_test::block_on(async {
            let (tx, rx) = broadcast::channel(1);
            let mut subscription = CollectionSubscription::new(rx);

            // Overflow the single-slot buffer; recv resumes at the newest
            let _ = tx.send(vec![Document::new("a", Map::new())]);
            let _ = tx.send(vec![Document::new("b", Map::new())]);

            let snapshot = subscription.recv().await.unwrap();
            assert_eq!(snapshot[0].id, "b");

            drop(tx);
            assert!(subscription.recv().await.is_none());
        });
    }

    #[test]
    fn document_field_accessors() {
        let fields = json!({ "email": "org@example.org", "count": 3.5 })
            .as_object()
            .cloned()
            .unwrap();
        let document = Document::new("d1", fields);

        assert_eq!(document.str_field("email"), Some("org@example.org"));
        assert_eq!(document.f64_field("count"), Some(3.5));
        assert!(document.field("missing").is_none());
    }
}
