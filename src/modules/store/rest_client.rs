//! REST client for the hosted document store.
//!
//! The store exposes named collections of JSON documents:
//!
//! - `GET  {base}/v1/collections/{c}/documents` (full collection)
//! - `GET  {base}/v1/collections/{c}/documents?field=&value=` (equality query)
//! - `GET  {base}/v1/collections/{c}/documents/{id}` (point read)
//! - `PATCH {base}/v1/collections/{c}/documents/{id}` (partial update)
//!
//! The store has no push channel, so change notification is a background
//! polling task per collection that broadcasts a snapshot whenever the
//! fetched collection differs from the previous one.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::broadcast;

use crate::core::config::StoreConfig;
use crate::core::error::{AppError, Result};
use crate::modules::store::document::{
    CollectionSubscription, Document, DocumentPatch, DocumentStore,
};

/// Buffered snapshots per subscription before older ones are dropped
const SUBSCRIPTION_BUFFER: usize = 16;

#[derive(Debug, Deserialize)]
struct ListDocumentsResponse {
    #[serde(default)]
    documents: Vec<Document>,
}

pub struct RestDocumentStore {
    http_client: reqwest::Client,
    config: StoreConfig,
    watchers: Arc<Mutex<HashMap<String, broadcast::Sender<Vec<Document>>>>>,
}

impl RestDocumentStore {
    pub fn new(config: StoreConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            config,
            watchers: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    fn documents_url(&self, collection: &str) -> String {
        format!(
            "{}/v1/collections/{}/documents",
            self.config.base_url,
            urlencoding::encode(collection)
        )
    }

    fn document_url(&self, collection: &str, id: &str) -> String {
        format!(
            "{}/{}",
            self.documents_url(collection),
            urlencoding::encode(id)
        )
    }

    async fn fetch_documents(&self, url: &str) -> Result<Vec<Document>> {
        let response = self
            .http_client
            .get(url)
            .bearer_auth(&self.config.api_key)
            .send()
            .await
            .map_err(|e| AppError::TransientFetch(format!("Store request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::TransientFetch(format!(
                "Store responded with HTTP {}",
                response.status()
            )));
        }

        let body: ListDocumentsResponse = response
            .json()
            .await
            .map_err(|e| AppError::TransientFetch(format!("Invalid store response: {}", e)))?;

        Ok(body.documents)
    }

    /// Start (or reuse) the polling task feeding subscribers of a collection
    fn watcher_sender(&self, collection: &str) -> broadcast::Sender<Vec<Document>> {
        let mut watchers = self.watchers.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(sender) = watchers.get(collection) {
            return sender.clone();
        }

        let (sender, _) = broadcast::channel(SUBSCRIPTION_BUFFER);
        watchers.insert(collection.to_string(), sender.clone());

        let poller = CollectionPoller {
            http_client: self.http_client.clone(),
            config: self.config.clone(),
            collection: collection.to_string(),
            sender: sender.clone(),
            watchers: Arc::clone(&self.watchers),
        };
        tokio::spawn(poller.run());

        sender
    }
}

#[async_trait]
impl DocumentStore for RestDocumentStore {
    async fn find_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Vec<Document>> {
        let url = format!(
            "{}?field={}&value={}",
            self.documents_url(collection),
            urlencoding::encode(field),
            urlencoding::encode(value)
        );
        self.fetch_documents(&url).await
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        let response = self
            .http_client
            .get(self.document_url(collection, id))
            .bearer_auth(&self.config.api_key)
            .send()
            .await
            .map_err(|e| AppError::TransientFetch(format!("Store request failed: {}", e)))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !response.status().is_success() {
            return Err(AppError::TransientFetch(format!(
                "Store responded with HTTP {}",
                response.status()
            )));
        }

        let document: Document = response
            .json()
            .await
            .map_err(|e| AppError::TransientFetch(format!("Invalid store response: {}", e)))?;

        Ok(Some(document))
    }

    async fn list(&self, collection: &str) -> Result<Vec<Document>> {
        self.fetch_documents(&self.documents_url(collection)).await
    }

    async fn patch(&self, collection: &str, id: &str, patch: DocumentPatch) -> Result<()> {
        let response = self
            .http_client
            .patch(self.document_url(collection, id))
            .bearer_auth(&self.config.api_key)
            .json(&serde_json::json!({ "fields": patch.to_wire() }))
            .send()
            .await
            .map_err(|e| AppError::TransientFetch(format!("Store patch failed: {}", e)))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(AppError::NotFound(format!(
                "Document {} not found in {}",
                id, collection
            )));
        }

        if !response.status().is_success() {
            return Err(AppError::TransientFetch(format!(
                "Store patch responded with HTTP {}",
                response.status()
            )));
        }

        Ok(())
    }

    async fn subscribe(&self, collection: &str) -> Result<CollectionSubscription> {
        let sender = self.watcher_sender(collection);
        Ok(CollectionSubscription::new(sender.subscribe()))
    }
}

/// Background polling task feeding one collection's subscribers
struct CollectionPoller {
    http_client: reqwest::Client,
    config: StoreConfig,
    collection: String,
    sender: broadcast::Sender<Vec<Document>>,
    watchers: Arc<Mutex<HashMap<String, broadcast::Sender<Vec<Document>>>>>,
}

impl CollectionPoller {
    async fn run(self) {
        tracing::info!("Starting change poller for collection '{}'", self.collection);

        let mut interval = tokio::time::interval(self.config.poll_interval);
        let mut last_snapshot: Option<Vec<Document>> = None;

        loop {
            interval.tick().await;

            if self.sender.receiver_count() == 0 {
                // Last subscriber is gone; stop polling and let a future
                // subscribe() start a fresh poller.
                let mut watchers = self.watchers.lock().unwrap_or_else(|e| e.into_inner());
                watchers.remove(&self.collection);
                tracing::info!(
                    "Stopping change poller for collection '{}' (no subscribers)",
                    self.collection
                );
                return;
            }

            let url = format!(
                "{}/v1/collections/{}/documents",
                self.config.base_url,
                urlencoding::encode(&self.collection)
            );

            let snapshot = match self.fetch(&url).await {
                Ok(documents) => documents,
                Err(e) => {
                    tracing::error!(
                        "Change poll for collection '{}' failed: {}",
                        self.collection,
                        e
                    );
                    continue;
                }
            };

            if last_snapshot.as_ref() == Some(&snapshot) {
                continue;
            }

            last_snapshot = Some(snapshot.clone());
            let _ = self.sender.send(snapshot);
        }
    }

    async fn fetch(&self, url: &str) -> Result<Vec<Document>> {
        let response = self
            .http_client
            .get(url)
            .bearer_auth(&self.config.api_key)
            .send()
            .await
            .map_err(|e| AppError::TransientFetch(format!("Store request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::TransientFetch(format!(
                "Store responded with HTTP {}",
                response.status()
            )));
        }

        let body: ListDocumentsResponse = response
            .json()
            .await
            .map_err(|e| AppError::TransientFetch(format!("Invalid store response: {}", e)))?;

        Ok(body.documents)
    }
}
