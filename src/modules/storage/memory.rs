//! In-memory object storage double for tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::core::error::{AppError, Result};
use crate::modules::storage::ObjectStorage;

#[derive(Debug, Clone, PartialEq)]
#[allow(dead_code)]
pub struct StoredObject {
    pub key: String,
    pub content_type: String,
    pub size: usize,
}

#[derive(Default)]
#[allow(dead_code)]
pub struct MemoryStorage {
    objects: Mutex<Vec<StoredObject>>,
    fail_puts: AtomicBool,
}

#[allow(dead_code)]
impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::SeqCst);
    }

    pub fn objects(&self) -> Vec<StoredObject> {
        self.objects
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl ObjectStorage for MemoryStorage {
    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> Result<()> {
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(AppError::Internal(
                "Simulated storage outage".to_string(),
            ));
        }

        self.objects
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(StoredObject {
                key: key.to_string(),
                content_type: content_type.to_string(),
                size: data.len(),
            });
        Ok(())
    }

    fn object_url(&self, key: &str) -> String {
        format!("memory://photos/{}", key)
    }
}
