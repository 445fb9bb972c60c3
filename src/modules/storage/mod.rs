//! Object storage for resolution photos
//!
//! Blob persistence is delegated to MinIO or any S3-compatible service.
//! The trait keeps the seam injectable; tests use the in-memory double.

mod memory;
mod minio;

use async_trait::async_trait;

use crate::core::error::Result;

pub use memory::MemoryStorage;
pub use minio::MinioStorage;

/// External object storage: store a blob at a key, derive a retrievable URL.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Store a blob under the given key
    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> Result<()>;

    /// Retrievable URL for a stored key. Must stay valid indefinitely, since
    /// it is persisted into report documents.
    fn object_url(&self, key: &str) -> String;
}
