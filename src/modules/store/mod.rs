//! Document store client
//!
//! The backend-as-a-service owns persistence and live-update delivery; this
//! module provides the trait the rest of the application is written against,
//! the REST client used in production, and an in-memory double for tests.

mod document;
mod memory;
mod rest_client;

pub use document::{CollectionSubscription, Document, DocumentPatch, DocumentStore, PatchValue};
pub use memory::MemoryDocumentStore;
pub use rest_client::RestDocumentStore;
