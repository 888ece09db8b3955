#![allow(unused)]

//! # contract: the seams between sync logic and the outside world
//!
//! Sync jobs and the media pipeline never talk to Firestore, Cloud Storage or a
//! media host directly. They take one of the traits below, so the concrete
//! client is constructed once by the caller and injected per invocation.
//!
//! - [`DocumentStore`]: collection/document key-value store. `set` is a full
//!   replace, never a merge.
//! - [`ObjectStore`]: bucket of named objects, written from a byte stream.
//! - [`MediaFetcher`]: downloads a URL as a byte stream.
//!
//! ## Mocking & Testing
//! - Every trait is annotated for `mockall`; with the default `test-export-mocks`
//!   feature the generated `Mock*` types are visible to integration tests.
//! - [`crate::memory`] provides in-memory implementations for dry runs.

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use serde_json::Value;

use mockall::{automock, predicate::*};

use crate::error::{ProviderError, StoreError};

/// Body of a download or upload.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send>>;

/// Metadata attached to a stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMetadata {
    pub content_type: String,
    pub cache_control: Option<String>,
    pub public_read: bool,
    pub resumable: bool,
}

impl Default for ObjectMetadata {
    fn default() -> Self {
        ObjectMetadata {
            content_type: "application/octet-stream".to_string(),
            cache_control: None,
            public_read: false,
            resumable: false,
        }
    }
}

/// A started download: the upstream content type and the body still in flight.
pub struct MediaDownload {
    pub content_type: Option<String>,
    pub body: ByteStream,
}

impl std::fmt::Debug for MediaDownload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaDownload")
            .field("content_type", &self.content_type)
            .finish_non_exhaustive()
    }
}

/// Collection/document persistence.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Writes `document` at `collection/id`, replacing whatever was there.
    async fn set(&self, collection: &str, id: &str, document: Value) -> Result<(), StoreError>;

    /// Reads `collection/id`; `None` when the document does not exist.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError>;
}

/// Bucket/file persistence.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Streams `body` into the object at `path`. Fails if the stream yields an error.
    async fn upload(
        &self,
        path: &str,
        body: ByteStream,
        metadata: ObjectMetadata,
    ) -> Result<(), StoreError>;

    /// Names of every object in the bucket, in the order the provider returns them.
    async fn list(&self) -> Result<Vec<String>, StoreError>;
}

/// Opens a download.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<MediaDownload, ProviderError>;
}
