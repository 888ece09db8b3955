//! In-memory stores for dry runs and tests.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use futures::TryStreamExt;
use serde_json::Value;
use tracing::debug;

use crate::contract::{ByteStream, DocumentStore, ObjectMetadata, ObjectStore};
use crate::error::StoreError;

#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    documents: Mutex<BTreeMap<(String, String), Value>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stored document as `(collection, id, document)`, sorted by key.
    pub fn snapshot(&self) -> Vec<(String, String, Value)> {
        let docs = self
            .documents
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        docs.iter()
            .map(|((c, id), v)| (c.clone(), id.clone(), v.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn set(&self, collection: &str, id: &str, document: Value) -> Result<(), StoreError> {
        let path = format!("{collection}/{id}");
        let mut docs = self.documents.lock().map_err(|e| StoreError::Write {
            path: path.clone(),
            message: e.to_string(),
        })?;
        docs.insert((collection.to_string(), id.to_string()), document);
        debug!(%path, "Stored document in memory");
        Ok(())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        let docs = self.documents.lock().map_err(|e| StoreError::Read {
            path: format!("{collection}/{id}"),
            message: e.to_string(),
        })?;
        Ok(docs
            .get(&(collection.to_string(), id.to_string()))
            .cloned())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub name: String,
    pub data: Vec<u8>,
    pub metadata: ObjectMetadata,
}

/// Keeps objects in insertion order; re-uploading a name replaces it in place.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: Mutex<Vec<StoredObject>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let objects = names
            .into_iter()
            .map(|name| StoredObject {
                name: name.into(),
                data: Vec::new(),
                metadata: ObjectMetadata::default(),
            })
            .collect();
        MemoryObjectStore {
            objects: Mutex::new(objects),
        }
    }

    pub fn object(&self, name: &str) -> Option<StoredObject> {
        self.objects
            .lock()
            .ok()
            .and_then(|objects| objects.iter().find(|o| o.name == name).cloned())
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn upload(
        &self,
        path: &str,
        body: ByteStream,
        metadata: ObjectMetadata,
    ) -> Result<(), StoreError> {
        let chunks: Vec<_> = body.try_collect().await.map_err(|e| StoreError::Upload {
            path: path.to_string(),
            message: e.to_string(),
        })?;
        let data = chunks.concat();
        let mut objects = self.objects.lock().map_err(|e| StoreError::Upload {
            path: path.to_string(),
            message: e.to_string(),
        })?;
        let object = StoredObject {
            name: path.to_string(),
            data,
            metadata,
        };
        match objects.iter_mut().find(|o| o.name == path) {
            Some(existing) => *existing = object,
            None => objects.push(object),
        }
        Ok(())
    }

    async fn list(&self) -> Result<Vec<String>, StoreError> {
        let objects = self.objects.lock().map_err(|e| StoreError::List {
            bucket: "memory".to_string(),
            message: e.to_string(),
        })?;
        Ok(objects.iter().map(|o| o.name.clone()).collect())
    }
}
