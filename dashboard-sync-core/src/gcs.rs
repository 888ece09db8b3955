//! Cloud Storage JSON API object store.
//!
//! Uploads are single-request (`uploadType=media`) streamed from the body;
//! `resumable` in the metadata is accepted but has no effect here.

use async_trait::async_trait;
use reqwest::{Body, Client, RequestBuilder, Url};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error, info};

use crate::config::{ProviderConfig, SyncSettings};
use crate::contract::{ByteStream, ObjectMetadata, ObjectStore};
use crate::error::StoreError;
use crate::http::bounded;

#[derive(Debug, Clone)]
pub struct GcsClient {
    http: Client,
    base_url: String,
    bucket: String,
    access_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectPage {
    #[serde(default)]
    items: Vec<ObjectEntry>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ObjectEntry {
    name: String,
}

impl GcsClient {
    pub fn new(
        http: Client,
        base_url: impl Into<String>,
        bucket: impl Into<String>,
        access_token: Option<String>,
    ) -> Self {
        GcsClient {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            bucket: bucket.into(),
            access_token,
        }
    }

    /// `None` when no bucket is configured.
    pub fn from_config(http: Client, config: &ProviderConfig, settings: &SyncSettings) -> Option<Self> {
        let bucket = config.get("storage.bucket")?;
        Some(Self::new(
            http,
            settings.endpoints.storage.clone(),
            bucket,
            config.owned("gcp.access_token"),
        ))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// `{base}/storage/v1/b/{bucket}/o/{name}` with the name as one encoded segment.
    fn object_url(&self, name: &str) -> Result<Url, String> {
        let mut url = Url::parse(&self.base_url).map_err(|e| e.to_string())?;
        url.path_segments_mut()
            .map_err(|_| format!("{} cannot be a base URL", self.base_url))?
            .pop_if_empty()
            .extend(["storage", "v1", "b", self.bucket.as_str(), "o", name]);
        Ok(url)
    }

    async fn set_cache_control(&self, path: &str, cache_control: &str) -> Result<(), StoreError> {
        let upload_err = |message: String| StoreError::Upload {
            path: path.to_string(),
            message,
        };
        let url = self.object_url(path).map_err(upload_err)?;
        let response = self
            .authorize(bounded(self.http.patch(url)))
            .json(&json!({ "cacheControl": cache_control }))
            .send()
            .await
            .map_err(|e| upload_err(e.to_string()))?;
        if !response.status().is_success() {
            return Err(upload_err(format!(
                "metadata update returned status {}",
                response.status()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for GcsClient {
    async fn upload(
        &self,
        path: &str,
        body: ByteStream,
        metadata: ObjectMetadata,
    ) -> Result<(), StoreError> {
        let upload_err = |message: String| StoreError::Upload {
            path: path.to_string(),
            message,
        };
        if metadata.resumable {
            debug!(path, "Resumable upload requested; using a single request");
        }

        let url = format!("{}/upload/storage/v1/b/{}/o", self.base_url, self.bucket);
        let mut query = vec![("uploadType", "media"), ("name", path)];
        if metadata.public_read {
            query.push(("predefinedAcl", "publicRead"));
        }
        let request = self
            .http
            .post(url)
            .query(&query)
            .header("Content-Type", metadata.content_type.as_str())
            .body(Body::wrap_stream(body));
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| upload_err(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            error!(path, status = %status, %detail, "Cloud Storage rejected upload");
            return Err(upload_err(format!("status {status}")));
        }

        if let Some(cache_control) = metadata.cache_control.as_deref() {
            self.set_cache_control(path, cache_control).await?;
        }
        info!(path, bucket = %self.bucket, content_type = %metadata.content_type, "Uploaded object");
        Ok(())
    }

    async fn list(&self) -> Result<Vec<String>, StoreError> {
        let list_err = |message: String| StoreError::List {
            bucket: self.bucket.clone(),
            message,
        };
        let url = format!("{}/storage/v1/b/{}/o", self.base_url, self.bucket);
        let mut names = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut request =
                bounded(self.http.get(&url)).query(&[("fields", "items(name),nextPageToken")]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }
            let response = self
                .authorize(request)
                .send()
                .await
                .map_err(|e| list_err(e.to_string()))?;
            if !response.status().is_success() {
                return Err(list_err(format!("status {}", response.status())));
            }
            let page: ObjectPage = response
                .json()
                .await
                .map_err(|e| list_err(e.to_string()))?;
            names.extend(page.items.into_iter().map(|entry| entry.name));
            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }
        debug!(bucket = %self.bucket, count = names.len(), "Listed bucket objects");
        Ok(names)
    }
}
