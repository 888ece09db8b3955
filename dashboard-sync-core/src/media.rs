//! Fetch-and-upload: mirror a remote media file into object storage.
//!
//! The download is never buffered; its byte stream is handed straight to the
//! object store. When the upload fails we still need to say whose fault it
//! was, so the download stream records its own error as it passes through.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::TryStreamExt;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::contract::{ByteStream, MediaDownload, MediaFetcher, ObjectMetadata, ObjectStore};
use crate::error::{MediaError, ProviderError, StoreError};

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Returned after a successful download + upload round trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaUploadResult {
    pub id: String,
    pub file_name: String,
}

/// Streams downloads with reqwest.
#[derive(Debug, Clone)]
pub struct ReqwestMediaFetcher {
    http: Client,
}

impl ReqwestMediaFetcher {
    pub fn new(http: Client) -> Self {
        ReqwestMediaFetcher { http }
    }
}

#[async_trait]
impl MediaFetcher for ReqwestMediaFetcher {
    async fn fetch(&self, url: &str) -> Result<MediaDownload, ProviderError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| ProviderError::transport("media", e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status {
                provider: "media",
                status: status.as_u16(),
            });
        }
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let body: ByteStream = Box::pin(response.bytes_stream().map_err(std::io::Error::other));
        Ok(MediaDownload { content_type, body })
    }
}

/// Downloads `source_url` and streams it into `destination_path`, public-read,
/// non-resumable, with the download's content type.
pub async fn fetch_and_upload_file<F, S>(
    fetcher: &F,
    store: &S,
    id: &str,
    source_url: Option<&str>,
    destination_path: &str,
    cache_control: Option<&str>,
) -> Result<MediaUploadResult, MediaError>
where
    F: MediaFetcher + ?Sized,
    S: ObjectStore + ?Sized,
{
    let source_url = source_url
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| MediaError::MissingMedia(id.to_string()))?;

    info!(id, destination = destination_path, "[MEDIA] Starting download");
    let download = fetcher.fetch(source_url).await.map_err(|e| {
        error!(id, error = %e, "[MEDIA][ERROR] Download failed");
        MediaError::DownloadFailed {
            id: id.to_string(),
            message: e.to_string(),
        }
    })?;

    let metadata = ObjectMetadata {
        content_type: download
            .content_type
            .clone()
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string()),
        cache_control: cache_control.map(str::to_owned),
        public_read: true,
        resumable: false,
    };

    let download_error: Arc<Mutex<Option<String>>> = Arc::new(Mutex::new(None));
    let slot = Arc::clone(&download_error);
    let body: ByteStream = Box::pin(download.body.inspect_err(move |e| {
        if let Ok(mut first) = slot.lock() {
            first.get_or_insert_with(|| e.to_string());
        }
    }));

    match store.upload(destination_path, body, metadata).await {
        Ok(()) => {
            info!(id, file_name = destination_path, "[MEDIA] Upload complete");
            Ok(MediaUploadResult {
                id: id.to_string(),
                file_name: destination_path.to_string(),
            })
        }
        Err(upload_err) => {
            let download_message = download_error.lock().ok().and_then(|slot| slot.clone());
            match download_message {
                Some(message) => {
                    error!(id, error = %message, "[MEDIA][ERROR] Download stream failed");
                    Err(MediaError::DownloadFailed {
                        id: id.to_string(),
                        message,
                    })
                }
                None => {
                    error!(id, error = %upload_err, "[MEDIA][ERROR] Upload failed");
                    Err(MediaError::UploadFailed {
                        path: destination_path.to_string(),
                        message: upload_err.to_string(),
                    })
                }
            }
        }
    }
}

/// Names of every stored object, in provider order.
pub async fn list_stored_media<S>(store: &S) -> Result<Vec<String>, StoreError>
where
    S: ObjectStore + ?Sized,
{
    let names = store.list().await?;
    info!(count = names.len(), "[MEDIA] Listed stored media");
    Ok(names)
}
