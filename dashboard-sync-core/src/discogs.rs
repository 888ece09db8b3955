//! Discogs release lookup.
//!
//! Soft-fail contract: once the API key is present, any transport or status
//! failure is logged and reported as `Ok(None)` so a caller iterating over a
//! collection can carry on. Only a missing key is a hard error.

use reqwest::{Client, Url};
use serde_json::Value;
use tracing::{error, info, warn};

use crate::config::{ProviderConfig, SyncSettings};
use crate::error::ProviderError;
use crate::http::bounded;
use crate::transform::{release_to_collection_item, CollectionItem, RawDiscogsRelease};

#[derive(Debug, Clone)]
pub struct DiscogsClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
}

/// Appends `token=<key>` unless the URL already carries a token.
/// `None` if `url` does not parse.
pub fn with_token(url: &str, key: &str) -> Option<String> {
    let mut parsed = Url::parse(url).ok()?;
    if !parsed.query_pairs().any(|(k, _)| k == "token") {
        parsed.query_pairs_mut().append_pair("token", key);
    }
    Some(parsed.into())
}

impl DiscogsClient {
    pub fn new(http: Client, base_url: impl Into<String>, api_key: Option<String>) -> Self {
        DiscogsClient {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        }
    }

    pub fn from_config(http: Client, config: &ProviderConfig, settings: &SyncSettings) -> Self {
        Self::new(
            http,
            settings.endpoints.discogs.clone(),
            config.owned("discogs.api_key"),
        )
    }

    /// `GET /releases/{id}`.
    pub async fn fetch_release(&self, release_id: u64) -> Result<Option<Value>, ProviderError> {
        let url = format!("{}/releases/{}", self.base_url, release_id);
        self.fetch_resource(&url).await
    }

    /// Fetches any Discogs resource URL (e.g. a `resource_url` from a listing).
    pub async fn fetch_resource(&self, url: &str) -> Result<Option<Value>, ProviderError> {
        let key = self
            .api_key
            .as_deref()
            .ok_or(ProviderError::MissingCredential("DISCOGS_API_KEY"))?;
        let Some(url) = with_token(url, key) else {
            error!(url, "Invalid Discogs resource URL");
            return Ok(None);
        };

        let response = match bounded(self.http.get(&url)).send().await {
            Ok(response) => response,
            Err(e) => {
                error!(error = %e, "Discogs request failed");
                return Ok(None);
            }
        };
        let status = response.status();
        if !status.is_success() {
            warn!(status = %status, "Discogs returned non-success status");
            return Ok(None);
        }
        match response.json::<Value>().await {
            Ok(body) => {
                info!("Fetched Discogs resource");
                Ok(Some(body))
            }
            Err(e) => {
                error!(error = %e, "Failed to decode Discogs response");
                Ok(None)
            }
        }
    }

    /// Looks a release up and reshapes it for display.
    pub async fn fetch_release_item(
        &self,
        release_id: u64,
    ) -> Result<Option<CollectionItem>, ProviderError> {
        let Some(body) = self.fetch_release(release_id).await? else {
            return Ok(None);
        };
        match serde_json::from_value::<RawDiscogsRelease>(body) {
            Ok(release) => Ok(Some(release_to_collection_item(&release))),
            Err(e) => {
                error!(error = %e, release_id, "Discogs release did not match the expected shape");
                Ok(None)
            }
        }
    }
}
