//! Flickr photo listing via `flickr.people.getPhotos`.

use reqwest::Client;
use serde_json::Value;
use tracing::{info, warn};

use crate::config::{ProviderConfig, SyncSettings};
use crate::error::ProviderError;
use crate::http::{send_json_with_retry, RetryPolicy};
use crate::transform::{photo_to_card, FlickrPhoto, RawFlickrPhoto};

const PROVIDER: &str = "Flickr";
const EXTRAS: &str = "description,date_taken,url_q,url_m,url_l,url_o";

#[derive(Debug, Clone)]
pub struct FlickrClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
    user_id: Option<String>,
}

impl FlickrClient {
    pub fn new(
        http: Client,
        base_url: impl Into<String>,
        api_key: Option<String>,
        user_id: Option<String>,
    ) -> Self {
        FlickrClient {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            user_id,
        }
    }

    pub fn from_config(http: Client, config: &ProviderConfig, settings: &SyncSettings) -> Self {
        Self::new(
            http,
            settings.endpoints.flickr.clone(),
            config.owned("flickr.api_key"),
            config.owned("flickr.user_id"),
        )
    }

    /// Lists the user's public photos, newest first, as display cards.
    pub async fn fetch_photos(
        &self,
        per_page: u32,
        policy: &RetryPolicy,
    ) -> Result<Vec<FlickrPhoto>, ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ProviderError::MissingCredential("FLICKR_API_KEY"))?;
        let user_id = self
            .user_id
            .as_deref()
            .ok_or(ProviderError::MissingCredential("FLICKR_USER_ID"))?;

        let url = format!("{}/services/rest/", self.base_url);
        let per_page = per_page.to_string();
        let body = send_json_with_retry(PROVIDER, policy, || {
            self.http.get(&url).query(&[
                ("method", "flickr.people.getPhotos"),
                ("api_key", api_key),
                ("user_id", user_id),
                ("extras", EXTRAS),
                ("per_page", per_page.as_str()),
                ("format", "json"),
                ("nojsoncallback", "1"),
            ])
        })
        .await?;

        let photos = parse_photos(&body)?;
        info!(count = photos.len(), "Fetched Flickr photos");
        Ok(photos
            .iter()
            .map(|photo| photo_to_card(photo, user_id))
            .collect())
    }
}

/// Pulls `photos.photo` out of a response. Entries that don't look like photos
/// are skipped with a warning.
pub fn parse_photos(body: &Value) -> Result<Vec<RawFlickrPhoto>, ProviderError> {
    let entries = body
        .pointer("/photos/photo")
        .and_then(Value::as_array)
        .ok_or(ProviderError::InvalidResponse { provider: PROVIDER })?;
    Ok(entries
        .iter()
        .filter_map(|entry| match serde_json::from_value(entry.clone()) {
            Ok(photo) => Some(photo),
            Err(e) => {
                warn!(error = %e, "Skipping malformed Flickr photo entry");
                None
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_photo_array_is_invalid_regardless_of_other_fields() {
        for body in [
            json!({"stat": "ok"}),
            json!({"photos": {"page": 1, "pages": 1}}),
            json!({"photos": {"photo": "nope"}, "stat": "ok"}),
        ] {
            let err = parse_photos(&body).unwrap_err();
            assert_eq!(err.to_string(), "Invalid response from Flickr API");
        }
    }

    #[test]
    fn empty_photo_array_is_valid() {
        let photos = parse_photos(&json!({"photos": {"photo": []}})).unwrap();
        assert!(photos.is_empty());
    }
}
