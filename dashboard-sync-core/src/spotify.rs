//! Spotify Web API client for the "currently listening to" tracks.
//!
//! The dashboard runs unattended, so there is no interactive authorization:
//! a long-lived refresh token is exchanged for a short-lived access token on
//! every invocation.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{error, info};

use crate::config::{ProviderConfig, SyncSettings};
use crate::error::ProviderError;
use crate::http::{send_json, send_json_with_retry, RetryPolicy};
use crate::transform::{track_to_collection_item, CollectionItem, RawSpotifyTrack};

const PROVIDER: &str = "Spotify";

#[derive(Debug, Clone)]
pub struct SpotifyClient {
    http: Client,
    api_url: String,
    accounts_url: String,
    client_id: Option<String>,
    client_secret: Option<String>,
    refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct Paging {
    #[serde(default)]
    items: Vec<RawSpotifyTrack>,
}

impl SpotifyClient {
    pub fn from_config(http: Client, config: &ProviderConfig, settings: &SyncSettings) -> Self {
        SpotifyClient {
            http,
            api_url: settings
                .endpoints
                .spotify_api
                .trim_end_matches('/')
                .to_string(),
            accounts_url: settings
                .endpoints
                .spotify_accounts
                .trim_end_matches('/')
                .to_string(),
            client_id: config.owned("spotify.client_id"),
            client_secret: config.owned("spotify.client_secret"),
            refresh_token: config.owned("spotify.refresh_token"),
        }
    }

    /// Exchanges the configured refresh token for an access token.
    pub async fn refresh_access_token(&self) -> Result<String, ProviderError> {
        let client_id = self
            .client_id
            .as_deref()
            .ok_or(ProviderError::MissingCredential("SPOTIFY_CLIENT_ID"))?;
        let client_secret = self
            .client_secret
            .as_deref()
            .ok_or(ProviderError::MissingCredential("SPOTIFY_CLIENT_SECRET"))?;
        let refresh_token = self
            .refresh_token
            .as_deref()
            .ok_or(ProviderError::MissingCredential("SPOTIFY_REFRESH_TOKEN"))?;

        let basic = STANDARD.encode(format!("{client_id}:{client_secret}"));
        let request = self
            .http
            .post(format!("{}/api/token", self.accounts_url))
            .header("Authorization", format!("Basic {basic}"))
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ]);
        let body = send_json(PROVIDER, request).await?;
        let token: TokenResponse = serde_json::from_value(body).map_err(|e| {
            error!(error = %e, "Spotify token response had no access_token");
            ProviderError::InvalidResponse { provider: PROVIDER }
        })?;
        Ok(token.access_token)
    }

    /// `GET /me/top/tracks`, reshaped into collection items.
    pub async fn fetch_top_tracks(
        &self,
        time_range: &str,
        limit: u32,
        policy: &RetryPolicy,
    ) -> Result<Vec<CollectionItem>, ProviderError> {
        let access_token = self.refresh_access_token().await?;
        let url = format!("{}/me/top/tracks", self.api_url);
        let limit = limit.to_string();
        let body: Value = send_json_with_retry(PROVIDER, policy, || {
            self.http
                .get(&url)
                .bearer_auth(&access_token)
                .query(&[("time_range", time_range), ("limit", limit.as_str())])
        })
        .await?;
        let page: Paging =
            serde_json::from_value(body).map_err(|e| ProviderError::decode(PROVIDER, e))?;
        info!(count = page.items.len(), time_range, "Fetched Spotify top tracks");
        Ok(page.items.iter().map(track_to_collection_item).collect())
    }
}
