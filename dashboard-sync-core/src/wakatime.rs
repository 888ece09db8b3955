//! WakaTime REST client: per-range stats and day-by-day summaries.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, info};

use crate::config::{ProviderConfig, SyncSettings};
use crate::error::ProviderError;
use crate::http::{send_json_with_retry, RetryPolicy};
use crate::range::SummaryWindow;

const PROVIDER: &str = "WakaTime";

/// Stats are computed lazily upstream; anything but `status: "ok"` is still pending.
pub fn stats_pending(body: &Value) -> bool {
    body.pointer("/data/status").and_then(Value::as_str) != Some("ok")
}

#[derive(Debug, Clone)]
pub struct WakaTimeClient {
    http: Client,
    base_url: String,
    access_token: Option<String>,
}

impl WakaTimeClient {
    pub fn new(http: Client, base_url: impl Into<String>, access_token: Option<String>) -> Self {
        WakaTimeClient {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token,
        }
    }

    pub fn from_config(http: Client, config: &ProviderConfig, settings: &SyncSettings) -> Self {
        Self::new(
            http,
            settings.endpoints.wakatime.clone(),
            config.owned("wakatime.access_token"),
        )
    }

    fn auth_header(&self) -> Result<String, ProviderError> {
        let token = self
            .access_token
            .as_deref()
            .ok_or(ProviderError::MissingCredential("WAKATIME_ACCESS_TOKEN"))?;
        Ok(format!("Basic {}", STANDARD.encode(token)))
    }

    /// Fails with `MissingCredential` when no access token is configured.
    pub fn ensure_credentials(&self) -> Result<(), ProviderError> {
        self.auth_header().map(|_| ())
    }

    /// `GET /users/current/stats/{range}`; returns the `data` object.
    pub async fn fetch_stats(
        &self,
        range: &str,
        policy: &RetryPolicy,
    ) -> Result<Value, ProviderError> {
        let auth = self.auth_header()?;
        let url = format!("{}/users/current/stats/{}", self.base_url, range);
        info!(range, "Fetching WakaTime stats");
        let mut body = send_json_with_retry(PROVIDER, policy, || {
            self.http.get(&url).header("Authorization", &auth)
        })
        .await?;
        match body.get_mut("data").map(Value::take) {
            Some(data @ Value::Object(_)) => Ok(data),
            _ => Err(ProviderError::InvalidResponse { provider: PROVIDER }),
        }
    }

    /// `GET /users/current/summaries`; returns the `data` array, one entry per day.
    pub async fn fetch_summaries(
        &self,
        window: &SummaryWindow,
        policy: &RetryPolicy,
    ) -> Result<Vec<Value>, ProviderError> {
        let auth = self.auth_header()?;
        let url = format!("{}/users/current/summaries", self.base_url);
        let query: Vec<(&str, String)> = match window {
            SummaryWindow::Dates(span) => vec![
                ("start", span.start.format("%Y-%m-%d").to_string()),
                ("end", span.end.format("%Y-%m-%d").to_string()),
            ],
            SummaryWindow::Named(name) => vec![("range", name.clone())],
        };
        debug!(?window, "Fetching WakaTime summaries");
        let mut body = send_json_with_retry(PROVIDER, policy, || {
            self.http
                .get(&url)
                .header("Authorization", &auth)
                .query(&query)
        })
        .await?;
        match body.get_mut("data").map(Value::take) {
            Some(Value::Array(summaries)) => {
                info!(days = summaries.len(), "Fetched WakaTime summaries");
                Ok(summaries)
            }
            _ => Err(ProviderError::InvalidResponse { provider: PROVIDER }),
        }
    }
}
