//! Provider credentials and non-secret sync settings.
//!
//! Credentials are never read from files: [`ProviderConfig`] resolves each
//! config path through [`ENV_MAPPING`] against a lookup function, which is the
//! process environment in production. Everything else lives in [`SyncSettings`],
//! which deserializes from YAML with every field defaulted.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ProviderError;
use crate::range::StatsRange;

/// Config path → environment variable.
pub const ENV_MAPPING: &[(&str, &str)] = &[
    ("wakatime.access_token", "WAKATIME_ACCESS_TOKEN"),
    ("discogs.api_key", "DISCOGS_API_KEY"),
    ("discogs.user_id", "DISCOGS_USER_ID"),
    ("flickr.api_key", "FLICKR_API_KEY"),
    ("flickr.user_id", "FLICKR_USER_ID"),
    ("steam.api_key", "STEAM_API_KEY"),
    ("steam.user_id", "STEAM_USER_ID"),
    ("github.access_token", "GITHUB_ACCESS_TOKEN"),
    ("github.username", "GITHUB_USERNAME"),
    ("spotify.client_id", "SPOTIFY_CLIENT_ID"),
    ("spotify.client_secret", "SPOTIFY_CLIENT_SECRET"),
    ("spotify.refresh_token", "SPOTIFY_REFRESH_TOKEN"),
    ("goodreads.key", "GOODREADS_KEY"),
    ("goodreads.user_id", "GOODREADS_USER_ID"),
    ("instagram.access_token", "INSTAGRAM_ACCESS_TOKEN"),
    ("google_books.api_key", "GOOGLE_BOOKS_API_KEY"),
    ("google_books.user_id", "GOOGLE_BOOKS_USER_ID"),
    ("gcp.project_id", "GCP_PROJECT_ID"),
    ("gcp.access_token", "GCP_ACCESS_TOKEN"),
    ("storage.bucket", "CLOUD_STORAGE_BUCKET"),
];

/// Looks up the environment variable backing a config path.
pub fn env_var_for(path: &str) -> Option<&'static str> {
    ENV_MAPPING
        .iter()
        .find(|(p, _)| *p == path)
        .map(|(_, var)| *var)
}

/// Resolved provider credentials, keyed by config path.
#[derive(Clone, Default)]
pub struct ProviderConfig {
    values: BTreeMap<&'static str, String>,
}

impl ProviderConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Builds the config by resolving every mapped variable through `lookup`.
    /// Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let values: BTreeMap<_, _> = ENV_MAPPING
            .iter()
            .filter_map(|(path, var)| {
                lookup(*var)
                    .filter(|v| !v.trim().is_empty())
                    .map(|v| (*path, v))
            })
            .collect();
        info!(
            resolved = values.len(),
            total = ENV_MAPPING.len(),
            "Resolved provider credentials"
        );
        ProviderConfig { values }
    }

    /// Sets a value by config path. Unknown paths are ignored.
    pub fn with(mut self, path: &str, value: impl Into<String>) -> Self {
        if let Some((known, _)) = ENV_MAPPING.iter().find(|(p, _)| *p == path) {
            self.values.insert(*known, value.into());
        } else {
            debug!(path, "Ignoring unknown config path");
        }
        self
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.values.get(path).map(String::as_str)
    }

    pub(crate) fn owned(&self, path: &str) -> Option<String> {
        self.get(path).map(str::to_owned)
    }

    /// Like [`get`](Self::get), but a missing value is a `MissingCredential`
    /// naming the environment variable.
    pub fn require(&self, path: &str) -> Result<&str, ProviderError> {
        match self.get(path) {
            Some(value) => Ok(value),
            None => Err(ProviderError::MissingCredential(
                env_var_for(path).unwrap_or("UNKNOWN_CONFIG_PATH"),
            )),
        }
    }

    /// Every mapping entry with no value.
    pub fn missing(&self) -> Vec<(&'static str, &'static str)> {
        ENV_MAPPING
            .iter()
            .filter(|(path, _)| !self.values.contains_key(path))
            .copied()
            .collect()
    }
}

// Never print secret values.
impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("set", &self.values.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub wakatime: String,
    pub discogs: String,
    pub flickr: String,
    pub github: String,
    pub spotify_api: String,
    pub spotify_accounts: String,
    pub firestore: String,
    pub storage: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Endpoints {
            wakatime: "https://wakatime.com/api/v1".into(),
            discogs: "https://api.discogs.com".into(),
            flickr: "https://api.flickr.com".into(),
            github: "https://api.github.com".into(),
            spotify_api: "https://api.spotify.com/v1".into(),
            spotify_accounts: "https://accounts.spotify.com".into(),
            firestore: "https://firestore.googleapis.com/v1".into(),
            storage: "https://storage.googleapis.com".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub attempts: u32,
    pub delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        RetrySettings {
            attempts: 3,
            delay_ms: 1_000,
        }
    }
}

impl RetrySettings {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// Target collection names in the document store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionNames {
    pub stats: String,
    pub summaries: String,
    pub code_summaries: String,
    pub tracks: String,
    pub photos: String,
    pub repositories: String,
}

impl Default for CollectionNames {
    fn default() -> Self {
        CollectionNames {
            stats: "stats".into(),
            summaries: "summaries".into(),
            code_summaries: "code_summaries".into(),
            tracks: "tracks".into(),
            photos: "photos".into(),
            repositories: "repositories".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    pub endpoints: Endpoints,
    pub stats_ranges: Vec<StatsRange>,
    pub summary_ranges: Vec<StatsRange>,
    pub retry: RetrySettings,
    pub collections: CollectionNames,
    pub github_repository_count: usize,
    pub flickr_per_page: u32,
    pub spotify_time_range: String,
    pub spotify_limit: u32,
    pub firestore_database: String,
    pub media_cache_control: String,
}

impl Default for SyncSettings {
    fn default() -> Self {
        SyncSettings {
            endpoints: Endpoints::default(),
            stats_ranges: ["last_7_days", "last_30_days", "last_6_months", "last_year"]
                .into_iter()
                .map(StatsRange::named)
                .collect(),
            summary_ranges: ["last_7_days", "last_30_days"]
                .into_iter()
                .map(StatsRange::named)
                .collect(),
            retry: RetrySettings::default(),
            collections: CollectionNames::default(),
            github_repository_count: 6,
            flickr_per_page: 30,
            spotify_time_range: "short_term".into(),
            spotify_limit: 20,
            firestore_database: "(default)".into(),
            media_cache_control: "public, max-age=31536000".into(),
        }
    }
}

impl SyncSettings {
    pub fn trace_loaded(&self) {
        info!(
            stats_ranges = self.stats_ranges.len(),
            summary_ranges = self.summary_ranges.len(),
            retry_attempts = self.retry.attempts,
            "Loaded sync settings"
        );
        debug!(?self, "Sync settings (full debug)");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn resolves_paths_through_the_mapping() {
        let config = ProviderConfig::from_lookup(lookup_from(&[
            ("WAKATIME_ACCESS_TOKEN", "waka"),
            ("FLICKR_USER_ID", "123@N01"),
        ]));
        assert_eq!(config.get("wakatime.access_token"), Some("waka"));
        assert_eq!(config.get("flickr.user_id"), Some("123@N01"));
        assert_eq!(config.get("flickr.api_key"), None);
    }

    #[test]
    fn empty_values_are_unset() {
        let config = ProviderConfig::from_lookup(lookup_from(&[("DISCOGS_API_KEY", "  ")]));
        assert!(config.get("discogs.api_key").is_none());
        assert!(config
            .missing()
            .contains(&("discogs.api_key", "DISCOGS_API_KEY")));
    }

    #[test]
    fn require_reports_the_env_var() {
        let err = ProviderConfig::default()
            .require("discogs.api_key")
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Missing required environment variable: DISCOGS_API_KEY"
        );
    }

    #[test]
    fn debug_output_hides_values() {
        let config = ProviderConfig::default().with("github.access_token", "ghp_secret");
        let printed = format!("{config:?}");
        assert!(printed.contains("github.access_token"));
        assert!(!printed.contains("ghp_secret"));
    }

    #[test]
    fn settings_default_every_field() {
        let settings: SyncSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings.stats_ranges.len(), 4);
        assert_eq!(settings.collections.stats, "stats");
        assert_eq!(settings.retry.attempts, 3);
    }
}
