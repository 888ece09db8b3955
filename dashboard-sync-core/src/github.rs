//! GitHub GraphQL client for the repository showcase.

use reqwest::Client;
use serde_json::{json, Value};
use tracing::{error, info};

use crate::config::{ProviderConfig, SyncSettings};
use crate::error::ProviderError;
use crate::http::{send_json_with_retry, RetryPolicy};
use crate::transform::{flatten_repository, RawRepository, Repository};

const PROVIDER: &str = "GitHub";

/// Most recent `$count` public, non-fork repositories the user owns. Ordering by
/// creation ascending and taking `last` yields the newest ones, oldest first.
pub const REPOSITORIES_QUERY: &str = r#"
query Repositories($login: String!, $count: Int!) {
  user(login: $login) {
    repositories(
      last: $count
      privacy: PUBLIC
      isFork: false
      ownerAffiliations: OWNER
      orderBy: { field: CREATED_AT, direction: ASC }
    ) {
      nodes {
        name
        description
        url
        homepageUrl
        createdAt
        updatedAt
        primaryLanguage { name color }
        stargazers { totalCount }
        forks { totalCount }
      }
    }
  }
}
"#;

#[derive(Debug, Clone)]
pub struct GithubClient {
    http: Client,
    base_url: String,
    access_token: Option<String>,
    username: Option<String>,
}

impl GithubClient {
    pub fn new(
        http: Client,
        base_url: impl Into<String>,
        access_token: Option<String>,
        username: Option<String>,
    ) -> Self {
        GithubClient {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token,
            username,
        }
    }

    pub fn from_config(http: Client, config: &ProviderConfig, settings: &SyncSettings) -> Self {
        Self::new(
            http,
            settings.endpoints.github.clone(),
            config.owned("github.access_token"),
            config.owned("github.username"),
        )
    }

    pub async fn fetch_repositories(
        &self,
        count: usize,
        policy: &RetryPolicy,
    ) -> Result<Vec<Repository>, ProviderError> {
        let token = self
            .access_token
            .as_deref()
            .ok_or(ProviderError::MissingCredential("GITHUB_ACCESS_TOKEN"))?;
        let login = self
            .username
            .as_deref()
            .ok_or(ProviderError::MissingCredential("GITHUB_USERNAME"))?;

        let url = format!("{}/graphql", self.base_url);
        let payload = json!({
            "query": REPOSITORIES_QUERY,
            "variables": { "login": login, "count": count },
        });
        let body = send_json_with_retry(PROVIDER, policy, || {
            self.http.post(&url).bearer_auth(token).json(&payload)
        })
        .await?;

        let repositories = parse_repositories(body)?;
        info!(count = repositories.len(), "Fetched GitHub repositories");
        Ok(repositories)
    }
}

pub fn parse_repositories(mut body: Value) -> Result<Vec<Repository>, ProviderError> {
    if let Some(errors) = body.get("errors").and_then(Value::as_array) {
        if !errors.is_empty() {
            error!(?errors, "GitHub GraphQL returned errors");
            return Err(ProviderError::InvalidResponse { provider: PROVIDER });
        }
    }
    let nodes = body
        .pointer_mut("/data/user/repositories/nodes")
        .map(Value::take)
        .filter(Value::is_array)
        .ok_or(ProviderError::InvalidResponse { provider: PROVIDER })?;
    let raw: Vec<RawRepository> =
        serde_json::from_value(nodes).map_err(|e| ProviderError::decode(PROVIDER, e))?;
    Ok(raw.iter().map(flatten_repository).collect())
}
