//! Shared request plumbing: one GET/POST with status checking, and a fixed-delay
//! retry loop around it.

use std::time::Duration;

use reqwest::RequestBuilder;
use serde_json::Value;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::RetrySettings;
use crate::error::ProviderError;

/// Upper bound for one JSON API call, body included. Media transfers are
/// streamed and carry no total deadline.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Applies [`REQUEST_TIMEOUT`] to a JSON API request.
pub fn bounded(request: RequestBuilder) -> RequestBuilder {
    request.timeout(REQUEST_TIMEOUT)
}

/// When a response should be asked for again.
#[derive(Clone, Copy)]
pub enum RetryCondition {
    /// Retry transport failures and non-success statuses.
    OnError,
    /// As `OnError`, and also while the predicate reports the payload as pending.
    WhilePending(fn(&Value) -> bool),
}

impl std::fmt::Debug for RetryCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RetryCondition::OnError => f.write_str("OnError"),
            RetryCondition::WhilePending(_) => f.write_str("WhilePending"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub attempts: u32,
    pub delay: Duration,
    pub condition: RetryCondition,
}

impl RetryPolicy {
    pub fn on_error(settings: &RetrySettings) -> Self {
        RetryPolicy {
            attempts: settings.attempts.max(1),
            delay: settings.delay(),
            condition: RetryCondition::OnError,
        }
    }

    pub fn while_pending(settings: &RetrySettings, is_pending: fn(&Value) -> bool) -> Self {
        RetryPolicy {
            attempts: settings.attempts.max(1),
            delay: settings.delay(),
            condition: RetryCondition::WhilePending(is_pending),
        }
    }

    /// A single attempt.
    pub fn none() -> Self {
        RetryPolicy {
            attempts: 1,
            delay: Duration::ZERO,
            condition: RetryCondition::OnError,
        }
    }

    fn should_retry(&self, outcome: &Result<Value, ProviderError>) -> bool {
        match (outcome, self.condition) {
            (Err(_), _) => true,
            (Ok(_), RetryCondition::OnError) => false,
            (Ok(body), RetryCondition::WhilePending(is_pending)) => is_pending(body),
        }
    }
}

/// Sends the request and decodes a JSON body, mapping non-2xx to `Status`.
pub(crate) async fn send_json(
    provider: &'static str,
    request: RequestBuilder,
) -> Result<Value, ProviderError> {
    let response = bounded(request)
        .send()
        .await
        .map_err(|e| ProviderError::transport(provider, e))?;
    let status = response.status();
    if !status.is_success() {
        debug!(provider, status = %status, "Upstream returned non-success status");
        return Err(ProviderError::Status {
            provider,
            status: status.as_u16(),
        });
    }
    response
        .json::<Value>()
        .await
        .map_err(|e| ProviderError::decode(provider, e))
}

/// Runs `build` → [`send_json`] until the policy is satisfied or attempts run out.
/// The last outcome is returned as-is, including a payload that is still pending.
pub(crate) async fn send_json_with_retry<F>(
    provider: &'static str,
    policy: &RetryPolicy,
    build: F,
) -> Result<Value, ProviderError>
where
    F: Fn() -> RequestBuilder,
{
    let mut attempt = 1;
    loop {
        let outcome = send_json(provider, build()).await;
        if !policy.should_retry(&outcome) {
            return outcome;
        }
        if attempt >= policy.attempts {
            if outcome.is_ok() {
                warn!(provider, attempt, "Giving up while upstream still reports pending");
            }
            return outcome;
        }
        match &outcome {
            Err(e) => warn!(provider, attempt, error = %e, "Request failed, retrying"),
            Ok(_) => warn!(provider, attempt, "Upstream still pending, retrying"),
        }
        sleep(policy.delay).await;
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pending(body: &Value) -> bool {
        body["status"] != "ok"
    }

    #[test]
    fn errors_are_always_retried() {
        let policy = RetryPolicy::while_pending(&RetrySettings::default(), pending);
        let outcome = Err(ProviderError::Status {
            provider: "Test",
            status: 502,
        });
        assert!(policy.should_retry(&outcome));
    }

    #[test]
    fn pending_payloads_only_retry_under_while_pending() {
        let body = Ok(json!({"status": "pending_update"}));
        assert!(RetryPolicy::while_pending(&RetrySettings::default(), pending).should_retry(&body));
        assert!(!RetryPolicy::on_error(&RetrySettings::default()).should_retry(&body));
    }

    #[test]
    fn json_requests_carry_a_deadline() {
        let request = bounded(reqwest::Client::new().get("http://127.0.0.1:9/stats"))
            .build()
            .unwrap();
        assert_eq!(request.timeout(), Some(&REQUEST_TIMEOUT));
    }

    #[test]
    fn zero_attempts_still_tries_once() {
        let settings = RetrySettings {
            attempts: 0,
            delay_ms: 0,
        };
        assert_eq!(RetryPolicy::on_error(&settings).attempts, 1);
    }
}
