//! Stats aggregation and synchronisation: WakaTime → document store.
//!
//! A [`StatsSync`] is built once per invocation from an injected
//! [`WakaTimeClient`], a [`DocumentStore`] and the loaded [`SyncSettings`].
//! Each operation fans out one request per configured range, waits for all of
//! them, then writes one document per successful range.
//!
//! # Failure semantics
//! - A missing WakaTime token fails the whole operation up front as
//!   [`SyncError::Provider`]; nothing is fetched or written.
//! - A failed fetch never blocks the other ranges. It is logged and reported
//!   in place as [`RangeOutcome::Failed`]; the result list always has exactly
//!   one entry per configured range, in configured order.
//! - Writes happen sequentially after all fetches settle. The first write
//!   error aborts the rest of the batch; documents already written stay.
//! - Every write is a full replace keyed by range name, so repeating a sync
//!   with the same upstream data leaves the same documents behind.
//!
//! Timestamps come from the job's clock at write time, not fetch time.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info};

use crate::config::SyncSettings;
use crate::contract::DocumentStore;
use crate::error::{StoreError, SyncError};
use crate::http::RetryPolicy;
use crate::range::{DateSpan, SummaryWindow};
use crate::wakatime::{stats_pending, WakaTimeClient};

/// Document name used for the daily code summary.
pub const YESTERDAY: &str = "yesterday";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum RangeOutcome<T> {
    Synced(T),
    Failed { error: String },
}

/// Outcome for one configured range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RangeResult<T> {
    pub name: String,
    pub outcome: RangeOutcome<T>,
}

impl<T> RangeResult<T> {
    pub fn is_synced(&self) -> bool {
        matches!(self.outcome, RangeOutcome::Synced(_))
    }
}

/// Persisted per stats range, and for published item lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsDocument {
    pub timestamp: DateTime<Utc>,
    pub data: Value,
}

/// Persisted per summary range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryDocument {
    pub name: String,
    pub summaries: Vec<Value>,
    pub timestamp: DateTime<Utc>,
}

/// Written in place of a daily summary when fetching it failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDocument {
    pub error: String,
    pub date: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncReport {
    pub success: bool,
    /// Days written per summary range.
    pub ranges: Vec<RangeResult<usize>>,
}

pub struct StatsSync<'a, D: DocumentStore + ?Sized> {
    wakatime: &'a WakaTimeClient,
    store: &'a D,
    settings: &'a SyncSettings,
    clock: fn() -> DateTime<Utc>,
}

impl<'a, D: DocumentStore + ?Sized> StatsSync<'a, D> {
    pub fn new(wakatime: &'a WakaTimeClient, store: &'a D, settings: &'a SyncSettings) -> Self {
        StatsSync {
            wakatime,
            store,
            settings,
            clock: Utc::now,
        }
    }

    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    async fn write<T: Serialize>(
        &self,
        collection: &str,
        id: &str,
        document: &T,
    ) -> Result<(), StoreError> {
        let value = serde_json::to_value(document).map_err(|e| StoreError::Write {
            path: format!("{collection}/{id}"),
            message: e.to_string(),
        })?;
        debug!(collection, id, "[SYNC][WRITE] Setting document");
        self.store.set(collection, id, value).await.map_err(|e| {
            error!(collection, id, error = %e, "[SYNC][WRITE][ERROR] Document write failed");
            e
        })
    }

    fn ensure_credentials(&self) -> Result<(), SyncError> {
        self.wakatime.ensure_credentials().map_err(|e| {
            error!(error = %e, "[SYNC][ERROR] WakaTime credentials missing, aborting");
            SyncError::Provider(e)
        })
    }

    /// Fetches stats for every configured range concurrently, retrying while
    /// WakaTime reports them as still being computed.
    pub async fn fetch_all_stats(&self) -> Result<Vec<RangeResult<Value>>, SyncError> {
        self.ensure_credentials()?;
        let policy = RetryPolicy::while_pending(&self.settings.retry, stats_pending);
        let ranges = &self.settings.stats_ranges;
        info!(ranges = ranges.len(), "[SYNC] Fetching stats for all ranges");

        let fetched = join_all(
            ranges
                .iter()
                .map(|range| self.wakatime.fetch_stats(&range.name, &policy)),
        )
        .await;

        Ok(ranges
            .iter()
            .zip(fetched)
            .map(|(range, result)| RangeResult {
                name: range.name.clone(),
                outcome: match result {
                    Ok(data) => RangeOutcome::Synced(data),
                    Err(e) => {
                        error!(range = %range.name, error = %e, "[SYNC][ERROR] Stats fetch failed, skipping range");
                        RangeOutcome::Failed {
                            error: e.to_string(),
                        }
                    }
                },
            })
            .collect())
    }

    /// Fetches all stats, then writes one [`StatsDocument`] per successful range.
    pub async fn sync_all_stats(&self) -> Result<Vec<RangeResult<Value>>, SyncError> {
        let results = self.fetch_all_stats().await?;
        let collection = &self.settings.collections.stats;
        for result in &results {
            if let RangeOutcome::Synced(data) = &result.outcome {
                let document = StatsDocument {
                    timestamp: (self.clock)(),
                    data: data.clone(),
                };
                self.write(collection, &result.name, &document).await?;
            }
        }
        info!(
            synced = results.iter().filter(|r| r.is_synced()).count(),
            total = results.len(),
            "[SYNC] Stats sync complete"
        );
        Ok(results)
    }

    /// Fetches summaries for every configured summary range and writes one
    /// [`SummaryDocument`] per successful range.
    pub async fn sync_all_summaries(&self, today: NaiveDate) -> Result<SyncReport, SyncError> {
        self.ensure_credentials()?;
        let policy = RetryPolicy::on_error(&self.settings.retry);
        let ranges = &self.settings.summary_ranges;
        info!(ranges = ranges.len(), %today, "[SYNC] Fetching summaries for all ranges");

        let windows: Vec<SummaryWindow> = ranges.iter().map(|r| r.summary_window(today)).collect();
        let fetched = join_all(
            windows
                .iter()
                .map(|window| self.wakatime.fetch_summaries(window, &policy)),
        )
        .await;

        let collection = &self.settings.collections.summaries;
        let mut report = Vec::with_capacity(ranges.len());
        for (range, result) in ranges.iter().zip(fetched) {
            let outcome = match result {
                Ok(summaries) => {
                    let days = summaries.len();
                    let document = SummaryDocument {
                        name: range.name.clone(),
                        summaries,
                        timestamp: (self.clock)(),
                    };
                    self.write(collection, &range.name, &document).await?;
                    RangeOutcome::Synced(days)
                }
                Err(e) => {
                    error!(range = %range.name, error = %e, "[SYNC][ERROR] Summaries fetch failed, skipping range");
                    RangeOutcome::Failed {
                        error: e.to_string(),
                    }
                }
            };
            report.push(RangeResult {
                name: range.name.clone(),
                outcome,
            });
        }
        info!("[SYNC] Summaries sync complete");
        Ok(SyncReport {
            success: true,
            ranges: report,
        })
    }

    /// Stores yesterday's summary under `{code_summaries}/{YYYY-MM-DD}`. A failed
    /// fetch stores an [`ErrorDocument`] under the same key instead; a missing
    /// token writes nothing.
    pub async fn sync_yesterdays_code_summary(
        &self,
        today: NaiveDate,
    ) -> Result<RangeResult<usize>, SyncError> {
        self.ensure_credentials()?;
        let yesterday = today - Duration::days(1);
        let date = yesterday.format("%Y-%m-%d").to_string();
        let collection = &self.settings.collections.code_summaries;
        let policy = RetryPolicy::on_error(&self.settings.retry);
        let window = SummaryWindow::Dates(DateSpan::single(yesterday));
        info!(%date, "[SYNC] Fetching yesterday's code summary");

        let outcome = match self.wakatime.fetch_summaries(&window, &policy).await {
            Ok(summaries) => {
                let days = summaries.len();
                let document = SummaryDocument {
                    name: YESTERDAY.to_string(),
                    summaries,
                    timestamp: (self.clock)(),
                };
                self.write(collection, &date, &document).await?;
                RangeOutcome::Synced(days)
            }
            Err(e) => {
                error!(%date, error = %e, "[SYNC][ERROR] Yesterday's summary failed, writing error document");
                let document = ErrorDocument {
                    error: e.to_string(),
                    date: date.clone(),
                };
                self.write(collection, &date, &document).await?;
                RangeOutcome::Failed {
                    error: document.error,
                }
            }
        };
        Ok(RangeResult {
            name: YESTERDAY.to_string(),
            outcome,
        })
    }

    /// Writes `{timestamp, data: items}` to `collection/key`; returns the item count.
    pub async fn publish_items<T: Serialize>(
        &self,
        collection: &str,
        key: &str,
        items: &[T],
    ) -> Result<usize, SyncError> {
        let data = serde_json::to_value(items).map_err(|e| StoreError::Write {
            path: format!("{collection}/{key}"),
            message: e.to_string(),
        })?;
        let document = StatsDocument {
            timestamp: (self.clock)(),
            data,
        };
        self.write(collection, key, &document).await?;
        info!(collection, key, count = items.len(), "[SYNC] Published items");
        Ok(items.len())
    }

    /// The last stats document written for `range`, if any.
    pub async fn read_published_stats(
        &self,
        range: &str,
    ) -> Result<Option<StatsDocument>, SyncError> {
        let collection = &self.settings.collections.stats;
        let Some(raw) = self.store.get(collection, range).await? else {
            return Ok(None);
        };
        let document = serde_json::from_value(raw).map_err(|e| StoreError::Read {
            path: format!("{collection}/{range}"),
            message: e.to_string(),
        })?;
        Ok(Some(document))
    }
}
