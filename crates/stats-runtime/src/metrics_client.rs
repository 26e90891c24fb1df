//! Batched retrieval of channel metric history from the stats provider.

use async_trait::async_trait;
use chrono::NaiveDate;
use futures::stream::{self, StreamExt, TryStreamExt};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use stats_core::error::{Result, StatsError};
use stats_core::models::Channel;
use stats_core::time_utils::format_query_date;
use tracing::{debug, info};

use crate::http::{read_json, send_error};

/// Most channel ids the provider accepts in one request.
pub const BATCH_LIMIT: usize = 5;

/// Public stats endpoint of the provider.
pub const STATS_URL: &str = "https://api.vidiq.com/youtube/channels/public/stats";

/// Client identifier the provider expects.
pub const CLIENT_ID: &str = "ext vff/3.43.2";

// ── MetricsSource ─────────────────────────────────────────────────────────────

/// Anything that can return raw daily samples for a batch of channels.
#[async_trait]
pub trait MetricsSource: Send + Sync {
    /// Fetch samples between `from` and `to` for at most [`BATCH_LIMIT`] ids.
    async fn fetch_batch(&self, ids: &[String], from: NaiveDate, to: NaiveDate)
        -> Result<Vec<Channel>>;
}

/// Full request URL for one batch.
pub fn stats_url(ids: &[String], from: NaiveDate, to: NaiveDate) -> String {
    format!(
        "{}?from={}&to={}&ids={}",
        STATS_URL,
        format_query_date(from),
        format_query_date(to),
        ids.join(",")
    )
}

/// [`MetricsSource`] backed by the provider's HTTP API.
pub struct StatsApiClient {
    client: reqwest::Client,
    authorization: String,
    device_id: String,
}

impl StatsApiClient {
    /// Both credentials are opaque header values copied from an
    /// authenticated browser session.
    pub fn new(
        client: reqwest::Client,
        authorization: impl Into<String>,
        device_id: impl Into<String>,
    ) -> Self {
        Self {
            client,
            authorization: authorization.into(),
            device_id: device_id.into(),
        }
    }
}

#[async_trait]
impl MetricsSource for StatsApiClient {
    async fn fetch_batch(
        &self,
        ids: &[String],
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Channel>> {
        if ids.len() > BATCH_LIMIT {
            return Err(StatsError::InvalidBatch(ids.len()));
        }

        let url = stats_url(ids, from, to);
        let response = self
            .client
            .get(&url)
            .header("X-Amplitude-Device-ID", &self.device_id)
            .header(AUTHORIZATION, &self.authorization)
            .header(CONTENT_TYPE, "application/json")
            .header("X-Vidiq-Client", CLIENT_ID)
            .send()
            .await
            .map_err(send_error(&url))?;

        read_json(response, &url).await
    }
}

// ── Batch driver ──────────────────────────────────────────────────────────────

/// Fetch every id in consecutive batches of [`BATCH_LIMIT`].
///
/// Up to `concurrency` batches are in flight at once, but results are
/// concatenated in batch order. The first failing batch aborts the whole
/// fetch.
pub async fn fetch_all(
    source: &dyn MetricsSource,
    ids: &[String],
    from: NaiveDate,
    to: NaiveDate,
    concurrency: usize,
) -> Result<Vec<Channel>> {
    let batches: Vec<&[String]> = ids.chunks(BATCH_LIMIT).collect();
    let total = batches.len();
    info!(
        "Fetching stats for {} channels in {} batches",
        ids.len(),
        total
    );

    let results: Vec<Vec<Channel>> = stream::iter(batches.into_iter().enumerate())
        .map(|(index, batch)| async move {
            debug!(batch = index + 1, total, ids = %batch.join(","), "requesting stats batch");
            source.fetch_batch(batch, from, to).await
        })
        .buffered(concurrency.max(1))
        .try_collect()
        .await?;

    Ok(results.into_iter().flatten().collect())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
