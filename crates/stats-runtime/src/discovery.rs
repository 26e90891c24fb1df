//! Channel discovery through the random channel generator.
//!
//! [`ChannelIdDiscoverer`] keeps asking a [`ChannelIdSource`] for fresh
//! channel ids and folds them into a [`ChannelIdSet`] until the set is large
//! enough. Failed fetches are logged and retried after a fixed delay.

use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::header::{CONTENT_TYPE, COOKIE, REFERER};
use serde::Deserialize;
use stats_core::error::{Result, StatsError};
use stats_core::models::ChannelIdSet;
use tracing::{debug, info, warn};

use crate::http::{read_json, send_error};

// ── Defaults ──────────────────────────────────────────────────────────────────

/// Generator endpoint returning random channels as an HTML fragment.
pub const GENERATOR_URL: &str =
    "https://www.generatorslist.com/random/websites/random-youtube-channel/ajax";

/// Page the generator expects requests to come from.
pub const GENERATOR_REFERER: &str =
    "https://www.generatorslist.com/random/websites/random-youtube-channel";

/// Channels requested per generator call.
pub const RESULTS_PER_REQUEST: u32 = 100;

/// Pause between a failed fetch and the next attempt.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);

// ── ChannelIdSource ───────────────────────────────────────────────────────────

/// Anything that can hand out a batch of freshly scraped channel ids.
#[async_trait]
pub trait ChannelIdSource: Send + Sync {
    /// Fetch one batch. Ids keep the order they were encountered in.
    async fn fetch_ids(&self) -> Result<Vec<String>>;
}

/// Response body of the generator endpoint.
#[derive(Debug, Deserialize)]
struct GeneratorResponse {
    #[serde(rename = "Content")]
    content: String,
}

/// Pull channel ids out of `https://www.youtube.com/channel/<id>` links.
pub fn extract_channel_ids(markup: &str) -> Vec<String> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let re = PATTERN.get_or_init(|| {
        Regex::new(r"https://www\.youtube\.com/channel/([\w\-]+)").expect("regex is valid")
    });
    re.captures_iter(markup)
        .map(|cap| cap[1].to_string())
        .collect()
}

/// [`ChannelIdSource`] backed by the random channel generator site.
pub struct GeneratorClient {
    client: reqwest::Client,
    session: String,
}

impl GeneratorClient {
    /// `session` is the generator's `PHPSESSID` cookie value.
    pub fn new(client: reqwest::Client, session: impl Into<String>) -> Self {
        Self {
            client,
            session: session.into(),
        }
    }
}

#[async_trait]
impl ChannelIdSource for GeneratorClient {
    async fn fetch_ids(&self) -> Result<Vec<String>> {
        let response = self
            .client
            .post(GENERATOR_URL)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(COOKIE, format!("PHPSESSID={}", self.session))
            .header(REFERER, GENERATOR_REFERER)
            .body(format!("numResults={}", RESULTS_PER_REQUEST))
            .send()
            .await
            .map_err(send_error(GENERATOR_URL))?;

        let body: GeneratorResponse = read_json(response, GENERATOR_URL).await?;
        Ok(extract_channel_ids(&body.content))
    }
}

// ── ChannelIdDiscoverer ───────────────────────────────────────────────────────

/// Grows an id set to a target size from a [`ChannelIdSource`].
#[derive(Debug, Clone)]
pub struct ChannelIdDiscoverer {
    /// Sleep between a failed fetch and the next one.
    retry_delay: Duration,
    /// Give up after this many failed fetches; `None` retries forever.
    max_failures: Option<u32>,
}

impl Default for ChannelIdDiscoverer {
    fn default() -> Self {
        Self::new(DEFAULT_RETRY_DELAY, None)
    }
}

impl ChannelIdDiscoverer {
    pub fn new(retry_delay: Duration, max_failures: Option<u32>) -> Self {
        Self {
            retry_delay,
            max_failures,
        }
    }

    /// Fetch batches until `ids` holds at least `target` distinct ids.
    ///
    /// Every id of the batch that crosses the target is kept, and no further
    /// batch is requested. With an empty seed the first fetch must succeed and
    /// yield ids, otherwise the run is misconfigured and this fails with
    /// [`StatsError::Config`].
    pub async fn discover(
        &self,
        source: &dyn ChannelIdSource,
        mut ids: ChannelIdSet,
        target: usize,
    ) -> Result<ChannelIdSet> {
        let seeded = !ids.is_empty();
        let mut failures: u32 = 0;
        let mut attempts: u32 = 0;

        while ids.len() < target {
            attempts += 1;
            match source.fetch_ids().await {
                Ok(batch) => {
                    if !seeded && attempts == 1 && batch.is_empty() {
                        return Err(StatsError::Config(
                            "discovery seed is empty and the first fetch returned no channels"
                                .to_string(),
                        ));
                    }
                    let fetched = batch.len();
                    let added = ids.extend(batch);
                    info!(
                        "Found {} channels ({} new, {}/{} total)",
                        fetched,
                        added,
                        ids.len(),
                        target
                    );
                }
                Err(e) => {
                    if !seeded && attempts == 1 {
                        return Err(StatsError::Config(format!(
                            "discovery seed is empty and the first fetch failed: {}",
                            e
                        )));
                    }
                    failures += 1;
                    if self.max_failures.is_some_and(|max| failures >= max) {
                        return Err(StatsError::DiscoveryExhausted(failures));
                    }
                    warn!(error = %e, failures, "channel fetch failed; retrying");
                    debug!(delay_ms = self.retry_delay.as_millis() as u64, "discovery back-off");
                    tokio::time::sleep(self.retry_delay).await;
                }
            }
        }

        Ok(ids)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays scripted fetch results and counts calls.
    struct ScriptedSource {
        script: Mutex<VecDeque<Result<Vec<String>>>>,
        calls: Mutex<u32>,
    }

    impl ScriptedSource {
        fn new(script: Vec<Result<Vec<String>>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                calls: Mutex::new(0),
            }
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl ChannelIdSource for ScriptedSource {
        async fn fetch_ids(&self) -> Result<Vec<String>> {
            *self.calls.lock().unwrap() += 1;
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    fn ids(range: std::ops::Range<u32>) -> Vec<String> {
        range.map(|i| format!("UC{:04}", i)).collect()
    }

    fn transient() -> StatsError {
        StatsError::HttpStatus {
            url: GENERATOR_URL.to_string(),
            status: 502,
        }
    }

    fn discoverer() -> ChannelIdDiscoverer {
        ChannelIdDiscoverer::new(Duration::ZERO, None)
    }

    // ── extract_channel_ids ───────────────────────────────────────────────────

    #[test]
    fn test_extract_channel_ids_in_order() {
        let markup = r#"<div><a href="https://www.youtube.com/channel/UCabc-1_x">A</a>
            <a href="https://www.youtube.com/user/someone">user link</a>
            <a href='https://www.youtube.com/channel/UCdef'>B</a>
            https://www.youtube.com/channel/UCabc-1_x"#;
        assert_eq!(
            extract_channel_ids(markup),
            vec!["UCabc-1_x", "UCdef", "UCabc-1_x"]
        );
    }

    #[test]
    fn test_extract_channel_ids_none() {
        assert!(extract_channel_ids("<p>nothing here</p>").is_empty());
    }

    #[test]
    fn test_generator_response_shape() {
        let body = r#"{"Content": "<a href=\"https://www.youtube.com/channel/UCxyz\">x</a>"}"#;
        let parsed: GeneratorResponse = serde_json::from_str(body).unwrap();
        assert_eq!(extract_channel_ids(&parsed.content), vec!["UCxyz"]);
    }

    // ── discover ──────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_discover_dedups_against_seed_and_batches() {
        let seed: ChannelIdSet = ids(0..5).into_iter().collect();
        let source = ScriptedSource::new(vec![
            Ok(ids(3..8)),   // 3 new → 8
            Ok(ids(6..10)),  // 2 new → 10
            Ok(ids(0..100)), // never requested
        ]);

        let out = discoverer().discover(&source, seed, 10).await.unwrap();

        assert_eq!(out.len(), 10);
        assert_eq!(out.snapshot(), ids(0..10));
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_discover_stops_once_target_crossed_within_batch() {
        let seed: ChannelIdSet = ids(0..32).into_iter().collect();
        let source = ScriptedSource::new(vec![
            Ok(ids(20..100)), // 68 new → 100
            Ok(ids(100..200)), // crosses 110 → 200
            Ok(ids(200..300)),
        ]);

        let out = discoverer().discover(&source, seed, 110).await.unwrap();

        assert_eq!(out.len(), 200);
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_discover_no_fetch_when_seed_already_large_enough() {
        let seed: ChannelIdSet = ids(0..120).into_iter().collect();
        let source = ScriptedSource::new(vec![]);

        let out = discoverer().discover(&source, seed, 110).await.unwrap();

        assert_eq!(out.len(), 120);
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn test_discover_retries_transient_failures() {
        let seed: ChannelIdSet = ids(0..2).into_iter().collect();
        let source = ScriptedSource::new(vec![
            Err(transient()),
            Err(transient()),
            Ok(ids(2..6)),
        ]);

        let out = discoverer().discover(&source, seed, 6).await.unwrap();

        assert_eq!(out.len(), 6);
        assert_eq!(source.calls(), 3);
    }

    #[tokio::test]
    async fn test_discover_gives_up_after_max_failures() {
        let seed: ChannelIdSet = ids(0..2).into_iter().collect();
        let source = ScriptedSource::new(vec![
            Err(transient()),
            Err(transient()),
            Err(transient()),
            Ok(ids(2..6)),
        ]);

        let err = ChannelIdDiscoverer::new(Duration::ZERO, Some(3))
            .discover(&source, seed, 6)
            .await
            .unwrap_err();

        assert!(matches!(err, StatsError::DiscoveryExhausted(3)));
        assert_eq!(source.calls(), 3);
    }

    #[tokio::test]
    async fn test_discover_empty_seed_first_failure_is_fatal() {
        let source = ScriptedSource::new(vec![Err(transient()), Ok(ids(0..10))]);

        let err = discoverer()
            .discover(&source, ChannelIdSet::new(), 5)
            .await
            .unwrap_err();

        assert!(matches!(err, StatsError::Config(_)));
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_discover_empty_seed_first_batch_empty_is_fatal() {
        let source = ScriptedSource::new(vec![Ok(Vec::new())]);

        let err = discoverer()
            .discover(&source, ChannelIdSet::new(), 5)
            .await
            .unwrap_err();

        assert!(matches!(err, StatsError::Config(_)));
    }

    #[tokio::test]
    async fn test_discover_empty_seed_later_failures_are_transient() {
        let source = ScriptedSource::new(vec![Ok(ids(0..3)), Err(transient()), Ok(ids(3..5))]);

        let out = discoverer()
            .discover(&source, ChannelIdSet::new(), 5)
            .await
            .unwrap();

        assert_eq!(out.snapshot(), ids(0..5));
    }
}
