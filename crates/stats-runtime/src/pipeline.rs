//! End-to-end run: discover, fetch, aggregate, enrich and export.
//!
//! [`Pipeline`] owns every network seam as a trait object so the whole run
//! can be exercised against in-memory sources. With a channel checkpoint on
//! disk (and no refresh requested) the network is not touched for metrics.

use std::path::PathBuf;

use chrono::NaiveDate;
use stats_core::error::{Result, StatsError};
use stats_core::known::{ChannelClassification, KNOWN_CHANNEL_IDS};
use stats_core::models::{Channel, ChannelIdSet, ReportWindow};
use stats_core::settings::{Settings, DEFAULT_TARGET};
use stats_core::time_utils::month_label;
use stats_data::aggregator::MonthlyAggregator;
use stats_data::checkpoint;
use stats_data::export::write_csv;
use stats_data::timeline::TimelineTableBuilder;
use tracing::info;

use crate::discovery::{ChannelIdDiscoverer, ChannelIdSource, GeneratorClient, DEFAULT_RETRY_DELAY};
use crate::http::build_client;
use crate::metrics_client::{fetch_all, MetricsSource, StatsApiClient};
use crate::tags::{collect_tags, TagSource, YoutubeTagClient};

// ── Configuration ─────────────────────────────────────────────────────────────

/// Paths and parameters of one run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Channel checkpoint (`stats.json`).
    pub stats_path: PathBuf,
    /// Tag checkpoint (`tags.json`).
    pub tags_path: PathBuf,
    /// CSV report destination.
    pub output: PathBuf,
    pub from: NaiveDate,
    pub to: NaiveDate,
    /// Distinct channels discovery must reach.
    pub target: usize,
    /// Stats batches in flight at once.
    pub concurrency: usize,
    /// Ignore checkpoints on disk.
    pub refresh: bool,
    /// Curated channels; they seed discovery and lead the report.
    pub known_ids: Vec<String>,
}

impl PipelineConfig {
    /// Defaults rooted at `data_dir`, writing the report to `output`.
    pub fn new(data_dir: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            stats_path: data_dir.join("stats.json"),
            tags_path: data_dir.join("tags.json"),
            output: output.into(),
            from: NaiveDate::from_ymd_opt(2020, 4, 11).unwrap_or_default(),
            to: NaiveDate::from_ymd_opt(2021, 3, 11).unwrap_or_default(),
            target: DEFAULT_TARGET,
            concurrency: 1,
            refresh: false,
            known_ids: KNOWN_CHANNEL_IDS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl From<&Settings> for PipelineConfig {
    fn from(s: &Settings) -> Self {
        Self {
            stats_path: s.stats_path(),
            tags_path: s.tags_path(),
            output: s.output.clone(),
            from: s.from,
            to: s.to,
            target: s.target,
            concurrency: s.concurrency as usize,
            refresh: s.refresh,
            known_ids: KNOWN_CHANNEL_IDS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Summary of a finished run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineReport {
    pub known_channels: usize,
    pub other_channels: usize,
    pub window: ReportWindow,
    /// Whether channel data came from the checkpoint rather than the network.
    pub from_checkpoint: bool,
    /// Number of tag records, `None` when enrichment was skipped.
    pub tagged_channels: Option<usize>,
    pub output: PathBuf,
}

// ── Pipeline ──────────────────────────────────────────────────────────────────

pub struct Pipeline {
    config: PipelineConfig,
    discoverer: ChannelIdDiscoverer,
    id_source: Option<Box<dyn ChannelIdSource>>,
    metrics_source: Option<Box<dyn MetricsSource>>,
    tag_source: Option<Box<dyn TagSource>>,
}

impl Pipeline {
    /// Pipeline without any network source; attach them with the `with_*`
    /// builders.
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            discoverer: ChannelIdDiscoverer::default(),
            id_source: None,
            metrics_source: None,
            tag_source: None,
        }
    }

    /// Wire up the real HTTP sources for whichever credentials are present.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let client = build_client()?;
        let mut pipeline = Self::new(PipelineConfig::from(settings)).with_discoverer(
            ChannelIdDiscoverer::new(DEFAULT_RETRY_DELAY, settings.max_discovery_failures),
        );

        if let Some(session) = &settings.generator_session {
            pipeline = pipeline.with_id_source(GeneratorClient::new(client.clone(), session));
        }
        if let (Some(auth), Some(device)) = (&settings.stats_auth, &settings.stats_device_id) {
            pipeline = pipeline.with_metrics_source(StatsApiClient::new(client.clone(), auth, device));
        }
        if let Some(key) = &settings.youtube_api_key {
            pipeline = pipeline.with_tag_source(YoutubeTagClient::new(client, key));
        }
        Ok(pipeline)
    }

    pub fn with_discoverer(mut self, discoverer: ChannelIdDiscoverer) -> Self {
        self.discoverer = discoverer;
        self
    }

    pub fn with_id_source(mut self, source: impl ChannelIdSource + 'static) -> Self {
        self.id_source = Some(Box::new(source));
        self
    }

    pub fn with_metrics_source(mut self, source: impl MetricsSource + 'static) -> Self {
        self.metrics_source = Some(Box::new(source));
        self
    }

    pub fn with_tag_source(mut self, source: impl TagSource + 'static) -> Self {
        self.tag_source = Some(Box::new(source));
        self
    }

    /// Run every stage and write the CSV report.
    ///
    /// Nothing is written to the report path unless every stage succeeds.
    pub async fn run(&self) -> Result<PipelineReport> {
        let (channels, from_checkpoint) = self.load_or_collect().await?;
        let tagged_channels = self.enrich(&channels, from_checkpoint).await?;

        let mut channels = MonthlyAggregator::aggregate_all(&channels);
        for channel in &mut channels {
            channel.sort_samples();
        }

        let window = TimelineTableBuilder::window(&channels)?;
        info!(
            "Report covers {} to {} ({} months)",
            month_label(window.start_year, window.start_month),
            month_label(window.end_year, window.end_month),
            window.month_count()
        );

        let classification = ChannelClassification::classify(channels, self.config.known_ids.as_slice());
        info!(
            "There are {} known channels and {} other channels",
            classification.known.len(),
            classification.other.len()
        );

        let rows = TimelineTableBuilder::build(&classification, &window);
        write_csv(&self.config.output, &rows)?;
        info!("CSV made!");

        Ok(PipelineReport {
            known_channels: classification.known.len(),
            other_channels: classification.other.len(),
            window,
            from_checkpoint,
            tagged_channels,
            output: self.config.output.clone(),
        })
    }

    /// Channel data from the checkpoint, or discovered and fetched afresh.
    ///
    /// The flag is `true` when the checkpoint was used.
    async fn load_or_collect(&self) -> Result<(Vec<Channel>, bool)> {
        if !self.config.refresh {
            if let Some(channels) = checkpoint::load_channels(&self.config.stats_path)? {
                info!(
                    "Loaded {} channels from {}",
                    channels.len(),
                    self.config.stats_path.display()
                );
                return Ok((channels, true));
            }
        }

        let metrics_source = self.metrics_source.as_deref().ok_or_else(|| {
            StatsError::Config(
                "no channel checkpoint and no stats credentials (--stats-auth, --stats-device-id)"
                    .to_string(),
            )
        })?;

        let seed: ChannelIdSet = self.config.known_ids.iter().cloned().collect();
        info!("Default channels {}", seed.len());

        // The generator is only needed when the seed falls short of the target.
        let ids = if seed.len() >= self.config.target {
            seed
        } else {
            let id_source = self.id_source.as_deref().ok_or_else(|| {
                StatsError::Config(
                    "no channel checkpoint and no generator session (--generator-session)"
                        .to_string(),
                )
            })?;
            self.discoverer
                .discover(id_source, seed, self.config.target)
                .await?
        };
        info!("Found {} channels total!", ids.len());

        let raw = fetch_all(
            metrics_source,
            &ids.snapshot(),
            self.config.from,
            self.config.to,
            self.config.concurrency,
        )
        .await?;
        info!("Found stats for {} channels", raw.len());

        let channels = MonthlyAggregator::aggregate_all(&raw);
        checkpoint::save_channels(&self.config.stats_path, &channels)?;
        Ok((channels, false))
    }

    /// Attach topic categories when a tag source is configured.
    ///
    /// A tag checkpoint is reused only alongside a channel checkpoint, so
    /// freshly fetched channels always get fresh tags.
    async fn enrich(&self, channels: &[Channel], from_checkpoint: bool) -> Result<Option<usize>> {
        let Some(source) = self.tag_source.as_deref() else {
            info!("No YouTube API key, not gathering tag list");
            return Ok(None);
        };

        if from_checkpoint && !self.config.refresh {
            if let Some(tags) = checkpoint::load_tags(&self.config.tags_path)? {
                info!(
                    "Loaded tags for {} channels from {}",
                    tags.len(),
                    self.config.tags_path.display()
                );
                return Ok(Some(tags.len()));
            }
        }

        let tags = collect_tags(channels, source).await?;
        checkpoint::save_tags(&self.config.tags_path, &tags)?;
        Ok(Some(tags.len()))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use stats_core::models::{ChannelTags, Sample};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    struct FixedIds(Vec<String>);

    #[async_trait]
    impl ChannelIdSource for FixedIds {
        async fn fetch_ids(&self) -> Result<Vec<String>> {
            Ok(self.0.clone())
        }
    }

    /// Two daily samples per channel in Jan and Feb 2024, counting calls.
    struct FakeMetrics {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl MetricsSource for FakeMetrics {
        async fn fetch_batch(
            &self,
            ids: &[String],
            _from: NaiveDate,
            _to: NaiveDate,
        ) -> Result<Vec<Channel>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(ids
                .iter()
                .map(|id| {
                    Channel::new(
                        id.clone(),
                        format!("Title {}", id),
                        vec![
                            sample(2024, 2, 1, 300),
                            sample(2024, 1, 5, 100),
                            sample(2024, 1, 20, 200),
                        ],
                    )
                })
                .collect())
        }
    }

    struct OneTag;

    #[async_trait]
    impl TagSource for OneTag {
        async fn channel_tags(&self, _id: &str) -> Result<Option<Vec<String>>> {
            Ok(Some(vec!["https://en.wikipedia.org/wiki/Science".to_string()]))
        }
    }

    struct CountingTags {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl TagSource for CountingTags {
        async fn channel_tags(&self, _id: &str) -> Result<Option<Vec<String>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Some(vec![]))
        }
    }

    fn sample(y: i32, m: u32, d: u32, views: u64) -> Sample {
        Sample {
            recorded_at: Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap(),
            subscribers: 10,
            views,
            videos: 1,
        }
    }

    fn config(tmp: &TempDir) -> PipelineConfig {
        let mut config = PipelineConfig::new(tmp.path(), tmp.path().join("result.csv"));
        config.known_ids = vec!["UCknown".to_string()];
        config.target = 3;
        config
    }

    fn read_lines(path: &std::path::Path) -> Vec<String> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[tokio::test]
    async fn test_run_fetches_and_writes_report() {
        let tmp = TempDir::new().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let pipeline = Pipeline::new(config(&tmp))
            .with_discoverer(ChannelIdDiscoverer::new(Duration::ZERO, None))
            .with_id_source(FixedIds(vec![
                "UCother".to_string(),
                "UCknown".to_string(),
                "UCthird".to_string(),
            ]))
            .with_metrics_source(FakeMetrics { calls: calls.clone() });

        let report = pipeline.run().await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!report.from_checkpoint);
        assert_eq!(report.known_channels, 1);
        assert_eq!(report.other_channels, 2);
        assert_eq!(report.tagged_channels, None);

        let lines = read_lines(&tmp.path().join("result.csv"));
        assert_eq!(lines[0], "Channel name,January-2024,February-2024");
        // Known channel first, Jan averaged from 100 and 200.
        assert_eq!(lines[1], "Title UCknown,150,300");
        assert_eq!(lines[2], "Title UCother,150,300");
        assert_eq!(lines[3], "Title UCthird,150,300");

        // Every checkpointed sample falls inside the reported window.
        let saved = checkpoint::load_channels(&tmp.path().join("stats.json"))
            .unwrap()
            .unwrap();
        assert_eq!(saved.len(), 3);
        assert!(saved
            .iter()
            .flat_map(|c| c.samples.iter())
            .all(|s| report.window.contains(s)));
    }

    #[tokio::test]
    async fn test_run_refresh_ignores_checkpoint() {
        let tmp = TempDir::new().unwrap();
        let stale = vec![Channel::new("UCstale", "Stale", vec![sample(2019, 5, 1, 9)])];
        checkpoint::save_channels(&tmp.path().join("stats.json"), &stale).unwrap();

        let mut config = config(&tmp);
        config.refresh = true;
        let calls = Arc::new(AtomicUsize::new(0));
        let report = Pipeline::new(config)
            .with_discoverer(ChannelIdDiscoverer::new(Duration::ZERO, None))
            .with_id_source(FixedIds(vec!["UCa".to_string(), "UCb".to_string()]))
            .with_metrics_source(FakeMetrics { calls: calls.clone() })
            .run()
            .await
            .unwrap();

        assert!(calls.load(Ordering::SeqCst) > 0);
        assert!(!report.from_checkpoint);
        let saved = checkpoint::load_channels(&tmp.path().join("stats.json"))
            .unwrap()
            .unwrap();
        assert!(saved.iter().all(|c| c.id != "UCstale"));
        let lines = read_lines(&tmp.path().join("result.csv"));
        assert_eq!(lines[0], "Channel name,January-2024,February-2024");
    }

    #[tokio::test]
    async fn test_run_reuses_tag_checkpoint() {
        let tmp = TempDir::new().unwrap();
        let channels = vec![Channel::new("UCknown", "Known", vec![sample(2024, 2, 3, 70)])];
        checkpoint::save_channels(&tmp.path().join("stats.json"), &channels).unwrap();
        let tags = vec![ChannelTags {
            id: "UCknown".to_string(),
            name: "Known".to_string(),
            tags: vec!["https://en.wikipedia.org/wiki/Science".to_string()],
        }];
        checkpoint::save_tags(&tmp.path().join("tags.json"), &tags).unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let report = Pipeline::new(config(&tmp))
            .with_tag_source(CountingTags { calls: calls.clone() })
            .run()
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(report.tagged_channels, Some(1));
    }

    #[tokio::test]
    async fn test_run_seed_at_target_needs_no_generator() {
        let tmp = TempDir::new().unwrap();
        let mut config = config(&tmp);
        config.target = 1;
        let calls = Arc::new(AtomicUsize::new(0));

        let report = Pipeline::new(config)
            .with_metrics_source(FakeMetrics { calls: calls.clone() })
            .run()
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(report.known_channels, 1);
        assert_eq!(report.other_channels, 0);
    }

    #[tokio::test]
    async fn test_run_seed_short_of_target_requires_generator() {
        let tmp = TempDir::new().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));

        let err = Pipeline::new(config(&tmp))
            .with_metrics_source(FakeMetrics { calls: calls.clone() })
            .run()
            .await
            .unwrap_err();

        assert!(matches!(err, StatsError::Config(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_run_uses_checkpoint_without_fetching() {
        let tmp = TempDir::new().unwrap();
        let channels = vec![
            Channel::new("UCother", "Other", vec![sample(2023, 11, 3, 40)]),
            Channel::new("UCknown", "Known", vec![sample(2024, 2, 3, 70)]),
        ];
        checkpoint::save_channels(&tmp.path().join("stats.json"), &channels).unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let pipeline = Pipeline::new(config(&tmp))
            .with_metrics_source(FakeMetrics { calls: calls.clone() });

        let report = pipeline.run().await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(report.from_checkpoint);
        let lines = read_lines(&tmp.path().join("result.csv"));
        assert_eq!(
            lines[0],
            "Channel name,November-2023,December-2023,January-2024,February-2024"
        );
        assert_eq!(lines[1], "Known,,,,70");
        assert_eq!(lines[2], "Other,40,,,");
    }

    #[tokio::test]
    async fn test_run_without_checkpoint_or_credentials_is_config_error() {
        let tmp = TempDir::new().unwrap();
        let err = Pipeline::new(config(&tmp)).run().await.unwrap_err();
        assert!(matches!(err, StatsError::Config(_)));
        assert!(!tmp.path().join("result.csv").exists());
    }

    #[tokio::test]
    async fn test_run_without_samples_writes_nothing() {
        let tmp = TempDir::new().unwrap();
        let channels = vec![Channel::new("UCa", "Empty", vec![sample(2024, 1, 1, 0)])];
        checkpoint::save_channels(&tmp.path().join("stats.json"), &channels).unwrap();

        let err = Pipeline::new(config(&tmp)).run().await.unwrap_err();

        assert!(matches!(err, StatsError::NoSamples));
        assert!(!tmp.path().join("result.csv").exists());
    }

    #[tokio::test]
    async fn test_run_collects_and_saves_tags() {
        let tmp = TempDir::new().unwrap();
        let channels = vec![Channel::new("UCknown", "Known", vec![sample(2024, 2, 3, 70)])];
        checkpoint::save_channels(&tmp.path().join("stats.json"), &channels).unwrap();

        let report = Pipeline::new(config(&tmp))
            .with_tag_source(OneTag)
            .run()
            .await
            .unwrap();

        assert_eq!(report.tagged_channels, Some(1));
        let tags = checkpoint::load_tags(&tmp.path().join("tags.json"))
            .unwrap()
            .unwrap();
        assert_eq!(tags[0].name, "Known");
    }

    #[tokio::test]
    async fn test_run_malformed_checkpoint_is_fatal() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("stats.json"), "{not json").unwrap();

        let err = Pipeline::new(config(&tmp)).run().await.unwrap_err();

        assert!(matches!(err, StatsError::JsonParse(_)));
        assert!(!tmp.path().join("result.csv").exists());
    }
}
