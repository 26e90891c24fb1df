//! Collapses daily channel samples into monthly averages.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use stats_core::models::{Channel, Sample, SampleResolution};

// ── MonthBucket ───────────────────────────────────────────────────────────────

/// Running totals for one `(year, month)` bucket.
#[derive(Debug, Clone)]
struct MonthBucket {
    /// Timestamp of the first sample added to the bucket.
    first_recorded_at: DateTime<Utc>,
    subscribers: u64,
    views: u64,
    videos: u64,
    count: u64,
}

impl MonthBucket {
    fn new(first: &Sample) -> Self {
        Self {
            first_recorded_at: first.recorded_at,
            subscribers: 0,
            views: 0,
            videos: 0,
            count: 0,
        }
    }

    fn add(&mut self, sample: &Sample) {
        self.subscribers += sample.subscribers;
        self.views += sample.views;
        self.videos += sample.videos;
        self.count += 1;
    }

    /// Floor average of every counter.
    fn average(&self) -> Sample {
        Sample {
            recorded_at: self.first_recorded_at,
            subscribers: self.subscribers / self.count,
            views: self.views / self.count,
            videos: self.videos / self.count,
        }
    }
}

// ── MonthlyAggregator ─────────────────────────────────────────────────────────

/// Stateless helper that reduces a channel to one sample per calendar month.
pub struct MonthlyAggregator;

impl MonthlyAggregator {
    /// Return a copy of `channel` whose samples are monthly averages.
    ///
    /// Samples with zero views are treated as missing and dropped. The rest
    /// are bucketed by `(year, month)`; each bucket yields one sample stamped
    /// with the bucket's first input timestamp. Output is in bucket order.
    /// Running an aggregated channel through again returns the same samples.
    pub fn aggregate(channel: &Channel) -> Channel {
        Channel {
            id: channel.id.clone(),
            title: channel.title.clone(),
            samples: Self::aggregate_samples(&channel.samples),
            resolution: SampleResolution::Monthly,
        }
    }

    /// Aggregate every channel, keeping their order.
    pub fn aggregate_all(channels: &[Channel]) -> Vec<Channel> {
        channels.iter().map(Self::aggregate).collect()
    }

    fn aggregate_samples(samples: &[Sample]) -> Vec<Sample> {
        let mut buckets: BTreeMap<(i32, u32), MonthBucket> = BTreeMap::new();

        for sample in samples.iter().filter(|s| !s.is_missing()) {
            buckets
                .entry(sample.month_key())
                .or_insert_with(|| MonthBucket::new(sample))
                .add(sample);
        }

        buckets.values().map(MonthBucket::average).collect()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
