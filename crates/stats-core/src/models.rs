use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;

/// Whether a channel's samples are raw daily observations or monthly averages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleResolution {
    /// Samples exactly as returned by the stats provider.
    #[default]
    Daily,
    /// One averaged sample per calendar month.
    Monthly,
}

/// One observation of a channel's public counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    /// UTC timestamp the provider recorded the counters at.
    pub recorded_at: DateTime<Utc>,
    /// Subscriber count.
    #[serde(default)]
    pub subscribers: u64,
    /// Lifetime view count. Zero marks a missing observation.
    #[serde(default)]
    pub views: u64,
    /// Number of public videos.
    #[serde(default)]
    pub videos: u64,
}

impl Sample {
    /// `(year, month)` bucket this sample falls into.
    pub fn month_key(&self) -> (i32, u32) {
        (self.recorded_at.year(), self.recorded_at.month())
    }

    /// `true` when the provider reported no views for this observation.
    pub fn is_missing(&self) -> bool {
        self.views == 0
    }
}

/// A tracked channel and its metric history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    /// Provider channel identifier (`UC...`).
    pub id: String,
    /// Display title.
    #[serde(default)]
    pub title: String,
    /// Metric history. The provider sends `null` for channels it never sampled.
    #[serde(rename = "stats", default, deserialize_with = "null_as_empty")]
    pub samples: Vec<Sample>,
    /// Whether `samples` has been collapsed to monthly averages.
    #[serde(default)]
    pub resolution: SampleResolution,
}

impl Channel {
    /// Create a channel holding raw daily samples.
    pub fn new(id: impl Into<String>, title: impl Into<String>, samples: Vec<Sample>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            samples,
            resolution: SampleResolution::Daily,
        }
    }

    /// Whether the samples are monthly averages.
    pub fn is_aggregated(&self) -> bool {
        self.resolution == SampleResolution::Monthly
    }

    /// Sort samples ascending by `recorded_at`.
    pub fn sort_samples(&mut self) {
        self.samples.sort_by_key(|s| s.recorded_at);
    }
}

/// Topic categories the video platform associates with a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelTags {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Inclusive month range spanned by all channels' samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportWindow {
    pub start_year: i32,
    /// 1-based calendar month.
    pub start_month: u32,
    pub end_year: i32,
    /// 1-based calendar month.
    pub end_month: u32,
}

impl ReportWindow {
    /// Window covering `start` through `end`, swapping them if given reversed.
    pub fn from_bounds(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        let (start, end) = if start <= end { (start, end) } else { (end, start) };
        Self {
            start_year: start.year(),
            start_month: start.month(),
            end_year: end.year(),
            end_month: end.month(),
        }
    }

    /// Number of calendar months in the window.
    pub fn month_count(&self) -> usize {
        let months = (self.end_year - self.start_year) * 12 + self.end_month as i32
            - self.start_month as i32
            + 1;
        months.max(0) as usize
    }

    /// Every `(year, month)` in the window, in chronological order.
    pub fn months(&self) -> Vec<(i32, u32)> {
        let mut out = Vec::with_capacity(self.month_count());
        let (mut year, mut month) = (self.start_year, self.start_month);
        while (year, month) <= (self.end_year, self.end_month) {
            out.push((year, month));
            if month == 12 {
                year += 1;
                month = 1;
            } else {
                month += 1;
            }
        }
        out
    }

    /// Whether `sample` falls inside the window.
    pub fn contains(&self, sample: &Sample) -> bool {
        let key = sample.month_key();
        key >= (self.start_year, self.start_month) && key <= (self.end_year, self.end_month)
    }
}

/// Ordered set of unique channel identifiers.
///
/// Only grows; identifiers keep the order they were first added in.
#[derive(Debug, Clone, Default)]
pub struct ChannelIdSet {
    order: Vec<String>,
    seen: HashSet<String>,
}

impl ChannelIdSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `id`, returning `true` when it was not already present.
    pub fn add(&mut self, id: impl Into<String>) -> bool {
        let id = id.into();
        if self.seen.contains(&id) {
            return false;
        }
        self.seen.insert(id.clone());
        self.order.push(id);
        true
    }

    /// Insert every id, returning how many were new.
    pub fn extend<I, S>(&mut self, ids: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut added = 0;
        for id in ids {
            if self.add(id) {
                added += 1;
            }
        }
        added
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Copy of the identifiers in insertion order.
    pub fn snapshot(&self) -> Vec<String> {
        self.order.clone()
    }
}

impl<S: Into<String>> FromIterator<S> for ChannelIdSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = ChannelIdSet::new();
        set.extend(iter);
        set
    }
}

/// Deserialize a JSON `null` as `T::default()`.
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
