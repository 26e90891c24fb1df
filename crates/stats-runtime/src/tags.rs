//! Optional topic-category enrichment through the YouTube Data API.

use async_trait::async_trait;
use serde::Deserialize;
use stats_core::error::Result;
use stats_core::models::{Channel, ChannelTags};
use tracing::{debug, info};

use crate::http::{read_json, send_error};

/// Channels resource of the YouTube Data API v3.
pub const CHANNELS_URL: &str = "https://www.googleapis.com/youtube/v3/channels";

/// Anything that can map a channel id to its topic categories.
#[async_trait]
pub trait TagSource: Send + Sync {
    /// Topic categories of `id`, or `None` when the API does not know the
    /// channel.
    async fn channel_tags(&self, id: &str) -> Result<Option<Vec<String>>>;
}

#[derive(Debug, Default, Deserialize)]
struct ChannelListResponse {
    #[serde(default)]
    items: Vec<ChannelItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelItem {
    #[serde(default)]
    topic_details: Option<TopicDetails>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TopicDetails {
    #[serde(default)]
    topic_categories: Vec<String>,
}

impl ChannelListResponse {
    /// Categories of the first item, `None` when the list is empty.
    fn into_tags(self) -> Option<Vec<String>> {
        let item = self.items.into_iter().next()?;
        Some(
            item.topic_details
                .map(|d| d.topic_categories)
                .unwrap_or_default(),
        )
    }
}

/// [`TagSource`] backed by the YouTube Data API.
pub struct YoutubeTagClient {
    client: reqwest::Client,
    api_key: String,
}

impl YoutubeTagClient {
    pub fn new(client: reqwest::Client, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl TagSource for YoutubeTagClient {
    async fn channel_tags(&self, id: &str) -> Result<Option<Vec<String>>> {
        let response = self
            .client
            .get(CHANNELS_URL)
            .query(&[
                ("part", "snippet,topicDetails"),
                ("id", id),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(send_error(CHANNELS_URL))?;

        let body: ChannelListResponse = read_json(response, CHANNELS_URL).await?;
        Ok(body.into_tags())
    }
}

/// Look up tags for every channel, one request at a time.
///
/// Records keep channel order; channels the API does not return are skipped.
/// Any request failure aborts the collection.
pub async fn collect_tags(channels: &[Channel], source: &dyn TagSource) -> Result<Vec<ChannelTags>> {
    let mut out = Vec::with_capacity(channels.len());
    for channel in channels {
        match source.channel_tags(&channel.id).await? {
            Some(tags) => out.push(ChannelTags {
                id: channel.id.clone(),
                name: channel.title.clone(),
                tags,
            }),
            None => debug!(id = %channel.id, "no tag record for channel"),
        }
    }

    let tagged = out.iter().filter(|t| !t.tags.is_empty()).count();
    info!(
        "Collected tags for {} of {} channels ({} with topics)",
        out.len(),
        channels.len(),
        tagged
    );
    Ok(out)
}
