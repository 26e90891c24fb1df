//! Month-by-month view table: one row per channel, one column per month.

use stats_core::error::{Result, StatsError};
use stats_core::known::ChannelClassification;
use stats_core::models::{Channel, ReportWindow};
use stats_core::time_utils::{bounds, month_label};

/// Label of the first header column.
pub const TITLE_COLUMN: &str = "Channel name";

/// Stateless helper that turns aggregated channels into a CSV-ready grid.
pub struct TimelineTableBuilder;

impl TimelineTableBuilder {
    /// Window spanning the earliest and latest sample across `channels`.
    ///
    /// Fails with [`StatsError::NoSamples`] when no channel has any sample.
    pub fn window<'a, I>(channels: I) -> Result<ReportWindow>
    where
        I: IntoIterator<Item = &'a Channel>,
    {
        let timestamps = channels
            .into_iter()
            .flat_map(|c| c.samples.iter().map(|s| s.recorded_at));
        let (start, end) = bounds(timestamps).ok_or(StatsError::NoSamples)?;
        Ok(ReportWindow::from_bounds(start, end))
    }

    /// One `"<Month>-<Year>"` label per window month, in order.
    pub fn month_columns(window: &ReportWindow) -> Vec<String> {
        window
            .months()
            .into_iter()
            .map(|(year, month)| month_label(year, month))
            .collect()
    }

    /// [`TITLE_COLUMN`] followed by [`Self::month_columns`].
    pub fn header(window: &ReportWindow) -> Vec<String> {
        let mut header = Vec::with_capacity(window.month_count() + 1);
        header.push(TITLE_COLUMN.to_string());
        header.extend(Self::month_columns(window));
        header
    }

    /// The channel title followed by its view count for each window month.
    ///
    /// Months without a sample are left empty. If several samples land in the
    /// same month the last one wins.
    pub fn row(channel: &Channel, window: &ReportWindow) -> Vec<String> {
        let mut row = Vec::with_capacity(window.month_count() + 1);
        row.push(channel.title.clone());

        for key in window.months() {
            let cell = channel
                .samples
                .iter()
                .rev()
                .find(|s| s.month_key() == key)
                .map(|s| s.views.to_string())
                .unwrap_or_default();
            row.push(cell);
        }

        row
    }

    /// Header plus one row per channel, known channels first.
    pub fn build(classification: &ChannelClassification, window: &ReportWindow) -> Vec<Vec<String>> {
        let mut grid = Vec::with_capacity(classification.len() + 1);
        grid.push(Self::header(window));
        grid.extend(classification.ordered().map(|c| Self::row(c, window)));
        grid
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
