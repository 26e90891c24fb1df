use chrono::{DateTime, Month, NaiveDate, Utc};

use crate::error::{Result, StatsError};

/// Date format the stats provider expects in its `from` / `to` parameters.
pub const QUERY_DATE_FORMAT: &str = "%Y-%m-%d";

// ── Month labels ──────────────────────────────────────────────────────────────

/// English name of a 1-based calendar month, or `None` when out of range.
pub fn month_name(month: u32) -> Option<&'static str> {
    let month = u8::try_from(month).ok()?;
    Month::try_from(month).ok().map(|m| m.name())
}

/// Column label for a report month, e.g. `"November-2023"`.
///
/// Out-of-range months fall back to the numeric form `"13-2023"`.
pub fn month_label(year: i32, month: u32) -> String {
    match month_name(month) {
        Some(name) => format!("{}-{}", name, year),
        None => format!("{}-{}", month, year),
    }
}

// ── Query dates ───────────────────────────────────────────────────────────────

/// Parse a `YYYY-MM-DD` date as given on the command line.
pub fn parse_query_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), QUERY_DATE_FORMAT)
        .map_err(|e| StatsError::Config(format!("invalid date \"{}\": {}", s, e)))
}

/// Format a date for the provider's query string.
pub fn format_query_date(date: NaiveDate) -> String {
    date.format(QUERY_DATE_FORMAT).to_string()
}

/// Earliest and latest of a set of timestamps.
pub fn bounds<I>(timestamps: I) -> Option<(DateTime<Utc>, DateTime<Utc>)>
where
    I: IntoIterator<Item = DateTime<Utc>>,
{
    timestamps.into_iter().fold(None, |acc, ts| match acc {
        None => Some((ts, ts)),
        Some((lo, hi)) => Some((lo.min(ts), hi.max(ts))),
    })
}
