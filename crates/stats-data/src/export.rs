//! CSV export of the timeline grid.

use std::path::Path;

use stats_core::error::{Result, StatsError};
use tracing::info;

use crate::checkpoint::write_atomic;

/// Encode `rows` as CSV.
///
/// Rows are not required to share a length; the writer is flexible so a
/// mismatch surfaces in the report instead of aborting the run.
pub fn to_csv_bytes(rows: &[Vec<String>]) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(Vec::new());
    for row in rows {
        writer.write_record(row)?;
    }
    writer
        .into_inner()
        .map_err(|e| StatsError::Io(e.into_error()))
}

/// Write `rows` to `path` as CSV. Nothing is left at `path` on failure.
pub fn write_csv(path: &Path, rows: &[Vec<String>]) -> Result<()> {
    let bytes = to_csv_bytes(rows)?;
    write_atomic(path, &bytes)?;
    info!("CSV written to {} ({} rows)", path.display(), rows.len());
    Ok(())
}
