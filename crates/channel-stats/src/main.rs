mod bootstrap;

use anyhow::Result;
use stats_core::settings::Settings;
use stats_core::time_utils::month_label;
use stats_runtime::pipeline::{Pipeline, PipelineReport};
use std::future::Future;

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::load_with_last_used();
    settings.validate()?;

    bootstrap::ensure_directories(&settings.data_dir)?;
    bootstrap::setup_logging(&settings.log_level, settings.log_file.as_ref())?;

    tracing::info!("channel-stats v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Window {} to {}, target {} channels, data dir {}",
        settings.from,
        settings.to,
        settings.target,
        settings.data_dir.display()
    );

    let pipeline = Pipeline::from_settings(&settings)?;

    // The report is only renamed into place once every stage has finished.
    let report = run_or_interrupt(pipeline.run(), tokio::signal::ctrl_c()).await?;
    tracing::info!(
        "Wrote {} ({} known, {} other channels, {} to {})",
        report.output.display(),
        report.known_channels,
        report.other_channels,
        month_label(report.window.start_year, report.window.start_month),
        month_label(report.window.end_year, report.window.end_month),
    );

    Ok(())
}

/// Drive `run` to completion unless `interrupt` fires first, in which case the
/// run is dropped and an error is returned.
async fn run_or_interrupt<R, S>(run: R, interrupt: S) -> Result<PipelineReport>
where
    R: Future<Output = stats_core::error::Result<PipelineReport>>,
    S: Future<Output = std::io::Result<()>>,
{
    tokio::select! {
        result = run => Ok(result?),
        _ = interrupt => {
            tracing::warn!("Ctrl+C received; stopping");
            anyhow::bail!("interrupted before the report was written")
        }
    }
}
