use chrono::NaiveDate;
use clap::{CommandFactory, Parser};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, StatsError};
use crate::time_utils::parse_query_date;

/// Default number of channels discovery must reach.
pub const DEFAULT_TARGET: usize = 110;

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Monthly view-count report for a pool of YouTube channels
#[derive(Parser, Debug, Clone)]
#[command(
    name = "channel-stats",
    about = "Monthly view-count report for a pool of YouTube channels",
    version
)]
pub struct Settings {
    /// PHPSESSID cookie for the random channel generator
    #[arg(long, env = "GENERATOR_SESSION", hide_env_values = true)]
    pub generator_session: Option<String>,

    /// Authorization header for the stats provider
    #[arg(long, env = "STATS_AUTH", hide_env_values = true)]
    pub stats_auth: Option<String>,

    /// Device id header for the stats provider
    #[arg(long, env = "STATS_DEVICE_ID", hide_env_values = true)]
    pub stats_device_id: Option<String>,

    /// YouTube Data API key; tag collection is skipped without one
    #[arg(long, env = "YOUTUBE_API_KEY", hide_env_values = true)]
    pub youtube_api_key: Option<String>,

    /// Directory holding the stats.json / tags.json checkpoints
    #[arg(long, default_value = ".")]
    pub data_dir: PathBuf,

    /// CSV report path
    #[arg(long, default_value = "result.csv")]
    pub output: PathBuf,

    /// First day of the collection window (YYYY-MM-DD)
    #[arg(long, default_value = "2020-04-11", value_parser = parse_date_arg)]
    pub from: NaiveDate,

    /// Last day of the collection window (YYYY-MM-DD)
    #[arg(long, default_value = "2021-03-11", value_parser = parse_date_arg)]
    pub to: NaiveDate,

    /// Number of distinct channels to discover
    #[arg(long, default_value_t = DEFAULT_TARGET)]
    pub target: usize,

    /// Concurrent stats requests (1-8)
    #[arg(long, default_value = "1", value_parser = clap::value_parser!(u32).range(1..=8))]
    pub concurrency: u32,

    /// Give up discovery after this many failed fetches (unbounded when omitted)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_discovery_failures: Option<u32>,

    /// Ignore existing checkpoints and fetch everything again
    #[arg(long)]
    pub refresh: bool,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"])]
    pub log_level: String,

    /// Log file path
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Clear saved configuration
    #[arg(long)]
    pub clear: bool,
}

fn parse_date_arg(s: &str) -> std::result::Result<NaiveDate, String> {
    parse_query_date(s).map_err(|e| e.to_string())
}

// ── LastUsedParams ─────────────────────────────────────────────────────────────

/// Persisted last-used parameters saved to `~/.channel-stats/last_used.json`.
///
/// Credentials are never written here.
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct LastUsedParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<u32>,
}

impl LastUsedParams {
    /// Return the default path to the persisted config file.
    /// Uses `~/.channel-stats/last_used.json`.
    pub fn config_path() -> PathBuf {
        Self::config_path_in(&dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
    }

    /// Return the config path rooted at `base_dir` (used for testing).
    pub fn config_path_in(base_dir: &Path) -> PathBuf {
        base_dir.join(".channel-stats").join("last_used.json")
    }

    /// Load persisted params from an explicit path.
    /// Returns `Default` when the file is absent or cannot be parsed.
    pub fn load_from(path: &Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        serde_json::from_str(&content).unwrap_or_default()
    }

    /// Atomically write params to an explicit path, creating parent
    /// directories if needed.
    pub fn save_to(&self, path: &Path) -> std::result::Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, path)?;

        Ok(())
    }

    /// Delete the config file at an explicit path if it exists.
    pub fn clear_at(path: &Path) -> std::result::Result<(), std::io::Error> {
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse CLI arguments, merge with last-used params where no explicit CLI
    /// value was provided, and persist the result.
    pub fn load_with_last_used() -> Self {
        Self::load_with_last_used_impl(
            std::env::args_os().collect(),
            &LastUsedParams::config_path(),
        )
    }

    /// Full implementation – accepts args and an explicit config path so that
    /// tests can redirect to a temporary directory.
    pub fn load_with_last_used_impl(
        args: Vec<std::ffi::OsString>,
        config_path: &Path,
    ) -> Self {
        let matches = Settings::command().get_matches_from(args.clone());
        let mut settings = Settings::parse_from(args);

        if settings.clear {
            let _ = LastUsedParams::clear_at(config_path);
            return Self::apply_debug(settings);
        }

        let last = LastUsedParams::load_from(config_path);

        // CLI always wins. clap stores the arg id under the field name.
        if !is_arg_explicitly_set(&matches, "data_dir") {
            if let Some(v) = last.data_dir {
                settings.data_dir = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "output") {
            if let Some(v) = last.output {
                settings.output = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "from") {
            if let Some(v) = last.from {
                settings.from = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "to") {
            if let Some(v) = last.to {
                settings.to = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "target") {
            if let Some(v) = last.target {
                settings.target = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "concurrency") {
            if let Some(v) = last.concurrency {
                settings.concurrency = v.clamp(1, 8);
            }
        }

        settings = Self::apply_debug(settings);

        let params = LastUsedParams::from(&settings);
        let _ = params.save_to(config_path);

        settings
    }

    /// `--debug` overrides the log level.
    fn apply_debug(mut settings: Settings) -> Settings {
        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }
        settings
    }

    /// Reject combinations no run could succeed with.
    pub fn validate(&self) -> Result<()> {
        if self.from > self.to {
            return Err(StatsError::Config(format!(
                "--from {} is after --to {}",
                self.from, self.to
            )));
        }
        if self.target == 0 {
            return Err(StatsError::Config("--target must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Path of the channel checkpoint inside `data_dir`.
    pub fn stats_path(&self) -> PathBuf {
        self.data_dir.join("stats.json")
    }

    /// Path of the tag checkpoint inside `data_dir`.
    pub fn tags_path(&self) -> PathBuf {
        self.data_dir.join("tags.json")
    }
}

// ── Conversion ─────────────────────────────────────────────────────────────────

impl From<&Settings> for LastUsedParams {
    fn from(s: &Settings) -> Self {
        LastUsedParams {
            data_dir: Some(s.data_dir.clone()),
            output: Some(s.output.clone()),
            from: Some(s.from),
            to: Some(s.to),
            target: Some(s.target),
            concurrency: Some(s.concurrency),
        }
    }
}

/// Returns `true` when `name` was supplied explicitly on the command line
/// (not via default value or environment variable).
fn is_arg_explicitly_set(matches: &clap::ArgMatches, name: &str) -> bool {
    matches.value_source(name) == Some(clap::parser::ValueSource::CommandLine)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
