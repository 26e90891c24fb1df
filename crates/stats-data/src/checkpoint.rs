//! JSON checkpoints for fetched channels and collected tags.
//!
//! A missing checkpoint is not an error; it means the data has to be fetched.
//! A checkpoint that exists but does not parse aborts the run.

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use stats_core::error::{Result, StatsError};
use stats_core::models::{Channel, ChannelTags};
use tracing::debug;

// ── Public API ────────────────────────────────────────────────────────────────

/// Load the channel list, or `None` when `path` does not exist.
pub fn load_channels(path: &Path) -> Result<Option<Vec<Channel>>> {
    load_json(path)
}

/// Write the channel list to `path`.
pub fn save_channels(path: &Path, channels: &[Channel]) -> Result<()> {
    save_json(path, channels)
}

/// Load the tag list, or `None` when `path` does not exist.
pub fn load_tags(path: &Path) -> Result<Option<Vec<ChannelTags>>> {
    load_json(path)
}

/// Write the tag list to `path`.
pub fn save_tags(path: &Path, tags: &[ChannelTags]) -> Result<()> {
    save_json(path, tags)
}

/// Write `bytes` to `path` through a sibling temp file and a rename, so a
/// failed write never leaves a partial file behind.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| StatsError::FileRead {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);

    std::fs::write(&tmp, bytes).map_err(|source| StatsError::FileRead {
        path: tmp.clone(),
        source,
    })?;
    std::fs::rename(&tmp, path).map_err(|source| StatsError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

// ── Internal helpers ──────────────────────────────────────────────────────────

fn load_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("No checkpoint at {}", path.display());
            return Ok(None);
        }
        Err(source) => {
            return Err(StatsError::FileRead {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let value = serde_json::from_str(&content)?;
    debug!("Loaded checkpoint {}", path.display());
    Ok(Some(value))
}

fn save_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_vec(value)?;
    write_atomic(path, &json)?;
    debug!("Wrote checkpoint {} ({} bytes)", path.display(), json.len());
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
