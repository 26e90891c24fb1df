use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the channel statistics pipeline.
#[derive(Error, Debug)]
pub enum StatsError {
    /// A checkpoint or output file could not be opened, read or written.
    #[error("Failed to access file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A JSON document could not be parsed.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// A request could not be sent or its body could not be decoded.
    #[error("Request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The upstream answered with a non-success status code.
    #[error("Request to {url} returned status {status}")]
    HttpStatus { url: String, status: u16 },

    /// A metrics batch exceeded the upstream batching limit.
    #[error("Batch of {0} ids exceeds the limit of 5")]
    InvalidBatch(usize),

    /// No channel carried a single valid sample, so no report window exists.
    #[error("No samples found across any channel")]
    NoSamples,

    /// Discovery gave up after the configured number of failed fetches.
    #[error("Channel discovery gave up after {0} failed fetches")]
    DiscoveryExhausted(u32),

    /// The CSV writer failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the stats crates.
pub type Result<T> = std::result::Result<T, StatsError>;
