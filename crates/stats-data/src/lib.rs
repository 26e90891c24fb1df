//! Data layer for the channel statistics pipeline.
//!
//! Responsible for collapsing raw samples into monthly averages, building the
//! month-by-month timeline table, reading and writing the JSON checkpoints and
//! exporting the final CSV report.

pub mod aggregator;
pub mod checkpoint;
pub mod export;
pub mod timeline;

pub use stats_core as core;
