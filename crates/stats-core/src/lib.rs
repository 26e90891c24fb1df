//! Shared types for the channel statistics pipeline.
//!
//! Holds the channel and sample models, the curated channel list, the CLI
//! settings layer and the crate-wide error type.

pub mod error;
pub mod known;
pub mod models;
pub mod settings;
pub mod time_utils;
