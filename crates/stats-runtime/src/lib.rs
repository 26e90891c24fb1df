//! Runtime layer for the channel statistics pipeline.
//!
//! Talks to the upstream services (channel generator, stats provider,
//! YouTube Data API) and drives the end-to-end [`pipeline::Pipeline`].

pub mod discovery;
pub mod http;
pub mod metrics_client;
pub mod pipeline;
pub mod tags;

pub use stats_core as core;
pub use stats_data as data;
