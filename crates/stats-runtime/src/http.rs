//! Shared HTTP plumbing for the upstream clients.

use std::time::Duration;

use serde::de::DeserializeOwned;
use stats_core::error::{Result, StatsError};

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// User agent sent with every request.
pub fn user_agent() -> String {
    format!("channel-stats/{}", env!("CARGO_PKG_VERSION"))
}

/// Build the client shared by all upstream sources.
pub fn build_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(DEFAULT_TIMEOUT)
        .user_agent(user_agent())
        .build()
        .map_err(|source| StatsError::Http {
            url: String::new(),
            source,
        })
}

/// Check the status of `response` and decode its body as JSON.
pub async fn read_json<T: DeserializeOwned>(response: reqwest::Response, url: &str) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        return Err(StatsError::HttpStatus {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let body = response.text().await.map_err(|source| StatsError::Http {
        url: url.to_string(),
        source,
    })?;
    Ok(serde_json::from_str(&body)?)
}

/// Wrap a send error with the URL it was sent to.
pub fn send_error(url: &str) -> impl FnOnce(reqwest::Error) -> StatsError + '_ {
    move |source| StatsError::Http {
        url: url.to_string(),
        source,
    }
}
