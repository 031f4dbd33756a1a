// Shared transport configuration for building the reqwest::Client and
// bounding the dispatcher's retry and pagination loops.

use std::time::Duration;

use crate::error::Error;

/// Fixed wait between two attempts of a throttled request.
pub const DEFAULT_THROTTLE_BACKOFF: Duration = Duration::from_secs(3);

/// Throttle retries before a request is given up.
pub const DEFAULT_MAX_THROTTLE_RETRIES: u32 = 100;

/// Upper bound for pages fetched by a single aggregation.
pub const DEFAULT_MAX_PAGES: u32 = 10_000;

/// Shared transport configuration for the HTTP client.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub timeout: Duration,
    /// Wait applied after every HTTP 429 before the same call is resent.
    /// The API sends no `Retry-After`, so this is a fixed interval.
    pub throttle_backoff: Duration,
    /// Throttled attempts tolerated before `Error::ExhaustedRetries`.
    pub max_throttle_retries: u32,
    /// Pages tolerated before `Error::PaginationLimit`; guards against a
    /// server that never reports `isLastPage`.
    pub max_pages: u32,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            throttle_backoff: DEFAULT_THROTTLE_BACKOFF,
            max_throttle_retries: DEFAULT_MAX_THROTTLE_RETRIES,
            max_pages: DEFAULT_MAX_PAGES,
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(concat!("plenty-api/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(Error::Transport)
    }

    pub fn with_throttle_backoff(mut self, backoff: Duration) -> Self {
        self.throttle_backoff = backoff;
        self
    }

    pub fn with_max_throttle_retries(mut self, retries: u32) -> Self {
        self.max_throttle_retries = retries;
        self
    }

    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages;
        self
    }
}
