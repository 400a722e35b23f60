//! Authenticated HTTP GETs against the mobile site.

mod backoff;

use std::sync::Arc;
use std::time::Duration;

use reqwest::{header, Client, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, warn};

pub use backoff::{BackoffPolicy, RateLimitState, RecordingSleeper, Sleeper, TokioSleeper};

use crate::constants::MOBILE_USER_AGENT;

/// Status the origin answers with while it throttles us.
pub const RATE_LIMITED: StatusCode = StatusCode::IM_A_TEAPOT;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("gave up on {url} after {throttles} rate-limited attempts")]
    RateLimited { url: String, throttles: u32 },
    #[error("unexpected status {status} from {url}")]
    Status { url: String, status: StatusCode },
    #[error("invalid JSON from {url}: {source}")]
    Json {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Raw response of one fetch.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub url: String,
    pub status: StatusCode,
    pub body: Vec<u8>,
}

impl FetchResponse {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Turn a non-2xx response into an error.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Status`] for any non-success status.
    pub fn error_for_status(self) -> Result<Self, FetchError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(FetchError::Status {
                url: self.url,
                status: self.status,
            })
        }
    }
}

/// Fetches pages with the session cookie and waits out rate limiting.
#[derive(Clone)]
pub struct Fetcher {
    client: Client,
    cookie: String,
    policy: BackoffPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl Fetcher {
    /// Create a fetcher that sends `cookie` on every request.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(cookie: &str, policy: BackoffPolicy, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(MOBILE_USER_AGENT)
            .build()
            .map_err(FetchError::Client)?;

        Ok(Self {
            client,
            cookie: cookie.to_string(),
            policy,
            sleeper: Arc::new(TokioSleeper),
        })
    }

    /// Replace the sleeper used for backoff and pacing.
    #[must_use]
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// The sleeper shared by everything that paces requests.
    #[must_use]
    pub fn sleeper(&self) -> Arc<dyn Sleeper> {
        Arc::clone(&self.sleeper)
    }

    /// Fetch `url`, retrying for as long as the origin signals rate limiting.
    ///
    /// Each consecutive throttle of this call waits one backoff step longer
    /// than the previous one. Any other status is returned as-is; transport
    /// failures are not retried here.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, or when a configured retry cap
    /// is exhausted.
    pub async fn fetch(&self, url: &str) -> Result<FetchResponse, FetchError> {
        let mut state = RateLimitState::new(self.policy.step);

        loop {
            let response = self
                .client
                .get(url)
                .header(header::COOKIE, &self.cookie)
                .send()
                .await
                .map_err(|source| FetchError::Transport {
                    url: url.to_string(),
                    source,
                })?;

            let status = response.status();
            if status == RATE_LIMITED {
                let wait = state.throttled();
                if !state.may_retry(&self.policy) {
                    return Err(FetchError::RateLimited {
                        url: url.to_string(),
                        throttles: state.throttles(),
                    });
                }
                warn!(
                    url = %url,
                    wait_secs = wait.as_secs(),
                    throttles = state.throttles(),
                    "Rate limited, waiting before retry"
                );
                self.sleeper.sleep(wait).await;
                continue;
            }

            let body = response
                .bytes()
                .await
                .map_err(|source| FetchError::Transport {
                    url: url.to_string(),
                    source,
                })?;

            debug!(url = %url, status = %status, bytes = body.len(), "Fetched");

            return Ok(FetchResponse {
                url: url.to_string(),
                status,
                body: body.to_vec(),
            });
        }
    }

    /// Fetch `url` and decode a successful response body as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the fetch fails, the status is not a success, or
    /// the body is not valid JSON for `T`.
    pub async fn fetch_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, FetchError> {
        let response = self.fetch(url).await?.error_for_status()?;
        serde_json::from_slice(&response.body).map_err(|source| FetchError::Json {
            url: url.to_string(),
            source,
        })
    }
}

impl std::fmt::Debug for Fetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fetcher")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}
