//! Retry schedule for calls to the game API.
//!
//! The API sits behind Cloudflare and answers floods with 429s or an HTML
//! block page, so those get a long pause. 5xx responses back off linearly and
//! transport failures exponentially. Anything else is returned immediately.

use crate::{
    config::app::RedemptionConfig,
    errors::{Error, Result},
};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Substrings of an error body that indicate rate limiting.
const RATE_LIMIT_MARKERS: [&str; 3] = ["cloudflare", "1015", "rate limit"];

/// Backoff schedule for a single API call.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Base of the exponential transport backoff
    pub base_backoff: Duration,
    /// Minimum wait after rate limiting
    pub cloudflare_backoff: Duration,
    /// Wait per attempt after a server error
    pub server_error_backoff: Duration,
}

impl RetryPolicy {
    /// Builds the policy from the `[redemption]` section.
    #[must_use]
    pub const fn from_config(config: &RedemptionConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_backoff: Duration::from_millis(config.base_backoff_ms),
            cloudflare_backoff: Duration::from_secs(config.cloudflare_backoff_secs),
            server_error_backoff: Duration::from_secs(config.server_error_backoff_secs),
        }
    }

    /// How long to wait before retry number `attempt + 1`.
    ///
    /// Rate limiting (429, a Cloudflare block page or [`Error::RateLimited`])
    /// waits at least `cloudflare_backoff`. Server errors back off linearly and
    /// transport errors exponentially.
    ///
    /// # Arguments
    /// * `error` - The failure of the last attempt
    /// * `attempt` - Number of the failed attempt, counting from 0
    ///
    /// # Returns
    /// * `Some(wait)` - The call may be retried after `wait`
    /// * `None` - The error is not worth retrying
    #[must_use]
    pub fn backoff_for(&self, error: &Error, attempt: u32) -> Option<Duration> {
        match error {
            Error::RateLimited { retry_after } => Some((*retry_after).max(self.cloudflare_backoff)),
            Error::Upstream { status, body } => {
                let body = body.to_lowercase();
                if *status == 429 || RATE_LIMIT_MARKERS.iter().any(|m| body.contains(m)) {
                    Some(self.cloudflare_backoff)
                } else if (500..600).contains(status) {
                    Some(self.server_error_backoff.saturating_mul(attempt + 1))
                } else {
                    None
                }
            }
            Error::Http(_) => Some(
                self.base_backoff
                    .saturating_mul(2_u32.saturating_pow(attempt)),
            ),
            _ => None,
        }
    }

    /// Runs `op`, retrying retryable failures up to `max_retries` times.
    ///
    /// # Errors
    /// Returns the first non-retryable error, or the last error once the
    /// retries are used up.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(error) => {
                    let Some(wait) = self.backoff_for(&error, attempt) else {
                        return Err(error);
                    };
                    if attempt >= self.max_retries {
                        return Err(error);
                    }
                    warn!(
                        "Attempt {} failed ({error}), retrying in {wait:?}",
                        attempt + 1
                    );
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
            }
        }
    }
}
