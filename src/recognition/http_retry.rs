//! HTTP retry with exponential backoff for recognition calls.
//!
//! 429 and 5xx responses and connect/timeout failures are retried; any
//! other client error is returned at once.

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

/// How hard to retry one recognition call
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Attempts before giving up
    pub max_attempts: u32,
    /// Backoff after the first failed attempt, doubled on each retry
    pub base_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
        }
    }
}

impl RetryPolicy {
    fn delay(&self, attempt: u32, rate_limited: bool) -> Duration {
        // Rate limits get one extra doubling so the quota has time to reset
        let exponent = if rate_limited { attempt + 1 } else { attempt };
        Duration::from_millis(self.base_delay_ms.saturating_mul(1u64 << exponent.min(16)))
    }
}

/// Send a request built by `build_request`, retrying per `policy`.
///
/// The error string describes the last failure and becomes the request's
/// error text.
pub async fn send_with_retry<F>(
    client: &Client,
    build_request: F,
    policy: RetryPolicy,
    context: &str,
) -> std::result::Result<Response, String>
where
    F: Fn(&Client) -> RequestBuilder,
{
    let mut last_error = format!("{}: no attempt made", context);

    for attempt in 0..policy.max_attempts {
        match build_request(client).send().await {
            Ok(resp) => {
                let status = resp.status();
                if status.is_success() {
                    return Ok(resp);
                }
                let rate_limited = status == StatusCode::TOO_MANY_REQUESTS;
                if !rate_limited && !status.is_server_error() {
                    warn!("{}: non-retriable status {}", context, status);
                    return Err(format!("{}: HTTP {}", context, status));
                }
                last_error = format!("{}: HTTP {}", context, status);
                if attempt + 1 < policy.max_attempts {
                    let delay = policy.delay(attempt, rate_limited);
                    warn!("{}: status {}, retrying in {:?}", context, status, delay);
                    tokio::time::sleep(delay).await;
                }
            }
            Err(e) if e.is_timeout() || e.is_connect() => {
                last_error = format!("{}: {}", context, e);
                if attempt + 1 < policy.max_attempts {
                    let delay = policy.delay(attempt, false);
                    warn!("{}: network error ({}), retrying in {:?}", context, e, delay);
                    tokio::time::sleep(delay).await;
                }
            }
            Err(e) => {
                warn!("{}: request failed: {}", context, e);
                return Err(format!("{}: {}", context, e));
            }
        }
    }

    warn!("{}: giving up after {} attempts", context, policy.max_attempts);
    Err(last_error)
}
