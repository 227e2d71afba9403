//! Retry policy for idempotent GitHub reads.
//!
//! Only GET requests go through [`send_idempotent`]. Blob/tree/commit
//! creation and ref updates are sent exactly once.

use anyhow::{Context, Result};
use rand::Rng;
use reqwest::StatusCode;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

/// 3 retries with exponential backoff from 500ms, plus up to 25% jitter.
const RETRY_BASE_DELAY_MS: u64 = 500;
const MAX_RETRIES: usize = 3;
const RETRY_JITTER_DIVISOR: u128 = 4;
/// Upper bound on a server-requested `Retry-After`.
const MAX_RETRY_AFTER_SECS: u64 = 30;

fn is_retriable_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::REQUEST_TIMEOUT
            | StatusCode::TOO_MANY_REQUESTS
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    )
}

fn is_retriable_send_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect()
}

fn retry_base_delay(attempt: usize) -> Duration {
    let multiplier = 1u64.checked_shl(attempt as u32).unwrap_or(u64::MAX);
    Duration::from_millis(RETRY_BASE_DELAY_MS.saturating_mul(multiplier))
}

fn add_jitter(delay: Duration) -> Duration {
    let max_jitter_ms = delay.as_millis() / RETRY_JITTER_DIVISOR;
    if max_jitter_ms == 0 {
        return delay;
    }

    let max_jitter_ms = std::cmp::min(max_jitter_ms, u128::from(u64::MAX)) as u64;
    let jitter_ms = rand::thread_rng().gen_range(0..=max_jitter_ms);
    delay + Duration::from_millis(jitter_ms)
}

/// Parse a `Retry-After` header given in seconds.
fn retry_after(response: &reqwest::Response) -> Option<Duration> {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(|secs| Duration::from_secs(secs.min(MAX_RETRY_AFTER_SECS)))
}

/// Send a GET-style request, retrying transient failures.
///
/// Non-success responses that are not retriable (or exhausted retries) are
/// returned as-is so the caller can build a structured error from the body.
pub(super) async fn send_idempotent(
    mut make_request: impl FnMut() -> reqwest::RequestBuilder,
) -> Result<reqwest::Response> {
    let max_attempts = MAX_RETRIES + 1;

    for attempt in 0..max_attempts {
        match make_request().send().await {
            Ok(response) => {
                let status = response.status();
                if status.is_success() || !is_retriable_status(status) || attempt >= MAX_RETRIES {
                    return Ok(response);
                }

                let delay = retry_after(&response)
                    .unwrap_or_else(|| add_jitter(retry_base_delay(attempt)));
                debug!(
                    "GitHub request failed with status {}; retrying in {:?} (attempt {}/{})",
                    status,
                    delay,
                    attempt + 1,
                    max_attempts
                );
                let _ = response.bytes().await;
                sleep(delay).await;
            }
            Err(err) => {
                if is_retriable_send_error(&err) && attempt < MAX_RETRIES {
                    let delay = add_jitter(retry_base_delay(attempt));
                    debug!(
                        "GitHub request error: {}; retrying in {:?} (attempt {}/{})",
                        err,
                        delay,
                        attempt + 1,
                        max_attempts
                    );
                    sleep(delay).await;
                    continue;
                }

                return Err(anyhow::Error::new(err)).with_context(|| {
                    format!("GitHub request failed after {} attempt(s)", attempt + 1)
                });
            }
        }
    }

    unreachable!("send_idempotent should have returned within max_attempts")
}
