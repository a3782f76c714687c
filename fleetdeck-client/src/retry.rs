//! Bounded retry with exponential backoff for transient fetch failures.

use crate::config::RetryConfig;
use crate::error::ClientError;
use std::future::Future;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Run `op` until it succeeds, exhausting `config.max_attempts` total
/// attempts. Only errors classified retryable by
/// [`ClientError::is_retryable`] are retried; everything else surfaces
/// immediately.
pub async fn retry_fetch<T, F, Fut>(config: &RetryConfig, mut op: F) -> Result<T, ClientError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ClientError>>,
{
    let mut delay_ms = config.initial_ms;
    let mut attempt = 1u32;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt < config.max_attempts => {
                tracing::debug!(attempt, delay_ms, error = %err, "retrying transient fetch failure");
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                delay_ms = next_delay(delay_ms, config.multiplier, config.max_ms);
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

pub(crate) fn next_delay(current_ms: u64, multiplier: f64, max_ms: u64) -> u64 {
    let next = (current_ms as f64 * multiplier) as u64;
    next.min(max_ms)
}

/// Add deterministic sub-second jitter so reconnecting clients do not
/// thundering-herd the backend.
pub(crate) fn jittered_backoff(base_ms: u64, jitter_ms: u64) -> u64 {
    if jitter_ms == 0 {
        return base_ms;
    }
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_nanos(0))
        .subsec_nanos() as u64;
    let jitter = nanos % jitter_ms;
    base_ms.saturating_add(jitter)
}
