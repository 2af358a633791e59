use crate::utils::time::sleep_with_jitter;
use std::future::Future;
use tracing::warn;

/// Retry `operation` with exponential backoff and jitter.
///
/// Only transient failures (transport errors, rate limiting, server-side
/// statuses) are retried; anything fatal surfaces immediately so a bad
/// credential or a malformed request does not burn the whole retry budget.
pub async fn retry_with_backoff<T, F, Fut>(
    mut retries: u32,
    base_delay_ms: u64,
    operation: F,
) -> common::Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = common::Result<T>>,
{
    let mut delay = base_delay_ms;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                if retries == 0 || !e.is_transient() {
                    return Err(e);
                }

                warn!(error = %e, retries_left = retries, delay_ms = delay, "Retrying after transient failure");
                retries -= 1;
                sleep_with_jitter(delay, delay / 2).await;
                delay *= 2;
            }
        }
    }
}
