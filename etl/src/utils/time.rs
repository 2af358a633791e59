use rand::Rng;
use std::time::Duration;

/// Sleep for `base_ms` plus a uniform random jitter of up to `jitter_ms`,
/// so parallel retry loops drift apart instead of hammering in lockstep.
pub async fn sleep_with_jitter(base_ms: u64, jitter_ms: u64) {
    let jitter = if jitter_ms == 0 {
        0
    } else {
        rand::rng().random_range(0..=jitter_ms)
    };

    tokio::time::sleep(Duration::from_millis(base_ms + jitter)).await;
}
